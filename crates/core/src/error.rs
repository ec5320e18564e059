//! Unified error types for hostgrade.
//!
//! Every failure the refresh pipeline can surface is one of these variants;
//! the HTTP layer maps them onto status codes through [`Error::kind`].

use tokio_rusqlite::rusqlite;

/// Unified error type for the hostgrade service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed hostname or request parameter.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Transport failure talking to one of the upstream providers.
    #[error("UPSTREAM_UNAVAILABLE: {0}")]
    UpstreamUnavailable(String),

    /// Upstream payload could not be decoded.
    #[error("DECODE_FAILURE: {0}")]
    DecodeFailure(String),

    /// SSL analysis did not reach a terminal status within its budget.
    #[error("ANALYSIS_TIMEOUT: {0}")]
    Timeout(String),

    /// Analyzer returned a status outside the known protocol.
    #[error("UNSUPPORTED_RESPONSE: {0}")]
    UnsupportedResponse(String),

    /// Database operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

/// Coarse failure classes used for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UpstreamUnavailable,
    DecodeFailure,
    Timeout,
    UnsupportedResponse,
    StorageFailure,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Error::DecodeFailure(_) => ErrorKind::DecodeFailure,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::UnsupportedResponse(_) => ErrorKind::UnsupportedResponse,
            Error::Database(_) | Error::MigrationFailed(_) => ErrorKind::StorageFailure,
        }
    }

    /// HTTP status code for this failure.
    ///
    /// Timeouts and protocol violations from the analyzer get their own
    /// codes; everything else past input validation is a server error.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::Timeout => 408,
            ErrorKind::UnsupportedResponse => 501,
            ErrorKind::UpstreamUnavailable | ErrorKind::DecodeFailure | ErrorKind::StorageFailure => 500,
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Timeout("example.com".to_string());
        assert!(err.to_string().contains("ANALYSIS_TIMEOUT"));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(Error::Timeout("x".into()).status_code(), 408);
        assert_eq!(Error::UnsupportedResponse("x".into()).status_code(), 501);
        assert_eq!(Error::UpstreamUnavailable("x".into()).status_code(), 500);
        assert_eq!(Error::DecodeFailure("x".into()).status_code(), 500);
        assert_eq!(Error::MigrationFailed("x".into()).status_code(), 500);
    }

    #[test]
    fn test_storage_kind() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
    }
}
