//! SSL Labs `analyze` response types and normalization.

use serde::Deserialize;

use hostgrade_core::upstream::{AnalysisReport, AnalysisStatus, Endpoint};

/// Raw response from the SSL Labs v3 `analyze` endpoint.
#[derive(Debug, Deserialize)]
pub struct AnalyzeResponse {
    pub status: String,
    #[serde(default)]
    pub endpoints: Vec<EndpointData>,
}

/// One graded endpoint as SSL Labs reports it.
#[derive(Debug, Deserialize)]
pub struct EndpointData {
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
    /// Absent while the endpoint is still being assessed or when it failed.
    #[serde(default)]
    pub grade: String,
}

impl From<AnalyzeResponse> for AnalysisReport {
    fn from(raw: AnalyzeResponse) -> Self {
        AnalysisReport {
            status: AnalysisStatus::parse(&raw.status),
            endpoints: raw
                .endpoints
                .into_iter()
                .map(|e| Endpoint { ip_address: e.ip_address, grade: e.grade })
                .collect(),
        }
    }
}
