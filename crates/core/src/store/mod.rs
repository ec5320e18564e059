//! SQLite-backed persistence for domain records.
//!
//! This module owns all long-lived record state. It provides:
//!
//! - Versioned schema migrations
//! - WAL mode for concurrent readers
//! - Transactional insert and refresh of a domain with its servers

pub mod connection;
pub mod domains;
pub mod migrations;

pub use crate::Error;

pub use connection::HostDb;
pub use domains::{RefreshUpdate, StoredDomain};
