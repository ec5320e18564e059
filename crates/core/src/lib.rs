//! Core types and shared functionality for hostgrade.
//!
//! This crate provides:
//! - Domain records and the SQLite store that persists them
//! - SSL analysis polling, registrant resolution and topology assembly
//! - The refresh orchestrator that serves records and revalidates stale ones
//! - Unified error types and layered configuration

pub mod analysis;
pub mod config;
pub mod error;
pub mod grade;
pub mod model;
pub mod refresh;
pub mod registrant;
pub mod store;
pub mod topology;
pub mod upstream;

pub use analysis::PollPolicy;
pub use config::AppConfig;
pub use error::{Error, ErrorKind};
pub use model::{Domain, DomainList, HostInfo, Server};
pub use refresh::{RefreshOrchestrator, Upstreams};
pub use store::HostDb;
