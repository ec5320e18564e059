//! Server topology assembly and change detection.

use crate::Error;
use crate::analysis::{self, PollPolicy};
use crate::model::Server;
use crate::registrant;
use crate::upstream::{RegistrantLookup, SslAnalyzer};

/// Servers of a host plus the liveness the analyzer reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub servers: Vec<Server>,
    pub is_down: bool,
}

/// Analyze `host` and resolve the registrant of every endpoint, in the
/// order the analyzer returned them.
///
/// The first failed registrant lookup aborts the build; nothing from a
/// partial build escapes.
pub async fn build_topology(
    analyzer: &dyn SslAnalyzer, registrants: &dyn RegistrantLookup, host: &str, policy: PollPolicy,
) -> Result<Topology, Error> {
    let report = analysis::analyze(analyzer, host, policy).await?;

    let mut servers = Vec::with_capacity(report.endpoints.len());
    for endpoint in report.endpoints {
        let resolved = registrant::resolve(registrants, &endpoint.ip_address).await?;
        servers.push(Server {
            address: endpoint.ip_address,
            ssl_grade: endpoint.grade,
            country: resolved.country,
            owner: resolved.organization,
        });
    }

    Ok(Topology { servers, is_down: report.status.is_down() })
}

/// Canonical server list for `host`.
pub async fn build_servers(
    analyzer: &dyn SslAnalyzer, registrants: &dyn RegistrantLookup, host: &str, policy: PollPolicy,
) -> Result<Vec<Server>, Error> {
    build_topology(analyzer, registrants, host, policy).await.map(|t| t.servers)
}

/// True when the lists differ in length or in any position.
pub fn servers_changed(previous: &[Server], current: &[Server]) -> bool {
    previous != current
}
