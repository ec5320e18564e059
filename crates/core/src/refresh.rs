//! Read-triggered revalidation of domain records.
//!
//! Every read of a domain goes through [`RefreshOrchestrator::resolve`]:
//!
//! - **miss**: nothing stored, build a new record from all three providers and insert it
//! - **fresh**: stored less than [`STALENESS_WINDOW`] ago, return it without upstream calls
//! - **stale**: rebuild the server topology, diff it against the stored list and write
//!   the new grade, previous grade, change flag and refresh time in one transaction
//!
//! Any failure while building leaves the stored record untouched.
//!
//! Refreshes of the same hostname are serialized by an in-process lock held
//! from lookup to write, so a request queued behind a refresh sees the
//! refreshed record as fresh. Separate processes sharing a database are not
//! coordinated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::Error;
use crate::analysis::PollPolicy;
use crate::grade::lowest_grade;
use crate::model::{Domain, DomainList, HostInfo};
use crate::store::{HostDb, RefreshUpdate, StoredDomain};
use crate::topology::{build_servers, build_topology, servers_changed};
use crate::upstream::{PageScraper, RegistrantLookup, SslAnalyzer};

/// Age at which a stored record must be revalidated before it is served.
pub const STALENESS_WINDOW: Duration = Duration::from_secs(60 * 60);

/// True once `now - last_refresh` reaches the staleness window.
pub fn is_stale(last_refresh: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let age = now.signed_duration_since(last_refresh);
    age.num_milliseconds() >= STALENESS_WINDOW.as_millis() as i64
}

/// The three upstream providers a rebuild draws on.
#[derive(Clone)]
pub struct Upstreams {
    pub analyzer: Arc<dyn SslAnalyzer>,
    pub registrants: Arc<dyn RegistrantLookup>,
    pub pages: Arc<dyn PageScraper>,
}

/// Per-hostname async locks.
///
/// An entry lives only while some request holds or waits on it; the last
/// guard to drop removes it.
#[derive(Default)]
struct HostLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl HostLocks {
    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(&self, host: &str) -> HostGuard<'_> {
        let lock = self.table().entry(host.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;
        HostGuard { registry: self, host: host.to_string(), guard: Some(guard) }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

/// Held lock on one hostname.
struct HostGuard<'a> {
    registry: &'a HostLocks,
    host: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for HostGuard<'_> {
    fn drop(&mut self) {
        // Waiters clone the Arc under the table lock, so a count of one
        // with the table held means nobody else can reach this entry.
        let mut table = self.registry.table();
        drop(self.guard.take());
        if table.get(&self.host).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            table.remove(&self.host);
        }
    }
}

/// Serves domain records, revalidating stale ones against upstream.
pub struct RefreshOrchestrator {
    db: HostDb,
    upstreams: Upstreams,
    policy: PollPolicy,
    locks: HostLocks,
}

impl RefreshOrchestrator {
    pub fn new(db: HostDb, upstreams: Upstreams, policy: PollPolicy) -> Self {
        Self { db, upstreams, policy, locks: HostLocks::default() }
    }

    /// Current record for `host`, building or refreshing it as needed.
    pub async fn resolve(&self, host: &str) -> Result<Domain, Error> {
        let _guard = self.locks.acquire(host).await;
        self.resolve_locked(host, Utc::now()).await
    }

    #[cfg(test)]
    async fn resolve_at(&self, host: &str, now: DateTime<Utc>) -> Result<Domain, Error> {
        let _guard = self.locks.acquire(host).await;
        self.resolve_locked(host, now).await
    }

    /// Every stored record, as-is.
    pub async fn list(&self) -> Result<DomainList, Error> {
        Ok(DomainList { items: self.db.list_domains().await? })
    }

    async fn resolve_locked(&self, host: &str, now: DateTime<Utc>) -> Result<Domain, Error> {
        match self.db.find_domain(host).await? {
            None => {
                tracing::debug!(host, "no stored record, building");
                self.create(host, now).await
            }
            Some(stored) if !is_stale(stored.domain.created_at, now) => {
                tracing::debug!(host, refreshed_at = %stored.domain.created_at, "serving fresh record");
                Ok(stored.domain)
            }
            Some(stored) => {
                tracing::debug!(host, refreshed_at = %stored.domain.created_at, "record is stale, revalidating");
                self.refresh(stored, now).await
            }
        }
    }

    async fn create(&self, host: &str, now: DateTime<Utc>) -> Result<Domain, Error> {
        let topology =
            build_topology(self.upstreams.analyzer.as_ref(), self.upstreams.registrants.as_ref(), host, self.policy)
                .await?;
        let page = self.upstreams.pages.fetch_page_info(host).await?;

        let domain = Domain {
            name: host.to_string(),
            host_info: HostInfo {
                ssl_grade: lowest_grade(&topology.servers),
                servers: topology.servers,
                servers_changed: false,
                previous_ssl_grade: String::new(),
                logo: page.logo,
                title: page.title,
                is_down: topology.is_down,
            },
            created_at: now,
        };

        self.db.insert_domain(&domain).await?;
        tracing::info!(
            host,
            ssl_grade = %domain.host_info.ssl_grade,
            servers = domain.host_info.servers.len(),
            is_down = domain.host_info.is_down,
            "stored new domain record"
        );

        Ok(domain)
    }

    async fn refresh(&self, stored: StoredDomain, now: DateTime<Utc>) -> Result<Domain, Error> {
        let StoredDomain { id, mut domain } = stored;

        let servers =
            build_servers(self.upstreams.analyzer.as_ref(), self.upstreams.registrants.as_ref(), &domain.name, self.policy)
                .await?;
        let grade = lowest_grade(&servers);
        let changed = servers_changed(&domain.host_info.servers, &servers);

        let update = RefreshUpdate {
            servers: changed.then(|| servers.clone()),
            servers_changed: changed,
            ssl_grade: grade,
            previous_ssl_grade: domain.host_info.ssl_grade.clone(),
            refreshed_at: now,
        };
        self.db.apply_refresh(id, &update).await?;

        tracing::info!(
            host = %domain.name,
            ssl_grade = %update.ssl_grade,
            previous_ssl_grade = %update.previous_ssl_grade,
            servers_changed = changed,
            "refreshed domain record"
        );

        let host = &mut domain.host_info;
        if changed {
            host.servers = servers;
        }
        host.servers_changed = update.servers_changed;
        host.ssl_grade = update.ssl_grade;
        host.previous_ssl_grade = update.previous_ssl_grade;
        domain.created_at = now;

        Ok(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Server;
    use crate::upstream::{AnalysisReport, AnalysisStatus, Endpoint, PageInfo, RegistrantInfo, RegistrantRecord};
    use async_trait::async_trait;
    use chrono::Duration as TimeDelta;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeAnalyzer {
        status: std::sync::Mutex<Option<&'static str>>,
        endpoints: std::sync::Mutex<Vec<(&'static str, &'static str)>>,
        calls: AtomicUsize,
    }

    impl FakeAnalyzer {
        fn set_endpoints(&self, endpoints: &[(&'static str, &'static str)]) {
            *self.endpoints.lock().unwrap() = endpoints.to_vec();
        }

        fn set_status(&self, status: &'static str) {
            *self.status.lock().unwrap() = Some(status);
        }
    }

    #[async_trait]
    impl SslAnalyzer for FakeAnalyzer {
        async fn fetch_report(&self, _host: &str) -> Result<AnalysisReport, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let status = self.status.lock().unwrap().unwrap_or("READY");
            let endpoints = self
                .endpoints
                .lock()
                .unwrap()
                .iter()
                .map(|(ip, grade)| Endpoint { ip_address: ip.to_string(), grade: grade.to_string() })
                .collect();
            Ok(AnalysisReport { status: AnalysisStatus::parse(status), endpoints })
        }
    }

    #[derive(Default)]
    struct FakeRegistry {
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RegistrantLookup for FakeRegistry {
        async fn lookup(&self, ip_address: &str) -> Result<RegistrantRecord, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::UpstreamUnavailable(format!("whois for {ip_address}")));
            }
            Ok(RegistrantRecord {
                primary: RegistrantInfo { organization: String::new(), country_code: String::new() },
                sub_record: Some(RegistrantInfo { organization: "Amazon.com, Inc.".into(), country_code: "US".into() }),
            })
        }
    }

    #[derive(Default)]
    struct FakePages {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageScraper for FakePages {
        async fn fetch_page_info(&self, host: &str) -> Result<PageInfo, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PageInfo { title: format!("Welcome to {host}"), logo: "/favicon.ico".into() })
        }
    }

    struct Harness {
        orchestrator: RefreshOrchestrator,
        db: HostDb,
        analyzer: Arc<FakeAnalyzer>,
        registry: Arc<FakeRegistry>,
        pages: Arc<FakePages>,
    }

    impl Harness {
        async fn new() -> Self {
            let db = HostDb::open_in_memory().await.unwrap();
            let analyzer = Arc::new(FakeAnalyzer::default());
            let registry = Arc::new(FakeRegistry::default());
            let pages = Arc::new(FakePages::default());
            analyzer.set_endpoints(&[("1.1.1.1", "A+"), ("2.2.2.2", "B")]);

            let upstreams = Upstreams {
                analyzer: analyzer.clone(),
                registrants: registry.clone(),
                pages: pages.clone(),
            };
            let orchestrator = RefreshOrchestrator::new(db.clone(), upstreams, PollPolicy::default());

            Self { orchestrator, db, analyzer, registry, pages }
        }

        fn upstream_calls(&self) -> usize {
            self.analyzer.calls.load(Ordering::SeqCst)
                + self.registry.calls.load(Ordering::SeqCst)
                + self.pages.calls.load(Ordering::SeqCst)
        }
    }

    fn server(address: &str, grade: &str) -> Server {
        Server {
            address: address.into(),
            ssl_grade: grade.into(),
            country: "US".into(),
            owner: "Amazon.com, Inc.".into(),
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_staleness_boundary() {
        let last = t0();
        assert!(!is_stale(last, last));
        assert!(!is_stale(last, last + TimeDelta::minutes(59) + TimeDelta::seconds(59)));
        assert!(is_stale(last, last + TimeDelta::hours(1)));
        assert!(is_stale(last, last + TimeDelta::days(3)));
    }

    #[tokio::test]
    async fn test_miss_builds_and_stores_record() {
        let h = Harness::new().await;

        let domain = h.orchestrator.resolve_at("example.com", t0()).await.unwrap();

        assert_eq!(domain.name, "example.com");
        assert_eq!(domain.created_at, t0());
        let host = &domain.host_info;
        assert_eq!(host.servers, vec![server("1.1.1.1", "A+"), server("2.2.2.2", "B")]);
        assert_eq!(host.ssl_grade, "B");
        assert_eq!(host.previous_ssl_grade, "");
        assert!(!host.servers_changed);
        assert!(!host.is_down);
        assert_eq!(host.title, "Welcome to example.com");
        assert_eq!(host.logo, "/favicon.ico");

        let stored = h.db.find_domain("example.com").await.unwrap().unwrap();
        assert_eq!(stored.domain, domain);
    }

    #[tokio::test]
    async fn test_miss_with_error_status_marks_down() {
        let h = Harness::new().await;
        h.analyzer.set_status("ERROR");

        let domain = h.orchestrator.resolve_at("example.com", t0()).await.unwrap();
        assert!(domain.host_info.is_down);
    }

    #[tokio::test]
    async fn test_fresh_record_served_without_upstream_calls() {
        let h = Harness::new().await;
        let created = h.orchestrator.resolve_at("example.com", t0()).await.unwrap();
        let calls_after_create = h.upstream_calls();

        let later = t0() + TimeDelta::minutes(59) + TimeDelta::seconds(59);
        let served = h.orchestrator.resolve_at("example.com", later).await.unwrap();

        assert_eq!(served, created);
        assert_eq!(h.upstream_calls(), calls_after_create);
    }

    #[tokio::test]
    async fn test_stale_record_with_same_topology() {
        let h = Harness::new().await;
        h.orchestrator.resolve_at("example.com", t0()).await.unwrap();
        let pages_before = h.pages.calls.load(Ordering::SeqCst);

        let later = t0() + TimeDelta::hours(1);
        let refreshed = h.orchestrator.resolve_at("example.com", later).await.unwrap();

        assert_eq!(h.analyzer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.pages.calls.load(Ordering::SeqCst), pages_before);
        assert!(!refreshed.host_info.servers_changed);
        assert_eq!(refreshed.host_info.ssl_grade, "B");
        assert_eq!(refreshed.host_info.previous_ssl_grade, "B");
        assert_eq!(refreshed.created_at, later);

        let stored = h.db.find_domain("example.com").await.unwrap().unwrap();
        assert_eq!(stored.domain, refreshed);
    }

    #[tokio::test]
    async fn test_stale_record_with_changed_topology() {
        let h = Harness::new().await;
        h.orchestrator.resolve_at("example.com", t0()).await.unwrap();

        h.analyzer.set_endpoints(&[("2.2.2.2", "B"), ("1.1.1.1", "A+"), ("3.3.3.3", "C")]);
        let later = t0() + TimeDelta::hours(2);
        let refreshed = h.orchestrator.resolve_at("example.com", later).await.unwrap();

        let host = &refreshed.host_info;
        assert!(host.servers_changed);
        assert_eq!(host.ssl_grade, "C");
        assert_eq!(host.previous_ssl_grade, "B");
        assert_eq!(host.servers.len(), 3);
        assert_eq!(host.servers[0].address, "2.2.2.2");

        let stored = h.db.find_domain("example.com").await.unwrap().unwrap();
        assert_eq!(stored.domain, refreshed);
    }

    #[tokio::test]
    async fn test_reordered_servers_count_as_change() {
        let h = Harness::new().await;
        h.orchestrator.resolve_at("example.com", t0()).await.unwrap();

        h.analyzer.set_endpoints(&[("2.2.2.2", "B"), ("1.1.1.1", "A+")]);
        let refreshed = h
            .orchestrator
            .resolve_at("example.com", t0() + TimeDelta::hours(1))
            .await
            .unwrap();

        assert!(refreshed.host_info.servers_changed);
        assert_eq!(refreshed.host_info.ssl_grade, "B");
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_record_untouched() {
        let h = Harness::new().await;
        let created = h.orchestrator.resolve_at("example.com", t0()).await.unwrap();

        h.analyzer.set_endpoints(&[("9.9.9.9", "F")]);
        h.registry.fail.store(true, Ordering::SeqCst);
        let result = h.orchestrator.resolve_at("example.com", t0() + TimeDelta::hours(3)).await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));

        let stored = h.db.find_domain("example.com").await.unwrap().unwrap();
        assert_eq!(stored.domain, created);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_timeout_stores_nothing() {
        let h = Harness::new().await;
        h.analyzer.set_status("IN_PROGRESS");

        let result = h.orchestrator.resolve_at("example.com", t0()).await;

        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(h.pages.calls.load(Ordering::SeqCst), 0);
        assert!(h.db.find_domain("example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_misses_build_once() {
        let h = Harness::new().await;

        let (a, b) = tokio::join!(
            h.orchestrator.resolve_at("example.com", t0()),
            h.orchestrator.resolve_at("example.com", t0()),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(h.analyzer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.db.list_domains().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_host_locks_released_after_failures() {
        let h = Harness::new().await;
        h.registry.fail.store(true, Ordering::SeqCst);

        for i in 0..50 {
            let host = format!("h{i}.example.com");
            assert!(h.orchestrator.resolve(&host).await.is_err());
        }

        assert_eq!(h.orchestrator.locks.len(), 0);
        assert!(h.db.list_domains().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_host_locks_released_after_contention() {
        let h = Harness::new().await;

        let (a, b, c) = tokio::join!(
            h.orchestrator.resolve("example.com"),
            h.orchestrator.resolve("example.com"),
            h.orchestrator.resolve("other.example.com"),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        assert_eq!(h.orchestrator.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_host_lock_entry_kept_while_waiting() {
        let locks = HostLocks::default();

        let first = locks.acquire("example.com").await;
        let waiter = locks.acquire("example.com");
        tokio::pin!(waiter);
        assert!(poll_once(waiter.as_mut()).await.is_none());

        drop(first);
        assert_eq!(locks.len(), 1);

        let second = waiter.await;
        drop(second);
        assert_eq!(locks.len(), 0);
    }

    async fn poll_once<F: std::future::Future + Unpin>(fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            out = fut => Some(out),
            _ = tokio::task::yield_now() => None,
        }
    }

    #[tokio::test]
    async fn test_list_returns_all_records() {
        let h = Harness::new().await;
        h.orchestrator.resolve_at("a.example.com", t0()).await.unwrap();
        h.orchestrator.resolve_at("b.example.com", t0()).await.unwrap();

        let list = h.orchestrator.list().await.unwrap();
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].name, "a.example.com");
    }
}
