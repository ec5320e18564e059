//! SSL analysis polling.
//!
//! The analyzer is asynchronous: a request either reports the analysis as
//! still running (`DNS`, `IN_PROGRESS`) or carries the final endpoint
//! grades (`READY`, `ERROR`). [`analyze`] re-polls on a fixed interval
//! under a wall-clock budget measured from the first request.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::Error;
use crate::upstream::{AnalysisReport, AnalysisStatus, SslAnalyzer};

/// Backoff interval and total budget for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub budget: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: Duration::from_secs(15), budget: Duration::from_secs(120) }
    }
}

/// Outcome of one polling attempt.
#[derive(Debug)]
pub enum Step<T> {
    Done(T),
    Pending,
}

/// Run `attempt` until it yields [`Step::Done`], sleeping `policy.interval`
/// between pending attempts.
///
/// The deadline is checked before every attempt and again after every
/// response, so a loop never outlives `policy.budget` by more than one
/// in-flight attempt. Errors from `attempt` end the loop immediately.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, what: &str, mut attempt: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Step<T>, Error>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        if started.elapsed() >= policy.budget {
            return Err(Error::Timeout(format!(
                "{what}: no result after {}s ({attempts} attempts)",
                policy.budget.as_secs()
            )));
        }

        attempts += 1;
        let step = attempt().await?;

        if started.elapsed() > policy.budget {
            return Err(Error::Timeout(format!(
                "{what}: budget of {}s exceeded during attempt {attempts}",
                policy.budget.as_secs()
            )));
        }

        match step {
            Step::Done(value) => return Ok(value),
            Step::Pending => {
                let remaining = policy.budget.saturating_sub(started.elapsed());
                tokio::time::sleep(policy.interval.min(remaining)).await;
            }
        }
    }
}

/// Poll the analyzer for `host` until a terminal status.
///
/// Returns the terminal report; an `ERROR` report still carries whatever
/// endpoints the analyzer graded.
pub async fn analyze(analyzer: &dyn SslAnalyzer, host: &str, policy: PollPolicy) -> Result<AnalysisReport, Error> {
    let what = format!("ssl analysis of {host}");

    poll_until(policy, &what, || async move {
        let report = analyzer.fetch_report(host).await?;
        tracing::debug!(host, status = ?report.status, endpoints = report.endpoints.len(), "analyzer poll");

        if report.status.is_terminal() {
            return Ok(Step::Done(report));
        }
        if report.status.is_pending() {
            return Ok(Step::Pending);
        }

        let raw = match &report.status {
            AnalysisStatus::Other(raw) => raw.clone(),
            status => format!("{status:?}"),
        };
        Err(Error::UnsupportedResponse(format!("analyzer returned unknown status {raw:?} for {host}")))
    })
    .await
}
