//! Health aggregation.
//!
//! # Responsibilities
//! - Find every registered component that implements `HealthCheck`
//! - Periodically poll them, treating slow answers as NotReady
//! - Publish the collected statuses on a fixed interval

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::health::state::{HealthCheck, Status};
use crate::registry::{
    init, Bindings, BoxError, Component, Configurable, Container, InitError, Mutator, Slot, Start,
    Stop,
};

/// Latest status of every monitored component, by container name.
pub type HealthReport = BTreeMap<String, Status>;

/// Polling cadence of a `HealthChecker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckIntervals {
    pub check: Duration,
    pub unresponsive: Duration,
    pub report: Duration,
}

impl Default for CheckIntervals {
    fn default() -> Self {
        Self {
            check: Duration::from_millis(300),
            unresponsive: Duration::from_secs(1),
            report: Duration::from_secs(5),
        }
    }
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Component aggregating the health of every other component.
pub struct HealthChecker {
    containers: Slot<Vec<Container>>,
    intervals: CheckIntervals,
    report: Arc<watch::Sender<HealthReport>>,
    worker: Mutex<Option<Worker>>,
}

impl Configurable for HealthChecker {
    fn defaults(&mut self) {
        self.intervals = CheckIntervals::default();
    }
}

impl HealthChecker {
    pub fn new(mutators: &[Mutator]) -> Result<Self, InitError> {
        let (report, _) = watch::channel(HealthReport::new());
        let mut checker = Self {
            containers: Slot::new(),
            intervals: CheckIntervals::default(),
            report: Arc::new(report),
            worker: Mutex::new(None),
        };
        init(&mut checker, mutators)?;
        Ok(checker)
    }

    pub fn intervals(&self) -> CheckIntervals {
        self.intervals
    }

    /// Follow published reports.
    pub fn subscribe(&self) -> watch::Receiver<HealthReport> {
        self.report.subscribe()
    }

    /// The last published report.
    pub fn report(&self) -> HealthReport {
        self.report.borrow().clone()
    }

    fn monitored(&self) -> Vec<(String, Arc<dyn HealthCheck>)> {
        self.containers
            .get()
            .map(|containers| {
                containers
                    .iter()
                    .filter_map(|c| {
                        c.view::<dyn HealthCheck>()
                            .map(|check| (c.name().to_string(), check))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Poll every check concurrently, each bounded by `unresponsive`.
async fn poll_all(
    checks: &[(String, Arc<dyn HealthCheck>)],
    unresponsive: Duration,
) -> Vec<(String, Status)> {
    let mut polls = JoinSet::new();
    for (name, check) in checks {
        let name = name.clone();
        let check = Arc::clone(check);
        polls.spawn(async move {
            let status = match time::timeout(unresponsive, check.status()).await {
                Ok(status) => status,
                Err(_) => {
                    tracing::warn!(component = %name, "Health check unresponsive");
                    Status::NotReady
                }
            };
            (name, status)
        });
    }

    let mut polled = Vec::with_capacity(checks.len());
    while let Some(result) = polls.join_next().await {
        match result {
            Ok(entry) => polled.push(entry),
            Err(e) => tracing::warn!(error = %e, "Health check task failed"),
        }
    }
    polled
}

async fn monitor(
    checks: Vec<(String, Arc<dyn HealthCheck>)>,
    intervals: CheckIntervals,
    report: Arc<watch::Sender<HealthReport>>,
    cancel: CancellationToken,
) {
    let mut statuses: HealthReport = checks
        .iter()
        .map(|(name, _)| (name.clone(), Status::NotReady))
        .collect();
    let mut check_ticker = time::interval(intervals.check);
    let mut report_ticker = time::interval(intervals.report);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Health checker received shutdown signal, exiting loop");
                break;
            }
            _ = check_ticker.tick() => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Health checker received shutdown signal during a check");
                        break;
                    }
                    polled = poll_all(&checks, intervals.unresponsive) => statuses.extend(polled),
                }
            }
            _ = report_ticker.tick() => {
                report.send_replace(statuses.clone());
            }
        }
    }
}

impl Component for HealthChecker {
    fn bind(&self, bindings: &mut Bindings) {
        bindings.all("containers", &self.containers);
    }

    fn as_start(&self) -> Option<&dyn Start> {
        Some(self)
    }

    fn as_stop(&self) -> Option<&dyn Stop> {
        Some(self)
    }
}

#[async_trait]
impl Start for HealthChecker {
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError> {
        let checks = self.monitored();
        tracing::info!(
            monitored = checks.len(),
            check_interval = ?self.intervals.check,
            report_interval = ?self.intervals.report,
            "Health checker starting"
        );

        let cancel = ctx.child_token();
        let handle = tokio::spawn(monitor(
            checks,
            self.intervals,
            Arc::clone(&self.report),
            cancel.clone(),
        ));
        let previous = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Worker { cancel, handle });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        Ok(())
    }
}

#[async_trait]
impl Stop for HealthChecker {
    async fn stop(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Worker { cancel, handle }) = worker {
            cancel.cancel();
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Health checker worker failed");
            }
        }
        Ok(())
    }
}

fn positive(value: Duration, what: &str) -> Result<Duration, BoxError> {
    if value.is_zero() {
        return Err(format!("{what} must be greater than zero").into());
    }
    Ok(value)
}

/// How often each component is polled. Defaults to 300ms.
pub fn with_check_interval(interval: Duration) -> Mutator {
    Mutator::new(move |c: &mut HealthChecker| {
        c.intervals.check = positive(interval, "check interval")?;
        Ok(())
    })
}

/// How long a component may take to answer before it counts as NotReady. Defaults to 1s.
pub fn with_unresponsive_timeout(timeout: Duration) -> Mutator {
    Mutator::new(move |c: &mut HealthChecker| {
        c.intervals.unresponsive = positive(timeout, "unresponsive timeout")?;
        Ok(())
    })
}

/// How often the report is published. Defaults to 5s.
pub fn with_report_interval(interval: Duration) -> Mutator {
    Mutator::new(move |c: &mut HealthChecker| {
        c.intervals.report = positive(interval, "report interval")?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_mutators() {
        let checker = HealthChecker::new(&[]).unwrap();
        assert_eq!(checker.intervals(), CheckIntervals::default());

        let checker = HealthChecker::new(&[
            with_check_interval(Duration::from_millis(10)),
            with_report_interval(Duration::from_millis(20)),
        ])
        .unwrap();
        assert_eq!(checker.intervals().check, Duration::from_millis(10));
        assert_eq!(checker.intervals().report, Duration::from_millis(20));
        assert_eq!(checker.intervals().unresponsive, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(HealthChecker::new(&[with_check_interval(Duration::ZERO)]).is_err());
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let checker = HealthChecker::new(&[]).unwrap();
        checker.stop(CancellationToken::new()).await.unwrap();
        assert!(checker.report().is_empty());
    }
}
