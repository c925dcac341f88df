//! Component health states.
//!
//! # States
//! - NotReady: not able to serve yet, or unresponsive
//! - NotHealthy: running but degraded
//! - Healthy: running
//! - Ready: running and accepting traffic
//!
//! # Design Decisions
//! - Components publish their own state through a `HealthReporter`
//! - A fresh reporter starts as NotReady

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotReady,
    NotHealthy,
    Healthy,
    Ready,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::NotReady => "Not ready",
            Status::NotHealthy => "Not healthy",
            Status::Healthy => "Healthy",
            Status::Ready => "Ready",
        };
        f.write_str(text)
    }
}

/// Implemented by components the `HealthChecker` should monitor.
///
/// Declare it with `Component::interfaces` so the checker can find it:
/// `out.provide::<dyn HealthCheck>(this.clone())`.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn status(&self) -> Status;
}

/// Default `HealthCheck` implementation, meant to be embedded in a component.
#[derive(Debug)]
pub struct HealthReporter {
    tx: watch::Sender<Status>,
}

impl HealthReporter {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Status::NotReady);
        Self { tx }
    }

    pub fn set_status(&self, status: Status) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            tracing::debug!(from = %previous, to = %status, "Health status changed");
        }
    }

    pub fn current(&self) -> Status {
        *self.tx.borrow()
    }

    /// Follow status changes.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }
}

impl Default for HealthReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthCheck for HealthReporter {
    async fn status(&self) -> Status {
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(Status::NotReady.to_string(), "Not ready");
        assert_eq!(Status::NotHealthy.to_string(), "Not healthy");
        assert_eq!(Status::Ready.to_string(), "Ready");
    }

    #[tokio::test]
    async fn test_reporter_starts_not_ready() {
        let reporter = HealthReporter::new();
        assert_eq!(reporter.status().await, Status::NotReady);

        let mut changes = reporter.subscribe();
        reporter.set_status(Status::Healthy);
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow(), Status::Healthy);
        assert_eq!(reporter.status().await, Status::Healthy);
    }
}
