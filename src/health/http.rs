//! HTTP readiness/liveness endpoint.
//!
//! Follows a `HealthChecker`'s reports, merges them into a single status
//! with a `MergingRule`, and answers 200 while that status is Ready or
//! Healthy, 503 otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::health::checker::{HealthChecker, HealthReport};
use crate::health::state::Status;
use crate::registry::{
    init, Bindings, BoxError, Component, Configurable, InitError, Mutator, Slot, Start, Validate,
};

/// Reduces a report to a single status.
pub type MergingRule = Arc<dyn Fn(&HealthReport) -> Status + Send + Sync>;

/// `must_be` when every service reports exactly `must_be`, `otherwise` as soon as one does not.
pub fn every_service(must_be: Status, otherwise: Status) -> MergingRule {
    Arc::new(move |services: &HealthReport| {
        if services.values().all(|status| *status == must_be) {
            must_be
        } else {
            otherwise
        }
    })
}

/// Health endpoint component.
pub struct HttpHandler {
    checker: Slot<HealthChecker>,
    rule: MergingRule,
    status: watch::Sender<Status>,
}

impl Configurable for HttpHandler {
    fn defaults(&mut self) {
        self.rule = every_service(Status::Ready, Status::NotReady);
        self.status.send_replace(Status::NotReady);
    }
}

impl HttpHandler {
    pub fn new(mutators: &[Mutator]) -> Result<Self, InitError> {
        let (status, _) = watch::channel(Status::NotReady);
        let mut handler = Self {
            checker: Slot::new(),
            rule: every_service(Status::Ready, Status::NotReady),
            status,
        };
        init(&mut handler, mutators)?;
        Ok(handler)
    }

    /// Merged status as of the last report.
    pub fn status(&self) -> Status {
        *self.status.borrow()
    }

    /// Whether the endpoint currently answers 200.
    pub fn is_serving(&self) -> bool {
        matches!(self.status(), Status::Ready | Status::Healthy)
    }

    /// Fold a report into the handler's status.
    pub fn apply(&self, report: &HealthReport) -> Status {
        let status = (self.rule)(report);
        self.status.send_replace(status);
        status
    }

    /// Router serving this handler at `path`.
    pub fn routes(self: Arc<Self>, path: &str) -> Router {
        Router::new()
            .route(path, get(status_handler))
            .with_state(self)
    }
}

#[derive(Serialize)]
struct StatusBody {
    status: Status,
}

async fn status_handler(State(handler): State<Arc<HttpHandler>>) -> Response {
    let status = handler.status();
    let code = if handler.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(StatusBody { status })).into_response()
}

impl Component for HttpHandler {
    fn bind(&self, bindings: &mut Bindings) {
        bindings.slot("checker", &self.checker);
    }

    fn as_validate(&self) -> Option<&dyn Validate> {
        Some(self)
    }

    fn as_start(&self) -> Option<&dyn Start> {
        Some(self)
    }
}

impl Validate for HttpHandler {
    fn validate(&self) -> Result<(), BoxError> {
        if !self.checker.is_set() {
            return Err("no health checker bound to the handler".into());
        }
        Ok(())
    }
}

#[async_trait]
impl Start for HttpHandler {
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError> {
        let Some(checker) = self.checker.get() else {
            return Err("no health checker bound to the handler".into());
        };
        let mut reports = checker.subscribe();

        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                changed = reports.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let report = reports.borrow_and_update().clone();
                    let status = self.apply(&report);
                    tracing::trace!(status = %status, services = report.len(), "Health report merged");
                }
            }
        }
    }
}

/// Replace the merging rule; defaults to `every_service(Ready, NotReady)`.
pub fn with_merging_rule(rule: MergingRule) -> Mutator {
    Mutator::new(move |h: &mut HttpHandler| {
        h.rule = Arc::clone(&rule);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(entries: &[(&str, Status)]) -> HealthReport {
        entries
            .iter()
            .map(|(name, status)| (name.to_string(), *status))
            .collect()
    }

    #[test]
    fn test_every_service() {
        let rule = every_service(Status::Ready, Status::NotReady);
        assert_eq!(rule(&HealthReport::new()), Status::Ready);
        assert_eq!(
            rule(&report(&[("a", Status::Ready), ("b", Status::Ready)])),
            Status::Ready
        );
        assert_eq!(
            rule(&report(&[("a", Status::Ready), ("b", Status::Healthy)])),
            Status::NotReady
        );
    }

    #[test]
    fn test_handler_applies_rule() {
        let handler = HttpHandler::new(&[with_merging_rule(every_service(
            Status::Healthy,
            Status::NotHealthy,
        ))])
        .unwrap();
        assert_eq!(handler.status(), Status::NotReady);
        assert!(!handler.is_serving());

        handler.apply(&report(&[("a", Status::Healthy)]));
        assert_eq!(handler.status(), Status::Healthy);
        assert!(handler.is_serving());

        handler.apply(&report(&[("a", Status::Ready)]));
        assert_eq!(handler.status(), Status::NotHealthy);
    }

    #[test]
    fn test_unbound_handler_is_invalid() {
        let handler = HttpHandler::new(&[]).unwrap();
        assert!(handler.validate().is_err());
    }
}
