mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use common::{http_get, test_app};
use scaffolder::health::checker::{
    with_check_interval, with_report_interval, with_unresponsive_timeout, HealthChecker,
    HealthReport,
};
use scaffolder::health::{HealthCheck, HealthReporter, HttpHandler, Status};
use scaffolder::http::{with_bind_address, HttpServer};
use scaffolder::registry::{
    with_name, BoxError, Component, Configurable, Interfaces, Start,
};

/// Reports `status` once started.
struct Service {
    health: HealthReporter,
    status: Status,
    hang: bool,
}

impl Service {
    fn reporting(status: Status) -> Self {
        Self {
            health: HealthReporter::new(),
            status,
            hang: false,
        }
    }

    fn unresponsive() -> Self {
        Self {
            hang: true,
            ..Self::reporting(Status::Ready)
        }
    }
}

impl Configurable for Service {}

impl Component for Service {
    fn interfaces(this: &Arc<Self>, out: &mut Interfaces) {
        out.provide::<dyn HealthCheck>(this.clone());
    }

    fn as_start(&self) -> Option<&dyn Start> {
        Some(self)
    }
}

#[async_trait]
impl HealthCheck for Service {
    async fn status(&self) -> Status {
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.health.status().await
    }
}

#[async_trait]
impl Start for Service {
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError> {
        self.health.set_status(self.status);
        ctx.cancelled().await;
        Ok(())
    }
}

fn fast_checker() -> Arc<HealthChecker> {
    Arc::new(
        HealthChecker::new(&[
            with_check_interval(Duration::from_millis(10)),
            with_unresponsive_timeout(Duration::from_millis(20)),
            with_report_interval(Duration::from_millis(20)),
        ])
        .unwrap(),
    )
}

#[tokio::test]
async fn test_checker_aggregates_reporters() {
    let checker = fast_checker();
    let mut reports = checker.subscribe();

    let mut app = test_app(Duration::from_millis(200), &[]);
    app.register_arc(checker.clone(), &[])
        .register(Service::reporting(Status::Ready), &[with_name("up")])
        .register(Service::reporting(Status::NotHealthy), &[with_name("degraded")])
        .register(Service::unresponsive(), &[with_name("stuck")]);

    let ctx = CancellationToken::new();
    let run = tokio::spawn(app.run(ctx.clone()));

    let expected: HealthReport = [
        ("up".to_string(), Status::Ready),
        ("degraded".to_string(), Status::NotHealthy),
        ("stuck".to_string(), Status::NotReady),
    ]
    .into_iter()
    .collect();
    tokio::time::timeout(Duration::from_secs(5), reports.wait_for(|r| *r == expected))
        .await
        .expect("health report never converged")
        .unwrap();

    ctx.cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_hung_check_does_not_delay_shutdown() {
    let checker = Arc::new(
        HealthChecker::new(&[
            with_check_interval(Duration::from_millis(10)),
            with_unresponsive_timeout(Duration::from_millis(500)),
        ])
        .unwrap(),
    );

    // The stuck check outlives the grace period.
    let mut app = test_app(Duration::from_millis(100), &[]);
    app.register_arc(checker, &[])
        .register(Service::unresponsive(), &[with_name("stuck")]);

    let ctx = CancellationToken::new();
    let cancel = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    app.run(ctx).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(400));
}

async fn get(handler: &Arc<HttpHandler>, path: &str) -> (StatusCode, serde_json::Value) {
    let response = handler
        .clone()
        .routes(path)
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_handler_maps_status_to_http() {
    let handler = Arc::new(HttpHandler::new(&[]).unwrap());

    let (code, body) = get(&handler, "/ready").await;
    assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not_ready");

    let report: HealthReport = [("up".to_string(), Status::Ready)].into_iter().collect();
    handler.apply(&report);
    let (code, body) = get(&handler, "/ready").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

/// Poll `path` until it answers 200, returning the body.
async fn wait_for_ok(addr: SocketAddr, path: &str) -> String {
    let poll = async {
        loop {
            let (code, body) = http_get(addr, path).await;
            if code == 200 {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .unwrap_or_else(|_| panic!("{path} never answered 200"))
}

#[tokio::test]
async fn test_server_serves_health_endpoints() {
    let server = Arc::new(HttpServer::new(&[with_bind_address("127.0.0.1:0")]).unwrap());
    let mut bound = server.watch_local_addr();

    let mut app = test_app(Duration::from_millis(200), &[]);
    app.register_arc(fast_checker(), &[])
        .register(HttpHandler::new(&[]).unwrap(), &[with_name("readiness")])
        .register(HttpHandler::new(&[]).unwrap(), &[with_name("liveness")])
        .register(Service::reporting(Status::Ready), &[with_name("up")])
        .register_arc(server.clone(), &[]);

    let ctx = CancellationToken::new();
    let run = tokio::spawn(app.run(ctx.clone()));

    let addr = tokio::time::timeout(Duration::from_secs(5), bound.wait_for(Option::is_some))
        .await
        .expect("server never bound")
        .map(|addr| *addr)
        .unwrap()
        .unwrap();

    let body = wait_for_ok(addr, "/ready").await;
    assert!(body.contains("\"ready\""));
    wait_for_ok(addr, "/healthy").await;
    let (code, _) = http_get(addr, "/missing").await;
    assert_eq!(code, 404);

    ctx.cancel();
    run.await.unwrap().unwrap();
    assert!(server.local_addr().is_none());
}
