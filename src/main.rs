//! Scaffolder demo service.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                        APPLICATION                           │
//!   │                                                              │
//!   │  ┌──────────┐   ┌──────────────┐   ┌──────────────────────┐  │
//!   │  │  Logger  │◀──│  Heartbeat   │   │    HealthChecker     │  │
//!   │  └──────────┘   │ (HealthCheck)│◀──│ ("containers" slot)  │  │
//!   │                 └──────────────┘   └──────────┬───────────┘  │
//!   │                                               │ reports      │
//!   │                              ┌────────────────┴─────────┐    │
//!   │                              ▼                          ▼    │
//!   │                     ┌─────────────────┐  ┌─────────────────┐ │
//!   │                     │   "readiness"   │  │   "liveness"    │ │
//!   │                     │   HttpHandler   │  │   HttpHandler   │ │
//!   │                     └────────┬────────┘  └────────┬────────┘ │
//!   │                              └──────────┬─────────┘          │
//!   │                                         ▼                    │
//!   │                               ┌──────────────────┐           │
//!   │                               │    HttpServer    │──▶ /ready │
//!   │                               │                  │──▶ /healthy
//!   │                               └──────────────────┘           │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use scaffolder::config::{load_config, AppConfig};
use scaffolder::health::checker::{HealthChecker, HealthReport};
use scaffolder::health::http::{with_merging_rule, HttpHandler, MergingRule};
use scaffolder::health::{HealthCheck, HealthReporter, Status};
use scaffolder::http::{with_bind_address, HttpServer};
use scaffolder::observability::{init_logging, Logger};
use scaffolder::registry::{
    with_name, Bindings, BoxError, Component, Configurable, Configuration, Interfaces, Slot,
    Start, Stop,
};
use scaffolder::Application;

#[derive(Debug, Parser)]
#[command(name = "scaffolder", version, about = "Component lifecycle demo service")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the application name.
    #[arg(long)]
    name: Option<String>,

    /// Override the health endpoint bind address.
    #[arg(long)]
    bind: Option<String>,
}

/// Reports Ready while running and logs a beat every few seconds.
#[derive(Default)]
struct Heartbeat {
    logger: Slot<Logger>,
    health: HealthReporter,
}

impl Configurable for Heartbeat {}

impl Component for Heartbeat {
    fn bind(&self, bindings: &mut Bindings) {
        bindings.slot("logger", &self.logger);
    }

    fn interfaces(this: &Arc<Self>, out: &mut Interfaces) {
        out.provide::<dyn HealthCheck>(this.clone());
    }

    fn as_start(&self) -> Option<&dyn Start> {
        Some(self)
    }

    fn as_stop(&self) -> Option<&dyn Stop> {
        Some(self)
    }
}

#[async_trait]
impl HealthCheck for Heartbeat {
    async fn status(&self) -> Status {
        self.health.status().await
    }
}

#[async_trait]
impl Start for Heartbeat {
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError> {
        let logger = self
            .logger
            .get()
            .map(|l| l.with("component", "heartbeat"))
            .ok_or("no logger bound")?;
        self.health.set_status(Status::Ready);
        logger.info("Started");

        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        let mut beats: u64 = 0;
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    beats += 1;
                    logger.with("beat", beats).debug("Alive");
                }
            }
        }
    }
}

#[async_trait]
impl Stop for Heartbeat {
    async fn stop(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        self.health.set_status(Status::NotReady);
        if let Some(logger) = self.logger.get() {
            logger.with("component", "heartbeat").info("Stopped");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(name) = cli.name {
        config.application.name = Some(name);
    }

    init_logging(&config.logging.filter)?;

    tracing::info!(
        config = ?cli.config,
        bind_address = cli.bind.as_deref().unwrap_or(&config.http.bind_address),
        "Configuration loaded"
    );

    let mut app_mutators = config.application.mutators();
    app_mutators.extend(config.inventory.mutators());
    let mut app = Application::new(&app_mutators)?;

    let mut http_mutators = config.http.mutators();
    if let Some(bind) = cli.bind {
        http_mutators.push(with_bind_address(bind));
    }

    // Alive unless a component reports itself degraded.
    let liveness: MergingRule = Arc::new(|report: &HealthReport| {
        if report.values().any(|status| *status == Status::NotHealthy) {
            Status::NotHealthy
        } else {
            Status::Healthy
        }
    });

    app.register(Logger::new(&[])?, &config.logging.mutators())
        .register(HealthChecker::new(&[])?, &config.health.mutators())
        .register(HttpHandler::new(&[])?, &[with_name("readiness")])
        .register(
            HttpHandler::new(&[])?,
            &[
                with_name("liveness"),
                with_merging_rule(liveness),
            ],
        )
        .register(Heartbeat::default(), &[])
        .register(HttpServer::new(&[])?, &http_mutators);

    tracing::info!(application = %app, "Scaffolder starting");
    app.run(CancellationToken::new()).await?;
    Ok(())
}
