//! Startup orchestration.
//!
//! # Responsibilities
//! - Launch every start hook on its own task, in registration order
//! - Wait for each task to be running before launching the next one
//! - Report start failures (errors and panics) to the run loop
//! - Record the stop hooks to call, in launch order
//!
//! # Design Decisions
//! - Launch order is serialized; component bodies run concurrently
//! - A start hook returning `Ok` is not a shutdown trigger
//! - Cancellation or a signal during launch stops launching immediately

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::lifecycle::signals::{self, Signals};
use crate::lifecycle::types::LifecycleError;
use crate::registry::{BoxError, Container};

/// Outcome of the launch phase.
pub(crate) struct Launched {
    /// Components with a stop hook, in launch order.
    pub(crate) stops: Vec<Container>,
    /// What interrupted the launch, if anything.
    pub(crate) interrupted: Option<&'static str>,
    monitors: JoinSet<()>,
    bodies: Vec<AbortHandle>,
}

/// Launch every start hook against `run_ctx`.
pub(crate) async fn launch(
    containers: &[Container],
    parent: &CancellationToken,
    run_ctx: &CancellationToken,
    errors: &mpsc::UnboundedSender<LifecycleError>,
    interrupts: &mut Option<Signals>,
) -> Launched {
    let mut launched = Launched {
        stops: Vec::new(),
        interrupted: None,
        monitors: JoinSet::new(),
        bodies: Vec::new(),
    };

    for container in containers {
        let Some(component) = container.component() else {
            continue;
        };

        if component.as_start().is_some() {
            let (ready_tx, ready_rx) = oneshot::channel();
            let body = {
                let component = component.clone();
                let ctx = run_ctx.clone();
                tokio::spawn(async move {
                    let _ = ready_tx.send(());
                    match component.as_start() {
                        Some(hook) => hook.start(ctx).await,
                        None => Ok(()),
                    }
                })
            };
            launched.bodies.push(body.abort_handle());

            let name = container.name().to_string();
            let errors = errors.clone();
            launched.monitors.spawn(async move {
                let source: BoxError = match body.await {
                    Ok(Ok(())) => {
                        tracing::debug!(component = %name, "Component start returned");
                        return;
                    }
                    Ok(Err(source)) => source,
                    Err(e) if e.is_panic() => Box::new(e),
                    Err(_) => return,
                };
                tracing::error!(component = %name, error = %source, "Component failed while running");
                let _ = errors.send(LifecycleError::Start {
                    component: name,
                    source,
                });
            });

            tokio::select! {
                _ = ready_rx => {
                    tracing::debug!(component = %container.name(), "Component started");
                }
                _ = parent.cancelled() => {
                    launched.interrupted = Some("cancellation");
                }
                signal = signals::recv(interrupts) => {
                    launched.interrupted = Some(signal);
                }
            }
        }

        if component.as_stop().is_some() {
            launched.stops.push(container.clone());
        }
        if let Some(reason) = launched.interrupted {
            tracing::info!(reason, component = %container.name(), "Startup interrupted");
            break;
        }
    }
    launched
}

impl Launched {
    /// Wait up to `grace` for start hooks to return after cancellation, then abort the rest.
    pub(crate) async fn drain(mut self, grace: Duration) {
        let monitors = &mut self.monitors;
        let finished = async {
            while monitors.join_next().await.is_some() {}
        };
        if tokio::time::timeout(grace, finished).await.is_err() {
            tracing::warn!(
                remaining = self.monitors.len(),
                "Start hooks ignored cancellation, aborting them"
            );
            for body in &self.bodies {
                body.abort();
            }
        }
    }
}
