//! Shutdown sweep.
//!
//! # Responsibilities
//! - Call stop hooks in reverse launch order, one at a time
//! - Bound each call by the grace period
//! - Keep the first failure, log the others
//!
//! # Design Decisions
//! - A stop that overruns its deadline is abandoned, the sweep moves on
//! - Every stop hook runs, whatever happened to the previous ones

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::lifecycle::types::{LifecycleError, LifecycleResult};
use crate::registry::Container;

/// Stop `containers` in reverse order. Returns the first failure.
pub(crate) async fn stop_all(containers: &[Container], grace: Duration) -> LifecycleResult<()> {
    let mut first: Option<LifecycleError> = None;

    for container in containers.iter().rev() {
        if let Err(err) = stop_one(container, grace).await {
            tracing::warn!(component = %container.name(), error = %err, "Component stop failed");
            if first.is_none() {
                first = Some(err);
            }
        }
    }
    first.map_or(Ok(()), Err)
}

async fn stop_one(container: &Container, grace: Duration) -> LifecycleResult<()> {
    let Some(hook) = container.component().and_then(|c| c.as_stop()) else {
        return Ok(());
    };

    tracing::debug!(component = %container.name(), grace = ?grace, "Stopping component");
    let deadline = CancellationToken::new();
    let _cancel_on_exit = deadline.clone().drop_guard();

    match tokio::time::timeout(grace, hook.stop(deadline.clone())).await {
        Ok(Ok(())) => {
            tracing::debug!(component = %container.name(), "Component stopped");
            Ok(())
        }
        Ok(Err(source)) => Err(LifecycleError::Stop {
            component: container.name().to_string(),
            source,
        }),
        Err(_) => Err(LifecycleError::StopTimeout {
            component: container.name().to_string(),
            grace,
        }),
    }
}
