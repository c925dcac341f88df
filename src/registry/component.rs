//! Component trait and lifecycle capabilities.
//!
//! A component declares what it needs (`bind`), what it can be injected as
//! (`interfaces`), and which lifecycle hooks it takes part in (`as_validate`,
//! `as_start`, `as_stop`). Every method has a default, so an empty
//! `impl Component for T {}` registers a plain component.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::registry::container::Interfaces;
use crate::registry::options::Configurable;
use crate::registry::slot::Bindings;
use crate::registry::types::BoxError;

/// An independently-configured unit of an application.
pub trait Component: Configurable + Send + Sync {
    /// Declare the slots the inventory should fill.
    fn bind(&self, _bindings: &mut Bindings) {}

    /// Declare the trait objects this component can be injected as.
    fn interfaces(_this: &Arc<Self>, _out: &mut Interfaces)
    where
        Self: Sized,
    {
    }

    fn as_validate(&self) -> Option<&dyn Validate> {
        None
    }

    fn as_start(&self) -> Option<&dyn Start> {
        None
    }

    fn as_stop(&self) -> Option<&dyn Stop> {
        None
    }
}

/// Self-check run once, after compilation and before anything starts.
pub trait Validate: Send + Sync {
    fn validate(&self) -> Result<(), BoxError>;
}

/// Long-running body of a component.
///
/// Expected to run until `ctx` is cancelled. Returning an error shuts the
/// application down; returning `Ok` early is not a shutdown trigger.
#[async_trait]
pub trait Start: Send + Sync {
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError>;
}

/// Graceful shutdown of a component.
///
/// The call is abandoned once the grace period expires. `ctx` is cancelled
/// after the call returns or is abandoned, so work spawned from the hook can
/// follow it; the hook itself never observes the cancellation.
#[async_trait]
pub trait Stop: Send + Sync {
    async fn stop(&self, ctx: CancellationToken) -> Result<(), BoxError>;
}
