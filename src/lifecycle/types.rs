//! Lifecycle states and error definitions.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::registry::types::{BoxError, InitError, InventoryError};

/// Phase of an application run.
///
/// ```text
/// Created → Compiled → Validated → Running → Stopping → Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    Created,
    Compiled,
    Validated,
    Running,
    Stopping,
    Terminated,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Created => "created",
            State::Compiled => "compiled",
            State::Validated => "validated",
            State::Running => "running",
            State::Stopping => "stopping",
            State::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Errors that end an application run.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Application mutators failed.
    #[error("application configuration failed: {0}")]
    Config(#[from] InitError),

    /// Registration or resolution failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    #[error("component `{component}` is invalid: {source}")]
    Validation {
        component: String,
        #[source]
        source: BoxError,
    },

    #[error("component `{component}` failed while running: {source}")]
    Start {
        component: String,
        #[source]
        source: BoxError,
    },

    #[error("component `{component}` failed to stop: {source}")]
    Stop {
        component: String,
        #[source]
        source: BoxError,
    },

    #[error("component `{component}` did not stop within {grace:?}")]
    StopTimeout { component: String, grace: Duration },
}

impl LifecycleError {
    /// Name of the component at fault, if the error belongs to one.
    pub fn component(&self) -> Option<&str> {
        match self {
            LifecycleError::Validation { component, .. }
            | LifecycleError::Start { component, .. }
            | LifecycleError::Stop { component, .. }
            | LifecycleError::StopTimeout { component, .. } => Some(component),
            _ => None,
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered() {
        assert!(State::Created < State::Running);
        assert!(State::Stopping < State::Terminated);
        assert_eq!(State::Validated.to_string(), "validated");
    }

    #[test]
    fn test_component_of_error() {
        let err = LifecycleError::StopTimeout {
            component: "Cache".into(),
            grace: Duration::from_secs(1),
        };
        assert_eq!(err.component(), Some("Cache"));
        assert_eq!(err.to_string(), "component `Cache` did not stop within 1s");
    }
}
