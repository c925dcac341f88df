//! Registry error definitions.

use std::sync::Arc;
use thiserror::Error;

/// Error type returned by mutators and component hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared form of [`BoxError`], so sticky errors can be handed out more than once.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while applying mutators to a target.
#[derive(Debug, Clone, Error)]
pub enum InitError {
    /// A mutator returned an error; mutators applied before it are not rolled back.
    #[error("mutator for `{target}` failed: {source}")]
    Mutator {
        target: &'static str,
        #[source]
        source: SharedError,
    },
}

/// Errors raised by `Inventory::add`. The first one is kept and returned by `compile`.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// Component-level mutators failed.
    #[error("component `{component}` could not be configured: {source}")]
    Configure {
        component: &'static str,
        #[source]
        source: InitError,
    },

    /// Container-level mutators (naming) failed.
    #[error("container for `{component}` could not be configured: {source}")]
    Container {
        component: &'static str,
        #[source]
        source: InitError,
    },

    /// Component mutators were given for an `Arc` that has other owners.
    #[error("component `{component}` is shared and cannot receive component mutators")]
    SharedComponent { component: &'static str },
}

/// Errors raised while resolving injection targets.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// Strict policy only: a tag names no registered container.
    #[error("no container named `{tag}` for `{owner}.{field}`")]
    Unmatched {
        owner: String,
        field: String,
        tag: String,
    },

    /// A tag names a container that cannot provide the slot's type.
    #[error("container `{container}` ({provided}) cannot be assigned to `{owner}.{field}` ({expected})")]
    Incompatible {
        owner: String,
        field: String,
        container: String,
        provided: &'static str,
        expected: &'static str,
    },
}

/// Errors returned by `Inventory::compile`.
#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ResolveError::Unmatched {
            owner: "Server".into(),
            field: "readiness".into(),
            tag: "ready".into(),
        };
        assert_eq!(err.to_string(), "no container named `ready` for `Server.readiness`");

        let err = InventoryError::from(RegistrationError::SharedComponent { component: "Cache" });
        assert!(err.to_string().contains("`Cache` is shared"));
    }
}
