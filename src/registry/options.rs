//! Functional-options configuration.
//!
//! # Responsibilities
//! - Run a target's default-value hook before anything else
//! - Apply an ordered list of mutators to the target
//! - Skip mutators written for another type, so one list can be shared
//!
//! # Design Decisions
//! - Mutators are type-erased and cloneable (`Arc<dyn Fn>`)
//! - First failing mutator aborts; earlier side effects are kept
//! - Target and mutator shape are checked by the compiler, not at runtime

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::registry::types::{BoxError, InitError};

/// Types that can be configured with [`init`].
///
/// `defaults` is invoked first, on every `init` call.
pub trait Configurable: Any {
    /// Assign default values.
    fn defaults(&mut self) {}
}

type ApplyFn = dyn Fn(&mut dyn Any) -> Result<(), BoxError> + Send + Sync;

/// A single-argument configuration function bound to one target type.
#[derive(Clone)]
pub struct Mutator {
    target: TypeId,
    target_name: &'static str,
    apply: Arc<ApplyFn>,
}

impl Mutator {
    /// Wrap a function mutating a `T`.
    pub fn new<T, F>(f: F) -> Self
    where
        T: Any,
        F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            target: TypeId::of::<T>(),
            target_name: type_name::<T>(),
            apply: Arc::new(move |target: &mut dyn Any| match target.downcast_mut::<T>() {
                Some(target) => f(target),
                None => Ok(()),
            }),
        }
    }

    /// Whether this mutator accepts a `T`.
    pub fn applies_to<T: Any>(&self) -> bool {
        self.target == TypeId::of::<T>()
    }

    /// Name of the type this mutator accepts.
    pub fn target_name(&self) -> &'static str {
        self.target_name
    }
}

impl fmt::Debug for Mutator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutator").field("target", &self.target_name).finish()
    }
}

/// Invoke `target.defaults()` then apply every mutator written for `T`, in order.
pub fn init<T: Configurable>(target: &mut T, mutators: &[Mutator]) -> Result<(), InitError> {
    target.defaults();

    for mutator in mutators {
        if !mutator.applies_to::<T>() {
            tracing::trace!(
                target_type = type_name::<T>(),
                mutator = mutator.target_name,
                "Skipping mutator for another type"
            );
            continue;
        }
        (mutator.apply)(target as &mut dyn Any).map_err(|e| InitError::Mutator {
            target: type_name::<T>(),
            source: e.into(),
        })?;
    }
    Ok(())
}

/// A configuration structure that can be turned into mutators,
/// typically after being deserialized from a file.
pub trait Configuration {
    fn mutators(&self) -> Vec<Mutator>;
}

/// Apply the mutators produced by `cfg` to `target`.
pub fn configure<T, C>(target: &mut T, cfg: &C) -> Result<(), InitError>
where
    T: Configurable,
    C: Configuration + ?Sized,
{
    init(target, &cfg.mutators())
}
