//! Component registry and lifecycle orchestration.
//!
//! Applications are assembled from independently configured components.
//! The inventory wires them together from the slots they declare, and the
//! application validates, starts and stops them in a deterministic order.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;

pub use config::schema::AppConfig;
pub use lifecycle::{Application, LifecycleError, State};
pub use registry::{Component, Inventory, Mutator, Slot};
