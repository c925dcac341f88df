//! Component registry subsystem.
//!
//! # Data Flow
//! ```text
//! Inventory::add(component, mutators)
//!     → options.rs (defaults + component mutators)
//!     → container.rs (name, type, interface views)
//!     → slot.rs (Component::bind → injection targets)
//!
//! Inventory::compile()
//!     → every unset slot matched against every container
//!     → tag / type+name / type / interface, first match wins
//! ```
//!
//! # Design Decisions
//! - Components describe their slots explicitly, nothing is discovered at runtime
//! - Registration order is kept; the lifecycle reuses it for start and stop
//! - Slots are write-once; caller wiring always wins over automatic wiring

pub mod component;
pub mod container;
pub mod inventory;
pub mod options;
pub mod slot;
pub mod types;

pub use component::{Component, Start, Stop, Validate};
pub use container::{with_name, Container, ContainerSpec, Interfaces, NameTaken};
pub use inventory::{BindingPolicy, Inventory, Rule};
pub use options::{configure, init, Configurable, Configuration, Mutator};
pub use slot::{Bindings, Slot, ALL_CONTAINERS};
pub use types::{BoxError, InitError, InventoryError, RegistrationError, ResolveError};
