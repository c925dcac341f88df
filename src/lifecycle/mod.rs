//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Application::run (application.rs):
//!     Compile inventory → Validate components → Launch → Run → Stop
//!
//! Startup (startup.rs):
//!     One task per start hook, launched in registration order
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → clean shutdown, same as context cancellation
//!
//! Shutdown (shutdown.rs):
//!     Stop hooks in reverse registration order, each within the grace period
//! ```
//!
//! # Design Decisions
//! - One cancellation token per run, child of the caller's token
//! - Fail fast before running: compile or validation errors never start anything
//! - Shutdown has timeout: a stop hook is abandoned after the grace period

pub mod application;
mod shutdown;
pub mod signals;
mod startup;
pub mod types;

pub use application::{Application, DEFAULT_GRACE_PERIOD};
pub use signals::Signals;
pub use types::{LifecycleError, LifecycleResult, State};
