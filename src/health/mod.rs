//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Components (state.rs):
//!     Embed a HealthReporter, expose it as `dyn HealthCheck`
//!
//! Aggregation (checker.rs):
//!     Bound to every container ("containers" tag)
//!     → Poll each HealthCheck on a timer
//!     → Publish a HealthReport
//!
//! Endpoint (http.rs):
//!     Follow reports → MergingRule → 200 / 503
//! ```
//!
//! # Design Decisions
//! - Unresponsive components count as NotReady
//! - Reports are published on a fixed interval, not on every change
//! - Several endpoints (readiness, liveness) can share one checker

pub mod checker;
pub mod http;
pub mod state;

pub use checker::{HealthChecker, HealthReport};
pub use http::{every_service, HttpHandler, MergingRule};
pub use state::{HealthCheck, HealthReporter, Status};
