//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Framework internals:
//!     → tracing events (logging.rs installs the subscriber)
//!
//! Components:
//!     → Logger (logger.rs), bound through the inventory
//!     → Printer (tracing by default, any io::Write on request)
//! ```
//!
//! # Design Decisions
//! - One global subscriber, installed by the binary, never by the library
//! - Loggers are immutable; metadata is stacked, not mutated

pub mod logger;
pub mod logging;

pub use logger::{Level, Logger, Meta, Printer, TracingPrinter, WriterPrinter};
pub use logging::init_logging;
