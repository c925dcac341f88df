//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace layer)
//!     → /ready   → readiness HttpHandler
//!     → /healthy → liveness HttpHandler
//! ```

pub mod server;

pub use server::{with_bind_address, HttpServer, HEALTHY_PATH, READY_PATH};
