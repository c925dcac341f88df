//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Configure log level from config and environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured filter

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither `RUST_LOG` nor the config provides one.
pub const DEFAULT_FILTER: &str = "scaffolder=info,tower_http=info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(filter: &str) -> Result<(), TryInitError> {
    let filter = if filter.is_empty() { DEFAULT_FILTER } else { filter };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
