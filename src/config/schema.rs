//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Each section that configures a component implements `Configuration`,
//! turning its values into that component's mutators.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::health::checker::{with_check_interval, with_report_interval, with_unresponsive_timeout};
use crate::http::server::with_bind_address;
use crate::lifecycle::application::{
    with_binding_policy, with_grace_period, with_name, with_signals, with_version,
};
use crate::observability::logger::{with_level, Level};
use crate::registry::{BindingPolicy, Configuration, Mutator};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Identity and shutdown behavior.
    pub application: ApplicationConfig,

    /// Dependency resolution settings.
    pub inventory: InventoryConfig,

    /// Log filter and component logger level.
    pub logging: LoggingConfig,

    /// Health polling cadence.
    pub health: HealthConfig,

    /// Health endpoint listener.
    pub http: HttpConfig,
}

/// Application section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Display name; the binary name when unset.
    pub name: Option<String>,

    pub version: String,

    /// Time each stop hook is given, in milliseconds.
    pub grace_period_ms: u64,

    /// Shut down on SIGINT/SIGTERM.
    pub handle_signals: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: None,
            version: "0.0.0".to_string(),
            grace_period_ms: 1_000,
            handle_signals: true,
        }
    }
}

impl ApplicationConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Configuration for ApplicationConfig {
    fn mutators(&self) -> Vec<Mutator> {
        let mut mutators = vec![
            with_version(self.version.clone()),
            with_grace_period(self.grace_period()),
            with_signals(self.handle_signals),
        ];
        if let Some(name) = &self.name {
            mutators.push(with_name(name.clone()));
        }
        mutators
    }
}

/// Inventory section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Fail compilation when a tagged slot has no container of that name.
    pub strict_bindings: bool,
}

impl InventoryConfig {
    pub fn policy(&self) -> BindingPolicy {
        if self.strict_bindings {
            BindingPolicy::Strict
        } else {
            BindingPolicy::Lenient
        }
    }
}

impl Configuration for InventoryConfig {
    fn mutators(&self) -> Vec<Mutator> {
        vec![with_binding_policy(self.policy())]
    }
}

/// Logging section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub filter: String,

    /// Minimum level of the registered `Logger`.
    pub level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: crate::observability::logging::DEFAULT_FILTER.to_string(),
            level: Level::Info,
        }
    }
}

impl Configuration for LoggingConfig {
    fn mutators(&self) -> Vec<Mutator> {
        vec![with_level(self.level)]
    }
}

/// Health checker section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    pub check_interval_ms: u64,
    pub unresponsive_timeout_ms: u64,
    pub report_interval_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 300,
            unresponsive_timeout_ms: 1_000,
            report_interval_ms: 5_000,
        }
    }
}

impl Configuration for HealthConfig {
    fn mutators(&self) -> Vec<Mutator> {
        vec![
            with_check_interval(Duration::from_millis(self.check_interval_ms)),
            with_unresponsive_timeout(Duration::from_millis(self.unresponsive_timeout_ms)),
            with_report_interval(Duration::from_millis(self.report_interval_ms)),
        ]
    }
}

/// HTTP server section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Configuration for HttpConfig {
    fn mutators(&self) -> Vec<Mutator> {
        vec![with_bind_address(self.bind_address.clone())]
    }
}
