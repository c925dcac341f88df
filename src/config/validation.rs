//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (durations > 0, parseable bind address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem, located by its dotted key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(name) = &config.application.name {
        if name.trim().is_empty() {
            errors.push(ValidationError::new("application.name", "must not be empty"));
        }
    }
    if config.application.version.trim().is_empty() {
        errors.push(ValidationError::new("application.version", "must not be empty"));
    }

    let durations = [
        ("application.grace_period_ms", config.application.grace_period_ms),
        ("health.check_interval_ms", config.health.check_interval_ms),
        ("health.unresponsive_timeout_ms", config.health.unresponsive_timeout_ms),
        ("health.report_interval_ms", config.health.report_interval_ms),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if let Err(e) = config.http.bind_address.parse::<SocketAddr>() {
        errors.push(ValidationError::new(
            "http.bind_address",
            format!("invalid socket address `{}`: {e}", config.http.bind_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = AppConfig::default();
        config.application.name = Some("  ".to_string());
        config.application.grace_period_ms = 0;
        config.health.report_interval_ms = 0;
        config.http.bind_address = "localhost".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "application.name",
                "application.grace_period_ms",
                "health.report_interval_ms",
                "http.bind_address",
            ]
        );
    }
}
