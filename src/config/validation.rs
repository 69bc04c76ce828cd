//! Semantic validation of loaded configuration.
//!
//! Serde handles syntax; these checks catch values that parse but cannot
//! work. All problems are collected so the operator sees them at once.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{LoadgenConfig, ServiceConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("error_rate must be within [0, 1], got {0}")]
    ErrorRateOutOfRange(f64),

    #[error("port must be non-zero")]
    ZeroPort,

    #[error("{role} requires an upstream URL")]
    MissingUpstream { role: String },

    #[error("invalid upstream URL '{url}': {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("load schedule has no stages")]
    EmptySchedule,

    #[error("stage target {target} exceeds the maximum of {max} virtual users")]
    TargetTooLarge { target: u32, max: u32 },
}

/// Upper bound on virtual users; one task is spawned per user up front.
pub const MAX_VIRTUAL_USERS: u32 = 10_000;

/// Validate a service configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !(0.0..=1.0).contains(&config.error_rate) {
        errors.push(ValidationError::ErrorRateOutOfRange(config.error_rate));
    }

    if config.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if config.role.upstream_path().is_some() {
        match config.upstream_url.as_deref().map(str::trim) {
            None | Some("") => errors.push(ValidationError::MissingUpstream {
                role: config.role.to_string(),
            }),
            Some(url) => {
                if let Err(e) = Url::parse(url) {
                    errors.push(ValidationError::InvalidUpstream {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.queue_sample_interval_ms == 0 {
        errors.push(ValidationError::ZeroInterval("queue_sample_interval_ms"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroInterval("timeouts.upstream_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a load generator configuration.
pub fn validate_loadgen_config(config: &LoadgenConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if Url::parse(&config.base_url).is_err() {
        errors.push(ValidationError::InvalidBaseUrl(config.base_url.clone()));
    }
    if config.stages.is_empty() {
        errors.push(ValidationError::EmptySchedule);
    }
    if let Some(target) = config
        .stages
        .iter()
        .map(|s| s.target)
        .find(|&t| t > MAX_VIRTUAL_USERS)
    {
        errors.push(ValidationError::TargetTooLarge {
            target,
            max: MAX_VIRTUAL_USERS,
        });
    }
    if config.status_timeout_ms == 0 {
        errors.push(ValidationError::ZeroInterval("status_timeout_ms"));
    }
    if config.request_timeout_ms == 0 {
        errors.push(ValidationError::ZeroInterval("request_timeout_ms"));
    }
    if !(0.0..=1.0).contains(&config.error_rate_threshold) {
        errors.push(ValidationError::ErrorRateOutOfRange(config.error_rate_threshold));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
