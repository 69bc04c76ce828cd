//! Configuration loading from disk and environment.
//!
//! Precedence, lowest first: defaults, TOML file, environment, CLI overrides.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::{LoadgenConfig, ServiceConfig, ServiceRole};
use crate::config::validation::{validate_config, validate_loadgen_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate a service configuration from the process environment.
pub fn load_config(
    path: Option<&Path>,
    role: Option<ServiceRole>,
) -> Result<ServiceConfig, ConfigError> {
    load_config_with(path, role, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(
    path: Option<&Path>,
    role: Option<ServiceRole>,
    env: F,
) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: ServiceConfig = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    if let Some(value) = env("SERVICE_ROLE") {
        config.role = parse_env("SERVICE_ROLE", &value)?;
    }
    if let Some(role) = role {
        config.role = role;
    }

    apply_env(&mut config, &env)?;

    if config.upstream_url.is_none() {
        config.upstream_url = config.role.default_upstream_url().map(str::to_string);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn apply_env<F>(config: &mut ServiceConfig, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env("OTEL_SERVICE_NAME") {
        config.service_name = Some(value);
    }
    if let Some(value) = env("PORT") {
        config.port = parse_env("PORT", &value)?;
    }
    if let Some(value) = env("DEMO_MODE") {
        config.demo_mode = parse_env("DEMO_MODE", &value)?;
    }
    if let Some(var) = config.role.upstream_env_var() {
        if let Some(value) = env(var) {
            config.upstream_url = Some(value);
        }
    }
    if let Some(value) = env("ERROR_RATE") {
        config.error_rate = parse_env("ERROR_RATE", &value)?;
    }
    if let Some(value) = env("HOSTNAME") {
        config.identity.hostname = value;
    }
    if let Some(value) = env("BUILD_ID") {
        config.identity.build_id = value;
    }
    if let Some(value) = env("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.collector_endpoint = value;
    }
    if let Some(value) = env("UPSTREAM_TIMEOUT_SECS") {
        config.timeouts.upstream_secs = parse_env("UPSTREAM_TIMEOUT_SECS", &value)?;
    }
    if let Some(value) = env("LOG_LEVEL") {
        config.observability.log_level = value;
    }
    if let Some(value) = env("LOG_FORMAT") {
        config.observability.log_format = parse_env("LOG_FORMAT", &value)?;
    }
    if let Some(value) = env("METRICS_ENABLED") {
        config.observability.metrics_enabled = parse_env("METRICS_ENABLED", &value)?;
    }
    if let Some(value) = env("METRICS_ADDRESS") {
        config.observability.metrics_address = value;
    }
    Ok(())
}

/// Load and validate the load generator configuration.
pub fn load_loadgen_config(path: Option<&Path>) -> Result<LoadgenConfig, ConfigError> {
    load_loadgen_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_loadgen_config`] with an injectable environment lookup.
pub fn load_loadgen_config_with<F>(path: Option<&Path>, env: F) -> Result<LoadgenConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: LoadgenConfig = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => LoadgenConfig::default(),
    };

    if let Some(value) = env("FRONTEND_URL") {
        config.base_url = value;
    }

    validate_loadgen_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn parse_env<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ServiceMode;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let env = env_of(&[
            ("PORT", "9090"),
            ("DEMO_MODE", "shaped"),
            ("HOSTNAME", "frontend-5d8f"),
            ("BUILD_ID", "build-777"),
            ("API_URL", "http://localhost:7000"),
        ]);
        let config = load_config_with(None, Some(ServiceRole::Frontend), env).unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.demo_mode, ServiceMode::Shaped);
        assert_eq!(config.identity.hostname, "frontend-5d8f");
        assert_eq!(config.identity.build_id, "build-777");
        assert_eq!(config.upstream_url.as_deref(), Some("http://localhost:7000"));
    }

    #[test]
    fn test_upstream_default_follows_role() {
        let config = load_config_with(None, Some(ServiceRole::Api), env_of(&[])).unwrap();
        assert_eq!(config.upstream_url.as_deref(), Some("http://worker:8080"));

        // API_URL belongs to the frontend and must not leak into the api.
        let env = env_of(&[("API_URL", "http://elsewhere:1")]);
        let config = load_config_with(None, Some(ServiceRole::Api), env).unwrap();
        assert_eq!(config.upstream_url.as_deref(), Some("http://worker:8080"));
    }

    #[test]
    fn test_role_from_env_and_cli() {
        let env = env_of(&[("SERVICE_ROLE", "worker")]);
        let config = load_config_with(None, None, &env).unwrap();
        assert_eq!(config.role, ServiceRole::Worker);

        let config = load_config_with(None, Some(ServiceRole::Api), &env).unwrap();
        assert_eq!(config.role, ServiceRole::Api);
    }

    #[test]
    fn test_bad_env_value() {
        let env = env_of(&[("ERROR_RATE", "lots")]);
        let err = load_config_with(None, Some(ServiceRole::Worker), env).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "ERROR_RATE", .. }));
    }

    #[test]
    fn test_validation_failure() {
        let env = env_of(&[("ERROR_RATE", "2.0")]);
        let err = load_config_with(None, Some(ServiceRole::Worker), env).unwrap_err();
        assert!(err.to_string().starts_with("Validation failed"));
    }

    #[test]
    fn test_loadgen_base_url_from_env() {
        let env = env_of(&[("FRONTEND_URL", "http://127.0.0.1:8080")]);
        let config = load_loadgen_config_with(None, env).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
    }
}
