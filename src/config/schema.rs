//! Configuration schema definitions.
//!
//! This module defines the configuration structures for the demo services and
//! the load generator. All types derive Serde traits for deserialization from
//! config files; environment overrides are applied afterwards by the loader.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::state::ServiceMode;

/// Which link of the frontend → api → worker chain this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    #[default]
    Frontend,
    Api,
    Worker,
}

impl ServiceRole {
    /// Service name used as the `service` label and in `/health`.
    pub fn default_name(self) -> &'static str {
        match self {
            ServiceRole::Frontend => "frontend",
            ServiceRole::Api => "api",
            ServiceRole::Worker => "worker",
        }
    }

    /// Environment variable naming the next hop, if this role has one.
    pub fn upstream_env_var(self) -> Option<&'static str> {
        match self {
            ServiceRole::Frontend => Some("API_URL"),
            ServiceRole::Api => Some("WORKER_URL"),
            ServiceRole::Worker => None,
        }
    }

    /// Default URL of the next hop.
    pub fn default_upstream_url(self) -> Option<&'static str> {
        match self {
            ServiceRole::Frontend => Some("http://api:8080"),
            ServiceRole::Api => Some("http://worker:8080"),
            ServiceRole::Worker => None,
        }
    }

    /// Path called on the next hop.
    pub fn upstream_path(self) -> Option<&'static str> {
        match self {
            ServiceRole::Frontend => Some("/process"),
            ServiceRole::Api => Some("/work"),
            ServiceRole::Worker => None,
        }
    }

    /// Only the frontend exposes runtime toggles (`/toggle-cardinality`,
    /// `?bomb=1`); the other services label purely from `DEMO_MODE`.
    pub fn honors_overrides(self) -> bool {
        matches!(self, ServiceRole::Frontend)
    }

    /// Only the frontend keeps the rolling window behind `/gold-metrics`.
    pub fn tracks_gold_metrics(self) -> bool {
        matches!(self, ServiceRole::Frontend)
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_name())
    }
}

impl FromStr for ServiceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "frontend" => Ok(ServiceRole::Frontend),
            "api" => Ok(ServiceRole::Api),
            "worker" => Ok(ServiceRole::Worker),
            _ => Err(format!("unknown service role '{}', use frontend, api or worker", s)),
        }
    }
}

/// Root configuration for one demo service process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Position in the service chain.
    pub role: ServiceRole,

    /// Value of the `service` label. Defaults to the role name.
    pub service_name: Option<String>,

    /// Bind host.
    pub bind_host: String,

    /// Listen port.
    pub port: u16,

    /// Labeling mode fixed at startup.
    pub demo_mode: ServiceMode,

    /// Base URL of the next hop (frontend → api, api → worker).
    pub upstream_url: Option<String>,

    /// Probability of a simulated `/work` failure (worker only).
    pub error_rate: f64,

    /// Interval of the worker queue-depth sampler in milliseconds.
    pub queue_sample_interval_ms: u64,

    /// Collector endpoint shown on the demo page.
    pub collector_endpoint: String,

    /// Process identity used verbatim as label values.
    pub identity: IdentityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        // The upstream default depends on the final role, so the loader
        // fills it in once file and environment have been applied.
        Self {
            upstream_url: None,
            ..Self::for_role(ServiceRole::default())
        }
    }
}

impl ServiceConfig {
    /// Defaults for the given role, including its upstream URL.
    pub fn for_role(role: ServiceRole) -> Self {
        Self {
            role,
            service_name: None,
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            demo_mode: ServiceMode::Firehose,
            upstream_url: role.default_upstream_url().map(str::to_string),
            error_rate: 0.05,
            queue_sample_interval_ms: 2000,
            collector_endpoint: "http://otel-collector:4318".to_string(),
            identity: IdentityConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }

    /// Effective service name.
    pub fn service_name(&self) -> &str {
        self.service_name
            .as_deref()
            .unwrap_or_else(|| self.role.default_name())
    }

    /// Address to bind, `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Process identity attached to firehose labels.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Used for both `pod` and `instance`.
    pub hostname: String,

    /// Used for `build_id`.
    pub build_id: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            hostname: "unknown".to_string(),
            build_id: "build-123".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for chained calls to the next hop, in seconds.
    pub upstream_secs: u64,

    /// Total time a request may spend inside the service, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upstream_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("unknown log format '{}'", s)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Scrape endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9464".to_string(),
        }
    }
}

/// One step of the virtual-user schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StageConfig {
    /// Stage length in seconds.
    pub duration_secs: u64,

    /// VU count reached at the end of the stage.
    pub target: u32,
}

/// Configuration for the adaptive load generator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadgenConfig {
    /// Frontend base URL.
    pub base_url: String,

    /// Ramp schedule.
    pub stages: Vec<StageConfig>,

    /// Maximum age of the cached frontend status in milliseconds.
    pub status_check_interval_ms: u64,

    /// Timeout for `/status` polls in milliseconds.
    pub status_timeout_ms: u64,

    /// Timeout for generated traffic in milliseconds.
    pub request_timeout_ms: u64,

    /// Sleep between iterations of one virtual user in milliseconds.
    pub iteration_pause_ms: u64,

    /// Latency check bound in milliseconds.
    pub latency_check_ms: u64,

    /// Threshold on the p95 request latency in milliseconds.
    pub p95_threshold_ms: f64,

    /// Threshold on the failed-iteration rate (0..1).
    pub error_rate_threshold: f64,

    /// Seed for path generation; random when absent.
    pub seed: Option<u64>,
}

impl Default for LoadgenConfig {
    fn default() -> Self {
        Self {
            base_url: "http://frontend:8080".to_string(),
            stages: vec![
                StageConfig { duration_secs: 30, target: 10 },
                StageConfig { duration_secs: 120, target: 10 },
                StageConfig { duration_secs: 30, target: 20 },
                StageConfig { duration_secs: 120, target: 20 },
                StageConfig { duration_secs: 30, target: 0 },
            ],
            status_check_interval_ms: 10_000,
            status_timeout_ms: 2_000,
            request_timeout_ms: 60_000,
            iteration_pause_ms: 500,
            latency_check_ms: 1_000,
            p95_threshold_ms: 500.0,
            error_rate_threshold: 0.1,
            seed: None,
        }
    }
}
