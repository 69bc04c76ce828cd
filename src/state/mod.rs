//! Per-service runtime state.
//!
//! # Data Flow
//! ```text
//! request middleware
//!     → mode.rs (read CardinalityState for the label policy)
//!     → gold.rs (count request, record duration on completion)
//!
//! /toggle-cardinality, /demo?bomb=1
//!     → mode.rs (the only mutation entry points)
//!
//! /status, /gold-metrics
//!     → snapshots of both
//! ```
//!
//! # Design Decisions
//! - One `ServiceState` per service instance, shared via `Arc` with handlers
//! - Nothing is persisted; a restart returns to `{false, false}`

pub mod gold;
pub mod mode;

pub use gold::{GoldMetrics, GoldMetricsReport, GoldSnapshot, RequestCounters};
pub use mode::{CardinalityState, ModeState, ServiceMode};

use crate::config::{ServiceConfig, ServiceRole};
use crate::labels::{LabelPolicy, ProcessIdentity};

/// Everything a service handler needs to label and account for requests.
#[derive(Debug)]
pub struct ServiceState {
    role: ServiceRole,
    policy: LabelPolicy,
    mode: ModeState,
    gold: Option<GoldMetrics>,
}

impl ServiceState {
    pub fn new(role: ServiceRole, policy: LabelPolicy) -> Self {
        Self {
            role,
            mode: ModeState::new(policy.mode()),
            gold: role.tracks_gold_metrics().then(GoldMetrics::new),
            policy,
        }
    }

    /// Build state from a validated service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let identity = ProcessIdentity::new(
            &config.identity.hostname,
            config.service_name(),
            &config.identity.build_id,
        );
        let policy = LabelPolicy::new(config.service_name(), config.demo_mode, identity);
        Self::new(config.role, policy)
    }

    pub fn role(&self) -> ServiceRole {
        self.role
    }

    pub fn policy(&self) -> &LabelPolicy {
        &self.policy
    }

    pub fn mode(&self) -> &ModeState {
        &self.mode
    }

    /// Present only on services that serve `/gold-metrics`.
    pub fn gold(&self) -> Option<&GoldMetrics> {
        self.gold.as_ref()
    }
}
