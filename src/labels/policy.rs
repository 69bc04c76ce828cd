//! Label policy engine.
//!
//! Decides, for one request, exactly which dimensions go on the emitted
//! metrics.
//!
//! # Tiers
//! ```text
//! Shaped    service, method, route, status_code, path={id}-normalized
//! Firehose  + user_id, raw path, pod, instance, container, build_id
//! Bomb      Firehose + path_id (when the path has a numeric segment)
//! ```
//!
//! Firehose applies when the service runs in firehose mode or the
//! high-cardinality toggle is on. Bomb applies when the persistent bomb flag is
//! set or the single request asked for it.

use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use crate::labels::identity::ProcessIdentity;
use crate::labels::path::{extract_path_id, normalize_path};
use crate::state::{CardinalityState, ServiceMode};

/// Labels on every emission.
pub const ALWAYS_LABELS: &[&str] = &["service", "method", "route", "status_code"];

/// Labels added by the firehose tier.
pub const FIREHOSE_LABELS: &[&str] = &["user_id", "path", "pod", "instance", "container", "build_id"];

/// Labels added by the bomb tier.
pub const BOMB_LABELS: &[&str] = &[
    "user_id",
    "path",
    "path_id",
    "pod",
    "instance",
    "container",
    "build_id",
];

/// `status_code` until the response is known.
pub const STATUS_PENDING: &str = "200";

/// Exclusive upper bound of generated user ids.
const USER_ID_SPACE: u32 = 10_000;

/// Which label tier a request falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelTier {
    Shaped,
    Firehose,
    Bomb,
}

/// The parts of a request the policy looks at.
#[derive(Debug, Clone, Copy)]
pub struct RequestInfo<'a> {
    pub method: &'a str,
    /// Matched route pattern, if the router matched one.
    pub route: Option<&'a str>,
    pub path: &'a str,
    /// `?bomb=1` on this request only.
    pub bomb_requested: bool,
}

/// High-cardinality extension of a [`LabelSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirehoseLabels {
    /// Drawn per request, not a stable user identifier.
    pub user_id: String,
    /// Bomb tier only.
    pub path_id: Option<String>,
    pub identity: Arc<ProcessIdentity>,
}

/// Labels for one metric emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    pub service: String,
    pub method: String,
    pub route: String,
    pub status_code: String,
    /// Normalized in the shaped tier, raw otherwise.
    pub path: String,
    pub firehose: Option<FirehoseLabels>,
    bomb: bool,
}

impl LabelSet {
    pub fn tier(&self) -> LabelTier {
        match (&self.firehose, self.bomb) {
            (None, _) => LabelTier::Shaped,
            (Some(_), false) => LabelTier::Firehose,
            (Some(_), true) => LabelTier::Bomb,
        }
    }

    /// Replace the pending status with the real one.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = status.to_string();
        self
    }

    /// Label pairs in emission order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("service", self.service.as_str()),
            ("method", self.method.as_str()),
            ("route", self.route.as_str()),
            ("status_code", self.status_code.as_str()),
        ];
        match &self.firehose {
            None => pairs.push(("path", self.path.as_str())),
            Some(firehose) => {
                pairs.push(("user_id", firehose.user_id.as_str()));
                pairs.push(("path", self.path.as_str()));
                if let Some(path_id) = &firehose.path_id {
                    pairs.push(("path_id", path_id.as_str()));
                }
                pairs.extend(firehose.identity.pairs());
            }
        }
        pairs
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.pairs().into_iter().map(|(key, _)| key).collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value)
    }
}

/// Label names advertised on `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct LabelCatalog {
    pub always: &'static [&'static str],
    pub firehose: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bomb: Option<&'static [&'static str]>,
}

/// Per-service labeling policy.
#[derive(Debug, Clone)]
pub struct LabelPolicy {
    service: String,
    mode: ServiceMode,
    identity: Arc<ProcessIdentity>,
}

impl LabelPolicy {
    pub fn new(service: impl Into<String>, mode: ServiceMode, identity: ProcessIdentity) -> Self {
        Self {
            service: service.into(),
            mode,
            identity: Arc::new(identity),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode
    }

    pub fn identity(&self) -> &ProcessIdentity {
        &self.identity
    }

    /// Tier for a request under the given runtime flags.
    pub fn tier(&self, state: CardinalityState, bomb_requested: bool) -> LabelTier {
        if bomb_requested || state.bomb_enabled {
            LabelTier::Bomb
        } else if self.mode == ServiceMode::Firehose || state.high_cardinality_enabled {
            LabelTier::Firehose
        } else {
            LabelTier::Shaped
        }
    }

    /// Labels for a request, with `status_code` still pending.
    pub fn compute(&self, state: CardinalityState, request: &RequestInfo<'_>) -> LabelSet {
        let tier = self.tier(state, request.bomb_requested);

        let (path, firehose) = match tier {
            LabelTier::Shaped => (normalize_path(request.path).into_owned(), None),
            LabelTier::Firehose | LabelTier::Bomb => {
                let path_id = (tier == LabelTier::Bomb)
                    .then(|| extract_path_id(request.path))
                    .flatten()
                    .map(str::to_string);
                let firehose = FirehoseLabels {
                    user_id: random_user_id(),
                    path_id,
                    identity: self.identity.clone(),
                };
                (request.path.to_string(), Some(firehose))
            }
        };

        LabelSet {
            service: self.service.clone(),
            method: request.method.to_string(),
            route: request.route.unwrap_or(request.path).to_string(),
            status_code: STATUS_PENDING.to_string(),
            path,
            firehose,
            bomb: tier == LabelTier::Bomb,
        }
    }

    /// Labels for the worker's `cpu_work_units` and simulated errors.
    /// These follow the configured mode only.
    pub fn work_labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![
            ("service", self.service.clone()),
            ("operation", "work".to_string()),
        ];
        if self.mode == ServiceMode::Firehose {
            labels.push(("user_id", random_user_id()));
            labels.extend(self.identity_labels());
        }
        labels
    }

    /// Labels for the worker's `queue_depth` gauge.
    pub fn queue_labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![("service", self.service.clone())];
        if self.mode == ServiceMode::Firehose {
            labels.extend(self.identity_labels());
        }
        labels
    }

    /// Label names for `/status`; the bomb list only where bombs exist.
    pub fn catalog(&self, with_bomb: bool) -> LabelCatalog {
        LabelCatalog {
            always: ALWAYS_LABELS,
            firehose: FIREHOSE_LABELS,
            bomb: with_bomb.then_some(BOMB_LABELS),
        }
    }

    fn identity_labels(&self) -> impl Iterator<Item = (&'static str, String)> + '_ {
        self.identity
            .pairs()
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
    }
}

fn random_user_id() -> String {
    format!("user_{}", rand::thread_rng().gen_range(0..USER_ID_SPACE))
}
