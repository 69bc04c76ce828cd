//! Cached view of the frontend's `/status`.

use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::error::LoadgenError;
use crate::state::ServiceMode;

/// The parts of the frontend `/status` body the driver reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatus {
    #[serde(default)]
    pub mode: ServiceMode,
    #[serde(default)]
    pub cardinality_bomb_mode: bool,
    #[serde(default)]
    pub high_cardinality_mode: bool,
}

/// Last successfully fetched status of one virtual user.
#[derive(Debug, Clone)]
pub struct StatusCache {
    entry: Option<(RemoteStatus, Instant)>,
    max_age: Duration,
}

impl StatusCache {
    pub fn new(max_age: Duration) -> Self {
        Self { entry: None, max_age }
    }

    /// `true` while a cached status exists and is younger than `max_age`.
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.entry
            .is_some_and(|(_, fetched_at)| now.saturating_duration_since(fetched_at) < self.max_age)
    }

    pub fn record(&mut self, status: RemoteStatus, now: Instant) {
        self.entry = Some((status, now));
    }

    /// Cached status, stale or not; firehose defaults before the first fetch.
    pub fn current(&self) -> RemoteStatus {
        self.entry.map(|(status, _)| status).unwrap_or_default()
    }
}

/// GET `{base_url}/status` with its own timeout.
pub async fn fetch_status(
    client: &reqwest::Client,
    base_url: &str,
    timeout: Duration,
) -> Result<RemoteStatus, LoadgenError> {
    let url = format!("{}/status", base_url.trim_end_matches('/'));
    let response = client
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| LoadgenError::StatusPoll(e.to_string()))?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(LoadgenError::StatusPoll(format!(
            "{url} returned {}",
            response.status()
        )));
    }

    response
        .json::<RemoteStatus>()
        .await
        .map_err(|e| LoadgenError::StatusPoll(e.to_string()))
}
