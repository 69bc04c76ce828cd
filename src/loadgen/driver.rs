//! Virtual-user loop.

use reqwest::header::USER_AGENT;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::Instant;

use crate::config::LoadgenConfig;
use crate::error::LoadgenError;
use crate::lifecycle::Shutdown;
use crate::loadgen::paths::{generate_path, Strategy};
use crate::loadgen::report::{Checks, RunReport, RunSummary};
use crate::loadgen::stages::StageSchedule;
use crate::loadgen::status::{fetch_status, StatusCache};

/// How often an idle VU re-checks whether it should become active.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Drives the stage schedule against the frontend.
pub struct LoadDriver {
    shared: Arc<Shared>,
    schedule: StageSchedule,
}

/// Read-only context every VU works from.
struct Shared {
    config: LoadgenConfig,
    client: reqwest::Client,
    checks: Checks,
    report: RunReport,
}

impl LoadDriver {
    pub fn new(config: LoadgenConfig) -> Result<Self, LoadgenError> {
        let client = reqwest::Client::builder().build()?;
        let schedule = StageSchedule::new(&config.stages);
        let shared = Shared {
            checks: Checks::new(Duration::from_millis(config.latency_check_ms)),
            report: RunReport::from_config(&config),
            client,
            config,
        };
        Ok(Self {
            shared: Arc::new(shared),
            schedule,
        })
    }

    pub fn schedule(&self) -> &StageSchedule {
        &self.schedule
    }

    /// Run the whole schedule, or until `shutdown` fires, and summarize.
    pub async fn run(self, shutdown: &Shutdown) -> RunSummary {
        let vus = self.schedule.max_target();
        tracing::info!(
            base_url = %self.shared.config.base_url,
            vus,
            duration_secs = self.schedule.total_duration().as_secs(),
            "Load run starting"
        );

        let start = Instant::now();
        let handles: Vec<_> = (0..vus)
            .map(|id| {
                let vu = VirtualUser::new(id, self.shared.clone());
                tokio::spawn(vu.run(self.schedule.clone(), start, shutdown.subscribe()))
            })
            .collect();

        for result in futures_util::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Virtual user task failed");
            }
        }

        let summary = self.shared.report.summary();
        tracing::info!(
            iterations = summary.iterations,
            error_rate = summary.error_rate,
            p95_latency_ms = summary.p95_latency_ms,
            "Load run finished"
        );
        summary
    }
}

struct VirtualUser {
    id: u32,
    shared: Arc<Shared>,
    cache: StatusCache,
    rng: fastrand::Rng,
}

impl VirtualUser {
    fn new(id: u32, shared: Arc<Shared>) -> Self {
        let rng = match shared.config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed.wrapping_add(u64::from(id))),
            None => fastrand::Rng::new(),
        };
        Self {
            id,
            cache: StatusCache::new(Duration::from_millis(shared.config.status_check_interval_ms)),
            shared,
            rng,
        }
    }

    async fn run(mut self, schedule: StageSchedule, start: Instant, mut shutdown: broadcast::Receiver<()>) {
        let total = schedule.total_duration();
        let pause = Duration::from_millis(self.shared.config.iteration_pause_ms);

        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }
            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            let wait = if schedule.target_at(elapsed) > f64::from(self.id) {
                self.iteration().await;
                pause
            } else {
                IDLE_POLL
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!(vu = self.id, "Virtual user finished");
    }

    async fn iteration(&mut self) {
        let config = &self.shared.config;

        let now = std::time::Instant::now();
        if !self.cache.is_fresh(now) {
            let timeout = Duration::from_millis(config.status_timeout_ms);
            match fetch_status(&self.shared.client, &config.base_url, timeout).await {
                Ok(status) => self.cache.record(status, now),
                Err(e) => tracing::debug!(vu = self.id, error = %e, "Status poll failed, using cached status"),
            }
        }

        let strategy = Strategy::from_status(&self.cache.current());
        let path = generate_path(strategy, &mut self.rng);
        let url = format!("{}{}", config.base_url.trim_end_matches('/'), path);
        let agent = format!("loadgen-{}", self.rng.u32(..1000));

        let started = Instant::now();
        let status = match self
            .shared
            .client
            .get(&url)
            .header(USER_AGENT, agent)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status().as_u16();
                let _ = response.bytes().await;
                Some(status)
            }
            Err(e) => {
                tracing::debug!(vu = self.id, url = %url, error = %e, "Request failed");
                None
            }
        };
        let latency = started.elapsed();

        let outcome = self.shared.checks.evaluate(strategy, path, status, latency);
        self.shared.report.record(outcome);
    }
}
