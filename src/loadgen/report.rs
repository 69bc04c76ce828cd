//! Run accounting and the end-of-run summary.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::config::LoadgenConfig;
use crate::loadgen::paths::Strategy;

pub const CHECK_STATUS: &str = "status is 200";
pub const CHECK_LATENCY: &str = "response time < limit";

/// Per-request checks.
#[derive(Debug, Clone, Copy)]
pub struct Checks {
    latency_limit: Duration,
}

impl Checks {
    pub fn new(latency_limit: Duration) -> Self {
        Self { latency_limit }
    }

    /// `status` is `None` when no response arrived at all.
    pub fn evaluate(
        &self,
        strategy: Strategy,
        path: String,
        status: Option<u16>,
        latency: Duration,
    ) -> IterationOutcome {
        IterationOutcome {
            strategy,
            path,
            latency,
            status_ok: status == Some(200),
            fast: latency < self.latency_limit,
        }
    }
}

/// Result of one VU iteration.
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    pub strategy: Strategy,
    pub path: String,
    pub latency: Duration,
    pub status_ok: bool,
    pub fast: bool,
}

impl IterationOutcome {
    /// An iteration fails when any check fails.
    pub fn failed(&self) -> bool {
        !(self.status_ok && self.fast)
    }
}

#[derive(Debug, Default)]
struct StrategyStats {
    iterations: u64,
    paths: HashSet<String>,
}

/// Shared accumulator written by every VU.
#[derive(Debug)]
pub struct RunReport {
    iterations: AtomicU64,
    failed_iterations: AtomicU64,
    status_failures: AtomicU64,
    latency_failures: AtomicU64,
    latencies_ms: Mutex<Vec<f64>>,
    strategies: DashMap<Strategy, StrategyStats>,
    p95_threshold_ms: f64,
    error_rate_threshold: f64,
}

impl RunReport {
    pub fn new(p95_threshold_ms: f64, error_rate_threshold: f64) -> Self {
        Self {
            iterations: AtomicU64::new(0),
            failed_iterations: AtomicU64::new(0),
            status_failures: AtomicU64::new(0),
            latency_failures: AtomicU64::new(0),
            latencies_ms: Mutex::new(Vec::new()),
            strategies: DashMap::new(),
            p95_threshold_ms,
            error_rate_threshold,
        }
    }

    pub fn from_config(config: &LoadgenConfig) -> Self {
        Self::new(config.p95_threshold_ms, config.error_rate_threshold)
    }

    pub fn record(&self, outcome: IterationOutcome) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        if outcome.failed() {
            self.failed_iterations.fetch_add(1, Ordering::Relaxed);
        }
        if !outcome.status_ok {
            self.status_failures.fetch_add(1, Ordering::Relaxed);
        }
        if !outcome.fast {
            self.latency_failures.fetch_add(1, Ordering::Relaxed);
        }

        self.latencies_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome.latency.as_secs_f64() * 1000.0);

        let mut stats = self.strategies.entry(outcome.strategy).or_default();
        stats.iterations += 1;
        stats.paths.insert(outcome.path);
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> RunSummary {
        let iterations = self.iterations();
        let failed = self.failed_iterations.load(Ordering::Relaxed);
        let error_rate = if iterations == 0 {
            0.0
        } else {
            failed as f64 / iterations as f64
        };

        let p95_latency_ms = {
            let mut latencies = self
                .latencies_ms
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            percentile(&mut latencies, 0.95)
        };

        let checks = vec![
            CheckSummary::new(CHECK_STATUS, iterations, self.status_failures.load(Ordering::Relaxed)),
            CheckSummary::new(CHECK_LATENCY, iterations, self.latency_failures.load(Ordering::Relaxed)),
        ];

        let strategies = self
            .strategies
            .iter()
            .map(|entry| {
                (
                    *entry.key(),
                    StrategySummary {
                        iterations: entry.iterations,
                        distinct_paths: entry.paths.len(),
                    },
                )
            })
            .collect();

        let thresholds = vec![
            ThresholdVerdict {
                name: "http_req_duration p(95)",
                observed: p95_latency_ms,
                limit: self.p95_threshold_ms,
                passed: p95_latency_ms < self.p95_threshold_ms,
            },
            ThresholdVerdict {
                name: "errors rate",
                observed: error_rate,
                limit: self.error_rate_threshold,
                passed: error_rate < self.error_rate_threshold,
            },
        ];

        RunSummary {
            iterations,
            checks,
            error_rate,
            p95_latency_ms,
            strategies,
            thresholds,
        }
    }
}

/// Nearest-rank percentile; 0 for no samples.
fn percentile(values: &mut [f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let rank = (quantile * values.len() as f64).ceil() as usize;
    values[rank.saturating_sub(1).min(values.len() - 1)]
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub name: &'static str,
    pub passed: u64,
    pub failed: u64,
}

impl CheckSummary {
    fn new(name: &'static str, total: u64, failed: u64) -> Self {
        Self {
            name,
            passed: total.saturating_sub(failed),
            failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategySummary {
    pub iterations: u64,
    pub distinct_paths: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdVerdict {
    pub name: &'static str,
    pub observed: f64,
    pub limit: f64,
    pub passed: bool,
}

/// What the CLI prints when the run ends.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub iterations: u64,
    pub checks: Vec<CheckSummary>,
    pub error_rate: f64,
    pub p95_latency_ms: f64,
    pub strategies: BTreeMap<Strategy, StrategySummary>,
    pub thresholds: Vec<ThresholdVerdict>,
}

impl RunSummary {
    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }
}
