//! Gold-metrics aggregation.
//!
//! Keeps a bounded window of recent request durations plus lifetime request
//! and error counters, and derives the four SLO signals on demand:
//! request rate, error rate, p95 latency and saturation.
//!
//! # Design Decisions
//! - FIFO of 1000 samples, oldest dropped first
//! - p95 looks only at the newest 100 samples
//! - Saturation is average latency against a 1s budget, capped at 100%
//! - Request rate divides the lifetime count by Unix-epoch seconds. This is
//!   not a windowed rate and yields tiny numbers; it is kept as-is so the
//!   dashboard reads the same as the other implementations of this demo.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Retained duration samples.
pub const SAMPLE_CAPACITY: usize = 1000;

/// Samples considered for the latency percentile.
pub const PERCENTILE_WINDOW: usize = 100;

/// Latency treated as 100% saturation, in seconds.
const SATURATION_BUDGET_SECS: f64 = 1.0;

/// Lifetime request/error counters. Never reset.
#[derive(Debug, Default)]
pub struct RequestCounters {
    requests: AtomicU64,
    errors: AtomicU64,
}

impl RequestCounters {
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Rolling window behind `/gold-metrics`.
#[derive(Debug, Default)]
pub struct GoldMetrics {
    samples: Mutex<VecDeque<f64>>,
    counters: RequestCounters,
}

impl GoldMetrics {
    pub fn new() -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(SAMPLE_CAPACITY)),
            counters: RequestCounters::default(),
        }
    }

    /// Count a request as soon as it arrives.
    pub fn record_request(&self) {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the duration of a finished request, in seconds.
    pub fn record_sample(&self, duration_secs: f64, failed: bool) {
        if failed {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
        }

        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        samples.push_back(duration_secs);
        if samples.len() > SAMPLE_CAPACITY {
            samples.pop_front();
        }
    }

    pub fn counters(&self) -> &RequestCounters {
        &self.counters
    }

    pub fn sample_count(&self) -> usize {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Derive the four signals as of `now`.
    pub fn compute(&self, now: SystemTime) -> GoldSnapshot {
        let requests = self.counters.requests();
        let errors = self.counters.errors();

        let (p95_latency_ms, saturation) = {
            let samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
            let recent = samples
                .iter()
                .skip(samples.len().saturating_sub(PERCENTILE_WINDOW))
                .copied()
                .collect::<Vec<_>>();
            let p95 = percentile_95(recent) * 1000.0;

            let avg = if samples.is_empty() {
                0.0
            } else {
                samples.iter().sum::<f64>() / samples.len() as f64
            };
            (p95, (avg / SATURATION_BUDGET_SECS * 100.0).min(100.0))
        };

        GoldSnapshot {
            request_rate: request_rate(requests, now),
            error_rate: error_rate(requests, errors),
            p95_latency_ms,
            saturation,
            timestamp: now,
        }
    }
}

fn request_rate(requests: u64, now: SystemTime) -> f64 {
    let epoch_secs = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    if requests == 0 || epoch_secs == 0.0 {
        0.0
    } else {
        requests as f64 / epoch_secs
    }
}

/// Error percentage; zero before the first request.
pub fn error_rate(requests: u64, errors: u64) -> f64 {
    if requests == 0 {
        0.0
    } else {
        errors as f64 / requests as f64 * 100.0
    }
}

/// Element at index `floor(0.95 * n)` of the ascending sort, or zero.
fn percentile_95(mut samples: Vec<f64>) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.sort_by(f64::total_cmp);
    let index = (samples.len() as f64 * 0.95).floor() as usize;
    samples.get(index).copied().unwrap_or(0.0)
}

/// Derived gold signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoldSnapshot {
    /// Requests per second (see module docs for the caveat).
    pub request_rate: f64,
    /// Percentage of requests with status >= 400.
    pub error_rate: f64,
    pub p95_latency_ms: f64,
    /// Percentage, 0..=100.
    pub saturation: f64,
    pub timestamp: SystemTime,
}

impl GoldSnapshot {
    /// Wire form: two-decimal strings plus an RFC 3339 timestamp.
    pub fn report(&self) -> GoldMetricsReport {
        GoldMetricsReport {
            request_rate: format!("{:.2}", self.request_rate),
            error_rate: format!("{:.2}", self.error_rate),
            p95_latency_ms: format!("{:.2}", self.p95_latency_ms),
            saturation: format!("{:.2}", self.saturation),
            timestamp: OffsetDateTime::from(self.timestamp)
                .format(&Rfc3339)
                .unwrap_or_default(),
        }
    }
}

/// Body of `GET /gold-metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoldMetricsReport {
    pub request_rate: String,
    pub error_rate: String,
    pub p95_latency_ms: String,
    pub saturation: String,
    pub timestamp: String,
}
