//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_request_duration_seconds` (histogram): request latency, full label set
//! - `http_request_total` (counter): requests, full label set
//! - `http_error_total` (counter): requests with status >= 400, and simulated worker errors
//! - `cpu_work_units` (counter, worker): simulated work performed
//! - `queue_depth` (gauge, worker): sampled queue depth
//!
//! # Design Decisions
//! - Label sets come from the label policy; this module only converts and emits
//! - Prometheus exposition on its own listener, away from the demo traffic

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Label, Unit,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

use crate::labels::LabelSet;

pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const REQUEST_TOTAL: &str = "http_request_total";
pub const ERROR_TOTAL: &str = "http_error_total";
pub const CPU_WORK_UNITS: &str = "cpu_work_units";
pub const QUEUE_DEPTH: &str = "queue_depth";

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_histogram!(REQUEST_DURATION, Unit::Seconds, "HTTP request duration in seconds");
    describe_counter!(REQUEST_TOTAL, "Total HTTP requests");
    describe_counter!(ERROR_TOTAL, "Total HTTP errors");
    describe_counter!(CPU_WORK_UNITS, "CPU work units processed");
    describe_gauge!(QUEUE_DEPTH, "Current queue depth");

    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Emit duration, count and (for failures) error count for one request.
pub fn record_request(labels: &LabelSet, elapsed: Duration, failed: bool) {
    let labels = to_labels(
        labels
            .pairs()
            .into_iter()
            .map(|(key, value)| (key, value.to_string())),
    );
    histogram!(REQUEST_DURATION, labels.clone()).record(elapsed.as_secs_f64());
    if failed {
        counter!(ERROR_TOTAL, labels.clone()).increment(1);
    }
    counter!(REQUEST_TOTAL, labels).increment(1);
}

/// Count simulated work done by the worker.
pub fn record_work_units(labels: &[(&'static str, String)], units: u64) {
    counter!(CPU_WORK_UNITS, to_labels(labels.iter().cloned())).increment(units);
}

/// Count an injected worker failure, tagged `error_type=simulated`.
pub fn record_simulated_error(labels: &[(&'static str, String)]) {
    let labels = labels
        .iter()
        .cloned()
        .chain([("error_type", "simulated".to_string())]);
    counter!(ERROR_TOTAL, to_labels(labels)).increment(1);
}

/// Publish the latest queue-depth sample.
pub fn set_queue_depth(labels: &[(&'static str, String)], depth: u64) {
    gauge!(QUEUE_DEPTH, to_labels(labels.iter().cloned())).set(depth as f64);
}

fn to_labels(pairs: impl IntoIterator<Item = (&'static str, String)>) -> Vec<Label> {
    pairs
        .into_iter()
        .map(|(key, value)| Label::new(key, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_labels_keeps_order() {
        let labels = to_labels([
            ("service", "worker".to_string()),
            ("operation", "work".to_string()),
        ]);
        let keys: Vec<_> = labels.iter().map(|l| l.key()).collect();
        assert_eq!(keys, ["service", "operation"]);
        assert_eq!(labels[0].value(), "worker");
    }

    #[test]
    fn test_emission_without_recorder_is_noop() {
        record_work_units(&[("service", "worker".to_string())], 3);
        set_queue_depth(&[("service", "worker".to_string())], 42);
        record_simulated_error(&[("service", "worker".to_string())]);
    }
}
