//! Per-request middleware.

pub mod request_metrics;

pub use request_metrics::record_request_metrics;
