//! Calls to the next service in the chain.
//!
//! # Data Flow
//! ```text
//! frontend /api/call ──GET /process──▶ api /process ──GET /work──▶ worker
//! ```
//!
//! # Design Decisions
//! - One plain GET per hop with a fixed timeout (5s by default)
//! - Non-2xx, timeout and connection errors all map to `UpstreamError`
//! - No retries, no backoff, no circuit breaking
//! - The caller's request ID is forwarded for log correlation

pub mod client;

pub use client::UpstreamClient;
