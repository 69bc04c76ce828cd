//! Adaptive load generator.
//!
//! # Data Flow
//! ```text
//! stages.rs (how many VUs should be active now)
//!     → driver.rs (one task per VU)
//!         → status.rs (per-VU cached frontend /status, 10s freshness)
//!         → paths.rs (strategy from status, path from strategy)
//!         → GET base_url + path, checks
//!     → report.rs (checks, p95, distinct paths, threshold verdicts)
//! ```
//!
//! # Design Decisions
//! - The only control channel is the frontend's public `/status`
//! - Status poll failures are absorbed; an iteration never fails because of them
//! - VUs share nothing but the report

pub mod driver;
pub mod paths;
pub mod report;
pub mod stages;
pub mod status;

pub use driver::LoadDriver;
pub use paths::{generate_path, Strategy};
pub use report::{Checks, IterationOutcome, RunReport, RunSummary};
pub use stages::{parse_stages, StageSchedule};
pub use status::{fetch_status, RemoteStatus, StatusCache};
