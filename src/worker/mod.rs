//! Worker-side simulation.
//!
//! # Responsibilities
//! - Burn a random amount of CPU per `/work` call
//! - Fail a configurable fraction of calls on purpose
//! - Sample a fake queue depth on a fixed timer
//!
//! # Design Decisions
//! - CPU work runs on the blocking pool so the reactor keeps serving
//! - The sampler is its own task and never waits on request handling

pub mod queue;
pub mod work;

pub use queue::{QueueDepth, QueueSampler};
pub use work::{simulate_work, work_units, ErrorInjector, WorkOutcome, MAX_ITERATIONS};
