//! Cardinality demo: a three-service chain (frontend → api → worker) whose
//! metric labels are governed by a runtime-switchable policy, plus an
//! adaptive load generator that reacts to that policy.

pub mod config;
pub mod error;
pub mod http;
pub mod labels;
pub mod lifecycle;
pub mod loadgen;
pub mod observability;
pub mod state;
pub mod upstream;
pub mod worker;

pub use config::schema::{LoadgenConfig, ServiceConfig, ServiceRole};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use loadgen::LoadDriver;
