//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, role-specific routes)
//!     → request.rs (request ID set and propagated)
//!     → middleware/ (labels computed, gold metrics counted)
//!     → handlers.rs / demo.rs
//!     → middleware/ (status filled in, metrics emitted)
//!     → Send to client
//! ```

pub mod demo;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
