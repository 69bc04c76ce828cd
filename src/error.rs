//! Error taxonomy and failure responses.
//!
//! Every failure is terminal at the boundary where it happens: a chained call
//! that times out, refuses the connection or answers non-2xx becomes a
//! `500 {success:false, error}` on this hop. Nothing is retried.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure of a call to the next service in the chain.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),

    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("Request failed with status code {0}")]
    Status(u16),

    #[error("invalid upstream response: {0}")]
    Decode(String),

    #[error("upstream request failed: {0}")]
    Request(String),
}

impl UpstreamError {
    /// Classify a reqwest failure.
    pub fn from_reqwest(err: reqwest::Error, url: &str, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(timeout_ms)
        } else if err.is_connect() {
            UpstreamError::Connect {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            UpstreamError::Status(status.as_u16())
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Request(err.to_string())
        }
    }
}

/// Failure of a worker `/work` call.
#[derive(Debug, Error)]
pub enum WorkError {
    /// Injected at `ERROR_RATE`.
    #[error("Simulated error")]
    Simulated,

    #[error("work task failed: {0}")]
    Task(String),
}

/// Errors surfaced by request handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Work(#[from] WorkError),

    #[error("{0} is not served by this service")]
    NotServed(&'static str),
}

/// Errors raised by the load driver.
#[derive(Debug, Error)]
pub enum LoadgenError {
    #[error("status poll failed: {0}")]
    StatusPoll(String),

    #[error("invalid stage '{input}': {reason}")]
    StageParse { input: String, reason: String },

    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors that stop a service from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Body shared by every failure response.
#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub success: bool,
    pub error: String,
}

impl FailureBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match &self {
            HandlerError::Work(WorkError::Simulated) => {
                tracing::debug!("Returning simulated failure");
            }
            other => {
                tracing::warn!(error = %other, "Request failed");
            }
        }
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(FailureBody::new(self.to_string())),
        )
            .into_response()
    }
}
