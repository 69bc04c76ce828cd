//! Request identification and query inspection.
//!
//! # Responsibilities
//! - Generate a UUID request ID for requests that arrive without one
//! - Read the request ID back for forwarding to the next hop
//! - Detect the per-request `?bomb=1` override
//!
//! # Design Decisions
//! - Request ID added as the outermost layer so every log line can carry it
//! - The override is parsed as a real query string, not a substring match

use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Query parameter that forces the bomb label tier for one request.
pub const BOMB_PARAM: &str = "bomb";

/// Mints a random UUID v4 per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID carried on the inbound request, if any.
pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
}

/// `true` when the query string carries `bomb=1`.
pub fn bomb_flag(query: Option<&str>) -> bool {
    query.is_some_and(|q| {
        url::form_urlencoded::parse(q.as_bytes()).any(|(key, value)| key == BOMB_PARAM && value == "1")
    })
}
