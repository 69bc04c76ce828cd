//! HTTP client for the next hop.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::UpstreamError;
use crate::http::request::X_REQUEST_ID;

/// Client bound to one upstream endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl UpstreamClient {
    /// `base_url` plus the fixed `path` of the next hop.
    pub fn new(base_url: &str, path: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the upstream endpoint and return its JSON body.
    pub async fn call(&self, request_id: Option<&str>) -> Result<Value, UpstreamError> {
        let timeout_ms = self.timeout.as_millis() as u64;

        let mut request = self.client.get(&self.url);
        if let Some(id) = request_id {
            request = request.header(X_REQUEST_ID, id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, &self.url, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %self.url, status = %status, "Upstream returned failure status");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, &self.url, timeout_ms))
    }
}
