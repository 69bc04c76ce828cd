//! Request labeling and metric emission.
//!
//! Runs inside the router so the matched route template is available.
//! Labels are computed from the cardinality state at request start and
//! completed with the status code once the response is ready.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::http::request::bomb_flag;
use crate::http::server::AppState;
use crate::labels::RequestInfo;
use crate::observability::metrics;

pub async fn record_request_metrics(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let service = state.service.clone();

    if let Some(gold) = service.gold() {
        gold.record_request();
    }

    let labels = {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str);
        let info = RequestInfo {
            method: request.method().as_str(),
            route,
            path: request.uri().path(),
            bomb_requested: service.role().honors_overrides() && bomb_flag(request.uri().query()),
        };
        service.policy().compute(service.mode().snapshot(), &info)
    };

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    let failed = status >= 400;

    if let Some(gold) = service.gold() {
        gold.record_sample(elapsed.as_secs_f64(), failed);
    }
    let labels = labels.with_status(status);
    tracing::trace!(tier = ?labels.tier(), status, "Request labeled");
    metrics::record_request(&labels, elapsed, failed);

    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use metrics_util::debugging::DebuggingRecorder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    use crate::config::{ServiceConfig, ServiceRole};
    use crate::http::HttpServer;
    use crate::observability::metrics::REQUEST_TOTAL;
    use crate::state::ServiceMode;

    type Labels = HashMap<String, String>;

    fn server(role: ServiceRole) -> HttpServer {
        let mut config = ServiceConfig::for_role(role);
        config.demo_mode = ServiceMode::Shaped;
        HttpServer::new(config).unwrap()
    }

    /// Send one request with a fresh local recorder and return the label
    /// sets recorded on `http_request_total`.
    async fn request_total_labels(server: &HttpServer, uri: &str) -> (StatusCode, Vec<Labels>) {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let request = Request::get(uri).body(Body::empty()).unwrap();
        let response = server.router().oneshot(request).await.unwrap();

        let labels = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, ..)| key.key().name() == REQUEST_TOTAL)
            .map(|(key, ..)| {
                key.key()
                    .labels()
                    .map(|label| (label.key().to_string(), label.value().to_string()))
                    .collect()
            })
            .collect();
        (response.status(), labels)
    }

    fn single(mut emitted: Vec<Labels>) -> Labels {
        assert_eq!(emitted.len(), 1, "expected one request_total series: {emitted:?}");
        emitted.remove(0)
    }

    #[tokio::test]
    async fn test_matched_route_and_status() {
        let frontend = server(ServiceRole::Frontend);
        let (status, emitted) = request_total_labels(&frontend, "/health").await;
        assert_eq!(status, StatusCode::OK);

        let labels = single(emitted);
        assert_eq!(labels["service"], "frontend");
        assert_eq!(labels["method"], "GET");
        assert_eq!(labels["route"], "/health");
        assert_eq!(labels["status_code"], "200");
        assert_eq!(labels["path"], "/health");
        assert!(!labels.contains_key("user_id"));
    }

    #[tokio::test]
    async fn test_unmatched_route_uses_raw_path() {
        let frontend = server(ServiceRole::Frontend);
        let (status, emitted) = request_total_labels(&frontend, "/orders/42").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let labels = single(emitted);
        assert_eq!(labels["route"], "/orders/42");
        assert_eq!(labels["status_code"], "404");
        assert_eq!(labels["path"], "/orders/{id}");
        assert!(!labels.contains_key("user_id"));
        assert!(!labels.contains_key("pod"));
    }

    #[tokio::test]
    async fn test_bomb_query_applies_to_one_request() {
        let frontend = server(ServiceRole::Frontend);
        let (_, emitted) = request_total_labels(&frontend, "/orders/42?bomb=1").await;

        let labels = single(emitted);
        assert_eq!(labels["route"], "/orders/42");
        assert_eq!(labels["status_code"], "404");
        assert_eq!(labels["path"], "/orders/42");
        assert_eq!(labels["path_id"], "42");
        assert!(labels.contains_key("user_id"));
        assert!(labels.contains_key("pod"));
        assert!(labels.contains_key("build_id"));
        assert!(!frontend.state().service.mode().snapshot().bomb_enabled);

        let (_, emitted) = request_total_labels(&frontend, "/orders/42").await;
        let labels = single(emitted);
        assert_eq!(labels["path"], "/orders/{id}");
        assert!(!labels.contains_key("path_id"));
    }

    #[tokio::test]
    async fn test_api_and_worker_ignore_bomb_query() {
        for (role, service) in [(ServiceRole::Api, "api"), (ServiceRole::Worker, "worker")] {
            let server = server(role);
            let (status, emitted) = request_total_labels(&server, "/health?bomb=1").await;
            assert_eq!(status, StatusCode::OK);

            let labels = single(emitted);
            assert_eq!(labels["service"], service);
            assert_eq!(labels["route"], "/health");
            assert!(!labels.contains_key("path_id"));
            assert!(!labels.contains_key("user_id"));
        }
    }
}
