//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the configured service role
//! - Wire up middleware (request metrics, timeout, request ID, tracing)
//! - Start role-specific background tasks
//! - Serve until the shutdown signal fires

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ServiceConfig, ServiceRole};
use crate::error::ServerError;
use crate::http::demo;
use crate::http::handlers;
use crate::http::middleware::record_request_metrics;
use crate::http::request::UuidRequestId;
use crate::state::ServiceState;
use crate::upstream::UpstreamClient;
use crate::worker::{ErrorInjector, QueueDepth, QueueSampler};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ServiceState>,
    /// Next hop; `None` on the worker.
    pub upstream: Option<UpstreamClient>,
    pub queue_depth: Arc<QueueDepth>,
    pub error_injector: ErrorInjector,
    pub collector_endpoint: Arc<str>,
}

/// HTTP server for one service of the chain.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given (validated) configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, ServerError> {
        let upstream = match (&config.upstream_url, config.role.upstream_path()) {
            (Some(url), Some(path)) => Some(UpstreamClient::new(
                url,
                path,
                Duration::from_secs(config.timeouts.upstream_secs),
            )?),
            _ => None,
        };

        let state = AppState {
            service: Arc::new(ServiceState::from_config(&config)),
            upstream,
            queue_depth: Arc::new(QueueDepth::default()),
            error_injector: ErrorInjector::new(config.error_rate),
            collector_endpoint: Arc::from(config.collector_endpoint.as_str()),
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            state,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let routes = Router::new()
            .route("/health", get(handlers::health))
            .route("/status", get(handlers::status));

        let routes = match config.role {
            ServiceRole::Frontend => routes
                .route("/demo", get(demo::demo_page))
                .route("/gold-metrics", get(handlers::gold_metrics))
                .route("/toggle-cardinality", post(handlers::toggle_cardinality))
                .route("/api/call", get(handlers::forward)),
            ServiceRole::Api => routes.route("/process", get(handlers::forward)),
            ServiceRole::Worker => routes.route("/work", get(handlers::work)),
        };

        routes
            .fallback(handlers::not_found)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                record_request_metrics,
            ))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.state.service.policy().service(),
            role = %self.config.role,
            mode = %self.config.demo_mode,
            "HTTP server starting"
        );

        if self.config.role == ServiceRole::Worker {
            let sampler = QueueSampler::new(
                self.state.queue_depth.clone(),
                self.state.service.policy().clone(),
                Duration::from_millis(self.config.queue_sample_interval_ms),
            );
            tokio::spawn(sampler.run(shutdown.resubscribe()));
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}
