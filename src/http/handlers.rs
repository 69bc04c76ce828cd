//! Route handlers for the three service roles.
//!
//! Which of these a service mounts depends on its role, see
//! [`HttpServer`](crate::http::HttpServer).

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::time::SystemTime;

use crate::config::ServiceRole;
use crate::error::{HandlerError, WorkError};
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::labels::LabelCatalog;
use crate::observability::metrics;
use crate::state::{GoldMetricsReport, ServiceMode};
use crate::worker::{simulate_work, work_units, WorkOutcome, MAX_ITERATIONS};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
}

/// `/status` body. Role-specific fields are omitted where they do not apply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub service: String,
    pub mode: ServiceMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_cardinality_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality_bomb_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<u64>,
    pub labels: LabelCatalog,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub high_cardinality_mode: bool,
}

/// Successful chained call.
#[derive(Debug, Serialize)]
pub struct ForwardResponse {
    pub success: bool,
    pub data: Value,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.service.policy().service().to_string(),
    })
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(status_report(&state))
}

/// Snapshot behind `/status`, also rendered on the demo page.
pub fn status_report(state: &AppState) -> StatusResponse {
    let service = &state.service;
    let role = service.role();
    let mut report = StatusResponse {
        service: service.policy().service().to_string(),
        mode: service.mode().mode(),
        high_cardinality_mode: None,
        cardinality_bomb_mode: None,
        request_count: None,
        error_count: None,
        error_rate: None,
        queue_depth: None,
        labels: service.policy().catalog(role.honors_overrides()),
    };

    if role.honors_overrides() {
        let flags = service.mode().snapshot();
        report.high_cardinality_mode = Some(flags.high_cardinality_enabled);
        report.cardinality_bomb_mode = Some(flags.bomb_enabled);
    }
    if let Some(gold) = service.gold() {
        report.request_count = Some(gold.counters().requests());
        report.error_count = Some(gold.counters().errors());
    }
    if role == ServiceRole::Worker {
        report.error_rate = Some(state.error_injector.rate());
        report.queue_depth = Some(state.queue_depth.get());
    }
    report
}

pub async fn gold_metrics(
    State(state): State<AppState>,
) -> Result<Json<GoldMetricsReport>, HandlerError> {
    let gold = state
        .service
        .gold()
        .ok_or(HandlerError::NotServed("/gold-metrics"))?;
    Ok(Json(gold.compute(SystemTime::now()).report()))
}

pub async fn toggle_cardinality(State(state): State<AppState>) -> Json<ToggleResponse> {
    let enabled = state.service.mode().toggle_high_cardinality();
    Json(ToggleResponse {
        high_cardinality_mode: enabled,
    })
}

/// `/api/call` on the frontend, `/process` on the api: call the next hop.
pub async fn forward(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ForwardResponse>, HandlerError> {
    let upstream = state
        .upstream
        .as_ref()
        .ok_or(HandlerError::NotServed("chained call"))?;

    match upstream.call(request_id(&headers)).await {
        Ok(data) => Ok(Json(ForwardResponse {
            success: true,
            data,
        })),
        Err(e) => {
            tracing::warn!(
                service = %state.service.policy().service(),
                upstream = %upstream.url(),
                error = %e,
                "Upstream call failed"
            );
            Err(e.into())
        }
    }
}

pub async fn work(State(state): State<AppState>) -> Result<Json<WorkOutcome>, HandlerError> {
    let iterations = rand::thread_rng().gen_range(0..MAX_ITERATIONS);
    let work_duration = tokio::task::spawn_blocking(move || simulate_work(iterations))
        .await
        .map_err(|e| WorkError::Task(e.to_string()))?;

    let units = work_units(work_duration);
    let labels = state.service.policy().work_labels();
    metrics::record_work_units(&labels, units);

    if state.error_injector.should_fail(&mut rand::thread_rng()) {
        metrics::record_simulated_error(&labels);
        return Err(WorkError::Simulated.into());
    }

    Ok(Json(WorkOutcome {
        success: true,
        work_duration,
        work_units: units,
        queue_depth: state.queue_depth.get(),
    }))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "No matching route found")
}
