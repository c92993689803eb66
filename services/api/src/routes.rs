use crate::infra::{AppState, FlowService};
use axum::http::{header, StatusCode};
use chrono::{DateTime, Utc};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use patient_flow::flows::admissions::{
    admission_router, admissions_per_day, availability_summary, average_stay,
    open_assignments_by_bed_type, AdmissionStore, BedStore, DailyAdmissions, LabelledCount,
    LabelledRatio,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_flow_routes(service: Arc<FlowService>) -> axum::Router {
    admission_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/dashboard",
            axum::routing::get(dashboard_endpoint),
        )
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) bed_availability: Vec<LabelledRatio>,
    pub(crate) global_availability: f64,
    pub(crate) total_discharges: usize,
    pub(crate) assignments: Vec<LabelledCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) average_stay_minutes: Option<i64>,
    pub(crate) admissions_per_day: Vec<DailyAdmissions>,
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Read-only global metrics for the ward dashboard, projected straight off
/// the assignment ledger.
pub(crate) async fn dashboard_endpoint(Extension(state): Extension<AppState>) -> axum::response::Response {
    let snapshot = match state.store.snapshot_ledger() {
        Ok(snapshot) => snapshot,
        Err(err) => return storage_error(err),
    };
    let bed_types = match state.store.list_bed_types() {
        Ok(bed_types) => bed_types,
        Err(err) => return storage_error(err),
    };
    let beds = match state.store.snapshot_beds() {
        Ok(beds) => beds,
        Err(err) => return storage_error(err),
    };

    let summary = availability_summary(&snapshot, &bed_types, &beds);
    let response = DashboardResponse {
        generated_at: Utc::now(),
        bed_availability: summary.bed_availability,
        global_availability: summary.global_availability,
        total_discharges: summary.total_discharges,
        assignments: open_assignments_by_bed_type(&snapshot, &bed_types, &beds),
        average_stay_minutes: average_stay(&snapshot).map(|duration| duration.num_minutes()),
        admissions_per_day: admissions_per_day(&snapshot),
    };
    (StatusCode::OK, Json(response)).into_response()
}

fn storage_error(err: patient_flow::flows::admissions::RepositoryError) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}
