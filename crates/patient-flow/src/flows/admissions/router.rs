use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::barcode::BarcodeRenderer;
use super::domain::{
    AdmissionId, BedId, BedState, BedTypeId, OutOfServiceReason, PatientId, Severity,
    SnapshotObservations, StaffId, VitalSigns,
};
use super::registry::{BedRemoval, RegistryError};
use super::repository::{AdmissionStore, BedStore, RepositoryError};
use super::service::{AdmissionService, AdmissionServiceError, TriageOutcome};

/// Router builder exposing the admission lifecycle and bed registry
/// operations as JSON endpoints. Mutating payloads carry the acting staff
/// member explicitly.
pub fn admission_router<B, A, R>(service: Arc<AdmissionService<B, A, R>>) -> Router
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    Router::new()
        .route("/api/v1/admissions", post(admit_handler::<B, A, R>))
        .route(
            "/api/v1/admissions/triage",
            post(triage_handler::<B, A, R>),
        )
        .route(
            "/api/v1/admissions/:admission_id",
            get(admission_handler::<B, A, R>),
        )
        .route(
            "/api/v1/admissions/:admission_id/snapshots",
            post(snapshot_handler::<B, A, R>),
        )
        .route(
            "/api/v1/admissions/:admission_id/bed",
            post(assign_bed_handler::<B, A, R>),
        )
        .route(
            "/api/v1/admissions/:admission_id/discharge",
            post(discharge_handler::<B, A, R>),
        )
        .route(
            "/api/v1/admissions/:admission_id/deceased",
            post(deceased_handler::<B, A, R>),
        )
        .route("/api/v1/bed-types", post(create_bed_type_handler::<B, A, R>))
        .route(
            "/api/v1/bed-types/:bed_type_id/capacity",
            put(capacity_handler::<B, A, R>),
        )
        .route(
            "/api/v1/bed-types/:bed_type_id/counters",
            get(counters_handler::<B, A, R>),
        )
        .route(
            "/api/v1/beds/:bed_id/transition",
            post(transition_handler::<B, A, R>),
        )
        .route("/api/v1/beds/:bed_id", delete(delete_bed_handler::<B, A, R>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdmitRequest {
    pub(crate) patient_id: Uuid,
    pub(crate) actor_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TriageRequest {
    pub(crate) patient_id: Uuid,
    pub(crate) actor_id: Uuid,
    pub(crate) severity: Severity,
    #[serde(default)]
    pub(crate) vitals: VitalSigns,
    #[serde(default)]
    pub(crate) observations: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotRequest {
    pub(crate) actor_id: Uuid,
    pub(crate) severity: Severity,
    #[serde(default)]
    pub(crate) vitals: VitalSigns,
    #[serde(default)]
    pub(crate) observations: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignBedRequest {
    pub(crate) bed_type_id: Uuid,
    pub(crate) actor_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DischargeRequest {
    pub(crate) actor_id: Uuid,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeceasedRequest {
    pub(crate) actor_id: Uuid,
    pub(crate) cause: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateBedTypeRequest {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) severity_match: Option<Severity>,
    pub(crate) total: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CapacityRequest {
    pub(crate) total: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub(crate) state: BedState,
    #[serde(default)]
    pub(crate) reason: Option<OutOfServiceReason>,
}

pub(crate) async fn admit_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    axum::Json(request): axum::Json<AdmitRequest>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service.admit(PatientId(request.patient_id), StaffId(request.actor_id)) {
        Ok(admission) => match service.admission_view(admission.id) {
            Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
            Err(err) => error_response(err),
        },
        Err(err) => error_response(err),
    }
}

pub(crate) async fn triage_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    axum::Json(request): axum::Json<TriageRequest>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    let observations = SnapshotObservations {
        severity: request.severity,
        vitals: request.vitals,
        observations: request.observations,
    };
    match service.admit_from_triage(
        PatientId(request.patient_id),
        observations,
        StaffId(request.actor_id),
    ) {
        Ok(TriageOutcome::NotAdmitted) => (
            StatusCode::OK,
            axum::Json(json!({ "admitted": false })),
        )
            .into_response(),
        Ok(TriageOutcome::Admitted { admission, .. }) => match service.admission_view(admission.id)
        {
            Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
            Err(err) => error_response(err),
        },
        Err(err) => error_response(err),
    }
}

pub(crate) async fn admission_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    Path(admission_id): Path<Uuid>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service.admission_view(AdmissionId(admission_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn snapshot_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    Path(admission_id): Path<Uuid>,
    axum::Json(request): axum::Json<SnapshotRequest>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    let observations = SnapshotObservations {
        severity: request.severity,
        vitals: request.vitals,
        observations: request.observations,
    };
    match service.record_snapshot(
        AdmissionId(admission_id),
        observations,
        StaffId(request.actor_id),
    ) {
        Ok(outcome) => (
            StatusCode::CREATED,
            axum::Json(json!({
                "snapshot": outcome.snapshot,
                "assigned_bed": outcome.assigned_bed,
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assign_bed_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    Path(admission_id): Path<Uuid>,
    axum::Json(request): axum::Json<AssignBedRequest>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service.assign_bed(
        AdmissionId(admission_id),
        BedTypeId(request.bed_type_id),
        StaffId(request.actor_id),
    ) {
        Ok(bed) => (StatusCode::OK, axum::Json(bed)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn discharge_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    Path(admission_id): Path<Uuid>,
    axum::Json(request): axum::Json<DischargeRequest>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service.discharge(
        AdmissionId(admission_id),
        request.notes,
        StaffId(request.actor_id),
    ) {
        Ok(event) => (StatusCode::CREATED, axum::Json(event)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn deceased_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    Path(admission_id): Path<Uuid>,
    axum::Json(request): axum::Json<DeceasedRequest>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service.record_deceased(
        AdmissionId(admission_id),
        request.cause,
        request.notes,
        StaffId(request.actor_id),
    ) {
        Ok(event) => (StatusCode::CREATED, axum::Json(event)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_bed_type_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    axum::Json(request): axum::Json<CreateBedTypeRequest>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service
        .registry()
        .create_bed_type(&request.name, request.severity_match, request.total)
    {
        Ok(bed_type) => (StatusCode::CREATED, axum::Json(bed_type)).into_response(),
        Err(err) => registry_error_response(err),
    }
}

pub(crate) async fn capacity_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    Path(bed_type_id): Path<Uuid>,
    axum::Json(request): axum::Json<CapacityRequest>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service
        .registry()
        .set_capacity(BedTypeId(bed_type_id), request.total)
    {
        Ok(change) => (
            StatusCode::OK,
            axum::Json(json!({
                "bed_type": change.bed_type,
                "provisioned": change.provisioned,
            })),
        )
            .into_response(),
        Err(err) => registry_error_response(err),
    }
}

pub(crate) async fn counters_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    Path(bed_type_id): Path<Uuid>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service.registry().counters(BedTypeId(bed_type_id)) {
        Ok(counters) => (StatusCode::OK, axum::Json(counters)).into_response(),
        Err(err) => registry_error_response(err),
    }
}

pub(crate) async fn transition_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    Path(bed_id): Path<Uuid>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service
        .registry()
        .transition(BedId(bed_id), request.state, request.reason)
    {
        Ok(bed) => (StatusCode::OK, axum::Json(bed)).into_response(),
        Err(err) => registry_error_response(err),
    }
}

pub(crate) async fn delete_bed_handler<B, A, R>(
    State(service): State<Arc<AdmissionService<B, A, R>>>,
    Path(bed_id): Path<Uuid>,
) -> Response
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    match service.registry().delete(BedId(bed_id)) {
        Ok(BedRemoval::Removed) => StatusCode::NO_CONTENT.into_response(),
        Ok(BedRemoval::Decommissioned(bed)) => (
            StatusCode::OK,
            axum::Json(json!({
                "decommissioned": true,
                "bed": bed,
            })),
        )
            .into_response(),
        Err(err) => registry_error_response(err),
    }
}

fn error_response(error: AdmissionServiceError) -> Response {
    let status = match &error {
        AdmissionServiceError::BedUnavailable { .. } => StatusCode::CONFLICT,
        AdmissionServiceError::UnknownAdmission(_) => StatusCode::NOT_FOUND,
        AdmissionServiceError::TerminalAdmission(_) => StatusCode::CONFLICT,
        AdmissionServiceError::Registry(err) => return registry_error_response_ref(err, &error),
        AdmissionServiceError::Repository(err) => repository_status(err),
        AdmissionServiceError::Barcode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = axum::Json(json!({ "error": error.to_string() }));
    (status, body).into_response()
}

fn registry_error_response(error: RegistryError) -> Response {
    let status = registry_status(&error);
    let body = axum::Json(json!({ "error": error.to_string() }));
    (status, body).into_response()
}

fn registry_error_response_ref(error: &RegistryError, display: &AdmissionServiceError) -> Response {
    let status = registry_status(error);
    let body = axum::Json(json!({ "error": display.to_string() }));
    (status, body).into_response()
}

fn registry_status(error: &RegistryError) -> StatusCode {
    match error {
        RegistryError::UnknownBedType(_) | RegistryError::UnknownBed(_) => StatusCode::NOT_FOUND,
        RegistryError::MissingReason
        | RegistryError::ReasonNotAllowed
        | RegistryError::UnroutableMatchTag => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::Repository(err) => repository_status(err),
    }
}

fn repository_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Busy | RepositoryError::Unavailable(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
