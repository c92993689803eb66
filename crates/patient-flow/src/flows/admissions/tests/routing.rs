use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::flows::admissions::domain::{BedState, Severity};
use crate::flows::admissions::repository::BedStore;
use crate::flows::admissions::router::admission_router;

fn post(uri: &str, payload: serde_json::Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(payload.to_string()))
        .expect("request builds")
}

fn put(uri: &str, payload: serde_json::Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::put(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(payload.to_string()))
        .expect("request builds")
}

fn get(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::get(uri)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

fn delete(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::delete(uri)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn bed_type_creation_and_counters_round_through_the_router() {
    let (service, _, _) = build_service();
    let router = admission_router(service);

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/bed-types",
            json!({ "name": "Intensive Care Unit", "severity_match": "RED", "total": 2 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    let bed_type_id = payload
        .get("id")
        .and_then(serde_json::Value::as_str)
        .expect("bed type id")
        .to_string();

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/bed-types/{bed_type_id}/counters")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let counters = read_json_body(response).await;
    assert_eq!(counters.get("available"), Some(&json!(2)));
    assert_eq!(counters.get("assigned"), Some(&json!(0)));

    let response = router
        .clone()
        .oneshot(put(
            &format!("/api/v1/bed-types/{bed_type_id}/capacity"),
            json!({ "total": 5 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("provisioned"), Some(&json!(3)));
}

#[tokio::test]
async fn admission_lifecycle_round_trips_through_the_router() {
    let (service, _, _) = build_service();
    let (icu, _, _) = seed_ward(&service);
    let router = admission_router(service);
    let staff = uuid::Uuid::new_v4();

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/admissions",
            json!({ "patient_id": uuid::Uuid::new_v4(), "actor_id": staff }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let view = read_json_body(response).await;
    let admission_id = view
        .get("id")
        .and_then(serde_json::Value::as_str)
        .expect("admission id")
        .to_string();
    let barcode = view
        .get("barcode")
        .and_then(serde_json::Value::as_str)
        .expect("barcode present");
    assert_eq!(barcode.len(), 13);
    assert_eq!(view.get("phase"), Some(&json!("Unassigned")));

    let response = router
        .clone()
        .oneshot(post(
            &format!("/api/v1/admissions/{admission_id}/bed"),
            json!({ "bed_type_id": icu.id.0, "actor_id": staff }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let bed = read_json_body(response).await;
    assert_eq!(bed.get("state"), Some(&json!("assigned")));

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/admissions/{admission_id}")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let view = read_json_body(response).await;
    assert_eq!(view.get("phase"), Some(&json!("Occupied")));
    assert!(view.get("current_bed").is_some());

    let response = router
        .clone()
        .oneshot(post(
            &format!("/api/v1/admissions/{admission_id}/discharge"),
            json!({ "actor_id": staff, "notes": "stable" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    // A second discharge is a conflict, not a new event.
    let response = router
        .clone()
        .oneshot(post(
            &format!("/api/v1/admissions/{admission_id}/discharge"),
            json!({ "actor_id": staff }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn exhaustion_maps_to_conflict_naming_the_type() {
    let (service, _, _) = build_service();
    let (icu, _, _) = seed_ward(&service);
    let staff = uuid::Uuid::new_v4();

    for _ in 0..2 {
        let admission = service.admit(patient(), actor()).expect("admitted");
        service
            .assign_bed(admission.id, icu.id, actor())
            .expect("bed assigned");
    }
    let third = service.admit(patient(), actor()).expect("admitted");
    let router = admission_router(service);

    let response = router
        .oneshot(post(
            &format!("/api/v1/admissions/{}/bed", third.id),
            json!({ "bed_type_id": icu.id.0, "actor_id": staff }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .contains("Intensive Care Unit"));
}

#[tokio::test]
async fn unknown_admission_maps_to_not_found() {
    let (service, _, _) = build_service();
    let router = admission_router(service);

    let response = router
        .oneshot(get(&format!(
            "/api/v1/admissions/{}",
            uuid::Uuid::new_v4()
        )))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transition_without_reason_maps_to_unprocessable() {
    let (service, store, _) = build_service();
    let (icu, _, _) = seed_ward(&service);
    let bed = store.list_beds(icu.id).expect("icu beds")[0].clone();
    let router = admission_router(service);

    let response = router
        .clone()
        .oneshot(post(
            &format!("/api/v1/beds/{}/transition", bed.id),
            json!({ "state": "out_of_service" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .oneshot(post(
            &format!("/api/v1/beds/{}/transition", bed.id),
            json!({ "state": "out_of_service", "reason": "equipment_failure" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("reason"), Some(&json!("equipment_failure")));
}

#[tokio::test]
async fn deleting_beds_reports_removal_or_decommissioning() {
    let (service, store, _) = build_service();
    let (icu, _, _) = seed_ward(&service);
    let staff = uuid::Uuid::new_v4();

    let free_bed = store.list_beds(icu.id).expect("icu beds")[0].clone();
    let admission = service.admit(patient(), actor()).expect("admitted");
    let router = admission_router(service);

    let response = router
        .clone()
        .oneshot(delete(&format!("/api/v1/beds/{}", free_bed.id)))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The remaining unit gets assigned, then deletion decommissions it.
    let response = router
        .clone()
        .oneshot(post(
            &format!("/api/v1/admissions/{}/bed", admission.id),
            json!({ "bed_type_id": icu.id.0, "actor_id": staff }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let bed = read_json_body(response).await;
    let bed_id = bed
        .get("id")
        .and_then(serde_json::Value::as_str)
        .expect("bed id")
        .to_string();

    let response = router
        .oneshot(delete(&format!("/api/v1/beds/{bed_id}")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("decommissioned"), Some(&json!(true)));
    assert_eq!(
        payload.get("bed").and_then(|bed| bed.get("reason")),
        Some(&json!("unavailable"))
    );
}

#[tokio::test]
async fn triage_endpoint_routes_or_declines_admission() {
    let (service, _, _) = build_service();
    seed_ward(&service);
    let router = admission_router(service);
    let staff = uuid::Uuid::new_v4();

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/admissions/triage",
            json!({
                "patient_id": uuid::Uuid::new_v4(),
                "actor_id": staff,
                "severity": "WHITE",
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("admitted"), Some(&json!(false)));

    let response = router
        .oneshot(post(
            "/api/v1/admissions/triage",
            json!({
                "patient_id": uuid::Uuid::new_v4(),
                "actor_id": staff,
                "severity": "YELLOW",
                "observations": "short of breath",
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("phase"), Some(&json!("Occupied")));
    assert_eq!(payload.get("current_severity"), Some(&json!("YELLOW")));
}

#[test]
fn severity_and_state_serialize_with_their_wire_names() {
    assert_eq!(
        serde_json::to_value(Severity::Red).expect("serializes"),
        json!("RED")
    );
    assert_eq!(
        serde_json::to_value(BedState::OutOfService).expect("serializes"),
        json!("out_of_service")
    );
}
