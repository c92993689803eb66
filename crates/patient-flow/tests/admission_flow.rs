use std::sync::Arc;

use patient_flow::flows::admissions::{
    AdmissionService, AdmissionServiceError, BedState, BedStore, InMemoryFlowStore,
    KeyOnlyRenderer, OutOfServiceReason, PatientId, Severity, SnapshotObservations, StaffId,
    TriageOutcome,
};

fn build_service() -> (
    Arc<AdmissionService<InMemoryFlowStore, InMemoryFlowStore, KeyOnlyRenderer>>,
    Arc<InMemoryFlowStore>,
) {
    let store = Arc::new(InMemoryFlowStore::new());
    let service = Arc::new(AdmissionService::new(
        store.clone(),
        store.clone(),
        Arc::new(KeyOnlyRenderer),
    ));
    (service, store)
}

#[test]
fn icu_ward_walkthrough_fills_capacity_then_rejects() {
    let (service, _) = build_service();
    let registry = service.registry();
    let icu = registry
        .create_bed_type("Intensive Care Unit", Some(Severity::Red), 2)
        .expect("icu registered");
    let staff = StaffId::new();

    let admission_a = service.admit(PatientId::new(), staff).expect("A admitted");
    service
        .assign_bed(admission_a.id, icu.id, staff)
        .expect("A takes a bed");
    let counters = registry.counters(icu.id).expect("counters");
    assert_eq!((counters.assigned, counters.available), (1, 1));

    let admission_b = service.admit(PatientId::new(), staff).expect("B admitted");
    service
        .assign_bed(admission_b.id, icu.id, staff)
        .expect("B takes a bed");
    let counters = registry.counters(icu.id).expect("counters");
    assert_eq!((counters.assigned, counters.available), (2, 0));

    let admission_c = service.admit(PatientId::new(), staff).expect("C admitted");
    match service.assign_bed(admission_c.id, icu.id, staff) {
        Err(AdmissionServiceError::BedUnavailable { bed_type_name }) => {
            assert_eq!(bed_type_name, "Intensive Care Unit");
        }
        other => panic!("expected bed unavailable, got {other:?}"),
    }
}

#[test]
fn a_full_stay_moves_through_triage_transfer_and_discharge() {
    let (service, store) = build_service();
    let registry = service.registry();
    let icu = registry
        .create_bed_type("Intensive Care Unit", Some(Severity::Red), 2)
        .expect("icu registered");
    let intermediate = registry
        .create_bed_type("Intermediate Care", Some(Severity::Yellow), 3)
        .expect("intermediate registered");
    let staff = StaffId::new();

    // Triage lands the patient in ICU off the initial snapshot.
    let outcome = service
        .admit_from_triage(
            PatientId::new(),
            SnapshotObservations {
                severity: Severity::Red,
                vitals: Default::default(),
                observations: Some("unresponsive on arrival".to_string()),
            },
            staff,
        )
        .expect("triage admits");
    let (admission, snapshot) = match outcome {
        TriageOutcome::Admitted {
            admission,
            snapshot,
        } => (admission, snapshot),
        other => panic!("red severity admits, got {other:?}"),
    };
    let icu_bed = snapshot.assigned_bed.expect("red routes to icu");
    assert_eq!(icu_bed.bed_type_id, icu.id);

    // Condition improves; staff transfer the patient to intermediate care.
    let ward_bed = service
        .assign_bed(admission.id, intermediate.id, staff)
        .expect("transfer succeeds");
    assert_eq!(ward_bed.bed_type_id, intermediate.id);

    let old_bed = store
        .fetch_bed(icu_bed.id)
        .expect("fetch runs")
        .expect("bed exists");
    assert_eq!(old_bed.state, BedState::OutOfService);
    assert_eq!(old_bed.reason, Some(OutOfServiceReason::Cleaning));

    // Discharge ends the stay and frees the ward bed into cleaning.
    service
        .discharge(admission.id, Some("recovered".to_string()), staff)
        .expect("discharged");
    let view = service.admission_view(admission.id).expect("view builds");
    assert!(view.is_discharged);
    assert!(view.current_bed.is_none());

    let freed = store
        .fetch_bed(ward_bed.id)
        .expect("fetch runs")
        .expect("bed exists");
    assert_eq!(freed.state, BedState::OutOfService);
    assert_eq!(freed.reason, Some(OutOfServiceReason::Cleaning));
}
