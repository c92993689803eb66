use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::flows::admissions::barcode::{
    Barcode, BarcodeError, BarcodeRenderer, RenderedBarcode,
};
use crate::flows::admissions::domain::{
    Bed, BedId, BedState, BedType, BedTypeId, OutOfServiceReason, PatientId, Severity,
    SnapshotObservations, StaffId, VitalSigns,
};
use crate::flows::admissions::memory::InMemoryFlowStore;
use crate::flows::admissions::repository::{BedStore, RepositoryError};
use crate::flows::admissions::service::AdmissionService;

pub(super) type MemoryService =
    AdmissionService<InMemoryFlowStore, InMemoryFlowStore, RecordingRenderer>;

pub(super) fn build_service() -> (
    Arc<MemoryService>,
    Arc<InMemoryFlowStore>,
    Arc<RecordingRenderer>,
) {
    let store = Arc::new(InMemoryFlowStore::new());
    let renderer = Arc::new(RecordingRenderer::default());
    let service = Arc::new(AdmissionService::new(
        store.clone(),
        store.clone(),
        renderer.clone(),
    ));
    (service, store, renderer)
}

/// The standard ward layout used across the suites: ICU(RED, 2),
/// Intermediate(YELLOW, 3), Recovery(GREEN, 3).
pub(super) fn seed_ward(service: &MemoryService) -> (BedType, BedType, BedType) {
    let registry = service.registry();
    let icu = registry
        .create_bed_type("Intensive Care Unit", Some(Severity::Red), 2)
        .expect("icu registered");
    let intermediate = registry
        .create_bed_type("Intermediate Care", Some(Severity::Yellow), 3)
        .expect("intermediate registered");
    let recovery = registry
        .create_bed_type("Recovery", Some(Severity::Green), 3)
        .expect("recovery registered");
    (icu, intermediate, recovery)
}

pub(super) fn actor() -> StaffId {
    StaffId::new()
}

pub(super) fn patient() -> PatientId {
    PatientId::new()
}

pub(super) fn observations(severity: Severity) -> SnapshotObservations {
    SnapshotObservations {
        severity,
        vitals: VitalSigns {
            blood_pressure_systolic: Some(120),
            blood_pressure_diastolic: Some(80),
            heart_rate: Some(72),
            breathing_rate: Some(16),
            temperature: Some(36.8),
            oxygen_saturation: Some(98),
        },
        observations: Some("triage notes".to_string()),
    }
}

#[derive(Default)]
pub(super) struct RecordingRenderer {
    rendered: Mutex<Vec<Barcode>>,
}

impl RecordingRenderer {
    pub(super) fn rendered(&self) -> Vec<Barcode> {
        self.rendered.lock().expect("renderer mutex poisoned").clone()
    }
}

impl BarcodeRenderer for RecordingRenderer {
    fn render(&self, barcode: &Barcode) -> Result<RenderedBarcode, BarcodeError> {
        self.rendered
            .lock()
            .expect("renderer mutex poisoned")
            .push(barcode.clone());
        Ok(RenderedBarcode {
            storage_key: format!("barcodes/{barcode}.png"),
        })
    }
}

/// Bed store wrapper that reports contention for the first N claims, for
/// exercising the bounded retry.
pub(super) struct ContentiousBedStore {
    inner: Arc<InMemoryFlowStore>,
    remaining_failures: AtomicU32,
}

impl ContentiousBedStore {
    pub(super) fn new(inner: Arc<InMemoryFlowStore>, failures: u32) -> Self {
        Self {
            inner,
            remaining_failures: AtomicU32::new(failures),
        }
    }
}

impl BedStore for ContentiousBedStore {
    fn insert_bed_type(&self, bed_type: BedType) -> Result<BedType, RepositoryError> {
        self.inner.insert_bed_type(bed_type)
    }

    fn fetch_bed_type(&self, id: BedTypeId) -> Result<Option<BedType>, RepositoryError> {
        self.inner.fetch_bed_type(id)
    }

    fn list_bed_types(&self) -> Result<Vec<BedType>, RepositoryError> {
        self.inner.list_bed_types()
    }

    fn ensure_capacity(
        &self,
        id: BedTypeId,
        total: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<Bed>, RepositoryError> {
        self.inner.ensure_capacity(id, total, now)
    }

    fn fetch_bed(&self, id: BedId) -> Result<Option<Bed>, RepositoryError> {
        self.inner.fetch_bed(id)
    }

    fn list_beds(&self, bed_type_id: BedTypeId) -> Result<Vec<Bed>, RepositoryError> {
        self.inner.list_beds(bed_type_id)
    }

    fn snapshot_beds(&self) -> Result<Vec<Bed>, RepositoryError> {
        self.inner.snapshot_beds()
    }

    fn count_by_state(
        &self,
        bed_type_id: BedTypeId,
        state: BedState,
    ) -> Result<usize, RepositoryError> {
        self.inner.count_by_state(bed_type_id, state)
    }

    fn claim_available(
        &self,
        bed_type_id: BedTypeId,
        now: DateTime<Utc>,
    ) -> Result<Option<Bed>, RepositoryError> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Busy);
        }
        self.inner.claim_available(bed_type_id, now)
    }

    fn set_state(
        &self,
        bed_id: BedId,
        state: BedState,
        reason: Option<OutOfServiceReason>,
        now: DateTime<Utc>,
    ) -> Result<Bed, RepositoryError> {
        self.inner.set_state(bed_id, state, reason, now)
    }

    fn remove_bed(&self, bed_id: BedId) -> Result<(), RepositoryError> {
        self.inner.remove_bed(bed_id)
    }
}

pub(super) fn contentious_service(
    failures: u32,
) -> (
    Arc<AdmissionService<ContentiousBedStore, InMemoryFlowStore, RecordingRenderer>>,
    Arc<InMemoryFlowStore>,
) {
    let store = Arc::new(InMemoryFlowStore::new());
    let beds = Arc::new(ContentiousBedStore::new(store.clone(), failures));
    let service = Arc::new(AdmissionService::new(
        beds,
        store.clone(),
        Arc::new(RecordingRenderer::default()),
    ));
    (service, store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
