use metrics_exporter_prometheus::PrometheusHandle;
use patient_flow::flows::admissions::{
    AdmissionService, BedType, InMemoryFlowStore, KeyOnlyRenderer, RegistryError, Severity,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// The concrete service stack the binary runs on: the crate's reference
/// in-memory store plus the key-only barcode renderer.
pub(crate) type FlowService =
    AdmissionService<InMemoryFlowStore, InMemoryFlowStore, KeyOnlyRenderer>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Arc<InMemoryFlowStore>,
}

pub(crate) fn build_core() -> (Arc<FlowService>, Arc<InMemoryFlowStore>) {
    let store = Arc::new(InMemoryFlowStore::new());
    let service = Arc::new(AdmissionService::new(
        store.clone(),
        store.clone(),
        Arc::new(KeyOnlyRenderer),
    ));
    (service, store)
}

/// The ward layout used by `--seed-ward` and the CLI demo.
pub(crate) fn seed_standard_ward(
    service: &FlowService,
) -> Result<(BedType, BedType, BedType), RegistryError> {
    let registry = service.registry();
    let icu = registry.create_bed_type("Intensive Care Unit", Some(Severity::Red), 2)?;
    let intermediate = registry.create_bed_type("Intermediate Care", Some(Severity::Yellow), 3)?;
    let recovery = registry.create_bed_type("Recovery", Some(Severity::Green), 3)?;
    Ok((icu, intermediate, recovery))
}
