//! Bed allocation and admission lifecycle.
//!
//! The module owns the correctness-critical occupancy state machine: one
//! open assignment per admission, one occupant per bed, and beds that cycle
//! through an out-of-service cleaning step before they are offered again.
//! Persistence sits behind the [`repository`] traits; [`memory`] provides
//! the reference store the service binary and the tests run on.

pub mod barcode;
pub mod domain;
pub mod ledger;
pub mod memory;
pub mod registry;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use barcode::{Barcode, BarcodeError, BarcodeRenderer, KeyOnlyRenderer, RenderedBarcode};
pub use domain::{
    Admission, AdmissionEvent, AdmissionId, AdmissionPhase, AssignmentId, Bed, BedAssignment,
    BedId, BedState, BedType, BedTypeId, DeceasedEvent, DischargeEvent, EventId, HealthSnapshot,
    OutOfServiceReason, PatientId, Severity, SnapshotId, SnapshotObservations, StaffId, VitalSigns,
};
pub use ledger::{
    admissions_per_day, availability_summary, average_stay, open_assignments_by_bed_type,
    AvailabilitySummary, DailyAdmissions, LabelledCount, LabelledRatio,
};
pub use memory::InMemoryFlowStore;
pub use registry::{BedRegistry, BedRemoval, BedTypeCounters, CapacityChange, RegistryError};
pub use repository::{AdmissionStore, BedStore, LedgerSnapshot, RepositoryError};
pub use router::admission_router;
pub use service::{
    AdmissionService, AdmissionServiceError, AdmissionView, SnapshotOutcome, TriageOutcome,
};
