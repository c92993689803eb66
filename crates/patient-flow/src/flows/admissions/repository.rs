use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::barcode::Barcode;
use super::domain::{
    Admission, AdmissionEvent, AdmissionId, Bed, BedAssignment, BedId, BedState, BedType,
    BedTypeId, HealthSnapshot, OutOfServiceReason, Severity,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("conflicting record state")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store contended, retry")]
    Busy,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction over the bed pool and its categories.
///
/// `claim_available` and `ensure_capacity` must be atomic with respect to
/// concurrent callers; a relational implementation would serialise them
/// with row locks, the in-memory reference store holds one lock across
/// each call.
pub trait BedStore: Send + Sync {
    fn insert_bed_type(&self, bed_type: BedType) -> Result<BedType, RepositoryError>;
    fn fetch_bed_type(&self, id: BedTypeId) -> Result<Option<BedType>, RepositoryError>;
    /// All bed types ordered by `(created_at, id)`.
    fn list_bed_types(&self) -> Result<Vec<BedType>, RepositoryError>;

    /// Raise the declared capacity to `total` and provision the missing
    /// units as `Available` beds, atomically. Never removes units; a `total`
    /// below the current unit count only updates the declared capacity.
    /// Returns the newly created beds.
    fn ensure_capacity(
        &self,
        id: BedTypeId,
        total: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<Bed>, RepositoryError>;

    fn fetch_bed(&self, id: BedId) -> Result<Option<Bed>, RepositoryError>;
    /// All beds of a type ordered by `(created_at, id)`.
    fn list_beds(&self, bed_type_id: BedTypeId) -> Result<Vec<Bed>, RepositoryError>;
    /// Every bed in the registry, across types.
    fn snapshot_beds(&self) -> Result<Vec<Bed>, RepositoryError>;
    fn count_by_state(
        &self,
        bed_type_id: BedTypeId,
        state: BedState,
    ) -> Result<usize, RepositoryError>;

    /// Atomically select the oldest `Available` bed of the type and flip it
    /// to `Assigned`. `Ok(None)` means the type is exhausted. The read and
    /// the write must not interleave with other claims.
    fn claim_available(
        &self,
        bed_type_id: BedTypeId,
        now: DateTime<Utc>,
    ) -> Result<Option<Bed>, RepositoryError>;

    /// Persist a bed state change. State/reason consistency is validated by
    /// the registry before this is called.
    fn set_state(
        &self,
        bed_id: BedId,
        state: BedState,
        reason: Option<OutOfServiceReason>,
        now: DateTime<Utc>,
    ) -> Result<Bed, RepositoryError>;

    /// Remove the bed row outright. Callers must have established that no
    /// open assignment references it.
    fn remove_bed(&self, bed_id: BedId) -> Result<(), RepositoryError>;
}

/// Read-model of the assignment ledger used by the aggregate projections.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub admissions: Vec<Admission>,
    pub assignments: Vec<BedAssignment>,
    pub events: Vec<AdmissionEvent>,
    /// First recorded triage severity per admission, where one exists.
    pub first_severity: BTreeMap<AdmissionId, Severity>,
}

/// Storage abstraction over admissions, their triage snapshots, the bed
/// assignment ledger, and terminal events.
pub trait AdmissionStore: Send + Sync {
    fn insert_admission(&self, admission: Admission) -> Result<Admission, RepositoryError>;
    fn fetch_admission(&self, id: AdmissionId) -> Result<Option<Admission>, RepositoryError>;
    fn barcode_in_use(&self, barcode: &Barcode) -> Result<bool, RepositoryError>;

    fn insert_snapshot(&self, snapshot: HealthSnapshot) -> Result<HealthSnapshot, RepositoryError>;
    /// Most recent snapshot, the one that defines current severity.
    fn latest_snapshot(
        &self,
        admission_id: AdmissionId,
    ) -> Result<Option<HealthSnapshot>, RepositoryError>;

    /// The open assignment for an admission, if any. At most one can exist.
    fn open_assignment(
        &self,
        admission_id: AdmissionId,
    ) -> Result<Option<BedAssignment>, RepositoryError>;

    /// Atomically close the admission's open assignment (stamping
    /// `unassigned_at = now`) and, when `replacement` is given, insert it as
    /// the new open assignment. Returns the closed assignment so the caller
    /// can cycle the freed bed. Rejects a replacement whose bed already has
    /// an open assignment.
    fn swap_open_assignment(
        &self,
        admission_id: AdmissionId,
        replacement: Option<BedAssignment>,
        now: DateTime<Utc>,
    ) -> Result<Option<BedAssignment>, RepositoryError>;

    /// Assignment history for an admission, most recently assigned first.
    fn list_assignments(
        &self,
        admission_id: AdmissionId,
    ) -> Result<Vec<BedAssignment>, RepositoryError>;

    /// Append a terminal event. Enforces at most one discharge and at most
    /// one deceased event per admission with `Conflict`.
    fn record_event(&self, event: AdmissionEvent) -> Result<AdmissionEvent, RepositoryError>;
    fn events(&self, admission_id: AdmissionId) -> Result<Vec<AdmissionEvent>, RepositoryError>;

    /// Consistent read of the full ledger for the aggregate projections.
    fn snapshot_ledger(&self) -> Result<LedgerSnapshot, RepositoryError>;
}
