use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::barcode::Barcode;
use super::domain::{
    Admission, AdmissionEvent, AdmissionId, Bed, BedAssignment, BedId, BedState, BedType,
    BedTypeId, HealthSnapshot, OutOfServiceReason,
};
use super::repository::{AdmissionStore, BedStore, LedgerSnapshot, RepositoryError};

/// Reference store backing the service binary and the test suites.
///
/// A single mutex guards the whole flow state, which makes the claim, the
/// open-assignment swap, and capacity provisioning genuinely atomic, the
/// properties a relational store would get from serialisable transactions.
#[derive(Debug, Default)]
pub struct InMemoryFlowStore {
    state: Mutex<FlowState>,
}

#[derive(Debug, Default)]
struct FlowState {
    bed_types: Vec<BedType>,
    beds: Vec<Bed>,
    admissions: Vec<Admission>,
    snapshots: Vec<HealthSnapshot>,
    assignments: Vec<BedAssignment>,
    events: Vec<AdmissionEvent>,
}

impl InMemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked<T>(
        &self,
        f: impl FnOnce(&mut FlowState) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))?;
        f(&mut state)
    }
}

fn sorted_by_age(mut beds: Vec<Bed>) -> Vec<Bed> {
    beds.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
    beds
}

impl BedStore for InMemoryFlowStore {
    fn insert_bed_type(&self, bed_type: BedType) -> Result<BedType, RepositoryError> {
        self.locked(|state| {
            if state.bed_types.iter().any(|bt| bt.id == bed_type.id) {
                return Err(RepositoryError::Conflict);
            }
            state.bed_types.push(bed_type.clone());
            Ok(bed_type)
        })
    }

    fn fetch_bed_type(&self, id: BedTypeId) -> Result<Option<BedType>, RepositoryError> {
        self.locked(|state| Ok(state.bed_types.iter().find(|bt| bt.id == id).cloned()))
    }

    fn list_bed_types(&self) -> Result<Vec<BedType>, RepositoryError> {
        self.locked(|state| {
            let mut types = state.bed_types.clone();
            types.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
            Ok(types)
        })
    }

    fn ensure_capacity(
        &self,
        id: BedTypeId,
        total: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<Bed>, RepositoryError> {
        self.locked(|state| {
            let existing = state.beds.iter().filter(|bed| bed.bed_type_id == id).count();
            let bed_type = state
                .bed_types
                .iter_mut()
                .find(|bt| bt.id == id)
                .ok_or(RepositoryError::NotFound)?;
            bed_type.total = total;

            let missing = (total as usize).saturating_sub(existing);
            let mut created = Vec::with_capacity(missing);
            for _ in 0..missing {
                let bed = Bed {
                    id: BedId::new(),
                    bed_type_id: id,
                    state: BedState::Available,
                    reason: None,
                    created_at: now,
                    updated_at: now,
                };
                state.beds.push(bed.clone());
                created.push(bed);
            }
            Ok(created)
        })
    }

    fn fetch_bed(&self, id: BedId) -> Result<Option<Bed>, RepositoryError> {
        self.locked(|state| Ok(state.beds.iter().find(|bed| bed.id == id).cloned()))
    }

    fn list_beds(&self, bed_type_id: BedTypeId) -> Result<Vec<Bed>, RepositoryError> {
        self.locked(|state| {
            Ok(sorted_by_age(
                state
                    .beds
                    .iter()
                    .filter(|bed| bed.bed_type_id == bed_type_id)
                    .cloned()
                    .collect(),
            ))
        })
    }

    fn snapshot_beds(&self) -> Result<Vec<Bed>, RepositoryError> {
        self.locked(|state| Ok(sorted_by_age(state.beds.clone())))
    }

    fn count_by_state(
        &self,
        bed_type_id: BedTypeId,
        state_filter: BedState,
    ) -> Result<usize, RepositoryError> {
        self.locked(|state| {
            Ok(state
                .beds
                .iter()
                .filter(|bed| bed.bed_type_id == bed_type_id && bed.state == state_filter)
                .count())
        })
    }

    fn claim_available(
        &self,
        bed_type_id: BedTypeId,
        now: DateTime<Utc>,
    ) -> Result<Option<Bed>, RepositoryError> {
        self.locked(|state| {
            let candidate = state
                .beds
                .iter_mut()
                .filter(|bed| bed.bed_type_id == bed_type_id && bed.state == BedState::Available)
                .min_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

            Ok(candidate.map(|bed| {
                bed.state = BedState::Assigned;
                bed.reason = None;
                bed.updated_at = now;
                bed.clone()
            }))
        })
    }

    fn set_state(
        &self,
        bed_id: BedId,
        new_state: BedState,
        reason: Option<OutOfServiceReason>,
        now: DateTime<Utc>,
    ) -> Result<Bed, RepositoryError> {
        self.locked(|state| {
            let bed = state
                .beds
                .iter_mut()
                .find(|bed| bed.id == bed_id)
                .ok_or(RepositoryError::NotFound)?;
            bed.state = new_state;
            bed.reason = reason;
            bed.updated_at = now;
            Ok(bed.clone())
        })
    }

    fn remove_bed(&self, bed_id: BedId) -> Result<(), RepositoryError> {
        self.locked(|state| {
            let open_reference = state
                .assignments
                .iter()
                .any(|assignment| assignment.bed_id == bed_id && assignment.is_open());
            if open_reference {
                return Err(RepositoryError::Conflict);
            }
            let before = state.beds.len();
            state.beds.retain(|bed| bed.id != bed_id);
            if state.beds.len() == before {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }
}

impl AdmissionStore for InMemoryFlowStore {
    fn insert_admission(&self, admission: Admission) -> Result<Admission, RepositoryError> {
        self.locked(|state| {
            if state
                .admissions
                .iter()
                .any(|row| row.id == admission.id || row.barcode == admission.barcode)
            {
                return Err(RepositoryError::Conflict);
            }
            state.admissions.push(admission.clone());
            Ok(admission)
        })
    }

    fn fetch_admission(&self, id: AdmissionId) -> Result<Option<Admission>, RepositoryError> {
        self.locked(|state| Ok(state.admissions.iter().find(|row| row.id == id).cloned()))
    }

    fn barcode_in_use(&self, barcode: &Barcode) -> Result<bool, RepositoryError> {
        self.locked(|state| Ok(state.admissions.iter().any(|row| &row.barcode == barcode)))
    }

    fn insert_snapshot(&self, snapshot: HealthSnapshot) -> Result<HealthSnapshot, RepositoryError> {
        self.locked(|state| {
            state.snapshots.push(snapshot.clone());
            Ok(snapshot)
        })
    }

    fn latest_snapshot(
        &self,
        admission_id: AdmissionId,
    ) -> Result<Option<HealthSnapshot>, RepositoryError> {
        self.locked(|state| {
            Ok(state
                .snapshots
                .iter()
                .filter(|snapshot| snapshot.admission_id == admission_id)
                .max_by_key(|snapshot| (snapshot.recorded_at, snapshot.id))
                .cloned())
        })
    }

    fn open_assignment(
        &self,
        admission_id: AdmissionId,
    ) -> Result<Option<BedAssignment>, RepositoryError> {
        self.locked(|state| {
            Ok(state
                .assignments
                .iter()
                .find(|assignment| assignment.admission_id == admission_id && assignment.is_open())
                .cloned())
        })
    }

    fn swap_open_assignment(
        &self,
        admission_id: AdmissionId,
        replacement: Option<BedAssignment>,
        now: DateTime<Utc>,
    ) -> Result<Option<BedAssignment>, RepositoryError> {
        self.locked(|state| {
            if let Some(new_assignment) = &replacement {
                let bed_already_held = state.assignments.iter().any(|assignment| {
                    assignment.bed_id == new_assignment.bed_id && assignment.is_open()
                });
                if bed_already_held {
                    return Err(RepositoryError::Conflict);
                }
            }

            let closed = state
                .assignments
                .iter_mut()
                .find(|assignment| assignment.admission_id == admission_id && assignment.is_open())
                .map(|assignment| {
                    assignment.unassigned_at = Some(now);
                    assignment.clone()
                });

            if let Some(new_assignment) = replacement {
                state.assignments.push(new_assignment);
            }
            Ok(closed)
        })
    }

    fn list_assignments(
        &self,
        admission_id: AdmissionId,
    ) -> Result<Vec<BedAssignment>, RepositoryError> {
        self.locked(|state| {
            let mut rows: Vec<BedAssignment> = state
                .assignments
                .iter()
                .filter(|assignment| assignment.admission_id == admission_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| (b.assigned_at, b.id).cmp(&(a.assigned_at, a.id)));
            Ok(rows)
        })
    }

    fn record_event(&self, event: AdmissionEvent) -> Result<AdmissionEvent, RepositoryError> {
        self.locked(|state| {
            let admission_id = event.admission_id();
            let duplicate = state.events.iter().any(|existing| {
                existing.admission_id() == admission_id
                    && matches!(
                        (existing, &event),
                        (AdmissionEvent::Discharge(_), AdmissionEvent::Discharge(_))
                            | (AdmissionEvent::Deceased(_), AdmissionEvent::Deceased(_))
                    )
            });
            if duplicate {
                return Err(RepositoryError::Conflict);
            }
            state.events.push(event.clone());
            Ok(event)
        })
    }

    fn events(&self, admission_id: AdmissionId) -> Result<Vec<AdmissionEvent>, RepositoryError> {
        self.locked(|state| {
            Ok(state
                .events
                .iter()
                .filter(|event| event.admission_id() == admission_id)
                .cloned()
                .collect())
        })
    }

    fn snapshot_ledger(&self) -> Result<LedgerSnapshot, RepositoryError> {
        self.locked(|state| {
            let mut first_severity = std::collections::BTreeMap::new();
            for snapshot in &state.snapshots {
                first_severity
                    .entry(snapshot.admission_id)
                    .or_insert(snapshot.severity);
            }
            Ok(LedgerSnapshot {
                admissions: state.admissions.clone(),
                assignments: state.assignments.clone(),
                events: state.events.clone(),
                first_severity,
            })
        })
    }
}
