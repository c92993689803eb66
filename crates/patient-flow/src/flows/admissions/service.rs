use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::barcode::{Barcode, BarcodeError, BarcodeRenderer, MAX_MINT_ATTEMPTS};
use super::domain::{
    Admission, AdmissionEvent, AdmissionId, AdmissionPhase, Bed, BedAssignment, BedState,
    BedTypeId, DeceasedEvent, DischargeEvent, EventId, HealthSnapshot, OutOfServiceReason,
    PatientId, Severity, SnapshotId, SnapshotObservations, StaffId,
};
use super::registry::{BedRegistry, RegistryError};
use super::repository::{AdmissionStore, BedStore, RepositoryError};

/// Attempts at the atomic bed claim before surfacing contention.
const CLAIM_ATTEMPTS: u32 = 3;

/// Error raised by the admission lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionServiceError {
    #[error("no available bed of type \"{bed_type_name}\"; select another type or use the waiting list")]
    BedUnavailable { bed_type_name: String },
    #[error("admission {0} is not registered")]
    UnknownAdmission(AdmissionId),
    #[error("admission {0} already reached a terminal state")]
    TerminalAdmission(AdmissionId),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Barcode(#[from] BarcodeError),
}

/// Outcome of a triage snapshot: the stored record plus the bed the
/// auto-router landed the admission in, when it did.
#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
    pub snapshot: HealthSnapshot,
    pub assigned_bed: Option<Bed>,
}

/// Outcome of triage-driven intake. `White` severity means the patient is
/// sent home without an admission record.
#[derive(Debug, Clone)]
pub enum TriageOutcome {
    NotAdmitted,
    Admitted {
        admission: Admission,
        snapshot: SnapshotOutcome,
    },
}

/// Read view of one admission for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionView {
    pub id: AdmissionId,
    pub patient_id: PatientId,
    pub barcode: Barcode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_artifact: Option<String>,
    pub admitted: bool,
    pub admitted_at: DateTime<Utc>,
    pub phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_bed: Option<Bed>,
    pub is_discharged: bool,
    pub is_deceased: bool,
}

/// The admission lifecycle state machine: intake, triage routing, bed
/// (re)assignment, discharge, and deceased recording.
///
/// Every mutating operation takes the acting staff member explicitly;
/// there is no ambient current-user state anywhere in the core.
pub struct AdmissionService<B, A, R> {
    beds: Arc<B>,
    admissions: Arc<A>,
    renderer: Arc<R>,
    registry: BedRegistry<B>,
}

impl<B, A, R> AdmissionService<B, A, R>
where
    B: BedStore + 'static,
    A: AdmissionStore + 'static,
    R: BarcodeRenderer + 'static,
{
    pub fn new(beds: Arc<B>, admissions: Arc<A>, renderer: Arc<R>) -> Self {
        let registry = BedRegistry::new(beds.clone());
        Self {
            beds,
            admissions,
            renderer,
            registry,
        }
    }

    /// The bed-pool administration surface sharing this service's store.
    pub fn registry(&self) -> &BedRegistry<B> {
        &self.registry
    }

    /// Create an admission directly, with a freshly minted unique barcode
    /// and its rendered artifact.
    pub fn admit(
        &self,
        patient_id: PatientId,
        actor: StaffId,
    ) -> Result<Admission, AdmissionServiceError> {
        let barcode = self.mint_barcode()?;
        let artifact = self.renderer.render(&barcode)?;

        let admission = self.admissions.insert_admission(Admission {
            id: AdmissionId::new(),
            patient_id,
            barcode,
            barcode_artifact: Some(artifact.storage_key),
            admitted: true,
            admitted_at: Utc::now(),
            created_by: actor,
        })?;
        info!(admission = %admission.id, barcode = %admission.barcode, "patient admitted");
        Ok(admission)
    }

    /// Triage-driven intake: classify first, admit only when the severity
    /// calls for it, then route a bed off the initial snapshot.
    pub fn admit_from_triage(
        &self,
        patient_id: PatientId,
        observations: SnapshotObservations,
        actor: StaffId,
    ) -> Result<TriageOutcome, AdmissionServiceError> {
        if !observations.severity.requires_admission() {
            info!(%patient_id, "triage classified white, no admission created");
            return Ok(TriageOutcome::NotAdmitted);
        }

        let admission = self.admit(patient_id, actor)?;
        let snapshot = self.record_snapshot(admission.id, observations, actor)?;
        Ok(TriageOutcome::Admitted {
            admission,
            snapshot,
        })
    }

    /// Store a triage snapshot. When the admission holds no bed and the
    /// severity maps to a bed type, a unit is routed automatically;
    /// exhaustion leaves the admission unassigned rather than failing the
    /// snapshot, since triage must never block on bed availability.
    pub fn record_snapshot(
        &self,
        admission_id: AdmissionId,
        observations: SnapshotObservations,
        actor: StaffId,
    ) -> Result<SnapshotOutcome, AdmissionServiceError> {
        self.require_admission(admission_id)?;

        let snapshot = self.admissions.insert_snapshot(HealthSnapshot {
            id: SnapshotId::new(),
            admission_id,
            severity: observations.severity,
            vitals: observations.vitals,
            observations: observations.observations,
            recorded_at: Utc::now(),
            recorded_by: actor,
        })?;

        let mut assigned_bed = None;
        let routable = self.phase(admission_id)? == AdmissionPhase::Unassigned;
        if routable {
            if let Some(bed_type) = self.registry.match_severity(snapshot.severity)? {
                match self.assign_bed(admission_id, bed_type.id, actor) {
                    Ok(bed) => assigned_bed = Some(bed),
                    Err(AdmissionServiceError::BedUnavailable { bed_type_name }) => {
                        warn!(
                            admission = %admission_id,
                            bed_type = %bed_type_name,
                            "auto-routing found no free bed, admission left unassigned"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(SnapshotOutcome {
            snapshot,
            assigned_bed,
        })
    }

    /// Assign a bed of the requested type, releasing any currently held
    /// bed through the cleaning cycle.
    ///
    /// The claim itself is atomic in the store; the bounded retry only
    /// covers transient contention surfaced as [`RepositoryError::Busy`].
    pub fn assign_bed(
        &self,
        admission_id: AdmissionId,
        bed_type_id: BedTypeId,
        actor: StaffId,
    ) -> Result<Bed, AdmissionServiceError> {
        self.require_admission(admission_id)?;
        if self.phase(admission_id)?.is_terminal() {
            return Err(AdmissionServiceError::TerminalAdmission(admission_id));
        }
        let bed_type = self.registry.bed_type(bed_type_id)?;

        let now = Utc::now();
        let claimed = self.claim_with_retry(bed_type_id, now)?.ok_or_else(|| {
            AdmissionServiceError::BedUnavailable {
                bed_type_name: bed_type.name.clone(),
            }
        })?;

        let assignment = BedAssignment::open(admission_id, claimed.id, now);
        let closed = match self
            .admissions
            .swap_open_assignment(admission_id, Some(assignment), now)
        {
            Ok(closed) => closed,
            Err(err) => {
                // Hand the claimed unit back before surfacing the failure.
                if let Err(release_err) =
                    self.beds.set_state(claimed.id, BedState::Available, None, now)
                {
                    warn!(bed = %claimed.id, error = %release_err, "failed to release claimed bed");
                }
                return Err(err.into());
            }
        };

        if let Some(previous) = closed {
            self.send_to_cleaning(previous, now)?;
        }

        info!(
            admission = %admission_id,
            bed = %claimed.id,
            bed_type = %bed_type.name,
            actor = %actor,
            "bed assigned"
        );
        Ok(claimed)
    }

    /// Bed referenced by the admission's open assignment, if any.
    pub fn current_bed(
        &self,
        admission_id: AdmissionId,
    ) -> Result<Option<Bed>, AdmissionServiceError> {
        self.require_admission(admission_id)?;
        let Some(assignment) = self.admissions.open_assignment(admission_id)? else {
            return Ok(None);
        };
        Ok(self.beds.fetch_bed(assignment.bed_id)?)
    }

    /// Severity of the most recent triage snapshot, if any was recorded.
    pub fn current_severity(
        &self,
        admission_id: AdmissionId,
    ) -> Result<Option<Severity>, AdmissionServiceError> {
        self.require_admission(admission_id)?;
        Ok(self
            .admissions
            .latest_snapshot(admission_id)?
            .map(|snapshot| snapshot.severity))
    }

    /// Record the discharge, close any open assignment, and cycle the
    /// freed bed through cleaning. A repeat discharge is a conflict.
    pub fn discharge(
        &self,
        admission_id: AdmissionId,
        notes: Option<String>,
        actor: StaffId,
    ) -> Result<DischargeEvent, AdmissionServiceError> {
        self.require_admission(admission_id)?;
        if self.phase(admission_id)?.is_terminal() {
            return Err(AdmissionServiceError::TerminalAdmission(admission_id));
        }

        let now = Utc::now();
        let event = DischargeEvent {
            id: EventId::new(),
            admission_id,
            discharged_at: now,
            notes,
            recorded_by: actor,
        };
        self.admissions
            .record_event(AdmissionEvent::Discharge(event.clone()))?;

        self.release_bed(admission_id, now)?;
        info!(admission = %admission_id, actor = %actor, "patient discharged");
        Ok(event)
    }

    /// Record the single permitted deceased event. Releases the bed the
    /// same way discharge does.
    pub fn record_deceased(
        &self,
        admission_id: AdmissionId,
        cause: String,
        notes: Option<String>,
        actor: StaffId,
    ) -> Result<DeceasedEvent, AdmissionServiceError> {
        self.require_admission(admission_id)?;
        if self.phase(admission_id)?.is_terminal() {
            return Err(AdmissionServiceError::TerminalAdmission(admission_id));
        }

        let now = Utc::now();
        let event = DeceasedEvent {
            id: EventId::new(),
            admission_id,
            registered_at: now,
            cause,
            notes,
            notified_next_of_kin: false,
            recorded_by: actor,
        };
        self.admissions
            .record_event(AdmissionEvent::Deceased(event.clone()))?;

        self.release_bed(admission_id, now)?;
        info!(admission = %admission_id, actor = %actor, "deceased recorded");
        Ok(event)
    }

    /// Derived occupancy phase of the admission.
    pub fn phase(&self, admission_id: AdmissionId) -> Result<AdmissionPhase, AdmissionServiceError> {
        let events = self.admissions.events(admission_id)?;
        if events
            .iter()
            .any(|event| matches!(event, AdmissionEvent::Deceased(_)))
        {
            return Ok(AdmissionPhase::Deceased);
        }
        if events
            .iter()
            .any(|event| matches!(event, AdmissionEvent::Discharge(_)))
        {
            return Ok(AdmissionPhase::Discharged);
        }
        if self.admissions.open_assignment(admission_id)?.is_some() {
            return Ok(AdmissionPhase::Occupied);
        }
        Ok(AdmissionPhase::Unassigned)
    }

    /// Full read view for API responses.
    pub fn admission_view(
        &self,
        admission_id: AdmissionId,
    ) -> Result<AdmissionView, AdmissionServiceError> {
        let admission = self.require_admission(admission_id)?;
        let phase = self.phase(admission_id)?;
        Ok(AdmissionView {
            id: admission.id,
            patient_id: admission.patient_id,
            barcode: admission.barcode,
            barcode_artifact: admission.barcode_artifact,
            admitted: admission.admitted,
            admitted_at: admission.admitted_at,
            phase: phase.label(),
            current_severity: self
                .admissions
                .latest_snapshot(admission_id)?
                .map(|snapshot| snapshot.severity),
            current_bed: match self.admissions.open_assignment(admission_id)? {
                Some(assignment) => self.beds.fetch_bed(assignment.bed_id)?,
                None => None,
            },
            is_discharged: phase == AdmissionPhase::Discharged,
            is_deceased: phase == AdmissionPhase::Deceased,
        })
    }

    fn require_admission(
        &self,
        admission_id: AdmissionId,
    ) -> Result<Admission, AdmissionServiceError> {
        self.admissions
            .fetch_admission(admission_id)?
            .ok_or(AdmissionServiceError::UnknownAdmission(admission_id))
    }

    fn claim_with_retry(
        &self,
        bed_type_id: BedTypeId,
        now: DateTime<Utc>,
    ) -> Result<Option<Bed>, AdmissionServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.beds.claim_available(bed_type_id, now) {
                Ok(outcome) => return Ok(outcome),
                Err(RepositoryError::Busy) if attempt < CLAIM_ATTEMPTS => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Close the open assignment, if any, and send the freed unit through
    /// the cleaning cycle. Beds never return to `Available` directly.
    fn release_bed(
        &self,
        admission_id: AdmissionId,
        now: DateTime<Utc>,
    ) -> Result<(), AdmissionServiceError> {
        if let Some(closed) = self
            .admissions
            .swap_open_assignment(admission_id, None, now)?
        {
            self.send_to_cleaning(closed, now)?;
        }
        Ok(())
    }

    fn send_to_cleaning(
        &self,
        assignment: BedAssignment,
        now: DateTime<Utc>,
    ) -> Result<(), AdmissionServiceError> {
        self.beds.set_state(
            assignment.bed_id,
            BedState::OutOfService,
            Some(OutOfServiceReason::Cleaning),
            now,
        )?;
        Ok(())
    }

    fn mint_barcode(&self) -> Result<Barcode, AdmissionServiceError> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_MINT_ATTEMPTS {
            let candidate = Barcode::random(&mut rng);
            if !self.admissions.barcode_in_use(&candidate)? {
                return Ok(candidate);
            }
        }
        Err(BarcodeError::Exhausted(MAX_MINT_ATTEMPTS).into())
    }
}
