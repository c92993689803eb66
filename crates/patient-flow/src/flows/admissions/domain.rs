use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::barcode::Barcode;

/// Identifier wrapper for bed categories (ICU, Intermediate, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BedTypeId(pub Uuid);

/// Identifier wrapper for individual bed units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BedId(pub Uuid);

/// Identifier wrapper for patient stays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdmissionId(pub Uuid);

/// Opaque reference to a patient record owned by an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatientId(pub Uuid);

/// The staff member performing an operation; threaded explicitly, never ambient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StaffId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

macro_rules! impl_id {
    ($($id:ident),+) => {
        $(
            impl $id {
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl Default for $id {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $id {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }
        )+
    };
}

impl_id!(BedTypeId, BedId, AdmissionId, PatientId, StaffId, SnapshotId, AssignmentId, EventId);

/// Triage classification attached to health snapshots and used to auto-route
/// an admission to a bed category. `White` indicates no admission is needed
/// and is never a valid bed-type match tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Red,
    Yellow,
    Green,
    White,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Yellow => "Yellow",
            Self::Green => "Green",
            Self::White => "White",
        }
    }

    /// Whether this classification admits the patient at all.
    pub const fn requires_admission(self) -> bool {
        !matches!(self, Self::White)
    }
}

/// Service state of one physical bed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedState {
    Available,
    Assigned,
    OutOfService,
}

impl BedState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Assigned => "Assigned",
            Self::OutOfService => "Out of service",
        }
    }
}

/// Why a bed is held out of service. Present exactly when the bed state is
/// [`BedState::OutOfService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfServiceReason {
    Cleaning,
    EquipmentFailure,
    Unavailable,
}

impl OutOfServiceReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cleaning => "Cleaning",
            Self::EquipmentFailure => "Equipment failure",
            Self::Unavailable => "Unavailable",
        }
    }
}

/// A category of bed resource with a declared total capacity.
///
/// The registry of individual units is lazily grown to `total` on every
/// capacity change and is never auto-shrunk; decommissioning happens per
/// unit through the bed registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedType {
    pub id: BedTypeId,
    pub name: String,
    pub severity_match: Option<Severity>,
    pub total: u32,
    pub created_at: DateTime<Utc>,
}

/// One physical bed unit belonging to a bed type. Ownership is immutable
/// after creation; only `state`/`reason` change over a unit's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    pub bed_type_id: BedTypeId,
    pub state: BedState,
    pub reason: Option<OutOfServiceReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bed {
    pub fn is_available(&self) -> bool {
        self.state == BedState::Available
    }
}

/// A patient's tracked hospital stay. Never deleted; terminal states are
/// reached through append-only discharge/deceased events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub id: AdmissionId,
    pub patient_id: PatientId,
    pub barcode: Barcode,
    /// Storage key of the rendered barcode artifact, when a renderer produced one.
    pub barcode_artifact: Option<String>,
    pub admitted: bool,
    pub admitted_at: DateTime<Utc>,
    pub created_by: StaffId,
}

/// Vitals captured during triage. Every field is optional; triage records
/// whatever was actually measured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub blood_pressure_systolic: Option<u16>,
    pub blood_pressure_diastolic: Option<u16>,
    pub heart_rate: Option<u16>,
    pub breathing_rate: Option<u16>,
    pub temperature: Option<f32>,
    pub oxygen_saturation: Option<u8>,
}

/// Append-only triage record; the newest snapshot defines the admission's
/// current severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub id: SnapshotId,
    pub admission_id: AdmissionId,
    pub severity: Severity,
    pub vitals: VitalSigns,
    pub observations: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: StaffId,
}

/// Triage input as supplied by the external intake collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotObservations {
    pub severity: Severity,
    #[serde(default)]
    pub vitals: VitalSigns,
    #[serde(default)]
    pub observations: Option<String>,
}

/// The binding of one admission to one bed for an open-ended interval.
///
/// `assigned_at` is immutable; `unassigned_at` is written exactly once when
/// the assignment closes. Rows are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedAssignment {
    pub id: AssignmentId,
    pub admission_id: AdmissionId,
    pub bed_id: BedId,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
}

impl BedAssignment {
    pub fn open(admission_id: AdmissionId, bed_id: BedId, assigned_at: DateTime<Utc>) -> Self {
        Self {
            id: AssignmentId::new(),
            admission_id,
            bed_id,
            assigned_at,
            unassigned_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.unassigned_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DischargeEvent {
    pub id: EventId,
    pub admission_id: AdmissionId,
    pub discharged_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub recorded_by: StaffId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeceasedEvent {
    pub id: EventId,
    pub admission_id: AdmissionId,
    pub registered_at: DateTime<Utc>,
    pub cause: String,
    pub notes: Option<String>,
    pub notified_next_of_kin: bool,
    pub recorded_by: StaffId,
}

/// Closed set of terminal events an admission can accumulate. Explicit
/// variants replace the original system's name-based record dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdmissionEvent {
    Discharge(DischargeEvent),
    Deceased(DeceasedEvent),
}

impl AdmissionEvent {
    pub fn admission_id(&self) -> AdmissionId {
        match self {
            Self::Discharge(event) => event.admission_id,
            Self::Deceased(event) => event.admission_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Discharge(event) => event.discharged_at,
            Self::Deceased(event) => event.registered_at,
        }
    }
}

/// Derived occupancy phase of an admission; never stored, always computed
/// from the ledger and event history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPhase {
    Unassigned,
    Occupied,
    Discharged,
    Deceased,
}

impl AdmissionPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unassigned => "Unassigned",
            Self::Occupied => "Occupied",
            Self::Discharged => "Discharged",
            Self::Deceased => "Deceased",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Discharged | Self::Deceased)
    }
}
