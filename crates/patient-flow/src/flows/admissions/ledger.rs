//! Read-only aggregate projections over the bed assignment ledger.
//!
//! These feed the external reporting surface and carry no invariants of
//! their own; everything here is a straightforward fold over a consistent
//! store snapshot.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::domain::{AdmissionEvent, Bed, BedState, BedType};
use super::repository::LedgerSnapshot;

/// Generic labelled count used by the reporting views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelledCount {
    pub label: String,
    pub value: usize,
}

/// Labelled 0..=1 ratio, e.g. share of a type's units that are free.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelledRatio {
    pub label: String,
    pub value: f64,
}

/// Admission intake counts for one calendar day, split by the first triage
/// severity recorded for each admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAdmissions {
    pub date: NaiveDate,
    pub counts: Vec<LabelledCount>,
}

/// Availability overview consumed by the excluded dashboard collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilitySummary {
    pub bed_availability: Vec<LabelledRatio>,
    pub global_availability: f64,
    pub total_discharges: usize,
}

const UNCLASSIFIED: &str = "Unclassified";

/// Current open assignment count per bed type name, sorted by name.
pub fn open_assignments_by_bed_type(
    snapshot: &LedgerSnapshot,
    bed_types: &[BedType],
    beds: &[Bed],
) -> Vec<LabelledCount> {
    let mut per_type: BTreeMap<&str, usize> = bed_types
        .iter()
        .map(|bed_type| (bed_type.name.as_str(), 0))
        .collect();

    for assignment in snapshot.assignments.iter().filter(|a| a.is_open()) {
        let type_name = beds
            .iter()
            .find(|bed| bed.id == assignment.bed_id)
            .and_then(|bed| bed_types.iter().find(|bt| bt.id == bed.bed_type_id))
            .map(|bed_type| bed_type.name.as_str());
        if let Some(name) = type_name {
            *per_type.entry(name).or_insert(0) += 1;
        }
    }

    per_type
        .into_iter()
        .map(|(label, value)| LabelledCount {
            label: label.to_string(),
            value,
        })
        .collect()
}

/// Mean stay duration over admissions that have at least one discharge
/// event: the gap between intake and the latest closing `unassigned_at`.
/// `None` when no discharged admission ever held a bed.
pub fn average_stay(snapshot: &LedgerSnapshot) -> Option<Duration> {
    let mut total = Duration::zero();
    let mut counted = 0i32;

    for admission in &snapshot.admissions {
        let discharged = snapshot
            .events
            .iter()
            .any(|event| matches!(event, AdmissionEvent::Discharge(d) if d.admission_id == admission.id));
        if !discharged {
            continue;
        }

        let last_release = snapshot
            .assignments
            .iter()
            .filter(|assignment| assignment.admission_id == admission.id)
            .filter_map(|assignment| assignment.unassigned_at)
            .max();
        if let Some(released_at) = last_release {
            total = total + (released_at - admission.admitted_at);
            counted += 1;
        }
    }

    (counted > 0).then(|| total / counted)
}

/// Daily admission counts bucketed by each admission's first recorded
/// severity, oldest day first.
pub fn admissions_per_day(snapshot: &LedgerSnapshot) -> Vec<DailyAdmissions> {
    let mut per_day: BTreeMap<NaiveDate, BTreeMap<&str, usize>> = BTreeMap::new();

    for admission in &snapshot.admissions {
        let label = snapshot
            .first_severity
            .get(&admission.id)
            .map(|severity| severity.label())
            .unwrap_or(UNCLASSIFIED);
        *per_day
            .entry(admission.admitted_at.date_naive())
            .or_default()
            .entry(label)
            .or_insert(0) += 1;
    }

    per_day
        .into_iter()
        .map(|(date, counts)| DailyAdmissions {
            date,
            counts: counts
                .into_iter()
                .map(|(label, value)| LabelledCount {
                    label: label.to_string(),
                    value,
                })
                .collect(),
        })
        .collect()
}

/// Free-unit ratios per type and globally, plus the running discharge
/// count. A type with no units yet reports 1.0, matching the dashboard it
/// was lifted from.
pub fn availability_summary(
    snapshot: &LedgerSnapshot,
    bed_types: &[BedType],
    beds: &[Bed],
) -> AvailabilitySummary {
    let bed_availability = bed_types
        .iter()
        .map(|bed_type| {
            let units = beds
                .iter()
                .filter(|bed| bed.bed_type_id == bed_type.id)
                .count();
            let free = beds
                .iter()
                .filter(|bed| bed.bed_type_id == bed_type.id && bed.state == BedState::Available)
                .count();
            LabelledRatio {
                label: bed_type.name.clone(),
                value: if units == 0 {
                    1.0
                } else {
                    free as f64 / units as f64
                },
            }
        })
        .collect();

    let total_units = beds.len();
    let total_free = beds
        .iter()
        .filter(|bed| bed.state == BedState::Available)
        .count();
    let global_availability = if total_units == 0 {
        1.0
    } else {
        total_free as f64 / total_units as f64
    };

    let total_discharges = snapshot
        .events
        .iter()
        .filter(|event| matches!(event, AdmissionEvent::Discharge(_)))
        .count();

    AvailabilitySummary {
        bed_availability,
        global_availability,
        total_discharges,
    }
}
