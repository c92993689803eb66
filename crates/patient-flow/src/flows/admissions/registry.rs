use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::domain::{Bed, BedId, BedState, BedType, BedTypeId, OutOfServiceReason, Severity};
use super::repository::{BedStore, RepositoryError};

/// Live availability counters for one bed type. Always computed from the
/// registry, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BedTypeCounters {
    pub available: usize,
    pub assigned: usize,
    pub out_of_service: usize,
}

/// Result of a capacity change: the updated type and how many units were
/// provisioned to reach it.
#[derive(Debug, Clone)]
pub struct CapacityChange {
    pub bed_type: BedType,
    pub provisioned: usize,
}

/// Outcome of a delete request. A bed holding an open assignment is never
/// purged; it is decommissioned in place instead.
#[derive(Debug, Clone, PartialEq)]
pub enum BedRemoval {
    Removed,
    Decommissioned(Bed),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("bed type {0} is not registered")]
    UnknownBedType(BedTypeId),
    #[error("bed {0} is not registered")]
    UnknownBed(BedId),
    #[error("a reason is required to take a bed out of service")]
    MissingReason,
    #[error("a reason only applies to out-of-service beds")]
    ReasonNotAllowed,
    #[error("white severity does not route to a bed type")]
    UnroutableMatchTag,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Operations over the pool of bed units and their categories: capacity
/// provisioning, live counters, severity routing, unit state transitions,
/// and decommissioning.
pub struct BedRegistry<B> {
    beds: Arc<B>,
}

impl<B> Clone for BedRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            beds: self.beds.clone(),
        }
    }
}

impl<B> BedRegistry<B>
where
    B: BedStore,
{
    pub fn new(beds: Arc<B>) -> Self {
        Self { beds }
    }

    /// Register a bed category and provision its units. `White` is the
    /// no-admission classification and cannot be used as a match tag.
    pub fn create_bed_type(
        &self,
        name: &str,
        severity_match: Option<Severity>,
        total: u32,
    ) -> Result<BedType, RegistryError> {
        if severity_match == Some(Severity::White) {
            return Err(RegistryError::UnroutableMatchTag);
        }

        let now = Utc::now();
        let bed_type = self.beds.insert_bed_type(BedType {
            id: BedTypeId::new(),
            name: name.to_string(),
            severity_match,
            total,
            created_at: now,
        })?;
        let created = self.beds.ensure_capacity(bed_type.id, total, now)?;
        info!(
            bed_type = %bed_type.name,
            provisioned = created.len(),
            "bed type registered"
        );
        Ok(bed_type)
    }

    /// Declare a new capacity. Raising it provisions the missing units;
    /// lowering it never removes existing units. Shrink is a per-unit
    /// decommissioning decision, not a bulk one.
    pub fn set_capacity(&self, id: BedTypeId, total: u32) -> Result<CapacityChange, RegistryError> {
        let created = match self.beds.ensure_capacity(id, total, Utc::now()) {
            Ok(created) => created,
            Err(RepositoryError::NotFound) => return Err(RegistryError::UnknownBedType(id)),
            Err(err) => return Err(err.into()),
        };
        let bed_type = self
            .beds
            .fetch_bed_type(id)?
            .ok_or(RegistryError::UnknownBedType(id))?;
        info!(bed_type = %bed_type.name, total, provisioned = created.len(), "capacity updated");
        Ok(CapacityChange {
            bed_type,
            provisioned: created.len(),
        })
    }

    pub fn bed_type(&self, id: BedTypeId) -> Result<BedType, RegistryError> {
        self.beds
            .fetch_bed_type(id)?
            .ok_or(RegistryError::UnknownBedType(id))
    }

    pub fn list_bed_types(&self) -> Result<Vec<BedType>, RegistryError> {
        Ok(self.beds.list_bed_types()?)
    }

    pub fn counters(&self, id: BedTypeId) -> Result<BedTypeCounters, RegistryError> {
        self.bed_type(id)?;
        Ok(BedTypeCounters {
            available: self.beds.count_by_state(id, BedState::Available)?,
            assigned: self.beds.count_by_state(id, BedState::Assigned)?,
            out_of_service: self.beds.count_by_state(id, BedState::OutOfService)?,
        })
    }

    pub fn is_available(&self, id: BedTypeId) -> Result<bool, RegistryError> {
        Ok(self.counters(id)?.available > 0)
    }

    /// Available units of a type, oldest first. The ordering is the claim
    /// ordering, so callers can predict which unit a claim will take.
    pub fn list_available(&self, id: BedTypeId) -> Result<Vec<Bed>, RegistryError> {
        self.bed_type(id)?;
        Ok(self
            .beds
            .list_beds(id)?
            .into_iter()
            .filter(Bed::is_available)
            .collect())
    }

    /// Bed type matching a triage severity. When several types share a tag
    /// the earliest-registered one wins, so routing is stable across runs.
    pub fn match_severity(&self, severity: Severity) -> Result<Option<BedType>, RegistryError> {
        if !severity.requires_admission() {
            return Ok(None);
        }
        Ok(self
            .beds
            .list_bed_types()?
            .into_iter()
            .find(|bed_type| bed_type.severity_match == Some(severity)))
    }

    /// Administrative state change for one unit. A reason must accompany
    /// `OutOfService` and nothing else.
    pub fn transition(
        &self,
        bed_id: BedId,
        state: BedState,
        reason: Option<OutOfServiceReason>,
    ) -> Result<Bed, RegistryError> {
        match (state, reason) {
            (BedState::OutOfService, None) => return Err(RegistryError::MissingReason),
            (BedState::Available | BedState::Assigned, Some(_)) => {
                return Err(RegistryError::ReasonNotAllowed)
            }
            _ => {}
        }

        match self.beds.set_state(bed_id, state, reason, Utc::now()) {
            Ok(bed) => Ok(bed),
            Err(RepositoryError::NotFound) => Err(RegistryError::UnknownBed(bed_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a unit. A bed that is currently assigned is not purged; it
    /// is decommissioned to `OutOfService/Unavailable` so its identity
    /// survives for the open assignment that references it.
    pub fn delete(&self, bed_id: BedId) -> Result<BedRemoval, RegistryError> {
        let bed = self
            .beds
            .fetch_bed(bed_id)?
            .ok_or(RegistryError::UnknownBed(bed_id))?;

        if bed.state == BedState::Assigned {
            let bed = self.beds.set_state(
                bed_id,
                BedState::OutOfService,
                Some(OutOfServiceReason::Unavailable),
                Utc::now(),
            )?;
            info!(bed = %bed_id, "assigned bed decommissioned instead of deleted");
            return Ok(BedRemoval::Decommissioned(bed));
        }

        match self.beds.remove_bed(bed_id) {
            Ok(()) => Ok(BedRemoval::Removed),
            Err(RepositoryError::NotFound) => Err(RegistryError::UnknownBed(bed_id)),
            Err(err) => Err(err.into()),
        }
    }
}
