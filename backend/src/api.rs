//! Public API surface of the topology backend.
//!
//! Consolidates the entity types and engine outputs that callers serialize.
//! All types derive Serialize/Deserialize (or Serialize for reports).

pub use crate::models::{
    Block, BlockFields, BlockId, MemberId, MemberKind, MemberSlot, MemberSlots, MembershipEntry,
    NearestPair, Sector, SectorId, SectorKind, SectorPair, Station, StationFields, StationId,
    TrainSector, TrainSectorId, MAX_ESR_CODE_LEN, MAX_NAME_LEN,
};
pub use crate::services::cascade::{CascadeAction, CascadeRoot, CascadeStep, StepOutcome};
pub use crate::services::membership::ReconciliationPlan;
pub use crate::services::{
    CascadePlan, CascadeReport, EngineOptions, NoCandidateReason, TopologyError, TopologyResult,
};
