//! Data Transfer Objects for the HTTP API.
//!
//! Entity payloads are the model types themselves (see [`crate::api`]); the
//! types here only cover request bodies and small response envelopes.

use serde::{Deserialize, Serialize};

use crate::models::{MemberId, SectorId};

/// Request body for creating or renaming a sector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorRequest {
    pub name: String,
}

/// Request body for creating or updating a train sector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSectorRequest {
    /// Owning sector of the same kind
    pub sector_id: SectorId,
    pub name: String,
}

/// Query parameters for listing train sectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainSectorQuery {
    /// Only train sectors owned by this sector
    #[serde(default)]
    pub sector_id: Option<SectorId>,
}

/// Candidate list for a bulk adjacency or nearest-neighbor add.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairCandidatesRequest {
    pub candidates: Vec<SectorId>,
}

/// Ids actually related by a bulk add.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairAddResponse {
    pub inserted: Vec<SectorId>,
}

/// Related sectors of one sector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedSectorsResponse {
    pub sector_id: SectorId,
    pub related: Vec<SectorId>,
}

/// Outcome of an idempotent removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

/// Target member set for a reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub members: Vec<MemberId>,
}

/// New position of one member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberPositionRequest {
    pub position: i32,
    #[serde(default = "default_true")]
    pub belongs: bool,
}

fn default_true() -> bool {
    true
}

/// List response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Repository backend name
    pub backend: String,
    /// Database connection status
    pub database: String,
}
