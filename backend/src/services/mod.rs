//! Service layer: the sector-topology consistency engine.
//!
//! Each public operation is one unit of work bounded by one store
//! transaction. Existence checks and the writes they guard always run in the
//! same transaction.
//!
//! - [`pairs`]: symmetric adjacency and nearest-neighbor relations
//! - [`membership`]: ordered train-sector membership lists
//! - [`cascade`]: table-driven cascading deletion of sectors and train sectors
//! - [`catalog`]: CRUD for stations, blocks, sectors and train sectors

pub mod cascade;
pub mod catalog;
pub mod error;
pub mod membership;
pub mod pairs;

pub use cascade::{delete_sector, delete_train_sector, CascadePlan, CascadeReport};
pub use error::{NoCandidateReason, TopologyError, TopologyResult};
pub use membership::{
    list_membership, reconcile_membership, remove_member, set_member_position,
};
pub use pairs::{
    add_adjacency, add_nearest, list_adjacent, list_nearest, remove_adjacency, remove_nearest,
};

use serde::{Deserialize, Serialize};

/// Tunables of the consistency engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Reject a membership position already held by another member of the
    /// same train sector.
    pub strict_positions: bool,
}

impl EngineOptions {
    /// Read options from the environment.
    ///
    /// `TOPOLOGY_STRICT_POSITIONS` accepts `1`, `true`, `yes` or `on`
    /// (case-insensitive); anything else leaves the option off.
    pub fn from_env() -> Self {
        let strict_positions = std::env::var("TOPOLOGY_STRICT_POSITIONS")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        Self { strict_positions }
    }
}
