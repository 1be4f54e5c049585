//! Unordered sector pairs.
//!
//! Both relation kinds are stored in a single canonical orientation so that a
//! unique index on the stored columns rejects (A,B) and (B,A) alike.

use serde::{Deserialize, Serialize};

use super::topology::{SectorId, SectorKind};

/// Adjacency between two distinct sectors of the same kind, normalized to
/// `(low, high)` with `low < high`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectorPair {
    low: SectorId,
    high: SectorId,
}

impl SectorPair {
    /// Normalize `(a, b)`. Returns `None` for a self-pair.
    pub fn new(a: SectorId, b: SectorId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> SectorId {
        self.low
    }

    pub fn high(&self) -> SectorId {
        self.high
    }

    pub fn contains(&self, id: SectorId) -> bool {
        self.low == id || self.high == id
    }

    /// The member of the pair that is not `id`.
    pub fn other(&self, id: SectorId) -> Option<SectorId> {
        if self.low == id {
            Some(self.high)
        } else if self.high == id {
            Some(self.low)
        } else {
            None
        }
    }
}

/// Nearest-neighbor association between one DNC and one ECD sector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NearestPair {
    pub dnc: SectorId,
    pub ecd: SectorId,
}

impl NearestPair {
    pub fn new(dnc: SectorId, ecd: SectorId) -> Self {
        Self { dnc, ecd }
    }

    /// Build the pair from a primary sector of `primary_kind` and a
    /// counterpart of the opposite kind.
    pub fn oriented(primary_kind: SectorKind, primary: SectorId, counterpart: SectorId) -> Self {
        match primary_kind {
            SectorKind::Dnc => Self::new(primary, counterpart),
            SectorKind::Ecd => Self::new(counterpart, primary),
        }
    }

    pub fn side(&self, kind: SectorKind) -> SectorId {
        match kind {
            SectorKind::Dnc => self.dnc,
            SectorKind::Ecd => self.ecd,
        }
    }
}
