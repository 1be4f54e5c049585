//! Row primitives for the adjacency and nearest-neighbor pair tables.

use super::error::RepositoryResult;
use crate::models::{NearestPair, SectorId, SectorKind, SectorPair};

/// Pair table access inside one transaction.
///
/// Pairs are always passed in their normalized form, so a store only ever
/// needs to look at one orientation.
pub trait PairRows {
    fn adjacent_pair_exists(&mut self, kind: SectorKind, pair: SectorPair)
        -> RepositoryResult<bool>;

    /// Insert an adjacency row. An existing row is a conflict.
    fn insert_adjacent_pair(&mut self, kind: SectorKind, pair: SectorPair) -> RepositoryResult<()>;

    /// Delete an adjacency row. Returns the number of rows removed (0 or 1).
    fn delete_adjacent_pair(&mut self, kind: SectorKind, pair: SectorPair)
        -> RepositoryResult<usize>;

    /// All adjacency rows of `kind` touching `sector`.
    fn adjacent_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<Vec<SectorPair>>;

    /// Delete every adjacency row of `kind` touching `sector`.
    fn delete_adjacent_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<usize>;

    fn nearest_pair_exists(&mut self, pair: NearestPair) -> RepositoryResult<bool>;

    /// Insert a nearest-neighbor row. An existing row is a conflict.
    fn insert_nearest_pair(&mut self, pair: NearestPair) -> RepositoryResult<()>;

    fn delete_nearest_pair(&mut self, pair: NearestPair) -> RepositoryResult<usize>;

    /// All nearest-neighbor rows whose `kind` side is `sector`.
    fn nearest_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<Vec<NearestPair>>;

    fn delete_nearest_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<usize>;
}
