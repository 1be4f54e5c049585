//! Row primitives for the entity catalog tables.
//!
//! Stations, blocks, sectors and train sectors. Implementations enforce the
//! store-level uniqueness constraints and report violations as
//! [`RepositoryError::Conflict`](super::RepositoryError::Conflict).

use super::error::RepositoryResult;
use crate::models::{
    Block, BlockFields, BlockId, Sector, SectorId, SectorKind, Station, StationFields, StationId,
    TrainSector, TrainSectorId,
};

/// Catalog row access inside one transaction.
pub trait CatalogRows {
    // ==================== Stations ====================

    fn station(&mut self, id: StationId) -> RepositoryResult<Option<Station>>;

    /// All stations ordered by id.
    fn stations(&mut self) -> RepositoryResult<Vec<Station>>;

    /// Insert a station. Duplicate ESR codes are a conflict.
    fn insert_station(&mut self, fields: &StationFields) -> RepositoryResult<Station>;

    /// Overwrite the editable fields. Returns `false` if the row is missing.
    fn update_station(&mut self, id: StationId, fields: &StationFields) -> RepositoryResult<bool>;

    /// Delete a station row. Returns `false` if the row is missing.
    fn delete_station(&mut self, id: StationId) -> RepositoryResult<bool>;

    // ==================== Blocks ====================

    fn block(&mut self, id: BlockId) -> RepositoryResult<Option<Block>>;

    /// All blocks ordered by id.
    fn blocks(&mut self) -> RepositoryResult<Vec<Block>>;

    /// Blocks that have `station` as an endpoint.
    fn blocks_touching_station(&mut self, station: StationId) -> RepositoryResult<Vec<BlockId>>;

    /// Insert a block. Duplicate names or endpoint pairs are a conflict.
    fn insert_block(&mut self, fields: &BlockFields) -> RepositoryResult<Block>;

    fn update_block(&mut self, id: BlockId, fields: &BlockFields) -> RepositoryResult<bool>;

    fn delete_block(&mut self, id: BlockId) -> RepositoryResult<bool>;

    // ==================== Sectors ====================

    fn sector(&mut self, kind: SectorKind, id: SectorId) -> RepositoryResult<Option<Sector>>;

    /// Sectors of `kind` ordered by id.
    fn sectors(&mut self, kind: SectorKind) -> RepositoryResult<Vec<Sector>>;

    /// The subset of `ids` that reference existing sectors of `kind`.
    fn existing_sectors(
        &mut self,
        kind: SectorKind,
        ids: &[SectorId],
    ) -> RepositoryResult<Vec<SectorId>>;

    /// Insert a sector. Duplicate names within a kind are a conflict.
    fn insert_sector(&mut self, kind: SectorKind, name: &str) -> RepositoryResult<Sector>;

    fn rename_sector(&mut self, kind: SectorKind, id: SectorId, name: &str)
        -> RepositoryResult<bool>;

    fn delete_sector(&mut self, kind: SectorKind, id: SectorId) -> RepositoryResult<bool>;

    // ==================== Train Sectors ====================

    fn train_sector(
        &mut self,
        kind: SectorKind,
        id: TrainSectorId,
    ) -> RepositoryResult<Option<TrainSector>>;

    /// Train sectors of `kind`, optionally restricted to one owning sector.
    fn train_sectors(
        &mut self,
        kind: SectorKind,
        owner: Option<SectorId>,
    ) -> RepositoryResult<Vec<TrainSector>>;

    /// Insert a train sector. Duplicate names within a kind are a conflict.
    fn insert_train_sector(
        &mut self,
        kind: SectorKind,
        sector_id: SectorId,
        name: &str,
    ) -> RepositoryResult<TrainSector>;

    fn update_train_sector(
        &mut self,
        kind: SectorKind,
        id: TrainSectorId,
        sector_id: SectorId,
        name: &str,
    ) -> RepositoryResult<bool>;

    /// Delete the given train sectors. Returns the number of rows removed.
    fn delete_train_sectors(
        &mut self,
        kind: SectorKind,
        ids: &[TrainSectorId],
    ) -> RepositoryResult<usize>;
}
