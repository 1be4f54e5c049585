//! In-memory local repository implementation.
//!
//! This module provides a local implementation of the repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory using ordered maps and sets, providing fast, deterministic, and
//! isolated execution.
//!
//! Transactions run against a private copy of the data while holding the
//! writer lock, so concurrent transactions are fully serialized. The copy
//! replaces the shared state on commit and is dropped on rollback.

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::*;

/// In-memory local repository.
///
/// # Example
/// ```
/// use rail_topology::db::repositories::LocalRepository;
/// use rail_topology::db::repository::TopologyRepository;
///
/// let repo = LocalRepository::new();
/// assert_eq!(repo.backend_name(), "local");
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    control: Arc<Mutex<Control>>,
}

#[derive(Clone)]
struct LocalData {
    stations: BTreeMap<StationId, Station>,
    blocks: BTreeMap<BlockId, Block>,
    sectors: BTreeMap<SectorId, Sector>,
    train_sectors: BTreeMap<TrainSectorId, TrainSector>,
    adjacent: BTreeSet<(SectorKind, SectorPair)>,
    nearest: BTreeSet<NearestPair>,

    // ID counters
    next_station_id: i64,
    next_block_id: i64,
    next_sector_id: i64,
    next_train_sector_id: i64,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            stations: BTreeMap::new(),
            blocks: BTreeMap::new(),
            sectors: BTreeMap::new(),
            train_sectors: BTreeMap::new(),
            adjacent: BTreeSet::new(),
            nearest: BTreeSet::new(),
            next_station_id: 1,
            next_block_id: 1,
            next_sector_id: 1,
            next_train_sector_id: 1,
        }
    }
}

struct Control {
    is_healthy: bool,
    // Tables whose writes fail until cleared
    faults: HashSet<Table>,
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
            control: Arc::new(Mutex::new(Control {
                is_healthy: true,
                faults: HashSet::new(),
            })),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.control.lock().is_healthy = healthy;
    }

    /// Make every subsequent write to `table` fail with a query error.
    ///
    /// Used to exercise rollback paths.
    pub fn inject_fault(&self, table: Table) {
        self.control.lock().faults.insert(table);
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        self.control.lock().faults.clear();
    }

    /// Number of adjacency rows of `kind`.
    pub fn adjacent_pair_count(&self, kind: SectorKind) -> usize {
        self.data
            .read()
            .adjacent
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Number of nearest-neighbor rows.
    pub fn nearest_pair_count(&self) -> usize {
        self.data.read().nearest.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        if !self.control.lock().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }

    fn run_local(&self, operation: &'static str, work: TxWork) -> RepositoryResult<TxOutput> {
        self.check_health()?;
        let faults = self.control.lock().faults.clone();

        let mut shared = self.data.write();
        let mut tx = LocalTx {
            data: shared.clone(),
            faults,
        };

        match (*work)(&mut tx) {
            Ok(output) => {
                *shared = tx.data;
                debug!("Committed local transaction {}", operation);
                Ok(output)
            }
            Err(e) => {
                warn!("Rolled back local transaction {}: {}", operation, e);
                Err(e)
            }
        }
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TopologyRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.control.lock().is_healthy)
    }

    async fn run_transaction(
        &self,
        operation: &'static str,
        work: TxWork,
    ) -> RepositoryResult<TxOutput> {
        self.run_local(operation, work)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// Working copy of the data for one transaction.
struct LocalTx {
    data: LocalData,
    faults: HashSet<Table>,
}

impl LocalTx {
    /// Fail the write if a fault was injected for `table`.
    fn write_to(&self, table: Table, op: &str) -> RepositoryResult<()> {
        if self.faults.contains(&table) {
            return Err(RepositoryError::query_with_context(
                "Injected write failure",
                ErrorContext::new(op).with_entity(table.as_str()),
            ));
        }
        Ok(())
    }

    fn conflict(op: &str, entity: &str, details: String) -> RepositoryError {
        RepositoryError::conflict_with_context(
            format!("Duplicate {}", entity),
            ErrorContext::new(op).with_entity(entity).with_details(details),
        )
    }

    fn esr_taken(&self, esr_code: &str, except: Option<StationId>) -> bool {
        self.data
            .stations
            .values()
            .any(|s| s.esr_code == esr_code && Some(s.id) != except)
    }

    fn block_clash(&self, fields: &BlockFields, except: Option<BlockId>) -> Option<String> {
        self.data
            .blocks
            .values()
            .filter(|b| Some(b.id) != except)
            .find_map(|b| {
                if b.name == fields.name {
                    Some(format!("name={}", fields.name))
                } else if b.endpoints() == fields.endpoints() {
                    let (a, z) = fields.endpoints();
                    Some(format!("stations=({}, {})", a, z))
                } else {
                    None
                }
            })
    }

    fn sector_name_taken(&self, kind: SectorKind, name: &str, except: Option<SectorId>) -> bool {
        self.data
            .sectors
            .values()
            .any(|s| s.kind == kind && s.name == name && Some(s.id) != except)
    }

    fn train_sector_name_taken(
        &self,
        kind: SectorKind,
        name: &str,
        except: Option<TrainSectorId>,
    ) -> bool {
        self.data
            .train_sectors
            .values()
            .any(|t| t.kind == kind && t.name == name && Some(t.id) != except)
    }

    fn slots_mut(&mut self, member: MemberKind, id: MemberId) -> Option<&mut MemberSlots> {
        match member {
            MemberKind::Station => self
                .data
                .stations
                .get_mut(&StationId(id.0))
                .map(|s| &mut s.slots),
            MemberKind::Block => self
                .data
                .blocks
                .get_mut(&BlockId(id.0))
                .map(|b| &mut b.slots),
        }
    }

    fn member_slots(&self, member: MemberKind) -> Vec<(MemberId, &MemberSlots)> {
        match member {
            MemberKind::Station => self
                .data
                .stations
                .values()
                .map(|s| (MemberId::from(s.id), &s.slots))
                .collect(),
            MemberKind::Block => self
                .data
                .blocks
                .values()
                .map(|b| (MemberId::from(b.id), &b.slots))
                .collect(),
        }
    }

    fn train_sector_exists(&self, kind: SectorKind, id: TrainSectorId) -> bool {
        self.data
            .train_sectors
            .get(&id)
            .is_some_and(|t| t.kind == kind)
    }
}

impl CatalogRows for LocalTx {
    fn station(&mut self, id: StationId) -> RepositoryResult<Option<Station>> {
        Ok(self.data.stations.get(&id).cloned())
    }

    fn stations(&mut self) -> RepositoryResult<Vec<Station>> {
        Ok(self.data.stations.values().cloned().collect())
    }

    fn insert_station(&mut self, fields: &StationFields) -> RepositoryResult<Station> {
        self.write_to(Table::Stations, "insert_station")?;
        if self.esr_taken(&fields.esr_code, None) {
            return Err(Self::conflict(
                "insert_station",
                "station",
                format!("esr_code={}", fields.esr_code),
            ));
        }

        let id = StationId(self.data.next_station_id);
        self.data.next_station_id += 1;
        let station = Station {
            id,
            esr_code: fields.esr_code.clone(),
            name: fields.name.clone(),
            slots: MemberSlots::default(),
        };
        self.data.stations.insert(id, station.clone());
        Ok(station)
    }

    fn update_station(&mut self, id: StationId, fields: &StationFields) -> RepositoryResult<bool> {
        self.write_to(Table::Stations, "update_station")?;
        if self.esr_taken(&fields.esr_code, Some(id)) {
            return Err(Self::conflict(
                "update_station",
                "station",
                format!("esr_code={}", fields.esr_code),
            ));
        }

        Ok(match self.data.stations.get_mut(&id) {
            Some(station) => {
                station.esr_code = fields.esr_code.clone();
                station.name = fields.name.clone();
                true
            }
            None => false,
        })
    }

    fn delete_station(&mut self, id: StationId) -> RepositoryResult<bool> {
        self.write_to(Table::Stations, "delete_station")?;
        // Blocks reference their endpoint stations
        if self
            .data
            .blocks
            .values()
            .any(|b| b.station1_id == id || b.station2_id == id)
        {
            return Err(RepositoryError::conflict_with_context(
                "Station is referenced by a block",
                ErrorContext::new("delete_station")
                    .with_entity("station")
                    .with_entity_id(id),
            ));
        }
        Ok(self.data.stations.remove(&id).is_some())
    }

    fn block(&mut self, id: BlockId) -> RepositoryResult<Option<Block>> {
        Ok(self.data.blocks.get(&id).cloned())
    }

    fn blocks(&mut self) -> RepositoryResult<Vec<Block>> {
        Ok(self.data.blocks.values().cloned().collect())
    }

    fn blocks_touching_station(&mut self, station: StationId) -> RepositoryResult<Vec<BlockId>> {
        Ok(self
            .data
            .blocks
            .values()
            .filter(|b| b.station1_id == station || b.station2_id == station)
            .map(|b| b.id)
            .collect())
    }

    fn insert_block(&mut self, fields: &BlockFields) -> RepositoryResult<Block> {
        self.write_to(Table::Blocks, "insert_block")?;
        if let Some(details) = self.block_clash(fields, None) {
            return Err(Self::conflict("insert_block", "block", details));
        }

        let id = BlockId(self.data.next_block_id);
        self.data.next_block_id += 1;
        let block = Block {
            id,
            name: fields.name.clone(),
            station1_id: fields.station1_id,
            station2_id: fields.station2_id,
            slots: MemberSlots::default(),
        };
        self.data.blocks.insert(id, block.clone());
        Ok(block)
    }

    fn update_block(&mut self, id: BlockId, fields: &BlockFields) -> RepositoryResult<bool> {
        self.write_to(Table::Blocks, "update_block")?;
        if let Some(details) = self.block_clash(fields, Some(id)) {
            return Err(Self::conflict("update_block", "block", details));
        }

        Ok(match self.data.blocks.get_mut(&id) {
            Some(block) => {
                block.name = fields.name.clone();
                block.station1_id = fields.station1_id;
                block.station2_id = fields.station2_id;
                true
            }
            None => false,
        })
    }

    fn delete_block(&mut self, id: BlockId) -> RepositoryResult<bool> {
        self.write_to(Table::Blocks, "delete_block")?;
        Ok(self.data.blocks.remove(&id).is_some())
    }

    fn sector(&mut self, kind: SectorKind, id: SectorId) -> RepositoryResult<Option<Sector>> {
        Ok(self
            .data
            .sectors
            .get(&id)
            .filter(|s| s.kind == kind)
            .cloned())
    }

    fn sectors(&mut self, kind: SectorKind) -> RepositoryResult<Vec<Sector>> {
        Ok(self
            .data
            .sectors
            .values()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect())
    }

    fn existing_sectors(
        &mut self,
        kind: SectorKind,
        ids: &[SectorId],
    ) -> RepositoryResult<Vec<SectorId>> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| self.data.sectors.get(id).is_some_and(|s| s.kind == kind))
            .collect())
    }

    fn insert_sector(&mut self, kind: SectorKind, name: &str) -> RepositoryResult<Sector> {
        self.write_to(Table::Sectors, "insert_sector")?;
        if self.sector_name_taken(kind, name, None) {
            return Err(Self::conflict(
                "insert_sector",
                "sector",
                format!("kind={}, name={}", kind, name),
            ));
        }

        let id = SectorId(self.data.next_sector_id);
        self.data.next_sector_id += 1;
        let sector = Sector {
            id,
            kind,
            name: name.to_string(),
        };
        self.data.sectors.insert(id, sector.clone());
        Ok(sector)
    }

    fn rename_sector(
        &mut self,
        kind: SectorKind,
        id: SectorId,
        name: &str,
    ) -> RepositoryResult<bool> {
        self.write_to(Table::Sectors, "rename_sector")?;
        if self.sector_name_taken(kind, name, Some(id)) {
            return Err(Self::conflict(
                "rename_sector",
                "sector",
                format!("kind={}, name={}", kind, name),
            ));
        }

        Ok(match self.data.sectors.get_mut(&id) {
            Some(sector) if sector.kind == kind => {
                sector.name = name.to_string();
                true
            }
            _ => false,
        })
    }

    fn delete_sector(&mut self, kind: SectorKind, id: SectorId) -> RepositoryResult<bool> {
        self.write_to(Table::Sectors, "delete_sector")?;
        if !self.data.sectors.get(&id).is_some_and(|s| s.kind == kind) {
            return Ok(false);
        }
        // Train sectors and pairs reference the sector row
        let referenced = self.data.train_sectors.values().any(|t| t.sector_id == id)
            || self.data.adjacent.iter().any(|(_, p)| p.contains(id))
            || self.data.nearest.iter().any(|p| p.side(kind) == id);
        if referenced {
            return Err(RepositoryError::conflict_with_context(
                "Sector is still referenced",
                ErrorContext::new("delete_sector")
                    .with_entity("sector")
                    .with_entity_id(id),
            ));
        }
        Ok(self.data.sectors.remove(&id).is_some())
    }

    fn train_sector(
        &mut self,
        kind: SectorKind,
        id: TrainSectorId,
    ) -> RepositoryResult<Option<TrainSector>> {
        Ok(self
            .data
            .train_sectors
            .get(&id)
            .filter(|t| t.kind == kind)
            .cloned())
    }

    fn train_sectors(
        &mut self,
        kind: SectorKind,
        owner: Option<SectorId>,
    ) -> RepositoryResult<Vec<TrainSector>> {
        Ok(self
            .data
            .train_sectors
            .values()
            .filter(|t| t.kind == kind && owner.map_or(true, |o| t.sector_id == o))
            .cloned()
            .collect())
    }

    fn insert_train_sector(
        &mut self,
        kind: SectorKind,
        sector_id: SectorId,
        name: &str,
    ) -> RepositoryResult<TrainSector> {
        self.write_to(Table::TrainSectors, "insert_train_sector")?;
        if self.train_sector_name_taken(kind, name, None) {
            return Err(Self::conflict(
                "insert_train_sector",
                "train_sector",
                format!("kind={}, name={}", kind, name),
            ));
        }
        if !self
            .data
            .sectors
            .get(&sector_id)
            .is_some_and(|s| s.kind == kind)
        {
            return Err(RepositoryError::conflict_with_context(
                "Owning sector does not exist",
                ErrorContext::new("insert_train_sector")
                    .with_entity("sector")
                    .with_entity_id(sector_id),
            ));
        }

        let id = TrainSectorId(self.data.next_train_sector_id);
        self.data.next_train_sector_id += 1;
        let train_sector = TrainSector {
            id,
            kind,
            sector_id,
            name: name.to_string(),
        };
        self.data.train_sectors.insert(id, train_sector.clone());
        Ok(train_sector)
    }

    fn update_train_sector(
        &mut self,
        kind: SectorKind,
        id: TrainSectorId,
        sector_id: SectorId,
        name: &str,
    ) -> RepositoryResult<bool> {
        self.write_to(Table::TrainSectors, "update_train_sector")?;
        if self.train_sector_name_taken(kind, name, Some(id)) {
            return Err(Self::conflict(
                "update_train_sector",
                "train_sector",
                format!("kind={}, name={}", kind, name),
            ));
        }

        Ok(match self.data.train_sectors.get_mut(&id) {
            Some(train_sector) if train_sector.kind == kind => {
                train_sector.sector_id = sector_id;
                train_sector.name = name.to_string();
                true
            }
            _ => false,
        })
    }

    fn delete_train_sectors(
        &mut self,
        kind: SectorKind,
        ids: &[TrainSectorId],
    ) -> RepositoryResult<usize> {
        self.write_to(Table::TrainSectors, "delete_train_sectors")?;
        let targets: Vec<TrainSectorId> = ids
            .iter()
            .copied()
            .filter(|id| self.train_sector_exists(kind, *id))
            .collect();

        // Member slots reference train sectors
        for member in MemberKind::ALL {
            let dangling = self
                .member_slots(member)
                .into_iter()
                .find(|(_, slots)| targets.iter().any(|t| slots.is_in(kind, *t)));
            if let Some((member_id, _)) = dangling {
                return Err(RepositoryError::conflict_with_context(
                    "Train sector is still referenced by a member",
                    ErrorContext::new("delete_train_sectors")
                        .with_entity(member.as_str())
                        .with_entity_id(member_id),
                ));
            }
        }

        Ok(targets
            .iter()
            .filter(|id| self.data.train_sectors.remove(*id).is_some())
            .count())
    }
}

impl PairRows for LocalTx {
    fn adjacent_pair_exists(
        &mut self,
        kind: SectorKind,
        pair: SectorPair,
    ) -> RepositoryResult<bool> {
        Ok(self.data.adjacent.contains(&(kind, pair)))
    }

    fn insert_adjacent_pair(&mut self, kind: SectorKind, pair: SectorPair) -> RepositoryResult<()> {
        self.write_to(Table::AdjacentPairs, "insert_adjacent_pair")?;
        if !self.data.adjacent.insert((kind, pair)) {
            return Err(Self::conflict(
                "insert_adjacent_pair",
                "adjacent_pair",
                format!("kind={}, pair=({}, {})", kind, pair.low(), pair.high()),
            ));
        }
        Ok(())
    }

    fn delete_adjacent_pair(
        &mut self,
        kind: SectorKind,
        pair: SectorPair,
    ) -> RepositoryResult<usize> {
        self.write_to(Table::AdjacentPairs, "delete_adjacent_pair")?;
        Ok(usize::from(self.data.adjacent.remove(&(kind, pair))))
    }

    fn adjacent_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<Vec<SectorPair>> {
        Ok(self
            .data
            .adjacent
            .iter()
            .filter(|(k, p)| *k == kind && p.contains(sector))
            .map(|(_, p)| *p)
            .collect())
    }

    fn delete_adjacent_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<usize> {
        self.write_to(Table::AdjacentPairs, "delete_adjacent_pairs_of")?;
        let before = self.data.adjacent.len();
        self.data
            .adjacent
            .retain(|(k, p)| !(*k == kind && p.contains(sector)));
        Ok(before - self.data.adjacent.len())
    }

    fn nearest_pair_exists(&mut self, pair: NearestPair) -> RepositoryResult<bool> {
        Ok(self.data.nearest.contains(&pair))
    }

    fn insert_nearest_pair(&mut self, pair: NearestPair) -> RepositoryResult<()> {
        self.write_to(Table::NearestPairs, "insert_nearest_pair")?;
        if !self.data.nearest.insert(pair) {
            return Err(Self::conflict(
                "insert_nearest_pair",
                "nearest_pair",
                format!("dnc={}, ecd={}", pair.dnc, pair.ecd),
            ));
        }
        Ok(())
    }

    fn delete_nearest_pair(&mut self, pair: NearestPair) -> RepositoryResult<usize> {
        self.write_to(Table::NearestPairs, "delete_nearest_pair")?;
        Ok(usize::from(self.data.nearest.remove(&pair)))
    }

    fn nearest_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<Vec<NearestPair>> {
        Ok(self
            .data
            .nearest
            .iter()
            .filter(|p| p.side(kind) == sector)
            .copied()
            .collect())
    }

    fn delete_nearest_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<usize> {
        self.write_to(Table::NearestPairs, "delete_nearest_pairs_of")?;
        let before = self.data.nearest.len();
        self.data.nearest.retain(|p| p.side(kind) != sector);
        Ok(before - self.data.nearest.len())
    }
}

impl MembershipRows for LocalTx {
    fn existing_members(
        &mut self,
        member: MemberKind,
        ids: &[MemberId],
    ) -> RepositoryResult<Vec<MemberId>> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| match member {
                MemberKind::Station => self.data.stations.contains_key(&StationId(id.0)),
                MemberKind::Block => self.data.blocks.contains_key(&BlockId(id.0)),
            })
            .collect())
    }

    fn memberships(
        &mut self,
        member: MemberKind,
        kind: SectorKind,
        train_sector: TrainSectorId,
    ) -> RepositoryResult<Vec<MembershipEntry>> {
        let mut entries: Vec<MembershipEntry> = self
            .member_slots(member)
            .into_iter()
            .filter_map(|(member_id, slots)| {
                slots
                    .get(kind)
                    .filter(|slot| slot.train_sector_id == train_sector)
                    .map(|slot| MembershipEntry {
                        member_id,
                        position: slot.position,
                        belongs: slot.belongs,
                    })
            })
            .collect();
        entries.sort_by_key(|e| (e.position, e.member_id));
        Ok(entries)
    }

    fn set_slot(
        &mut self,
        member: MemberKind,
        kind: SectorKind,
        id: MemberId,
        slot: Option<MemberSlot>,
    ) -> RepositoryResult<bool> {
        let table = match member {
            MemberKind::Station => Table::Stations,
            MemberKind::Block => Table::Blocks,
        };
        self.write_to(table, "set_slot")?;

        if let Some(slot) = slot {
            if !self.train_sector_exists(kind, slot.train_sector_id) {
                return Err(RepositoryError::conflict_with_context(
                    "Train sector does not exist",
                    ErrorContext::new("set_slot")
                        .with_entity("train_sector")
                        .with_entity_id(slot.train_sector_id),
                ));
            }
        }

        Ok(match self.slots_mut(member, id) {
            Some(slots) => {
                slots.set(kind, slot);
                true
            }
            None => false,
        })
    }

    fn clear_slots_in(
        &mut self,
        member: MemberKind,
        kind: SectorKind,
        train_sectors: &[TrainSectorId],
    ) -> RepositoryResult<usize> {
        let table = match member {
            MemberKind::Station => Table::Stations,
            MemberKind::Block => Table::Blocks,
        };
        self.write_to(table, "clear_slots_in")?;

        let targets: Vec<MemberId> = self
            .member_slots(member)
            .into_iter()
            .filter(|(_, slots)| train_sectors.iter().any(|t| slots.is_in(kind, *t)))
            .map(|(id, _)| id)
            .collect();

        for id in &targets {
            if let Some(slots) = self.slots_mut(member, *id) {
                slots.set(kind, None);
            }
        }
        Ok(targets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station_fields(esr: &str, name: &str) -> StationFields {
        StationFields {
            esr_code: esr.to_string(),
            name: name.to_string(),
        }
    }

    async fn seed_sector(repo: &LocalRepository, kind: SectorKind, name: &'static str) -> Sector {
        transaction(repo, "seed", move |tx| tx.insert_sector(kind, name))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_makes_changes_visible() {
        let repo = LocalRepository::new();
        let sector = seed_sector(&repo, SectorKind::Dnc, "North").await;

        let found = transaction(&repo, "read", move |tx| tx.sector(SectorKind::Dnc, sector.id))
            .await
            .unwrap();
        assert_eq!(found.unwrap().name, "North");
    }

    #[tokio::test]
    async fn test_error_rolls_back_all_writes() {
        let repo = LocalRepository::new();

        let result: RepositoryResult<()> = transaction(&repo, "failing", |tx| {
            tx.insert_sector(SectorKind::Dnc, "A")?;
            tx.insert_sector(SectorKind::Dnc, "A")?;
            Ok(())
        })
        .await;
        assert!(result.unwrap_err().is_conflict());

        let sectors = transaction(&repo, "read", |tx| tx.sectors(SectorKind::Dnc))
            .await
            .unwrap();
        assert!(sectors.is_empty());
    }

    #[tokio::test]
    async fn test_injected_fault_fails_writes_only() {
        let repo = LocalRepository::new();
        seed_sector(&repo, SectorKind::Ecd, "East").await;
        repo.inject_fault(Table::Sectors);

        let write: RepositoryResult<Sector> =
            transaction(&repo, "write", |tx| tx.insert_sector(SectorKind::Ecd, "West")).await;
        assert!(matches!(write, Err(RepositoryError::QueryError { .. })));

        let read = transaction(&repo, "read", |tx| tx.sectors(SectorKind::Ecd))
            .await
            .unwrap();
        assert_eq!(read.len(), 1);

        repo.clear_faults();
        assert!(transaction(&repo, "write", |tx| tx.insert_sector(SectorKind::Ecd, "West"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unhealthy_repository_rejects_transactions() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());

        let result = transaction(&repo, "read", |tx| tx.stations()).await;
        assert!(matches!(result, Err(RepositoryError::ConnectionError { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_esr_code_is_conflict() {
        let repo = LocalRepository::new();
        let result: RepositoryResult<()> = transaction(&repo, "stations", |tx| {
            tx.insert_station(&station_fields("010203", "Alpha"))?;
            tx.insert_station(&station_fields("010203", "Beta"))?;
            Ok(())
        })
        .await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_reversed_block_endpoints_are_conflict() {
        let repo = LocalRepository::new();
        let result: RepositoryResult<()> = transaction(&repo, "blocks", |tx| {
            let a = tx.insert_station(&station_fields("000001", "A"))?;
            let b = tx.insert_station(&station_fields("000002", "B"))?;
            tx.insert_block(&BlockFields {
                name: "A-B".into(),
                station1_id: a.id,
                station2_id: b.id,
            })?;
            tx.insert_block(&BlockFields {
                name: "B-A".into(),
                station1_id: b.id,
                station2_id: a.id,
            })?;
            Ok(())
        })
        .await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_memberships_are_ordered_by_position() {
        let repo = LocalRepository::new();
        let entries = transaction(&repo, "members", |tx| {
            let sector = tx.insert_sector(SectorKind::Dnc, "S")?;
            let ts = tx.insert_train_sector(SectorKind::Dnc, sector.id, "T")?;
            let a = tx.insert_station(&station_fields("000001", "A"))?;
            let b = tx.insert_station(&station_fields("000002", "B"))?;
            for (id, position) in [(a.id, 5), (b.id, 2)] {
                tx.set_slot(
                    MemberKind::Station,
                    SectorKind::Dnc,
                    id.into(),
                    Some(MemberSlot {
                        train_sector_id: ts.id,
                        position,
                        belongs: true,
                    }),
                )?;
            }
            tx.memberships(MemberKind::Station, SectorKind::Dnc, ts.id)
        })
        .await
        .unwrap();

        let positions: Vec<i32> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![2, 5]);
    }
}
