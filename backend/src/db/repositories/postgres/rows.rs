//! Row traits for one open Postgres transaction.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::collections::HashSet;

use super::models::*;
use super::schema::{adjacent_sectors, blocks, nearest_sectors, sectors, stations, train_sectors};
use crate::db::repository::*;
use crate::models::*;

/// Bind the membership columns of one (member kind, sector kind) slot and
/// evaluate `$body` against them.
macro_rules! with_slot_columns {
    ($member:expr, $kind:expr, |$table:ident, $id:ident, $ts:ident, $pos:ident, $belongs:ident| $body:expr) => {
        match ($member, $kind) {
            (MemberKind::Station, SectorKind::Dnc) => {
                #[allow(unused_imports)]
                use super::schema::stations::dsl::{
                    dnc_belongs as $belongs, dnc_position as $pos, dnc_train_sector_id as $ts,
                    station_id as $id, stations as $table,
                };
                $body
            }
            (MemberKind::Station, SectorKind::Ecd) => {
                #[allow(unused_imports)]
                use super::schema::stations::dsl::{
                    ecd_belongs as $belongs, ecd_position as $pos, ecd_train_sector_id as $ts,
                    station_id as $id, stations as $table,
                };
                $body
            }
            (MemberKind::Block, SectorKind::Dnc) => {
                #[allow(unused_imports)]
                use super::schema::blocks::dsl::{
                    block_id as $id, blocks as $table, dnc_belongs as $belongs,
                    dnc_position as $pos, dnc_train_sector_id as $ts,
                };
                $body
            }
            (MemberKind::Block, SectorKind::Ecd) => {
                #[allow(unused_imports)]
                use super::schema::blocks::dsl::{
                    block_id as $id, blocks as $table, ecd_belongs as $belongs,
                    ecd_position as $pos, ecd_train_sector_id as $ts,
                };
                $body
            }
        }
    };
}

pub(super) struct PgTx<'c> {
    pub(super) conn: &'c mut PgConnection,
}

fn ids<T: Copy>(values: &[T], raw: impl Fn(T) -> i64) -> Vec<i64> {
    values.iter().copied().map(raw).collect()
}

impl PgTx<'_> {
    fn train_sector_of_kind(&mut self, kind: SectorKind, id: TrainSectorId) -> RepositoryResult<bool> {
        let found: i64 = train_sectors::table
            .filter(train_sectors::train_sector_id.eq(id.0))
            .filter(train_sectors::kind.eq(kind.as_str()))
            .count()
            .get_result(self.conn)?;
        Ok(found > 0)
    }
}

impl CatalogRows for PgTx<'_> {
    fn station(&mut self, id: StationId) -> RepositoryResult<Option<Station>> {
        Ok(stations::table
            .find(id.0)
            .select(StationRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Station::from))
    }

    fn stations(&mut self) -> RepositoryResult<Vec<Station>> {
        Ok(stations::table
            .order(stations::station_id.asc())
            .select(StationRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(Station::from)
            .collect())
    }

    fn insert_station(&mut self, fields: &StationFields) -> RepositoryResult<Station> {
        let row = diesel::insert_into(stations::table)
            .values(StationFieldsRow::from(fields))
            .returning(StationRow::as_returning())
            .get_result(self.conn)?;
        Ok(Station::from(row))
    }

    fn update_station(&mut self, id: StationId, fields: &StationFields) -> RepositoryResult<bool> {
        let updated = diesel::update(stations::table.find(id.0))
            .set(StationFieldsRow::from(fields))
            .execute(self.conn)?;
        Ok(updated > 0)
    }

    fn delete_station(&mut self, id: StationId) -> RepositoryResult<bool> {
        let deleted = diesel::delete(stations::table.find(id.0)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn block(&mut self, id: BlockId) -> RepositoryResult<Option<Block>> {
        Ok(blocks::table
            .find(id.0)
            .select(BlockRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Block::from))
    }

    fn blocks(&mut self) -> RepositoryResult<Vec<Block>> {
        Ok(blocks::table
            .order(blocks::block_id.asc())
            .select(BlockRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(Block::from)
            .collect())
    }

    fn blocks_touching_station(&mut self, station: StationId) -> RepositoryResult<Vec<BlockId>> {
        let rows: Vec<i64> = blocks::table
            .filter(
                blocks::station1_id
                    .eq(station.0)
                    .or(blocks::station2_id.eq(station.0)),
            )
            .order(blocks::block_id.asc())
            .select(blocks::block_id)
            .load(self.conn)?;
        Ok(rows.into_iter().map(BlockId).collect())
    }

    fn insert_block(&mut self, fields: &BlockFields) -> RepositoryResult<Block> {
        let row = diesel::insert_into(blocks::table)
            .values(BlockFieldsRow::from(fields))
            .returning(BlockRow::as_returning())
            .get_result(self.conn)?;
        Ok(Block::from(row))
    }

    fn update_block(&mut self, id: BlockId, fields: &BlockFields) -> RepositoryResult<bool> {
        let updated = diesel::update(blocks::table.find(id.0))
            .set(BlockFieldsRow::from(fields))
            .execute(self.conn)?;
        Ok(updated > 0)
    }

    fn delete_block(&mut self, id: BlockId) -> RepositoryResult<bool> {
        let deleted = diesel::delete(blocks::table.find(id.0)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn sector(&mut self, kind: SectorKind, id: SectorId) -> RepositoryResult<Option<Sector>> {
        sectors::table
            .find(id.0)
            .filter(sectors::kind.eq(kind.as_str()))
            .select(SectorRow::as_select())
            .first(self.conn)
            .optional()?
            .map(SectorRow::into_sector)
            .transpose()
    }

    fn sectors(&mut self, kind: SectorKind) -> RepositoryResult<Vec<Sector>> {
        sectors::table
            .filter(sectors::kind.eq(kind.as_str()))
            .order(sectors::sector_id.asc())
            .select(SectorRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(SectorRow::into_sector)
            .collect()
    }

    fn existing_sectors(
        &mut self,
        kind: SectorKind,
        ids_in: &[SectorId],
    ) -> RepositoryResult<Vec<SectorId>> {
        let found: HashSet<i64> = sectors::table
            .filter(sectors::kind.eq(kind.as_str()))
            .filter(sectors::sector_id.eq_any(ids(ids_in, |id| id.0)))
            .select(sectors::sector_id)
            .load::<i64>(self.conn)?
            .into_iter()
            .collect();
        Ok(ids_in
            .iter()
            .copied()
            .filter(|id| found.contains(&id.0))
            .collect())
    }

    fn insert_sector(&mut self, kind: SectorKind, name: &str) -> RepositoryResult<Sector> {
        diesel::insert_into(sectors::table)
            .values(NewSectorRow {
                kind: kind.as_str(),
                name,
            })
            .returning(SectorRow::as_returning())
            .get_result(self.conn)?
            .into_sector()
    }

    fn rename_sector(
        &mut self,
        kind: SectorKind,
        id: SectorId,
        name: &str,
    ) -> RepositoryResult<bool> {
        let updated = diesel::update(
            sectors::table
                .find(id.0)
                .filter(sectors::kind.eq(kind.as_str())),
        )
        .set(sectors::name.eq(name))
        .execute(self.conn)?;
        Ok(updated > 0)
    }

    fn delete_sector(&mut self, kind: SectorKind, id: SectorId) -> RepositoryResult<bool> {
        let deleted = diesel::delete(
            sectors::table
                .find(id.0)
                .filter(sectors::kind.eq(kind.as_str())),
        )
        .execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn train_sector(
        &mut self,
        kind: SectorKind,
        id: TrainSectorId,
    ) -> RepositoryResult<Option<TrainSector>> {
        train_sectors::table
            .find(id.0)
            .filter(train_sectors::kind.eq(kind.as_str()))
            .select(TrainSectorRow::as_select())
            .first(self.conn)
            .optional()?
            .map(TrainSectorRow::into_train_sector)
            .transpose()
    }

    fn train_sectors(
        &mut self,
        kind: SectorKind,
        owner: Option<SectorId>,
    ) -> RepositoryResult<Vec<TrainSector>> {
        let mut query = train_sectors::table
            .filter(train_sectors::kind.eq(kind.as_str()))
            .into_boxed();
        if let Some(owner) = owner {
            query = query.filter(train_sectors::sector_id.eq(owner.0));
        }

        query
            .order(train_sectors::train_sector_id.asc())
            .select(TrainSectorRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(TrainSectorRow::into_train_sector)
            .collect()
    }

    fn insert_train_sector(
        &mut self,
        kind: SectorKind,
        sector_id: SectorId,
        name: &str,
    ) -> RepositoryResult<TrainSector> {
        diesel::insert_into(train_sectors::table)
            .values(NewTrainSectorRow {
                kind: kind.as_str(),
                sector_id: sector_id.0,
                name,
            })
            .returning(TrainSectorRow::as_returning())
            .get_result(self.conn)?
            .into_train_sector()
    }

    fn update_train_sector(
        &mut self,
        kind: SectorKind,
        id: TrainSectorId,
        sector_id: SectorId,
        name: &str,
    ) -> RepositoryResult<bool> {
        let updated = diesel::update(
            train_sectors::table
                .find(id.0)
                .filter(train_sectors::kind.eq(kind.as_str())),
        )
        .set((
            train_sectors::sector_id.eq(sector_id.0),
            train_sectors::name.eq(name),
        ))
        .execute(self.conn)?;
        Ok(updated > 0)
    }

    fn delete_train_sectors(
        &mut self,
        kind: SectorKind,
        ids_in: &[TrainSectorId],
    ) -> RepositoryResult<usize> {
        Ok(diesel::delete(
            train_sectors::table
                .filter(train_sectors::kind.eq(kind.as_str()))
                .filter(train_sectors::train_sector_id.eq_any(ids(ids_in, |id| id.0))),
        )
        .execute(self.conn)?)
    }
}

impl PairRows for PgTx<'_> {
    fn adjacent_pair_exists(
        &mut self,
        kind: SectorKind,
        pair: SectorPair,
    ) -> RepositoryResult<bool> {
        let found: i64 = adjacent_sectors::table
            .find((kind.as_str(), pair.low().0, pair.high().0))
            .count()
            .get_result(self.conn)?;
        Ok(found > 0)
    }

    fn insert_adjacent_pair(&mut self, kind: SectorKind, pair: SectorPair) -> RepositoryResult<()> {
        diesel::insert_into(adjacent_sectors::table)
            .values((
                adjacent_sectors::kind.eq(kind.as_str()),
                adjacent_sectors::sector_low.eq(pair.low().0),
                adjacent_sectors::sector_high.eq(pair.high().0),
            ))
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_adjacent_pair(
        &mut self,
        kind: SectorKind,
        pair: SectorPair,
    ) -> RepositoryResult<usize> {
        Ok(diesel::delete(adjacent_sectors::table.find((
            kind.as_str(),
            pair.low().0,
            pair.high().0,
        )))
        .execute(self.conn)?)
    }

    fn adjacent_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<Vec<SectorPair>> {
        let rows: Vec<(i64, i64)> = adjacent_sectors::table
            .filter(adjacent_sectors::kind.eq(kind.as_str()))
            .filter(
                adjacent_sectors::sector_low
                    .eq(sector.0)
                    .or(adjacent_sectors::sector_high.eq(sector.0)),
            )
            .order((
                adjacent_sectors::sector_low.asc(),
                adjacent_sectors::sector_high.asc(),
            ))
            .select((adjacent_sectors::sector_low, adjacent_sectors::sector_high))
            .load(self.conn)?;
        Ok(rows
            .into_iter()
            .filter_map(|(low, high)| SectorPair::new(SectorId(low), SectorId(high)))
            .collect())
    }

    fn delete_adjacent_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<usize> {
        Ok(diesel::delete(
            adjacent_sectors::table
                .filter(adjacent_sectors::kind.eq(kind.as_str()))
                .filter(
                    adjacent_sectors::sector_low
                        .eq(sector.0)
                        .or(adjacent_sectors::sector_high.eq(sector.0)),
                ),
        )
        .execute(self.conn)?)
    }

    fn nearest_pair_exists(&mut self, pair: NearestPair) -> RepositoryResult<bool> {
        let found: i64 = nearest_sectors::table
            .find((pair.dnc.0, pair.ecd.0))
            .count()
            .get_result(self.conn)?;
        Ok(found > 0)
    }

    fn insert_nearest_pair(&mut self, pair: NearestPair) -> RepositoryResult<()> {
        diesel::insert_into(nearest_sectors::table)
            .values((
                nearest_sectors::dnc_sector_id.eq(pair.dnc.0),
                nearest_sectors::ecd_sector_id.eq(pair.ecd.0),
            ))
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_nearest_pair(&mut self, pair: NearestPair) -> RepositoryResult<usize> {
        Ok(
            diesel::delete(nearest_sectors::table.find((pair.dnc.0, pair.ecd.0)))
                .execute(self.conn)?,
        )
    }

    fn nearest_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<Vec<NearestPair>> {
        let query = nearest_sectors::table
            .order((
                nearest_sectors::dnc_sector_id.asc(),
                nearest_sectors::ecd_sector_id.asc(),
            ))
            .select((nearest_sectors::dnc_sector_id, nearest_sectors::ecd_sector_id))
            .into_boxed();
        let query = match kind {
            SectorKind::Dnc => query.filter(nearest_sectors::dnc_sector_id.eq(sector.0)),
            SectorKind::Ecd => query.filter(nearest_sectors::ecd_sector_id.eq(sector.0)),
        };

        let rows: Vec<(i64, i64)> = query.load(self.conn)?;
        Ok(rows
            .into_iter()
            .map(|(dnc, ecd)| NearestPair::new(SectorId(dnc), SectorId(ecd)))
            .collect())
    }

    fn delete_nearest_pairs_of(
        &mut self,
        kind: SectorKind,
        sector: SectorId,
    ) -> RepositoryResult<usize> {
        let deleted = match kind {
            SectorKind::Dnc => diesel::delete(
                nearest_sectors::table.filter(nearest_sectors::dnc_sector_id.eq(sector.0)),
            )
            .execute(self.conn)?,
            SectorKind::Ecd => diesel::delete(
                nearest_sectors::table.filter(nearest_sectors::ecd_sector_id.eq(sector.0)),
            )
            .execute(self.conn)?,
        };
        Ok(deleted)
    }
}

impl MembershipRows for PgTx<'_> {
    fn existing_members(
        &mut self,
        member: MemberKind,
        ids_in: &[MemberId],
    ) -> RepositoryResult<Vec<MemberId>> {
        let wanted = ids(ids_in, |id| id.0);
        let found: HashSet<i64> = match member {
            MemberKind::Station => stations::table
                .filter(stations::station_id.eq_any(wanted))
                .select(stations::station_id)
                .load::<i64>(self.conn)?,
            MemberKind::Block => blocks::table
                .filter(blocks::block_id.eq_any(wanted))
                .select(blocks::block_id)
                .load::<i64>(self.conn)?,
        }
        .into_iter()
        .collect();

        Ok(ids_in
            .iter()
            .copied()
            .filter(|id| found.contains(&id.0))
            .collect())
    }

    fn memberships(
        &mut self,
        member: MemberKind,
        kind: SectorKind,
        train_sector: TrainSectorId,
    ) -> RepositoryResult<Vec<MembershipEntry>> {
        let conn = &mut *self.conn;
        let rows: Vec<(i64, Option<i32>, Option<bool>)> = with_slot_columns!(
            member,
            kind,
            |table, id_col, ts_col, pos_col, belongs_col| {
                table
                    .filter(ts_col.eq(train_sector.0))
                    .order((pos_col.asc(), id_col.asc()))
                    .select((id_col, pos_col, belongs_col))
                    .load(conn)?
            }
        );

        Ok(rows
            .into_iter()
            .map(|(id, position, belongs)| MembershipEntry {
                member_id: MemberId(id),
                position: position.unwrap_or(0),
                belongs: belongs.unwrap_or(false),
            })
            .collect())
    }

    fn set_slot(
        &mut self,
        member: MemberKind,
        kind: SectorKind,
        id: MemberId,
        slot: Option<MemberSlot>,
    ) -> RepositoryResult<bool> {
        if let Some(slot) = slot {
            if !self.train_sector_of_kind(kind, slot.train_sector_id)? {
                return Err(RepositoryError::conflict_with_context(
                    "Train sector does not exist",
                    ErrorContext::new("set_slot")
                        .with_entity("train_sector")
                        .with_entity_id(slot.train_sector_id),
                ));
            }
        }

        let train_sector = slot.map(|s| s.train_sector_id.0);
        let position = slot.map(|s| s.position);
        let belongs = slot.map(|s| s.belongs);

        let conn = &mut *self.conn;
        let updated = with_slot_columns!(
            member,
            kind,
            |table, id_col, ts_col, pos_col, belongs_col| {
                diesel::update(table.filter(id_col.eq(id.0)))
                    .set((
                        ts_col.eq(train_sector),
                        pos_col.eq(position),
                        belongs_col.eq(belongs),
                    ))
                    .execute(conn)?
            }
        );
        Ok(updated > 0)
    }

    fn clear_slots_in(
        &mut self,
        member: MemberKind,
        kind: SectorKind,
        train_sectors_in: &[TrainSectorId],
    ) -> RepositoryResult<usize> {
        let targets = ids(train_sectors_in, |id| id.0);
        let conn = &mut *self.conn;
        let cleared = with_slot_columns!(
            member,
            kind,
            |table, id_col, ts_col, pos_col, belongs_col| {
                diesel::update(table.filter(ts_col.eq_any(targets)))
                    .set((
                        ts_col.eq(None::<i64>),
                        pos_col.eq(None::<i32>),
                        belongs_col.eq(None::<bool>),
                    ))
                    .execute(conn)?
            }
        );
        Ok(cleared)
    }
}
