use diesel::prelude::*;
use std::str::FromStr;

use super::schema::{blocks, sectors, stations, train_sectors};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{
    Block, BlockFields, BlockId, MemberSlot, MemberSlots, Sector, SectorId, SectorKind, Station,
    StationFields, StationId, TrainSector, TrainSectorId,
};

fn parse_kind(raw: &str) -> RepositoryResult<SectorKind> {
    SectorKind::from_str(raw).map_err(RepositoryError::internal)
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sectors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SectorRow {
    pub sector_id: i64,
    pub kind: String,
    pub name: String,
}

impl SectorRow {
    pub fn into_sector(self) -> RepositoryResult<Sector> {
        Ok(Sector {
            id: SectorId(self.sector_id),
            kind: parse_kind(&self.kind)?,
            name: self.name,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sectors)]
pub struct NewSectorRow<'a> {
    pub kind: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = train_sectors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TrainSectorRow {
    pub train_sector_id: i64,
    pub kind: String,
    pub sector_id: i64,
    pub name: String,
}

impl TrainSectorRow {
    pub fn into_train_sector(self) -> RepositoryResult<TrainSector> {
        Ok(TrainSector {
            id: TrainSectorId(self.train_sector_id),
            kind: parse_kind(&self.kind)?,
            sector_id: SectorId(self.sector_id),
            name: self.name,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = train_sectors)]
pub struct NewTrainSectorRow<'a> {
    pub kind: &'a str,
    pub sector_id: i64,
    pub name: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = stations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StationRow {
    pub station_id: i64,
    pub esr_code: String,
    pub name: String,
    pub dnc_train_sector_id: Option<i64>,
    pub dnc_position: Option<i32>,
    pub dnc_belongs: Option<bool>,
    pub ecd_train_sector_id: Option<i64>,
    pub ecd_position: Option<i32>,
    pub ecd_belongs: Option<bool>,
}

impl From<StationRow> for Station {
    fn from(row: StationRow) -> Self {
        Station {
            id: StationId(row.station_id),
            esr_code: row.esr_code,
            name: row.name,
            slots: MemberSlots {
                dnc: MemberSlot::from_columns(
                    row.dnc_train_sector_id,
                    row.dnc_position,
                    row.dnc_belongs,
                ),
                ecd: MemberSlot::from_columns(
                    row.ecd_train_sector_id,
                    row.ecd_position,
                    row.ecd_belongs,
                ),
            },
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = stations)]
pub struct StationFieldsRow<'a> {
    pub esr_code: &'a str,
    pub name: &'a str,
}

impl<'a> From<&'a StationFields> for StationFieldsRow<'a> {
    fn from(fields: &'a StationFields) -> Self {
        Self {
            esr_code: &fields.esr_code,
            name: &fields.name,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = blocks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlockRow {
    pub block_id: i64,
    pub name: String,
    pub station1_id: i64,
    pub station2_id: i64,
    pub dnc_train_sector_id: Option<i64>,
    pub dnc_position: Option<i32>,
    pub dnc_belongs: Option<bool>,
    pub ecd_train_sector_id: Option<i64>,
    pub ecd_position: Option<i32>,
    pub ecd_belongs: Option<bool>,
}

impl From<BlockRow> for Block {
    fn from(row: BlockRow) -> Self {
        Block {
            id: BlockId(row.block_id),
            name: row.name,
            station1_id: StationId(row.station1_id),
            station2_id: StationId(row.station2_id),
            slots: MemberSlots {
                dnc: MemberSlot::from_columns(
                    row.dnc_train_sector_id,
                    row.dnc_position,
                    row.dnc_belongs,
                ),
                ecd: MemberSlot::from_columns(
                    row.ecd_train_sector_id,
                    row.ecd_position,
                    row.ecd_belongs,
                ),
            },
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = blocks)]
pub struct BlockFieldsRow<'a> {
    pub name: &'a str,
    pub station1_id: i64,
    pub station2_id: i64,
}

impl<'a> From<&'a BlockFields> for BlockFieldsRow<'a> {
    fn from(fields: &'a BlockFields) -> Self {
        Self {
            name: &fields.name,
            station1_id: fields.station1_id.0,
            station2_id: fields.station2_id.0,
        }
    }
}
