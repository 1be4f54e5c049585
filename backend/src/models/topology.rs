//! Reference-data entities: stations, blocks, sectors and train sectors.
//!
//! Stations and blocks carry at most one train-sector membership per sector
//! kind. The membership lives on the member row itself as a [`MemberSlot`].

use serde::{Deserialize, Serialize};

use crate::{define_id_type, define_labelled_enum};

define_id_type!(i64, StationId);
define_id_type!(i64, BlockId);
define_id_type!(i64, SectorId);
define_id_type!(i64, TrainSectorId);
define_id_type!(i64, MemberId);

impl From<StationId> for MemberId {
    fn from(id: StationId) -> Self {
        MemberId(id.0)
    }
}

impl From<BlockId> for MemberId {
    fn from(id: BlockId) -> Self {
        MemberId(id.0)
    }
}

/// Maximum length of an ESR station code.
pub const MAX_ESR_CODE_LEN: usize = 6;

/// Maximum length of a station, block, sector or train sector name.
pub const MAX_NAME_LEN: usize = 32;

/// Sector kind: dispatch control (DNC) or electrification control (ECD).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SectorKind {
    Dnc,
    Ecd,
}

define_labelled_enum!(SectorKind {
    Dnc => "dnc",
    Ecd => "ecd",
});

impl SectorKind {
    /// The kind on the other side of a nearest-neighbor pair.
    pub fn opposite(self) -> SectorKind {
        match self {
            SectorKind::Dnc => SectorKind::Ecd,
            SectorKind::Ecd => SectorKind::Dnc,
        }
    }
}

/// Kind of row that can be a member of a train sector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum MemberKind {
    Station,
    Block,
}

define_labelled_enum!(MemberKind {
    Station => "station" | "stations",
    Block => "block" | "blocks",
});

impl MemberKind {
    pub const ALL: [MemberKind; 2] = [MemberKind::Station, MemberKind::Block];
}

/// Membership of a station or block in one train sector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSlot {
    pub train_sector_id: TrainSectorId,
    pub position: i32,
    pub belongs: bool,
}

impl MemberSlot {
    /// Rebuild a slot from its three nullable storage columns.
    ///
    /// A slot only exists when the train sector reference is set; missing
    /// position or flag default to `0` / `false`.
    pub fn from_columns(
        train_sector_id: Option<i64>,
        position: Option<i32>,
        belongs: Option<bool>,
    ) -> Option<Self> {
        train_sector_id.map(|id| MemberSlot {
            train_sector_id: TrainSectorId(id),
            position: position.unwrap_or(0),
            belongs: belongs.unwrap_or(false),
        })
    }
}

/// One row of a train sector's ordered member list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEntry {
    pub member_id: MemberId,
    pub position: i32,
    pub belongs: bool,
}

/// Per-kind membership slots shared by stations and blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSlots {
    pub dnc: Option<MemberSlot>,
    pub ecd: Option<MemberSlot>,
}

impl MemberSlots {
    pub fn get(&self, kind: SectorKind) -> Option<&MemberSlot> {
        match kind {
            SectorKind::Dnc => self.dnc.as_ref(),
            SectorKind::Ecd => self.ecd.as_ref(),
        }
    }

    pub fn set(&mut self, kind: SectorKind, slot: Option<MemberSlot>) {
        match kind {
            SectorKind::Dnc => self.dnc = slot,
            SectorKind::Ecd => self.ecd = slot,
        }
    }

    /// Whether the slot for `kind` points at `train_sector_id`.
    pub fn is_in(&self, kind: SectorKind, train_sector_id: TrainSectorId) -> bool {
        self.get(kind)
            .is_some_and(|slot| slot.train_sector_id == train_sector_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub esr_code: String,
    pub name: String,
    #[serde(default)]
    pub slots: MemberSlots,
}

/// Editable station fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationFields {
    pub esr_code: String,
    pub name: String,
}

/// Track segment between two stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub station1_id: StationId,
    pub station2_id: StationId,
    #[serde(default)]
    pub slots: MemberSlots,
}

impl Block {
    /// Endpoint stations in normalized (lower, higher) order.
    pub fn endpoints(&self) -> (StationId, StationId) {
        normalized_endpoints(self.station1_id, self.station2_id)
    }
}

/// Editable block fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFields {
    pub name: String,
    pub station1_id: StationId,
    pub station2_id: StationId,
}

impl BlockFields {
    pub fn endpoints(&self) -> (StationId, StationId) {
        normalized_endpoints(self.station1_id, self.station2_id)
    }
}

fn normalized_endpoints(a: StationId, b: StationId) -> (StationId, StationId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub kind: SectorKind,
    pub name: String,
}

/// Named ordered sub-route owned by exactly one sector of the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainSector {
    pub id: TrainSectorId,
    pub kind: SectorKind,
    pub sector_id: SectorId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sector_kind_parse_and_display() {
        assert_eq!(SectorKind::from_str("DNC").unwrap(), SectorKind::Dnc);
        assert_eq!(SectorKind::from_str("ecd").unwrap(), SectorKind::Ecd);
        assert!(SectorKind::from_str("abc").is_err());
        assert_eq!(SectorKind::Dnc.to_string(), "dnc");
        assert_eq!(SectorKind::Dnc.opposite(), SectorKind::Ecd);
    }

    #[test]
    fn test_member_kind_accepts_plural() {
        assert_eq!(MemberKind::from_str("stations").unwrap(), MemberKind::Station);
        assert_eq!(MemberKind::from_str("Block").unwrap(), MemberKind::Block);
    }

    #[test]
    fn test_deserialize_matches_from_str() {
        let kind: SectorKind = serde_json::from_str("\"DNC\"").unwrap();
        assert_eq!(kind, SectorKind::Dnc);
        let member: MemberKind = serde_json::from_str("\"Stations\"").unwrap();
        assert_eq!(member, MemberKind::Station);
        assert!(serde_json::from_str::<SectorKind>("\"abc\"").is_err());
        // Serialized form stays lowercase
        assert_eq!(serde_json::to_string(&SectorKind::Ecd).unwrap(), "\"ecd\"");
    }

    #[test]
    fn test_slot_from_columns_requires_train_sector() {
        assert_eq!(MemberSlot::from_columns(None, Some(3), Some(true)), None);
        let slot = MemberSlot::from_columns(Some(7), Some(2), None).unwrap();
        assert_eq!(slot.train_sector_id, TrainSectorId(7));
        assert_eq!(slot.position, 2);
        assert!(!slot.belongs);
    }

    #[test]
    fn test_block_endpoints_are_normalized() {
        let block = Block {
            id: BlockId(1),
            name: "B".into(),
            station1_id: StationId(9),
            station2_id: StationId(4),
            slots: MemberSlots::default(),
        };
        assert_eq!(block.endpoints(), (StationId(4), StationId(9)));
    }

    #[test]
    fn test_member_slots_is_in() {
        let mut slots = MemberSlots::default();
        slots.set(
            SectorKind::Ecd,
            Some(MemberSlot {
                train_sector_id: TrainSectorId(5),
                position: 1,
                belongs: true,
            }),
        );
        assert!(slots.is_in(SectorKind::Ecd, TrainSectorId(5)));
        assert!(!slots.is_in(SectorKind::Dnc, TrainSectorId(5)));
    }
}
