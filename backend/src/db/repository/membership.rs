//! Row primitives for train-sector membership slots on stations and blocks.

use super::error::RepositoryResult;
use crate::models::{MemberId, MemberKind, MemberSlot, MembershipEntry, SectorKind, TrainSectorId};

/// Membership slot access inside one transaction.
pub trait MembershipRows {
    /// The subset of `ids` that reference existing rows of `member` kind.
    fn existing_members(
        &mut self,
        member: MemberKind,
        ids: &[MemberId],
    ) -> RepositoryResult<Vec<MemberId>>;

    /// Current members of a train sector, ordered by position then id.
    fn memberships(
        &mut self,
        member: MemberKind,
        kind: SectorKind,
        train_sector: TrainSectorId,
    ) -> RepositoryResult<Vec<MembershipEntry>>;

    /// Overwrite (or clear with `None`) the `kind` slot of one member row.
    ///
    /// Returns `false` if the member row does not exist.
    fn set_slot(
        &mut self,
        member: MemberKind,
        kind: SectorKind,
        id: MemberId,
        slot: Option<MemberSlot>,
    ) -> RepositoryResult<bool>;

    /// Clear the `kind` slot on every member row pointing at one of
    /// `train_sectors`. Returns the number of rows touched.
    fn clear_slots_in(
        &mut self,
        member: MemberKind,
        kind: SectorKind,
        train_sectors: &[TrainSectorId],
    ) -> RepositoryResult<usize>;
}
