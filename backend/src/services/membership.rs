//! Ordered membership of stations and blocks in train sectors.
//!
//! Each member row carries at most one slot per sector kind. A train sector's
//! member list is the set of rows whose slot points at it, ordered by
//! position. Reconciliation keeps the positions of retained members and
//! appends additions after the current maximum.

use log::debug;
use serde::Serialize;
use std::collections::HashSet;

use super::error::{TopologyError, TopologyResult};
use super::EngineOptions;
use crate::db::repository::{transaction, StoreTx, TopologyRepository};
use crate::models::{
    MemberId, MemberKind, MemberSlot, MembershipEntry, SectorKind, TrainSectorId,
};

/// Delta between the current member list and a requested target set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    /// New members with their assigned positions, in request order.
    pub additions: Vec<(MemberId, i32)>,
    /// Current members absent from the target.
    pub removals: Vec<MemberId>,
    /// Current members kept with their positions untouched.
    pub retained: Vec<MemberId>,
}

impl ReconciliationPlan {
    pub fn is_noop(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// Compute the reconciliation of `current` against `target`.
///
/// Additions take positions `max + 1, max + 2, ...` where `max` is the
/// highest current position, or 0 for an empty list.
pub fn plan_reconciliation(
    current: &[MembershipEntry],
    target: &[MemberId],
) -> TopologyResult<ReconciliationPlan> {
    let existing: HashSet<MemberId> = current.iter().map(|e| e.member_id).collect();
    let wanted: HashSet<MemberId> = target.iter().copied().collect();
    let mut next = current.iter().map(|e| e.position).max().unwrap_or(0);

    let mut plan = ReconciliationPlan::default();
    let mut queued = HashSet::new();
    for id in target {
        if existing.contains(id) || !queued.insert(*id) {
            continue;
        }
        next = next
            .checked_add(1)
            .ok_or_else(|| TopologyError::validation("position", "position space exhausted"))?;
        plan.additions.push((*id, next));
    }

    for entry in current {
        if wanted.contains(&entry.member_id) {
            plan.retained.push(entry.member_id);
        } else {
            plan.removals.push(entry.member_id);
        }
    }
    Ok(plan)
}

fn require_train_sector(
    tx: &mut dyn StoreTx,
    kind: SectorKind,
    id: TrainSectorId,
) -> TopologyResult<()> {
    match tx.train_sector(kind, id)? {
        Some(_) => Ok(()),
        None => Err(TopologyError::not_found(
            format!("{} train sector", kind),
            id,
        )),
    }
}

fn apply_plan(
    tx: &mut dyn StoreTx,
    member: MemberKind,
    kind: SectorKind,
    train_sector: TrainSectorId,
    plan: &ReconciliationPlan,
) -> TopologyResult<()> {
    let added: Vec<MemberId> = plan.additions.iter().map(|(id, _)| *id).collect();
    let found: HashSet<MemberId> = tx.existing_members(member, &added)?.into_iter().collect();
    if let Some(missing) = added.iter().find(|id| !found.contains(id)) {
        return Err(TopologyError::not_found(member.as_str(), missing));
    }

    for (id, position) in &plan.additions {
        let slot = MemberSlot {
            train_sector_id: train_sector,
            position: *position,
            belongs: true,
        };
        if !tx.set_slot(member, kind, *id, Some(slot))? {
            return Err(TopologyError::not_found(member.as_str(), id));
        }
    }

    for id in &plan.removals {
        tx.set_slot(member, kind, *id, None)?;
    }
    Ok(())
}

/// Make the member list of `train_sector` equal to `target`.
///
/// Retained members keep their position and flag. Additions get fresh
/// positions after the current maximum with `belongs = true`; a member that
/// sat in another train sector of the same kind is moved. Removed members
/// have their slot cleared.
///
/// # Returns
/// The final member list in position order.
///
/// # Errors
/// - [`TopologyError::NotFound`] for an unknown train sector or target member
pub async fn reconcile_membership<R: TopologyRepository + ?Sized>(
    repo: &R,
    member: MemberKind,
    kind: SectorKind,
    train_sector: TrainSectorId,
    target: &[MemberId],
) -> TopologyResult<Vec<MembershipEntry>> {
    let target = target.to_vec();
    let (plan, members) =
        transaction(repo, "reconcile_membership", move |tx| -> TopologyResult<_> {
            require_train_sector(tx, kind, train_sector)?;
            let current = tx.memberships(member, kind, train_sector)?;
            let plan = plan_reconciliation(&current, &target)?;
            if plan.is_noop() {
                return Ok((plan, current));
            }

            apply_plan(tx, member, kind, train_sector, &plan)?;
            let members = tx.memberships(member, kind, train_sector)?;
            Ok((plan, members))
        })
        .await?;

    debug!(
        "Reconciled {} {} membership of train sector {}: +{} -{} ={}",
        kind,
        member,
        train_sector,
        plan.additions.len(),
        plan.removals.len(),
        plan.retained.len()
    );
    Ok(members)
}

/// Overwrite the position and flag of an existing member.
///
/// # Errors
/// - [`TopologyError::Validation`] for a negative position
/// - [`TopologyError::NotFound`] if `member_id` is not in the train sector
/// - [`TopologyError::Conflict`] if `options.strict_positions` is set and
///   another member already holds `position`
#[allow(clippy::too_many_arguments)]
pub async fn set_member_position<R: TopologyRepository + ?Sized>(
    repo: &R,
    options: EngineOptions,
    member: MemberKind,
    kind: SectorKind,
    train_sector: TrainSectorId,
    member_id: MemberId,
    position: i32,
    belongs: bool,
) -> TopologyResult<MembershipEntry> {
    if position < 0 {
        return Err(TopologyError::validation(
            "position",
            format!("must be non-negative, got {}", position),
        ));
    }

    let entry = transaction(repo, "set_member_position", move |tx| {
        let current = tx.memberships(member, kind, train_sector)?;
        if !current.iter().any(|e| e.member_id == member_id) {
            return Err(TopologyError::not_found(member.as_str(), member_id));
        }

        if options.strict_positions {
            if let Some(holder) = current
                .iter()
                .find(|e| e.position == position && e.member_id != member_id)
            {
                return Err(TopologyError::conflict(format!(
                    "position {} in train sector {} is held by {} {}",
                    position, train_sector, member, holder.member_id
                )));
            }
        }

        let slot = MemberSlot {
            train_sector_id: train_sector,
            position,
            belongs,
        };
        tx.set_slot(member, kind, member_id, Some(slot))?;
        Ok(MembershipEntry {
            member_id,
            position,
            belongs,
        })
    })
    .await?;

    debug!(
        "Set {} {} in train sector {} to position {} (belongs={})",
        member, member_id, train_sector, position, belongs
    );
    Ok(entry)
}

/// Remove one member from a train sector. Idempotent.
pub async fn remove_member<R: TopologyRepository + ?Sized>(
    repo: &R,
    member: MemberKind,
    kind: SectorKind,
    train_sector: TrainSectorId,
    member_id: MemberId,
) -> TopologyResult<bool> {
    let removed = transaction(repo, "remove_member", move |tx| {
        let current = tx.memberships(member, kind, train_sector)?;
        if !current.iter().any(|e| e.member_id == member_id) {
            return Ok(false);
        }
        tx.set_slot(member, kind, member_id, None)?;
        Ok::<_, TopologyError>(true)
    })
    .await?;

    debug!(
        "Removed {} {} from train sector {}: {}",
        member, member_id, train_sector, removed
    );
    Ok(removed)
}

/// Members of a train sector in position order.
pub async fn list_membership<R: TopologyRepository + ?Sized>(
    repo: &R,
    member: MemberKind,
    kind: SectorKind,
    train_sector: TrainSectorId,
) -> TopologyResult<Vec<MembershipEntry>> {
    transaction(repo, "list_membership", move |tx| -> TopologyResult<_> {
        require_train_sector(tx, kind, train_sector)?;
        Ok(tx.memberships(member, kind, train_sector)?)
    })
    .await
}

#[cfg(test)]
#[path = "membership_tests.rs"]
mod tests;
