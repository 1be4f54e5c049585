//! Symmetric pair relations between sectors.
//!
//! Two relations share one contract:
//!
//! - **adjacency**: unordered pairs of distinct sectors of the same kind
//! - **nearest**: pairs of one DNC and one ECD sector
//!
//! A bulk add validates the primary sector, filters the candidate list and
//! inserts one row per surviving candidate. Rows are stored in a canonical
//! orientation, so (A,B) and (B,A) are the same row and a duplicate is caught
//! no matter which side the caller starts from.

use log::debug;

use super::error::{NoCandidateReason, TopologyError, TopologyResult};
use crate::db::repository::{transaction, RepositoryResult, StoreTx, TopologyRepository};
use crate::models::{NearestPair, SectorId, SectorKind, SectorPair};

/// Storage hooks for one relation.
trait PairRelation: Copy + Send + Sync + 'static {
    type Pair: Copy;

    /// Kind of the sectors on the candidate side.
    fn candidate_kind(&self) -> SectorKind;

    /// Canonical pair for `primary` and `candidate`, or `None` when the two
    /// may not be related at all.
    fn pair(&self, primary: SectorId, candidate: SectorId) -> Option<Self::Pair>;

    fn exists(&self, tx: &mut dyn StoreTx, pair: Self::Pair) -> RepositoryResult<bool>;

    fn insert(&self, tx: &mut dyn StoreTx, pair: Self::Pair) -> RepositoryResult<()>;
}

#[derive(Copy, Clone)]
struct Adjacency {
    kind: SectorKind,
}

impl PairRelation for Adjacency {
    type Pair = SectorPair;

    fn candidate_kind(&self) -> SectorKind {
        self.kind
    }

    fn pair(&self, primary: SectorId, candidate: SectorId) -> Option<SectorPair> {
        SectorPair::new(primary, candidate)
    }

    fn exists(&self, tx: &mut dyn StoreTx, pair: SectorPair) -> RepositoryResult<bool> {
        tx.adjacent_pair_exists(self.kind, pair)
    }

    fn insert(&self, tx: &mut dyn StoreTx, pair: SectorPair) -> RepositoryResult<()> {
        tx.insert_adjacent_pair(self.kind, pair)
    }
}

#[derive(Copy, Clone)]
struct Nearest {
    primary_kind: SectorKind,
}

impl PairRelation for Nearest {
    type Pair = NearestPair;

    fn candidate_kind(&self) -> SectorKind {
        self.primary_kind.opposite()
    }

    fn pair(&self, primary: SectorId, candidate: SectorId) -> Option<NearestPair> {
        Some(NearestPair::oriented(self.primary_kind, primary, candidate))
    }

    fn exists(&self, tx: &mut dyn StoreTx, pair: NearestPair) -> RepositoryResult<bool> {
        tx.nearest_pair_exists(pair)
    }

    fn insert(&self, tx: &mut dyn StoreTx, pair: NearestPair) -> RepositoryResult<()> {
        tx.insert_nearest_pair(pair)
    }
}

/// Candidate ids in request order with duplicates collapsed.
fn dedup_in_order(candidates: &[SectorId]) -> Vec<SectorId> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

fn require_sector(tx: &mut dyn StoreTx, kind: SectorKind, id: SectorId) -> TopologyResult<()> {
    match tx.sector(kind, id)? {
        Some(_) => Ok(()),
        None => Err(TopologyError::not_found(format!("{} sector", kind), id)),
    }
}

/// Bulk add of one relation. Runs inside the caller's transaction.
fn add_pairs<P: PairRelation>(
    tx: &mut dyn StoreTx,
    relation: P,
    primary_kind: SectorKind,
    primary: SectorId,
    candidates: &[SectorId],
) -> TopologyResult<Vec<SectorId>> {
    require_sector(tx, primary_kind, primary)?;

    let requested = dedup_in_order(candidates);
    let relatable: Vec<SectorId> = requested
        .iter()
        .copied()
        .filter(|c| relation.pair(primary, *c).is_some())
        .collect();
    let existing = tx.existing_sectors(relation.candidate_kind(), &relatable)?;

    if existing.is_empty() {
        return Err(TopologyError::NoValidCandidates {
            sector: primary,
            reason: NoCandidateReason::NoneExist,
            rejected: requested,
        });
    }

    let mut inserted = Vec::with_capacity(existing.len());
    for candidate in existing {
        let Some(pair) = relation.pair(primary, candidate) else {
            continue;
        };
        if !relation.exists(tx, pair)? {
            relation.insert(tx, pair)?;
            inserted.push(candidate);
        }
    }

    if inserted.is_empty() {
        return Err(TopologyError::NoValidCandidates {
            sector: primary,
            reason: NoCandidateReason::AllAlreadyRelated,
            rejected: requested,
        });
    }
    Ok(inserted)
}

/// Relate `sector` to every valid candidate of the same kind.
///
/// Self-pairs, duplicates, unknown sectors and already adjacent sectors are
/// dropped. Returns the ids actually inserted, in request order.
///
/// # Errors
/// - [`TopologyError::NotFound`] if `sector` does not exist
/// - [`TopologyError::NoValidCandidates`] if nothing was inserted
pub async fn add_adjacency<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    sector: SectorId,
    candidates: &[SectorId],
) -> TopologyResult<Vec<SectorId>> {
    let candidates = candidates.to_vec();
    let inserted = transaction(repo, "add_adjacency", move |tx| {
        add_pairs(tx, Adjacency { kind }, kind, sector, &candidates)
    })
    .await?;

    debug!(
        "Added {} {} adjacencies for sector {}: {:?}",
        inserted.len(),
        kind,
        sector,
        inserted
    );
    Ok(inserted)
}

/// Remove the adjacency between `a` and `b` in either orientation.
///
/// Idempotent: returns `false` when no row existed.
pub async fn remove_adjacency<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    a: SectorId,
    b: SectorId,
) -> TopologyResult<bool> {
    let Some(pair) = SectorPair::new(a, b) else {
        return Ok(false);
    };

    let removed = transaction(repo, "remove_adjacency", move |tx| {
        Ok::<_, TopologyError>(tx.delete_adjacent_pair(kind, pair)? > 0)
    })
    .await?;

    debug!("Removed {} adjacency {}-{}: {}", kind, a, b, removed);
    Ok(removed)
}

/// Sectors adjacent to `sector`, sorted by id.
pub async fn list_adjacent<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    sector: SectorId,
) -> TopologyResult<Vec<SectorId>> {
    transaction(repo, "list_adjacent", move |tx| -> TopologyResult<_> {
        require_sector(tx, kind, sector)?;
        let mut neighbors: Vec<SectorId> = tx
            .adjacent_pairs_of(kind, sector)?
            .iter()
            .filter_map(|pair| pair.other(sector))
            .collect();
        neighbors.sort();
        Ok(neighbors)
    })
    .await
}

/// Relate `sector` to every valid candidate of the opposite kind.
///
/// Same contract as [`add_adjacency`] for the cross-kind relation.
pub async fn add_nearest<R: TopologyRepository + ?Sized>(
    repo: &R,
    primary_kind: SectorKind,
    sector: SectorId,
    candidates: &[SectorId],
) -> TopologyResult<Vec<SectorId>> {
    let candidates = candidates.to_vec();
    let inserted = transaction(repo, "add_nearest", move |tx| {
        add_pairs(
            tx,
            Nearest { primary_kind },
            primary_kind,
            sector,
            &candidates,
        )
    })
    .await?;

    debug!(
        "Added {} nearest pairs for {} sector {}: {:?}",
        inserted.len(),
        primary_kind,
        sector,
        inserted
    );
    Ok(inserted)
}

/// Remove the nearest-neighbor pair `(dnc, ecd)`. Idempotent.
pub async fn remove_nearest<R: TopologyRepository + ?Sized>(
    repo: &R,
    dnc: SectorId,
    ecd: SectorId,
) -> TopologyResult<bool> {
    let pair = NearestPair::new(dnc, ecd);
    let removed = transaction(repo, "remove_nearest", move |tx| {
        Ok::<_, TopologyError>(tx.delete_nearest_pair(pair)? > 0)
    })
    .await?;

    debug!("Removed nearest pair dnc={} ecd={}: {}", dnc, ecd, removed);
    Ok(removed)
}

/// Opposite-kind sectors paired with `sector`, sorted by id.
pub async fn list_nearest<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    sector: SectorId,
) -> TopologyResult<Vec<SectorId>> {
    transaction(repo, "list_nearest", move |tx| -> TopologyResult<_> {
        require_sector(tx, kind, sector)?;
        let mut counterparts: Vec<SectorId> = tx
            .nearest_pairs_of(kind, sector)?
            .iter()
            .map(|pair| pair.side(kind.opposite()))
            .collect();
        counterparts.sort();
        Ok(counterparts)
    })
    .await
}

#[cfg(test)]
#[path = "pairs_tests.rs"]
mod tests;
