//! Cascading deletion of sectors and train sectors.
//!
//! A deletion is described as a [`CascadePlan`]: an ordered list of
//! `(table, filter, action)` steps. One interpreter executes any validated
//! plan inside a single transaction, so a failing step leaves every table
//! exactly as it was.
//!
//! Deleting a sector runs:
//!
//! | # | table            | filter                          | action     |
//! |---|------------------|---------------------------------|------------|
//! | 1 | `stations`       | slot in an owned train sector   | clear slot |
//! | 2 | `blocks`         | slot in an owned train sector   | clear slot |
//! | 3 | `adjacent_pairs` | pair touches the sector         | delete     |
//! | 4 | `nearest_pairs`  | pair touches the sector         | delete     |
//! | 5 | `train_sectors`  | owned by the sector             | delete     |
//! | 6 | `sectors`        | the sector itself               | delete     |
//!
//! Deleting a train sector runs steps 1, 2 and 5 for that train sector only.

use log::{debug, warn};
use serde::Serialize;

use super::error::{TopologyError, TopologyResult};
use crate::db::repository::{transaction, RepositoryError, StoreTx, Table, TopologyRepository};
use crate::models::{MemberKind, SectorId, SectorKind, TrainSectorId};

/// Row that a cascade starts from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CascadeRoot {
    Sector(SectorId),
    TrainSector(TrainSectorId),
}

/// Which rows of a step's table are affected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeFilter {
    /// Member rows whose slot points at one of the doomed train sectors.
    MemberOfDoomed,
    /// Pair rows referencing the root sector.
    TouchingSector,
    /// The doomed train sector rows.
    Doomed,
    /// The root sector row.
    RootSector,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeAction {
    ClearSlot,
    Delete,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeStep {
    pub table: Table,
    pub filter: CascadeFilter,
    pub action: CascadeAction,
}

impl CascadeStep {
    pub const fn new(table: Table, filter: CascadeFilter, action: CascadeAction) -> Self {
        Self {
            table,
            filter,
            action,
        }
    }

    /// Whether the (table, filter, action) combination has an executor.
    fn is_executable(&self) -> bool {
        use CascadeAction::*;
        use CascadeFilter::*;
        matches!(
            (self.table, self.filter, self.action),
            (Table::Stations, MemberOfDoomed, ClearSlot)
                | (Table::Blocks, MemberOfDoomed, ClearSlot)
                | (Table::AdjacentPairs, TouchingSector, Delete)
                | (Table::NearestPairs, TouchingSector, Delete)
                | (Table::TrainSectors, Doomed, Delete)
                | (Table::Sectors, RootSector, Delete)
        )
    }
}

/// Reasons a plan is rejected before execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("step {index} ({table}) has no executor")]
    Unexecutable { index: usize, table: Table },

    #[error("step {index} ({table}) needs a sector root")]
    NeedsSectorRoot { index: usize, table: Table },

    #[error("{table} is never cleaned up")]
    Missing { table: Table },

    #[error("{table} must be handled before {before}")]
    OutOfOrder { table: Table, before: Table },
}

/// Ordered deletion steps for one root row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadePlan {
    pub kind: SectorKind,
    pub root: CascadeRoot,
    pub steps: Vec<CascadeStep>,
}

const CLEAR_STATIONS: CascadeStep = CascadeStep::new(
    Table::Stations,
    CascadeFilter::MemberOfDoomed,
    CascadeAction::ClearSlot,
);
const CLEAR_BLOCKS: CascadeStep = CascadeStep::new(
    Table::Blocks,
    CascadeFilter::MemberOfDoomed,
    CascadeAction::ClearSlot,
);
const DELETE_TRAIN_SECTORS: CascadeStep = CascadeStep::new(
    Table::TrainSectors,
    CascadeFilter::Doomed,
    CascadeAction::Delete,
);

impl CascadePlan {
    /// Plan for deleting a sector with everything that depends on it.
    pub fn for_sector(kind: SectorKind, sector: SectorId) -> Self {
        Self {
            kind,
            root: CascadeRoot::Sector(sector),
            steps: vec![
                CLEAR_STATIONS,
                CLEAR_BLOCKS,
                CascadeStep::new(
                    Table::AdjacentPairs,
                    CascadeFilter::TouchingSector,
                    CascadeAction::Delete,
                ),
                CascadeStep::new(
                    Table::NearestPairs,
                    CascadeFilter::TouchingSector,
                    CascadeAction::Delete,
                ),
                DELETE_TRAIN_SECTORS,
                CascadeStep::new(
                    Table::Sectors,
                    CascadeFilter::RootSector,
                    CascadeAction::Delete,
                ),
            ],
        }
    }

    /// Plan for deleting one train sector. Pairs and the owning sector are
    /// left alone.
    pub fn for_train_sector(kind: SectorKind, train_sector: TrainSectorId) -> Self {
        Self {
            kind,
            root: CascadeRoot::TrainSector(train_sector),
            steps: vec![CLEAR_STATIONS, CLEAR_BLOCKS, DELETE_TRAIN_SECTORS],
        }
    }

    fn position(&self, table: Table) -> Option<usize> {
        self.steps.iter().position(|s| s.table == table)
    }

    /// Check that every step is executable and that referencing rows are
    /// handled before the rows they reference.
    pub fn validate(&self) -> Result<(), PlanError> {
        let sector_root = matches!(self.root, CascadeRoot::Sector(_));

        for (index, step) in self.steps.iter().enumerate() {
            if !step.is_executable() {
                return Err(PlanError::Unexecutable {
                    index,
                    table: step.table,
                });
            }
            let needs_sector = matches!(
                step.filter,
                CascadeFilter::TouchingSector | CascadeFilter::RootSector
            );
            if needs_sector && !sector_root {
                return Err(PlanError::NeedsSectorRoot {
                    index,
                    table: step.table,
                });
            }
        }

        let mut required = vec![Table::Stations, Table::Blocks, Table::TrainSectors];
        if sector_root {
            required.extend([Table::AdjacentPairs, Table::NearestPairs, Table::Sectors]);
        }
        for table in required {
            if self.position(table).is_none() {
                return Err(PlanError::Missing { table });
            }
        }

        // Referencing table first, referenced table second
        let edges = [
            (Table::Stations, Table::TrainSectors),
            (Table::Blocks, Table::TrainSectors),
            (Table::TrainSectors, Table::Sectors),
            (Table::AdjacentPairs, Table::Sectors),
            (Table::NearestPairs, Table::Sectors),
        ];
        for (table, before) in edges {
            if let (Some(a), Some(b)) = (self.position(table), self.position(before)) {
                if a > b {
                    return Err(PlanError::OutOfOrder { table, before });
                }
            }
        }
        Ok(())
    }

    /// Execute the plan inside an open transaction.
    pub fn execute(&self, tx: &mut dyn StoreTx) -> TopologyResult<CascadeReport> {
        self.validate().map_err(|e| TopologyError::TransactionFailed {
            source: RepositoryError::internal(format!("Invalid cascade plan: {}", e)),
        })?;

        let kind = self.kind;
        let doomed: Vec<TrainSectorId> = match self.root {
            CascadeRoot::Sector(id) => {
                if tx.sector(kind, id)?.is_none() {
                    return Err(TopologyError::not_found(format!("{} sector", kind), id));
                }
                tx.train_sectors(kind, Some(id))?
                    .into_iter()
                    .map(|t| t.id)
                    .collect()
            }
            CascadeRoot::TrainSector(id) => {
                if tx.train_sector(kind, id)?.is_none() {
                    return Err(TopologyError::not_found(
                        format!("{} train sector", kind),
                        id,
                    ));
                }
                vec![id]
            }
        };

        let mut report = CascadeReport {
            kind,
            root: self.root,
            train_sectors: doomed.clone(),
            steps: Vec::with_capacity(self.steps.len()),
        };
        for step in &self.steps {
            let rows = self.execute_step(tx, step, &doomed)?;
            report.steps.push(StepOutcome {
                table: step.table,
                action: step.action,
                rows,
            });
        }
        Ok(report)
    }

    fn execute_step(
        &self,
        tx: &mut dyn StoreTx,
        step: &CascadeStep,
        doomed: &[TrainSectorId],
    ) -> TopologyResult<usize> {
        let kind = self.kind;
        let sector = match self.root {
            CascadeRoot::Sector(id) => Some(id),
            CascadeRoot::TrainSector(_) => None,
        };

        let rows = match (step.table, sector) {
            (Table::Stations, _) => tx.clear_slots_in(MemberKind::Station, kind, doomed)?,
            (Table::Blocks, _) => tx.clear_slots_in(MemberKind::Block, kind, doomed)?,
            (Table::TrainSectors, _) => tx.delete_train_sectors(kind, doomed)?,
            (Table::AdjacentPairs, Some(id)) => tx.delete_adjacent_pairs_of(kind, id)?,
            (Table::NearestPairs, Some(id)) => tx.delete_nearest_pairs_of(kind, id)?,
            (Table::Sectors, Some(id)) => usize::from(tx.delete_sector(kind, id)?),
            (table, None) => {
                return Err(TopologyError::TransactionFailed {
                    source: RepositoryError::internal(format!(
                        "{} step needs a sector root",
                        table
                    )),
                })
            }
        };
        Ok(rows)
    }
}

/// Rows touched by one executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub table: Table,
    pub action: CascadeAction,
    pub rows: usize,
}

/// Result of an executed cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub kind: SectorKind,
    pub root: CascadeRoot,
    /// Train sectors removed by the cascade.
    pub train_sectors: Vec<TrainSectorId>,
    pub steps: Vec<StepOutcome>,
}

impl CascadeReport {
    /// Rows affected in `table`, or 0 if the plan did not touch it.
    pub fn rows(&self, table: Table) -> usize {
        self.steps
            .iter()
            .filter(|s| s.table == table)
            .map(|s| s.rows)
            .sum()
    }
}

async fn run_plan<R: TopologyRepository + ?Sized>(
    repo: &R,
    operation: &'static str,
    plan: CascadePlan,
) -> TopologyResult<CascadeReport> {
    let root = plan.root;
    let result = transaction(repo, operation, move |tx| plan.execute(tx)).await;

    match &result {
        Ok(report) => debug!(
            "Cascade {:?} removed {} train sectors: {:?}",
            root,
            report.train_sectors.len(),
            report.steps
        ),
        Err(e) => warn!("Cascade {:?} rolled back: {}", root, e),
    }
    result
}

/// Delete a sector together with its train sectors, their member references
/// and every pair that mentions it.
///
/// # Errors
/// - [`TopologyError::NotFound`] if the sector does not exist
/// - [`TopologyError::TransactionFailed`] if any step fails; nothing is
///   deleted in that case
pub async fn delete_sector<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    sector: SectorId,
) -> TopologyResult<CascadeReport> {
    run_plan(repo, "delete_sector", CascadePlan::for_sector(kind, sector)).await
}

/// Delete one train sector after clearing its member references.
pub async fn delete_train_sector<R: TopologyRepository + ?Sized>(
    repo: &R,
    kind: SectorKind,
    train_sector: TrainSectorId,
) -> TopologyResult<CascadeReport> {
    run_plan(
        repo,
        "delete_train_sector",
        CascadePlan::for_train_sector(kind, train_sector),
    )
    .await
}

#[cfg(test)]
#[path = "cascade_tests.rs"]
mod tests;
