//! Repository trait definitions for database operations.
//!
//! The store is split into two layers:
//!
//! - [`TopologyRepository`]: the object-safe, async entry point a backend
//!   implements. Its only unit of work is a transaction.
//! - [`StoreTx`]: synchronous row primitives available inside one
//!   transaction, composed from focused traits:
//!   - [`catalog`]: stations, blocks, sectors, train sectors
//!   - [`relations`]: adjacency and nearest-neighbor pairs
//!   - [`membership`]: train-sector membership slots
//!
//! Service code never talks to a backend outside of [`transaction`], so a
//! check followed by a write always happens inside one transaction.
//!
//! ```ignore
//! let inserted = transaction(repo, "add_adjacency", move |tx| {
//!     if tx.sector(kind, id)?.is_none() { /* ... */ }
//!     tx.insert_adjacent_pair(kind, pair)?;
//!     Ok::<_, RepositoryError>(vec![other])
//! })
//! .await?;
//! ```

pub mod catalog;
pub mod error;
pub mod membership;
pub mod relations;

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export row traits
pub use catalog::CatalogRows;
pub use membership::MembershipRows;
pub use relations::PairRows;

/// Composite trait for everything available inside a transaction.
///
/// Automatically implemented for any type that implements all row traits.
pub trait StoreTx: CatalogRows + PairRows + MembershipRows {}

impl<T> StoreTx for T where T: CatalogRows + PairRows + MembershipRows {}

/// Logical tables of the store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Stations,
    Blocks,
    Sectors,
    TrainSectors,
    AdjacentPairs,
    NearestPairs,
}

crate::define_labelled_enum!(Table {
    Stations => "stations",
    Blocks => "blocks",
    Sectors => "sectors",
    TrainSectors => "train_sectors",
    AdjacentPairs => "adjacent_pairs",
    NearestPairs => "nearest_pairs",
});

/// Type-erased transaction result.
pub type TxOutput = Box<dyn Any + Send>;

/// Type-erased transaction body.
///
/// The body is `Fn` rather than `FnOnce` so a backend may run it again from
/// scratch after a retryable failure.
pub type TxWork = Arc<dyn Fn(&mut dyn StoreTx) -> RepositoryResult<TxOutput> + Send + Sync>;

/// Store backend.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait TopologyRepository: Send + Sync {
    /// Check if the store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Run `work` inside one transaction.
    ///
    /// Commits when `work` returns `Ok`; otherwise every change made by
    /// `work` is rolled back and the error is returned unchanged.
    async fn run_transaction(
        &self,
        operation: &'static str,
        work: TxWork,
    ) -> RepositoryResult<TxOutput>;

    /// Short backend name for logs and health responses.
    fn backend_name(&self) -> &'static str;
}

/// Run a typed transaction body against any repository.
///
/// `E` is the caller's error type. Errors returned by `work` roll the
/// transaction back and come back out as the same `E`.
pub async fn transaction<R, T, E, F>(repo: &R, operation: &'static str, work: F) -> Result<T, E>
where
    R: TopologyRepository + ?Sized,
    T: Send + 'static,
    E: From<RepositoryError> + Into<RepositoryError> + std::error::Error + 'static,
    F: Fn(&mut dyn StoreTx) -> Result<T, E> + Send + Sync + 'static,
{
    let erased: TxWork = Arc::new(move |tx: &mut dyn StoreTx| {
        work(tx)
            .map(|value| Box::new(value) as TxOutput)
            .map_err(Into::into)
    });

    match repo.run_transaction(operation, erased).await {
        Ok(output) => output.downcast::<T>().map(|value| *value).map_err(|_| {
            E::from(RepositoryError::internal_with_context(
                "Transaction output has an unexpected type",
                ErrorContext::new(operation),
            ))
        }),
        Err(err) => Err(err.into_aborted::<E>().unwrap_or_else(E::from)),
    }
}
