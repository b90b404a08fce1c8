//! Collection operation coordinators
//!
//! One coordinator per logical operation and storage variant. A persister
//! builds the set once per collection role through
//! [`CollectionCoordinatorFactory`] and shares it across sessions, so every
//! coordinator is `Send + Sync` and memoizes its statements in once-cells.
//!
//! Executors are opened per call and released when the call returns, on the
//! error path too.

mod audit;
mod delete;
mod factory;
mod history;
mod insert;
mod remove;
mod subclass;
mod update;

pub use audit::{DeleteRowsCoordinatorAudit, InsertRowsCoordinatorAudit, UpdateRowsCoordinatorAudit};
pub use delete::DeleteRowsCoordinatorStandard;
pub use factory::{CollectionCoordinatorFactory, CollectionCoordinators};
pub use history::{
    DeleteRowsCoordinatorHistory, InsertRowsCoordinatorHistory, RemoveCoordinatorHistory,
    UpdateRowsCoordinatorHistory,
};
pub use insert::InsertRowsCoordinatorStandard;
pub use remove::RemoveCoordinatorStandard;
pub use subclass::{
    DeleteRowsCoordinatorTablePerSubclass, InsertRowsCoordinatorTablePerSubclass,
    RemoveCoordinatorTablePerSubclass, UpdateRowsCoordinatorTablePerSubclass,
};
pub use update::{UpdateRowsCoordinatorOneToMany, UpdateRowsCoordinatorStandard, UpdateRowsCoordinatorTemporal};

use std::sync::Arc;

use crate::Result;
use crate::collection::{CollectionEntry, PersistentCollection};
use crate::jdbc::SessionContext;
use crate::target::CollectionMutationTarget;
use crate::value::JdbcValue;

/// Decides which entries an insert writes; `None` means "entries needing insert"
pub type EntryChecker<'a> = Option<&'a dyn Fn(&CollectionEntry, usize) -> bool>;

// =============================================================================
// Coordinator traits
// =============================================================================

/// Common surface of every coordinator
pub trait CollectionOperationCoordinator: Send + Sync {
    fn target(&self) -> &CollectionMutationTarget;
}

/// Writes new rows
pub trait InsertRowsCoordinator: CollectionOperationCoordinator {
    fn insert_rows(
        &self,
        collection: &dyn PersistentCollection,
        key: &[JdbcValue],
        entry_checker: EntryChecker<'_>,
        session: &dyn SessionContext,
    ) -> Result<()>;
}

/// Rewrites rows whose element changed in place
pub trait UpdateRowsCoordinator: CollectionOperationCoordinator {
    fn update_rows(
        &self,
        key: &[JdbcValue],
        collection: &dyn PersistentCollection,
        session: &dyn SessionContext,
    ) -> Result<()>;
}

/// Removes rows no longer present
pub trait DeleteRowsCoordinator: CollectionOperationCoordinator {
    fn delete_rows(
        &self,
        collection: &dyn PersistentCollection,
        key: &[JdbcValue],
        session: &dyn SessionContext,
    ) -> Result<()>;
}

/// Removes every row of one owner
pub trait RemoveCoordinator: CollectionOperationCoordinator {
    fn delete_all_rows(&self, key: &[JdbcValue], session: &dyn SessionContext) -> Result<()>;
}

// =============================================================================
// No-op
// =============================================================================

/// Coordinator for collections that never write rows (inverse or immutable)
#[derive(Debug)]
pub struct NoOpCoordinator {
    target: Arc<CollectionMutationTarget>,
}

impl NoOpCoordinator {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        Self { target }
    }
}

impl CollectionOperationCoordinator for NoOpCoordinator {
    fn target(&self) -> &CollectionMutationTarget {
        &self.target
    }
}

impl InsertRowsCoordinator for NoOpCoordinator {
    fn insert_rows(
        &self,
        _collection: &dyn PersistentCollection,
        _key: &[JdbcValue],
        _entry_checker: EntryChecker<'_>,
        _session: &dyn SessionContext,
    ) -> Result<()> {
        Ok(())
    }
}

impl UpdateRowsCoordinator for NoOpCoordinator {
    fn update_rows(
        &self,
        _key: &[JdbcValue],
        _collection: &dyn PersistentCollection,
        _session: &dyn SessionContext,
    ) -> Result<()> {
        Ok(())
    }
}

impl DeleteRowsCoordinator for NoOpCoordinator {
    fn delete_rows(
        &self,
        _collection: &dyn PersistentCollection,
        _key: &[JdbcValue],
        _session: &dyn SessionContext,
    ) -> Result<()> {
        Ok(())
    }
}

impl RemoveCoordinator for NoOpCoordinator {
    fn delete_all_rows(&self, _key: &[JdbcValue], _session: &dyn SessionContext) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Row selection
// =============================================================================

/// Entries paired with their positions, last first after an element removal
///
/// Indexed collections renumber trailing rows when an element is removed;
/// walking from the end writes each shifted row before the slot it moves
/// into is touched.
pub(crate) fn rows_in_update_order(collection: &dyn PersistentCollection) -> Vec<(usize, CollectionEntry)> {
    let mut rows: Vec<_> = collection.entries().into_iter().enumerate().collect();
    if collection.is_element_removed() {
        rows.reverse();
    }
    rows
}

/// Whether an insert pass writes `entry`
pub(crate) fn includes_insert(
    collection: &dyn PersistentCollection,
    entry_checker: EntryChecker<'_>,
    entry: &CollectionEntry,
    position: usize,
) -> bool {
    match entry_checker {
        Some(checker) => checker(entry, position),
        None => collection.needs_inserting(entry, position),
    }
}
