//! History-table decorators
//!
//! Each decorator runs its delegate first, then mirrors the same rows into
//! the collection's history table: new rows open a validity period, removed
//! or replaced rows close theirs.

use std::sync::{Arc, OnceLock};

use super::{
    CollectionOperationCoordinator, DeleteRowsCoordinator, EntryChecker, InsertRowsCoordinator,
    RemoveCoordinator, UpdateRowsCoordinator, includes_insert, rows_in_update_order,
};
use crate::Result;
use crate::collection::{CollectionEntry, PersistentCollection};
use crate::jdbc::{BatchKey, ExecutorScope, MutationOperationGroup, SessionContext};
use crate::operations::RowMutationOperations;
use crate::quarry_trace_mutation;
use crate::target::CollectionMutationTarget;
use crate::value::JdbcValue;

/// Statements against the history table of one role
#[derive(Debug)]
struct HistoryRows {
    operations: Option<RowMutationOperations>,
    insert_key: BatchKey,
    end_key: BatchKey,
    end_all_key: BatchKey,
    insert_group: OnceLock<MutationOperationGroup>,
    end_group: OnceLock<MutationOperationGroup>,
    end_all_group: OnceLock<MutationOperationGroup>,
}

impl HistoryRows {
    fn new(target: &CollectionMutationTarget) -> Self {
        Self {
            operations: target
                .history_target()
                .map(|history| RowMutationOperations::new(Arc::new(history))),
            insert_key: BatchKey::new(&target.role, "HISTORY_INSERT"),
            end_key: BatchKey::new(&target.role, "HISTORY_END"),
            end_all_key: BatchKey::new(&target.role, "HISTORY_END_ALL"),
            insert_group: OnceLock::new(),
            end_group: OnceLock::new(),
            end_all_group: OnceLock::new(),
        }
    }

    /// Open a validity period for each row
    fn insert(&self, key: &[JdbcValue], rows: &[(usize, CollectionEntry)], session: &dyn SessionContext) -> Result<()> {
        let Some(operations) = &self.operations else {
            return Ok(());
        };
        if rows.is_empty() {
            return Ok(());
        }
        let group = self.insert_group.get_or_init(|| {
            MutationOperationGroup::single(&operations.target().role, operations.insert_row().clone())
        });
        let mut executor = ExecutorScope::open(session, &self.insert_key, group)?;
        for (position, entry) in rows {
            operations.bind_insert_values(key, entry, *position, session, executor.bindings())?;
            executor.execute()?;
        }
        quarry_trace_mutation!("history-insert", role = %operations.target().role, rows = rows.len());
        Ok(())
    }

    /// Close the open validity period of each row
    fn end(&self, key: &[JdbcValue], rows: &[(usize, CollectionEntry)], session: &dyn SessionContext) -> Result<()> {
        let Some(operations) = &self.operations else {
            return Ok(());
        };
        if rows.is_empty() {
            return Ok(());
        }
        let group = self.end_group.get_or_init(|| {
            MutationOperationGroup::single(&operations.target().role, operations.delete_row().clone())
        });
        let mut executor = ExecutorScope::open(session, &self.end_key, group)?;
        for (position, entry) in rows {
            operations.bind_delete_restrictions(key, entry, *position, session, executor.bindings())?;
            executor.execute()?;
        }
        quarry_trace_mutation!("history-end", role = %operations.target().role, rows = rows.len());
        Ok(())
    }

    /// Close every open validity period of the owner
    fn end_all(&self, key: &[JdbcValue], session: &dyn SessionContext) -> Result<()> {
        let Some(operations) = &self.operations else {
            return Ok(());
        };
        let group = self.end_all_group.get_or_init(|| {
            MutationOperationGroup::single(&operations.target().role, operations.delete_all().clone())
        });
        let mut executor = ExecutorScope::open(session, &self.end_all_key, group)?;
        operations.bind_delete_all_restrictions(key, session, executor.bindings());
        executor.execute()
    }
}

// =============================================================================
// Decorators
// =============================================================================

pub struct InsertRowsCoordinatorHistory {
    delegate: Box<dyn InsertRowsCoordinator>,
    history: HistoryRows,
}

impl InsertRowsCoordinatorHistory {
    #[must_use]
    pub fn new(delegate: Box<dyn InsertRowsCoordinator>) -> Self {
        let history = HistoryRows::new(delegate.target());
        Self { delegate, history }
    }
}

impl CollectionOperationCoordinator for InsertRowsCoordinatorHistory {
    fn target(&self) -> &CollectionMutationTarget {
        self.delegate.target()
    }
}

impl InsertRowsCoordinator for InsertRowsCoordinatorHistory {
    fn insert_rows(
        &self,
        collection: &dyn PersistentCollection,
        key: &[JdbcValue],
        entry_checker: EntryChecker<'_>,
        session: &dyn SessionContext,
    ) -> Result<()> {
        self.delegate.insert_rows(collection, key, entry_checker, session)?;
        let rows: Vec<_> = collection
            .entries()
            .into_iter()
            .enumerate()
            .filter(|(position, entry)| includes_insert(collection, entry_checker, entry, *position))
            .collect();
        self.history.insert(key, &rows, session)
    }
}

pub struct UpdateRowsCoordinatorHistory {
    delegate: Box<dyn UpdateRowsCoordinator>,
    history: HistoryRows,
}

impl UpdateRowsCoordinatorHistory {
    #[must_use]
    pub fn new(delegate: Box<dyn UpdateRowsCoordinator>) -> Self {
        let history = HistoryRows::new(delegate.target());
        Self { delegate, history }
    }
}

impl CollectionOperationCoordinator for UpdateRowsCoordinatorHistory {
    fn target(&self) -> &CollectionMutationTarget {
        self.delegate.target()
    }
}

impl UpdateRowsCoordinator for UpdateRowsCoordinatorHistory {
    fn update_rows(
        &self,
        key: &[JdbcValue],
        collection: &dyn PersistentCollection,
        session: &dyn SessionContext,
    ) -> Result<()> {
        self.delegate.update_rows(key, collection, session)?;
        let changed: Vec<_> = rows_in_update_order(collection)
            .into_iter()
            .filter(|(position, entry)| collection.needs_updating(entry, *position))
            .collect();
        let previous: Vec<_> = changed
            .iter()
            .filter_map(|(position, entry)| {
                collection
                    .snapshot_element(entry, *position)
                    .map(|old| (*position, old))
            })
            .collect();
        self.history.end(key, &previous, session)?;
        self.history.insert(key, &changed, session)
    }
}

pub struct DeleteRowsCoordinatorHistory {
    delegate: Box<dyn DeleteRowsCoordinator>,
    history: HistoryRows,
}

impl DeleteRowsCoordinatorHistory {
    #[must_use]
    pub fn new(delegate: Box<dyn DeleteRowsCoordinator>) -> Self {
        let history = HistoryRows::new(delegate.target());
        Self { delegate, history }
    }
}

impl CollectionOperationCoordinator for DeleteRowsCoordinatorHistory {
    fn target(&self) -> &CollectionMutationTarget {
        self.delegate.target()
    }
}

impl DeleteRowsCoordinator for DeleteRowsCoordinatorHistory {
    fn delete_rows(
        &self,
        collection: &dyn PersistentCollection,
        key: &[JdbcValue],
        session: &dyn SessionContext,
    ) -> Result<()> {
        self.delegate.delete_rows(collection, key, session)?;
        self.history.end(key, &collection.deletes(), session)
    }
}

pub struct RemoveCoordinatorHistory {
    delegate: Box<dyn RemoveCoordinator>,
    history: HistoryRows,
}

impl RemoveCoordinatorHistory {
    #[must_use]
    pub fn new(delegate: Box<dyn RemoveCoordinator>) -> Self {
        let history = HistoryRows::new(delegate.target());
        Self { delegate, history }
    }
}

impl CollectionOperationCoordinator for RemoveCoordinatorHistory {
    fn target(&self) -> &CollectionMutationTarget {
        self.delegate.target()
    }
}

impl RemoveCoordinator for RemoveCoordinatorHistory {
    fn delete_all_rows(&self, key: &[JdbcValue], session: &dyn SessionContext) -> Result<()> {
        self.delegate.delete_all_rows(key, session)?;
        self.history.end_all(key, session)
    }
}
