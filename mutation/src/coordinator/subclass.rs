//! Table-per-subclass fan-out
//!
//! Elements stored one physical table per concrete subclass are written
//! through per-subclass statements and executors. Both are kept in slots
//! indexed by subclass id: statements are built the first time a subclass
//! shows up and reused after, executors are opened at most once per call and
//! only for the subclasses the call touches.

use std::sync::{Arc, OnceLock};

use super::{
    CollectionOperationCoordinator, DeleteRowsCoordinator, EntryChecker, InsertRowsCoordinator,
    RemoveCoordinator, UpdateRowsCoordinator, includes_insert, rows_in_update_order,
};
use crate::collection::{CollectionEntry, PersistentCollection};
use crate::jdbc::{BatchKey, ExecutorScope, MutationOperationGroup, SessionContext};
use crate::operations::RowMutationOperations;
use crate::sql::TableMutation;
use crate::target::CollectionMutationTarget;
use crate::value::JdbcValue;
use crate::{MutationError, Result, quarry_trace_mutation};

// =============================================================================
// Slots
// =============================================================================

#[derive(Debug)]
struct SubclassEntry {
    operations: RowMutationOperations,
    batch_key: BatchKey,
    group: MutationOperationGroup,
}

/// Lazily built per-subclass statements for one operation
#[derive(Debug)]
struct SubclassMutations {
    target: Arc<CollectionMutationTarget>,
    operation: &'static str,
    statement: fn(&RowMutationOperations) -> &TableMutation,
    slots: Vec<OnceLock<SubclassEntry>>,
}

impl SubclassMutations {
    fn new(
        target: Arc<CollectionMutationTarget>,
        operation: &'static str,
        statement: fn(&RowMutationOperations) -> &TableMutation,
    ) -> Self {
        let slots = (0..target.subclass_tables.len()).map(|_| OnceLock::new()).collect();
        Self {
            target,
            operation,
            statement,
            slots,
        }
    }

    fn missing(&self, subclass_id: usize) -> MutationError {
        MutationError::MissingSubclassMapping {
            role: self.target.role.clone(),
            subclass_id,
        }
    }

    fn entry(&self, subclass_id: usize) -> Result<&SubclassEntry> {
        let slot = self.slots.get(subclass_id).ok_or_else(|| self.missing(subclass_id))?;
        if let Some(entry) = slot.get() {
            return Ok(entry);
        }
        let table = self
            .target
            .table_for_subclass(subclass_id)
            .ok_or_else(|| self.missing(subclass_id))?;
        let operations = RowMutationOperations::for_table(Arc::clone(&self.target), table);
        let group = MutationOperationGroup::single(&self.target.role, (self.statement)(&operations).clone());
        let batch_key = BatchKey::new(&self.target.role, self.operation).subclass(subclass_id);
        Ok(slot.get_or_init(|| SubclassEntry {
            operations,
            batch_key,
            group,
        }))
    }

    /// Subclass ids with a mapped table
    fn mapped_subclasses(&self) -> impl Iterator<Item = usize> + '_ {
        self.target
            .subclass_tables
            .iter()
            .enumerate()
            .filter_map(|(id, table)| table.as_ref().map(|_| id))
    }
}

/// Executors opened during one call, one slot per subclass id
struct SubclassExecutors {
    slots: Vec<Option<ExecutorScope>>,
}

impl SubclassExecutors {
    fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
        }
    }

    fn get(
        &mut self,
        subclass_id: usize,
        entry: &SubclassEntry,
        session: &dyn SessionContext,
    ) -> Result<&mut ExecutorScope> {
        let slot = self.slots.get_mut(subclass_id).ok_or_else(|| {
            MutationError::MissingSubclassMapping {
                role: entry.group.role.clone(),
                subclass_id,
            }
        })?;
        let executor = match slot.take() {
            Some(executor) => executor,
            None => ExecutorScope::open(session, &entry.batch_key, &entry.group)?,
        };
        Ok(slot.insert(executor))
    }

    fn opened(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

// =============================================================================
// Insert
// =============================================================================

#[derive(Debug)]
pub struct InsertRowsCoordinatorTablePerSubclass {
    mutations: SubclassMutations,
}

impl InsertRowsCoordinatorTablePerSubclass {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        Self {
            mutations: SubclassMutations::new(target, "INSERT", RowMutationOperations::insert_row),
        }
    }
}

impl CollectionOperationCoordinator for InsertRowsCoordinatorTablePerSubclass {
    fn target(&self) -> &CollectionMutationTarget {
        &self.mutations.target
    }
}

impl InsertRowsCoordinator for InsertRowsCoordinatorTablePerSubclass {
    fn insert_rows(
        &self,
        collection: &dyn PersistentCollection,
        key: &[JdbcValue],
        entry_checker: EntryChecker<'_>,
        session: &dyn SessionContext,
    ) -> Result<()> {
        if !self.target().is_writable() {
            return Ok(());
        }
        let mut executors = SubclassExecutors::new(self.mutations.slots.len());
        for (position, entry) in collection.entries().iter().enumerate() {
            if !includes_insert(collection, entry_checker, entry, position) {
                continue;
            }
            let subclass = self.mutations.entry(entry.subclass_id)?;
            let executor = executors.get(entry.subclass_id, subclass, session)?;
            subclass
                .operations
                .bind_insert_values(key, entry, position, session, executor.bindings())?;
            executor.execute()?;
        }
        quarry_trace_mutation!("insert-rows", role = %self.target().role, executors = executors.opened());
        Ok(())
    }
}

// =============================================================================
// Update
// =============================================================================

/// Foreign-key updates per subclass table: unlink every changed row, then relink
#[derive(Debug)]
pub struct UpdateRowsCoordinatorTablePerSubclass {
    deletes: SubclassMutations,
    inserts: SubclassMutations,
}

impl UpdateRowsCoordinatorTablePerSubclass {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        Self {
            deletes: SubclassMutations::new(Arc::clone(&target), "UPDATE_DELETE", RowMutationOperations::delete_row),
            inserts: SubclassMutations::new(target, "UPDATE_INSERT", RowMutationOperations::insert_row),
        }
    }
}

impl CollectionOperationCoordinator for UpdateRowsCoordinatorTablePerSubclass {
    fn target(&self) -> &CollectionMutationTarget {
        &self.inserts.target
    }
}

impl UpdateRowsCoordinator for UpdateRowsCoordinatorTablePerSubclass {
    fn update_rows(
        &self,
        key: &[JdbcValue],
        collection: &dyn PersistentCollection,
        session: &dyn SessionContext,
    ) -> Result<()> {
        if !self.target().is_writable() || !self.target().row_update_possible {
            return Ok(());
        }
        let changed: Vec<(usize, CollectionEntry)> = rows_in_update_order(collection)
            .into_iter()
            .filter(|(position, entry)| collection.needs_updating(entry, *position))
            .collect();
        if changed.is_empty() {
            return Ok(());
        }

        let mut executors = SubclassExecutors::new(self.deletes.slots.len());
        for (position, entry) in &changed {
            let Some(previous) = collection.snapshot_element(entry, *position) else {
                continue;
            };
            let subclass = self.deletes.entry(previous.subclass_id)?;
            let executor = executors.get(previous.subclass_id, subclass, session)?;
            subclass
                .operations
                .bind_delete_restrictions(key, &previous, *position, session, executor.bindings())?;
            executor.execute()?;
        }
        drop(executors);

        let mut executors = SubclassExecutors::new(self.inserts.slots.len());
        for (position, entry) in &changed {
            let subclass = self.inserts.entry(entry.subclass_id)?;
            let executor = executors.get(entry.subclass_id, subclass, session)?;
            subclass
                .operations
                .bind_insert_values(key, entry, *position, session, executor.bindings())?;
            executor.execute()?;
        }

        quarry_trace_mutation!("update-rows", role = %self.target().role, rows = changed.len());
        Ok(())
    }
}

// =============================================================================
// Delete
// =============================================================================

#[derive(Debug)]
pub struct DeleteRowsCoordinatorTablePerSubclass {
    mutations: SubclassMutations,
}

impl DeleteRowsCoordinatorTablePerSubclass {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        Self {
            mutations: SubclassMutations::new(target, "DELETE_ROWS", RowMutationOperations::delete_row),
        }
    }
}

impl CollectionOperationCoordinator for DeleteRowsCoordinatorTablePerSubclass {
    fn target(&self) -> &CollectionMutationTarget {
        &self.mutations.target
    }
}

impl DeleteRowsCoordinator for DeleteRowsCoordinatorTablePerSubclass {
    fn delete_rows(
        &self,
        collection: &dyn PersistentCollection,
        key: &[JdbcValue],
        session: &dyn SessionContext,
    ) -> Result<()> {
        if !self.target().is_writable() {
            return Ok(());
        }
        let deletes = collection.deletes();
        let mut executors = SubclassExecutors::new(self.mutations.slots.len());
        for (position, removed) in &deletes {
            let subclass = self.mutations.entry(removed.subclass_id)?;
            let executor = executors.get(removed.subclass_id, subclass, session)?;
            subclass
                .operations
                .bind_delete_restrictions(key, removed, *position, session, executor.bindings())?;
            executor.execute()?;
        }
        quarry_trace_mutation!(
            "delete-rows",
            role = %self.target().role,
            rows = deletes.len(),
            executors = executors.opened()
        );
        Ok(())
    }
}

// =============================================================================
// Remove
// =============================================================================

/// Unlinks an owner's rows from every subclass table
#[derive(Debug)]
pub struct RemoveCoordinatorTablePerSubclass {
    mutations: SubclassMutations,
}

impl RemoveCoordinatorTablePerSubclass {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        Self {
            mutations: SubclassMutations::new(target, "REMOVE", RowMutationOperations::delete_all),
        }
    }
}

impl CollectionOperationCoordinator for RemoveCoordinatorTablePerSubclass {
    fn target(&self) -> &CollectionMutationTarget {
        &self.mutations.target
    }
}

impl RemoveCoordinator for RemoveCoordinatorTablePerSubclass {
    fn delete_all_rows(&self, key: &[JdbcValue], session: &dyn SessionContext) -> Result<()> {
        if !self.target().is_writable() {
            return Ok(());
        }
        let mut executors = SubclassExecutors::new(self.mutations.slots.len());
        for subclass_id in self.mutations.mapped_subclasses() {
            let subclass = self.mutations.entry(subclass_id)?;
            let executor = executors.get(subclass_id, subclass, session)?;
            subclass
                .operations
                .bind_delete_all_restrictions(key, session, executor.bindings());
            executor.execute()?;
        }
        quarry_trace_mutation!("remove", role = %self.target().role, executors = executors.opened());
        Ok(())
    }
}
