use std::sync::{Arc, OnceLock};

use super::{CollectionOperationCoordinator, UpdateRowsCoordinator, rows_in_update_order};
use crate::Result;
use crate::collection::{CollectionEntry, PersistentCollection};
use crate::jdbc::{BatchKey, ExecutorScope, MutationOperationGroup, SessionContext};
use crate::operations::RowMutationOperations;
use crate::target::{CollectionMutationTarget, MutationType};
use crate::value::JdbcValue;
use crate::{quarry_trace_mutation, quarry_trace_row};

// =============================================================================
// Standard
// =============================================================================

/// Rewrites the element of each changed row in place
#[derive(Debug)]
pub struct UpdateRowsCoordinatorStandard {
    operations: RowMutationOperations,
    batch_key: BatchKey,
    group: OnceLock<MutationOperationGroup>,
}

impl UpdateRowsCoordinatorStandard {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        let batch_key = BatchKey::for_mutation(&target.role, MutationType::Update);
        Self {
            operations: RowMutationOperations::new(target),
            batch_key,
            group: OnceLock::new(),
        }
    }

    fn group(&self) -> &MutationOperationGroup {
        self.group.get_or_init(|| {
            MutationOperationGroup::single(&self.operations.target().role, self.operations.update_row().clone())
        })
    }
}

impl CollectionOperationCoordinator for UpdateRowsCoordinatorStandard {
    fn target(&self) -> &CollectionMutationTarget {
        self.operations.target()
    }
}

impl UpdateRowsCoordinator for UpdateRowsCoordinatorStandard {
    fn update_rows(
        &self,
        key: &[JdbcValue],
        collection: &dyn PersistentCollection,
        session: &dyn SessionContext,
    ) -> Result<()> {
        if !self.operations.has_update_row() {
            return Ok(());
        }
        let rows = rows_in_update_order(collection);
        if rows.is_empty() {
            return Ok(());
        }

        let mut executor = ExecutorScope::open(session, &self.batch_key, self.group())?;
        let mut count = 0usize;
        for (position, entry) in &rows {
            if collection.needs_updating(entry, *position) {
                quarry_trace_row!(role = %self.target().role, position = *position, "update row");
                self.operations
                    .bind_update_values(key, entry, *position, executor.bindings())?;
                executor.execute()?;
                count += 1;
            }
        }

        quarry_trace_mutation!("update-rows", role = %self.target().role, rows = count);
        Ok(())
    }
}

// =============================================================================
// Two-pass updates
// =============================================================================

/// Shared driver for updates that end or unlink the old row, then write the new one
///
/// Both passes walk the rows in update order. The first pass binds the
/// snapshot state of each changed row, the second its current state, each
/// through its own executor.
#[derive(Debug)]
struct TwoPassUpdate {
    operations: RowMutationOperations,
    delete_key: BatchKey,
    insert_key: BatchKey,
    delete_group: OnceLock<MutationOperationGroup>,
    insert_group: OnceLock<MutationOperationGroup>,
}

impl TwoPassUpdate {
    fn new(target: Arc<CollectionMutationTarget>) -> Self {
        let delete_key = BatchKey::new(&target.role, "UPDATE_DELETE");
        let insert_key = BatchKey::new(&target.role, "UPDATE_INSERT");
        Self {
            operations: RowMutationOperations::new(target),
            delete_key,
            insert_key,
            delete_group: OnceLock::new(),
            insert_group: OnceLock::new(),
        }
    }

    fn run(
        &self,
        operation: &'static str,
        key: &[JdbcValue],
        collection: &dyn PersistentCollection,
        session: &dyn SessionContext,
    ) -> Result<()> {
        let changed: Vec<(usize, CollectionEntry)> = rows_in_update_order(collection)
            .into_iter()
            .filter(|(position, entry)| collection.needs_updating(entry, *position))
            .collect();
        if changed.is_empty() {
            return Ok(());
        }
        let role = &self.operations.target().role;

        let delete_group = self.delete_group.get_or_init(|| {
            MutationOperationGroup::single(role, self.operations.delete_row().clone())
        });
        let mut executor = ExecutorScope::open(session, &self.delete_key, delete_group)?;
        for (position, entry) in &changed {
            let Some(previous) = collection.snapshot_element(entry, *position) else {
                continue;
            };
            self.operations
                .bind_delete_restrictions(key, &previous, *position, session, executor.bindings())?;
            executor.execute()?;
        }
        drop(executor);

        let insert_group = self.insert_group.get_or_init(|| {
            MutationOperationGroup::single(role, self.operations.insert_row().clone())
        });
        let mut executor = ExecutorScope::open(session, &self.insert_key, insert_group)?;
        for (position, entry) in &changed {
            self.operations
                .bind_insert_values(key, entry, *position, session, executor.bindings())?;
            executor.execute()?;
        }

        quarry_trace_mutation!("update-rows", variant = operation, role = %role, rows = changed.len());
        Ok(())
    }
}

/// Updates of a foreign-key collection: unlink the previous rows, then link the current ones
#[derive(Debug)]
pub struct UpdateRowsCoordinatorOneToMany {
    passes: TwoPassUpdate,
}

impl UpdateRowsCoordinatorOneToMany {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        Self {
            passes: TwoPassUpdate::new(target),
        }
    }
}

impl CollectionOperationCoordinator for UpdateRowsCoordinatorOneToMany {
    fn target(&self) -> &CollectionMutationTarget {
        self.passes.operations.target()
    }
}

impl UpdateRowsCoordinator for UpdateRowsCoordinatorOneToMany {
    fn update_rows(
        &self,
        key: &[JdbcValue],
        collection: &dyn PersistentCollection,
        session: &dyn SessionContext,
    ) -> Result<()> {
        self.passes.run("one-to-many", key, collection, session)
    }
}

/// Updates of a collection table with validity columns: end the current row, then insert a new one
#[derive(Debug)]
pub struct UpdateRowsCoordinatorTemporal {
    passes: TwoPassUpdate,
}

impl UpdateRowsCoordinatorTemporal {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        Self {
            passes: TwoPassUpdate::new(target),
        }
    }
}

impl CollectionOperationCoordinator for UpdateRowsCoordinatorTemporal {
    fn target(&self) -> &CollectionMutationTarget {
        self.passes.operations.target()
    }
}

impl UpdateRowsCoordinator for UpdateRowsCoordinatorTemporal {
    fn update_rows(
        &self,
        key: &[JdbcValue],
        collection: &dyn PersistentCollection,
        session: &dyn SessionContext,
    ) -> Result<()> {
        self.passes.run("temporal", key, collection, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{CollectionSemantics, SnapshotCollection};
    use crate::target::{CollectionNature, CollectionTableMapping, TemporalColumns};
    use crate::testing::RecordingSession;

    fn letters(values: &[&str]) -> Vec<CollectionEntry> {
        values.iter().map(|v| CollectionEntry::of(*v)).collect()
    }

    fn lines(one_to_many: bool) -> Arc<CollectionMutationTarget> {
        let table = CollectionTableMapping::new("order_lines", vec!["order_id".into()], vec!["product".into()])
            .index_columns(vec!["position".into()])
            .one_to_many(one_to_many);
        Arc::new(CollectionMutationTarget::new("Order.lines", CollectionNature::List, table))
    }

    #[test]
    fn test_removal_rebinds_shifted_row_at_new_position() {
        let mut collection = SnapshotCollection::new(CollectionSemantics::List, letters(&["A", "B", "C"]));
        collection.remove(1);
        let session = RecordingSession::new();

        UpdateRowsCoordinatorStandard::new(lines(false))
            .update_rows(&[JdbcValue::Int(7)], &collection, &session)
            .unwrap();

        let executed = session.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(
            executed[0].sql,
            "update order_lines set product=? where order_id=? and position=?"
        );
        assert_eq!(executed[0].values, vec!["C".into(), JdbcValue::Int(7), JdbcValue::Int(1)]);
    }

    #[test]
    fn test_unchanged_rows_skipped() {
        let collection = SnapshotCollection::new(CollectionSemantics::List, letters(&["A", "B"]));
        let session = RecordingSession::new();
        UpdateRowsCoordinatorStandard::new(lines(false))
            .update_rows(&[JdbcValue::Int(7)], &collection, &session)
            .unwrap();
        assert!(session.executed().is_empty());
        assert_eq!(session.created().len(), session.released().len());
    }

    #[test]
    fn test_one_to_many_runs_deletes_before_inserts() {
        let mut collection = SnapshotCollection::new(CollectionSemantics::List, letters(&["A", "B", "C"]));
        collection.set(0, CollectionEntry::of("X"));
        collection.set(2, CollectionEntry::of("Y"));
        let session = RecordingSession::new();

        UpdateRowsCoordinatorOneToMany::new(lines(true))
            .update_rows(&[JdbcValue::Int(7)], &collection, &session)
            .unwrap();

        let executed = session.executed();
        let keys: Vec<_> = executed.iter().map(|e| e.batch_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "Order.lines#UPDATE_DELETE",
                "Order.lines#UPDATE_DELETE",
                "Order.lines#UPDATE_INSERT",
                "Order.lines#UPDATE_INSERT",
            ]
        );
        // unlink binds the snapshot element, link binds the current one
        assert_eq!(executed[0].values, vec![JdbcValue::Int(7), "A".into()]);
        assert_eq!(
            executed[2].sql,
            "update order_lines set order_id=?, position=? where product=?"
        );
        assert_eq!(executed[2].values, vec![JdbcValue::Int(7), JdbcValue::Int(0), "X".into()]);
        assert_eq!(session.created().len(), 2);
        assert_eq!(session.released().len(), 2);
    }

    #[test]
    fn test_temporal_update_ends_then_inserts() {
        let table = CollectionTableMapping::new("order_lines", vec!["order_id".into()], vec!["product".into()])
            .index_columns(vec!["position".into()]);
        let target = CollectionMutationTarget::new("Order.lines", CollectionNature::List, table).temporal(
            TemporalColumns {
                starting_column: "valid_from".into(),
                ending_column: "valid_to".into(),
            },
        );
        let mut collection = SnapshotCollection::new(CollectionSemantics::List, letters(&["A"]));
        collection.set(0, CollectionEntry::of("B"));
        let session = RecordingSession::new();

        UpdateRowsCoordinatorTemporal::new(Arc::new(target))
            .update_rows(&[JdbcValue::Int(7)], &collection, &session)
            .unwrap();

        let executed = session.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].sql.starts_with("update order_lines set valid_to=?"));
        assert_eq!(
            executed[1].sql,
            "insert into order_lines (order_id, position, product, valid_from) values (?, ?, ?, ?)"
        );
        assert_eq!(executed[1].values[2], "B".into());
    }
}
