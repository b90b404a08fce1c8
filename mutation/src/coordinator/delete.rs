use std::sync::{Arc, OnceLock};

use super::{CollectionOperationCoordinator, DeleteRowsCoordinator};
use crate::Result;
use crate::collection::PersistentCollection;
use crate::jdbc::{BatchKey, ExecutorScope, MutationOperationGroup, SessionContext};
use crate::operations::RowMutationOperations;
use crate::quarry_trace_mutation;
use crate::target::{CollectionMutationTarget, MutationType};
use crate::value::JdbcValue;

/// Deletes the row of every entry missing from the current state
#[derive(Debug)]
pub struct DeleteRowsCoordinatorStandard {
    operations: RowMutationOperations,
    batch_key: BatchKey,
    group: OnceLock<MutationOperationGroup>,
}

impl DeleteRowsCoordinatorStandard {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        let batch_key = BatchKey::new(&target.role, "DELETE_ROWS");
        Self {
            operations: RowMutationOperations::new(target),
            batch_key,
            group: OnceLock::new(),
        }
    }

    fn group(&self) -> &MutationOperationGroup {
        self.group.get_or_init(|| {
            MutationOperationGroup::single(&self.operations.target().role, self.operations.delete_row().clone())
        })
    }
}

impl CollectionOperationCoordinator for DeleteRowsCoordinatorStandard {
    fn target(&self) -> &CollectionMutationTarget {
        self.operations.target()
    }
}

impl DeleteRowsCoordinator for DeleteRowsCoordinatorStandard {
    fn delete_rows(
        &self,
        collection: &dyn PersistentCollection,
        key: &[JdbcValue],
        session: &dyn SessionContext,
    ) -> Result<()> {
        let deletes = collection.deletes();
        if deletes.is_empty() || !self.operations.has_delete_row() {
            return Ok(());
        }

        let mut executor = ExecutorScope::open(session, &self.batch_key, self.group())?;
        for (position, removed) in &deletes {
            self.operations
                .bind_delete_restrictions(key, removed, *position, session, executor.bindings())?;
            executor.execute()?;
        }

        quarry_trace_mutation!("delete-rows", role = %self.target().role, rows = deletes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{CollectionEntry, CollectionSemantics, SnapshotCollection};
    use crate::target::{CollectionNature, CollectionTableMapping, TemporalColumns};
    use crate::testing::RecordingSession;

    #[test]
    fn test_deletes_trailing_list_rows() {
        let table = CollectionTableMapping::new("order_lines", vec!["order_id".into()], vec!["product".into()])
            .index_columns(vec!["position".into()]);
        let target = Arc::new(CollectionMutationTarget::new("Order.lines", CollectionNature::List, table));
        let mut collection = SnapshotCollection::new(
            CollectionSemantics::List,
            ["A", "B", "C"].map(CollectionEntry::of),
        );
        collection.remove(1);
        let session = RecordingSession::new();

        DeleteRowsCoordinatorStandard::new(target)
            .delete_rows(&collection, &[JdbcValue::Int(7)], &session)
            .unwrap();

        let executed = session.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].sql, "delete from order_lines where order_id=? and position=?");
        assert_eq!(executed[0].values, vec![JdbcValue::Int(7), JdbcValue::Int(2)]);
    }

    #[test]
    fn test_temporal_delete_ends_the_row() {
        let table = CollectionTableMapping::new("order_tags", vec!["order_id".into()], vec!["tag".into()]);
        let target = CollectionMutationTarget::new("Order.tags", CollectionNature::Set, table).temporal(
            TemporalColumns {
                starting_column: "valid_from".into(),
                ending_column: "valid_to".into(),
            },
        );
        let mut collection = SnapshotCollection::new(CollectionSemantics::Set, [CollectionEntry::of("red")]);
        collection.clear();
        let session = RecordingSession::new();

        DeleteRowsCoordinatorStandard::new(Arc::new(target))
            .delete_rows(&collection, &[JdbcValue::Int(7)], &session)
            .unwrap();

        let executed = session.executed();
        assert_eq!(
            executed[0].sql,
            "update order_tags set valid_to=? where order_id=? and tag=? and valid_to is null"
        );
        assert_eq!(executed[0].values[1..], [JdbcValue::Int(7), "red".into()]);
    }
}
