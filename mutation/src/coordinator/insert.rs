use std::sync::{Arc, OnceLock};

use super::{CollectionOperationCoordinator, EntryChecker, InsertRowsCoordinator, includes_insert};
use crate::Result;
use crate::collection::PersistentCollection;
use crate::jdbc::{BatchKey, ExecutorScope, MutationOperationGroup, SessionContext};
use crate::operations::RowMutationOperations;
use crate::quarry_trace_mutation;
use crate::target::{CollectionMutationTarget, MutationType};
use crate::value::JdbcValue;

/// Inserts each new entry as one row of the collection table
#[derive(Debug)]
pub struct InsertRowsCoordinatorStandard {
    operations: RowMutationOperations,
    batch_key: BatchKey,
    group: OnceLock<MutationOperationGroup>,
}

impl InsertRowsCoordinatorStandard {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        let batch_key = BatchKey::for_mutation(&target.role, MutationType::Insert);
        Self {
            operations: RowMutationOperations::new(target),
            batch_key,
            group: OnceLock::new(),
        }
    }

    fn group(&self) -> &MutationOperationGroup {
        self.group.get_or_init(|| {
            MutationOperationGroup::single(&self.operations.target().role, self.operations.insert_row().clone())
        })
    }
}

impl CollectionOperationCoordinator for InsertRowsCoordinatorStandard {
    fn target(&self) -> &CollectionMutationTarget {
        self.operations.target()
    }
}

impl InsertRowsCoordinator for InsertRowsCoordinatorStandard {
    fn insert_rows(
        &self,
        collection: &dyn PersistentCollection,
        key: &[JdbcValue],
        entry_checker: EntryChecker<'_>,
        session: &dyn SessionContext,
    ) -> Result<()> {
        let entries = collection.entries();
        if entries.is_empty() || !self.operations.has_insert_row() {
            return Ok(());
        }

        let mut executor = ExecutorScope::open(session, &self.batch_key, self.group())?;
        let mut count = 0usize;
        for (position, entry) in entries.iter().enumerate() {
            if includes_insert(collection, entry_checker, entry, position) {
                self.operations
                    .bind_insert_values(key, entry, position, session, executor.bindings())?;
                executor.execute()?;
                count += 1;
            }
        }

        quarry_trace_mutation!("insert-rows", role = %self.target().role, rows = count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{CollectionEntry, CollectionSemantics, SnapshotCollection};
    use crate::target::{CollectionNature, CollectionTableMapping};
    use crate::testing::RecordingSession;

    fn tags() -> Arc<CollectionMutationTarget> {
        let table = CollectionTableMapping::new("order_tags", vec!["order_id".into()], vec!["tag".into()]);
        Arc::new(CollectionMutationTarget::new("Order.tags", CollectionNature::Set, table))
    }

    #[test]
    fn test_inserts_only_new_entries() {
        let mut collection = SnapshotCollection::new(CollectionSemantics::Set, [CollectionEntry::of("red")]);
        collection.push(CollectionEntry::of("blue"));
        let session = RecordingSession::new();

        InsertRowsCoordinatorStandard::new(tags())
            .insert_rows(&collection, &[JdbcValue::Int(7)], None, &session)
            .unwrap();

        let executed = session.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].sql, "insert into order_tags (order_id, tag) values (?, ?)");
        assert_eq!(executed[0].values, vec![JdbcValue::Int(7), "blue".into()]);
        assert_eq!(session.released(), vec!["Order.tags#INSERT".to_string()]);
    }

    #[test]
    fn test_recreate_inserts_everything() {
        let collection = SnapshotCollection::new(
            CollectionSemantics::Set,
            [CollectionEntry::of("red"), CollectionEntry::of("blue")],
        );
        let session = RecordingSession::new();
        let all = |_: &CollectionEntry, _: usize| true;

        InsertRowsCoordinatorStandard::new(tags())
            .insert_rows(&collection, &[JdbcValue::Int(7)], Some(&all), &session)
            .unwrap();

        assert_eq!(session.executed().len(), 2);
    }

    #[test]
    fn test_empty_collection_opens_no_executor() {
        let collection = SnapshotCollection::created(CollectionSemantics::Set, []);
        let session = RecordingSession::new();
        InsertRowsCoordinatorStandard::new(tags())
            .insert_rows(&collection, &[JdbcValue::Int(7)], None, &session)
            .unwrap();
        assert!(session.created().is_empty());
    }

    #[test]
    fn test_executor_released_on_failure() {
        let collection = SnapshotCollection::created(CollectionSemantics::Set, [CollectionEntry::of("red")]);
        let session = RecordingSession::failing("Order.tags#INSERT");
        let result = InsertRowsCoordinatorStandard::new(tags()).insert_rows(
            &collection,
            &[JdbcValue::Int(7)],
            None,
            &session,
        );
        assert!(result.is_err());
        assert_eq!(session.released().len(), 1);
    }
}
