use std::sync::{Arc, OnceLock};

use super::{CollectionOperationCoordinator, RemoveCoordinator};
use crate::Result;
use crate::jdbc::{BatchKey, ExecutorScope, MutationOperationGroup, SessionContext};
use crate::operations::RowMutationOperations;
use crate::quarry_trace_mutation;
use crate::target::CollectionMutationTarget;
use crate::value::JdbcValue;

/// Deletes every row of an owner with one statement
#[derive(Debug)]
pub struct RemoveCoordinatorStandard {
    operations: RowMutationOperations,
    batch_key: BatchKey,
    group: OnceLock<MutationOperationGroup>,
}

impl RemoveCoordinatorStandard {
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        let batch_key = BatchKey::new(&target.role, "REMOVE");
        Self {
            operations: RowMutationOperations::new(target),
            batch_key,
            group: OnceLock::new(),
        }
    }

    fn group(&self) -> &MutationOperationGroup {
        self.group.get_or_init(|| {
            MutationOperationGroup::single(&self.operations.target().role, self.operations.delete_all().clone())
        })
    }
}

impl CollectionOperationCoordinator for RemoveCoordinatorStandard {
    fn target(&self) -> &CollectionMutationTarget {
        self.operations.target()
    }
}

impl RemoveCoordinator for RemoveCoordinatorStandard {
    fn delete_all_rows(&self, key: &[JdbcValue], session: &dyn SessionContext) -> Result<()> {
        if !self.operations.has_delete_row() {
            return Ok(());
        }
        quarry_trace_mutation!("remove", role = %self.target().role);

        let mut executor = ExecutorScope::open(session, &self.batch_key, self.group())?;
        self.operations
            .bind_delete_all_restrictions(key, session, executor.bindings());
        executor.execute()
    }
}
