use std::sync::Arc;

use super::{
    CollectionOperationCoordinator, DeleteRowsCoordinator, DeleteRowsCoordinatorAudit, DeleteRowsCoordinatorHistory,
    DeleteRowsCoordinatorStandard, DeleteRowsCoordinatorTablePerSubclass, InsertRowsCoordinator,
    InsertRowsCoordinatorAudit, InsertRowsCoordinatorHistory, InsertRowsCoordinatorStandard,
    InsertRowsCoordinatorTablePerSubclass, NoOpCoordinator, RemoveCoordinator, RemoveCoordinatorHistory,
    RemoveCoordinatorStandard, RemoveCoordinatorTablePerSubclass, UpdateRowsCoordinator,
    UpdateRowsCoordinatorAudit, UpdateRowsCoordinatorHistory, UpdateRowsCoordinatorOneToMany,
    UpdateRowsCoordinatorStandard, UpdateRowsCoordinatorTablePerSubclass, UpdateRowsCoordinatorTemporal,
};
use crate::target::CollectionMutationTarget;

/// The coordinators of one collection role
pub struct CollectionCoordinators {
    pub insert: Box<dyn InsertRowsCoordinator>,
    pub update: Box<dyn UpdateRowsCoordinator>,
    pub delete: Box<dyn DeleteRowsCoordinator>,
    pub remove: Box<dyn RemoveCoordinator>,
}

impl core::fmt::Debug for CollectionCoordinators {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CollectionCoordinators")
            .field("role", &self.insert.target().role)
            .finish_non_exhaustive()
    }
}

/// Picks coordinator variants for a mutation target
///
/// Storage decides the base variant: nothing for inverse or immutable
/// collections, per-subclass fan-out when elements live in one table per
/// subclass, otherwise the standard row coordinators with a one-to-many or
/// temporal update. History and audit decorators wrap the base variant, in
/// that order, when the target has those tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionCoordinatorFactory;

impl CollectionCoordinatorFactory {
    #[must_use]
    pub fn build(target: Arc<CollectionMutationTarget>) -> CollectionCoordinators {
        if !target.is_writable() {
            crate::quarry_trace_mutation!("coordinators", role = %target.role, variant = "no-op");
            return CollectionCoordinators {
                insert: Box::new(NoOpCoordinator::new(Arc::clone(&target))),
                update: Box::new(NoOpCoordinator::new(Arc::clone(&target))),
                delete: Box::new(NoOpCoordinator::new(Arc::clone(&target))),
                remove: Box::new(NoOpCoordinator::new(target)),
            };
        }

        let mut coordinators = if target.has_subclass_tables() {
            CollectionCoordinators {
                insert: Box::new(InsertRowsCoordinatorTablePerSubclass::new(Arc::clone(&target))),
                update: Self::subclass_update(&target),
                delete: Box::new(DeleteRowsCoordinatorTablePerSubclass::new(Arc::clone(&target))),
                remove: Box::new(RemoveCoordinatorTablePerSubclass::new(Arc::clone(&target))),
            }
        } else {
            CollectionCoordinators {
                insert: Box::new(InsertRowsCoordinatorStandard::new(Arc::clone(&target))),
                update: Self::update(&target),
                delete: Box::new(DeleteRowsCoordinatorStandard::new(Arc::clone(&target))),
                remove: Box::new(RemoveCoordinatorStandard::new(Arc::clone(&target))),
            }
        };

        if target.history.is_some() {
            coordinators = CollectionCoordinators {
                insert: Box::new(InsertRowsCoordinatorHistory::new(coordinators.insert)),
                update: Box::new(UpdateRowsCoordinatorHistory::new(coordinators.update)),
                delete: Box::new(DeleteRowsCoordinatorHistory::new(coordinators.delete)),
                remove: Box::new(RemoveCoordinatorHistory::new(coordinators.remove)),
            };
        }
        if target.audit.is_some() {
            coordinators = CollectionCoordinators {
                insert: Box::new(InsertRowsCoordinatorAudit::new(coordinators.insert)),
                update: Box::new(UpdateRowsCoordinatorAudit::new(coordinators.update)),
                delete: Box::new(DeleteRowsCoordinatorAudit::new(coordinators.delete)),
                remove: coordinators.remove,
            };
        }

        crate::quarry_trace_mutation!(
            "coordinators",
            role = %target.role,
            subclass_tables = target.has_subclass_tables(),
            history = target.history.is_some(),
            audit = target.audit.is_some()
        );
        coordinators
    }

    fn update(target: &Arc<CollectionMutationTarget>) -> Box<dyn UpdateRowsCoordinator> {
        if !target.row_update_possible {
            Box::new(NoOpCoordinator::new(Arc::clone(target)))
        } else if target.is_one_to_many() {
            Box::new(UpdateRowsCoordinatorOneToMany::new(Arc::clone(target)))
        } else if target.temporal.is_some() {
            Box::new(UpdateRowsCoordinatorTemporal::new(Arc::clone(target)))
        } else {
            Box::new(UpdateRowsCoordinatorStandard::new(Arc::clone(target)))
        }
    }

    fn subclass_update(target: &Arc<CollectionMutationTarget>) -> Box<dyn UpdateRowsCoordinator> {
        if target.row_update_possible {
            Box::new(UpdateRowsCoordinatorTablePerSubclass::new(Arc::clone(target)))
        } else {
            Box::new(NoOpCoordinator::new(Arc::clone(target)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{CollectionEntry, CollectionSemantics, SnapshotCollection};
    use crate::target::{AuditTable, CollectionNature, CollectionTableMapping};
    use crate::testing::RecordingSession;
    use crate::value::JdbcValue;

    fn tags() -> CollectionMutationTarget {
        let table = CollectionTableMapping::new("order_tags", vec!["order_id".into()], vec!["tag".into()]);
        CollectionMutationTarget::new("Order.tags", CollectionNature::Set, table)
    }

    #[test]
    fn test_inverse_collection_writes_nothing() {
        let coordinators = CollectionCoordinatorFactory::build(Arc::new(tags().inverse(true)));
        let collection = SnapshotCollection::created(CollectionSemantics::Set, [CollectionEntry::of("red")]);
        let session = RecordingSession::new();

        coordinators
            .insert
            .insert_rows(&collection, &[JdbcValue::Int(7)], None, &session)
            .unwrap();
        coordinators.remove.delete_all_rows(&[JdbcValue::Int(7)], &session).unwrap();

        assert!(session.created().is_empty());
    }

    #[test]
    fn test_set_update_is_no_op() {
        let coordinators = CollectionCoordinatorFactory::build(Arc::new(tags()));
        let mut collection = SnapshotCollection::new(CollectionSemantics::Set, [CollectionEntry::of("red")]);
        collection.push(CollectionEntry::of("blue"));
        let session = RecordingSession::new();

        coordinators
            .update
            .update_rows(&[JdbcValue::Int(7)], &collection, &session)
            .unwrap();

        assert!(session.created().is_empty());
    }

    #[test]
    fn test_audit_wraps_remove_untouched() {
        let target = tags().audit(AuditTable {
            table_name: "order_tags_aud".into(),
            transaction_id_column: "REV".into(),
            modification_type_column: "REVTYPE".into(),
        });
        let coordinators = CollectionCoordinatorFactory::build(Arc::new(target));
        let session = RecordingSession::new();

        coordinators.remove.delete_all_rows(&[JdbcValue::Int(7)], &session).unwrap();

        assert_eq!(session.created(), vec!["Order.tags#REMOVE".to_string()]);
    }
}
