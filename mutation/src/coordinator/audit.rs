//! Audit-log decorators
//!
//! The audit table receives one row per changed collection row, stamped
//! with the transaction id and a modification code. Rows are written after
//! the delegate's primary mutation, from the same collection state.

use std::sync::{Arc, OnceLock};

use super::{
    CollectionOperationCoordinator, DeleteRowsCoordinator, EntryChecker, InsertRowsCoordinator,
    UpdateRowsCoordinator, includes_insert, rows_in_update_order,
};
use crate::Result;
use crate::collection::{CollectionEntry, PersistentCollection};
use crate::jdbc::{BatchKey, ExecutorScope, JdbcValueBindings, MutationOperationGroup, SessionContext};
use crate::operations::RowMutationOperations;
use crate::quarry_trace_mutation;
use crate::sql::{MutationSql, ParameterUsage};
use crate::target::{AuditTable, CollectionMutationTarget, ModificationType};
use crate::value::JdbcValue;

#[derive(Debug)]
struct AuditRows {
    operations: RowMutationOperations,
    batch_key: BatchKey,
    group: OnceLock<Option<MutationOperationGroup>>,
}

impl AuditRows {
    fn new(target: &CollectionMutationTarget) -> Self {
        Self {
            batch_key: BatchKey::new(&target.role, "AUDIT"),
            operations: RowMutationOperations::new(Arc::new(target.clone())),
            group: OnceLock::new(),
        }
    }

    fn audit_table(&self) -> Option<&AuditTable> {
        self.operations.target().audit.as_ref()
    }

    fn group(&self) -> Option<&MutationOperationGroup> {
        self.group
            .get_or_init(|| {
                let audit = self.audit_table()?;
                let table = self.operations.table();
                let mut sql = MutationSql::insert(self.operations.target().dialect, &audit.table_name)
                    .set(&audit.transaction_id_column)
                    .set_all(&table.key_columns);
                if let Some(identifier) = &table.identifier_column {
                    sql = sql.set(identifier);
                }
                let statement = sql
                    .set_all(&table.index_columns)
                    .set_all(&table.element_columns)
                    .set(&audit.modification_type_column)
                    .build();
                Some(MutationOperationGroup::single(&self.operations.target().role, statement))
            })
            .as_ref()
    }

    fn bind(
        &self,
        key: &[JdbcValue],
        entry: &CollectionEntry,
        position: usize,
        modification: ModificationType,
        session: &dyn SessionContext,
        bindings: &mut JdbcValueBindings,
    ) -> Result<()> {
        let Some(audit) = self.audit_table() else {
            return Ok(());
        };
        let table = self.operations.table();
        bindings.bind_value(session.transaction_id(), &audit.transaction_id_column, ParameterUsage::Set);
        bindings.bind_values(key, &table.key_columns, ParameterUsage::Set);
        if let Some(column) = &table.identifier_column {
            let identifier = entry.identifier.clone().unwrap_or(JdbcValue::Null);
            bindings.bind_value(identifier, column, ParameterUsage::Set);
        }
        self.operations
            .bind_index(entry, position, ParameterUsage::Set, bindings)?;
        bindings.bind_values(&entry.element, &table.element_columns, ParameterUsage::Set);
        bindings.bind_value(
            JdbcValue::Int(modification.code()),
            &audit.modification_type_column,
            ParameterUsage::Set,
        );
        Ok(())
    }

    fn write(
        &self,
        key: &[JdbcValue],
        rows: &[(usize, CollectionEntry)],
        modification: ModificationType,
        session: &dyn SessionContext,
    ) -> Result<()> {
        let Some(group) = self.group() else {
            return Ok(());
        };
        if rows.is_empty() {
            return Ok(());
        }
        let mut executor = ExecutorScope::open(session, &self.batch_key, group)?;
        for (position, entry) in rows {
            self.bind(key, entry, *position, modification, session, executor.bindings())?;
            executor.execute()?;
        }
        quarry_trace_mutation!(
            "audit",
            role = %self.operations.target().role,
            modification = modification.code(),
            rows = rows.len()
        );
        Ok(())
    }
}

// =============================================================================
// Decorators
// =============================================================================

pub struct InsertRowsCoordinatorAudit {
    delegate: Box<dyn InsertRowsCoordinator>,
    audit: AuditRows,
}

impl InsertRowsCoordinatorAudit {
    #[must_use]
    pub fn new(delegate: Box<dyn InsertRowsCoordinator>) -> Self {
        let audit = AuditRows::new(delegate.target());
        Self { delegate, audit }
    }
}

impl CollectionOperationCoordinator for InsertRowsCoordinatorAudit {
    fn target(&self) -> &CollectionMutationTarget {
        self.delegate.target()
    }
}

impl InsertRowsCoordinator for InsertRowsCoordinatorAudit {
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
        self.audit.write(key, &rows, ModificationType::Add, session)
    }
}

pub struct UpdateRowsCoordinatorAudit {
    delegate: Box<dyn UpdateRowsCoordinator>,
    audit: AuditRows,
}

impl UpdateRowsCoordinatorAudit {
    #[must_use]
    pub fn new(delegate: Box<dyn UpdateRowsCoordinator>) -> Self {
        let audit = AuditRows::new(delegate.target());
        Self { delegate, audit }
    }
}

impl CollectionOperationCoordinator for UpdateRowsCoordinatorAudit {
    fn target(&self) -> &CollectionMutationTarget {
        self.delegate.target()
    }
}

impl UpdateRowsCoordinator for UpdateRowsCoordinatorAudit {
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
        self.audit.write(key, &changed, ModificationType::Modify, session)
    }
}

pub struct DeleteRowsCoordinatorAudit {
    delegate: Box<dyn DeleteRowsCoordinator>,
    audit: AuditRows,
}

impl DeleteRowsCoordinatorAudit {
    #[must_use]
    pub fn new(delegate: Box<dyn DeleteRowsCoordinator>) -> Self {
        let audit = AuditRows::new(delegate.target());
        Self { delegate, audit }
    }
}

impl CollectionOperationCoordinator for DeleteRowsCoordinatorAudit {
    fn target(&self) -> &CollectionMutationTarget {
        self.delegate.target()
    }
}

impl DeleteRowsCoordinator for DeleteRowsCoordinatorAudit {
    fn delete_rows(
        &self,
        collection: &dyn PersistentCollection,
        key: &[JdbcValue],
        session: &dyn SessionContext,
    ) -> Result<()> {
        self.delegate.delete_rows(collection, key, session)?;
        self.audit
            .write(key, &collection.deletes(), ModificationType::Delete, session)
    }
}
