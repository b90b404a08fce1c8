//! Row mutation operations
//!
//! The statements a collection role needs against one physical table, plus
//! the rules for binding a row's values into them. Statements are rendered
//! on first use and then reused.

use std::sync::{Arc, OnceLock};

use crate::collection::CollectionEntry;
use crate::jdbc::{JdbcValueBindings, SessionContext};
use crate::sql::{MutationSql, ParameterUsage, TableMutation};
use crate::target::{CollectionMutationTarget, CollectionNature, CollectionTableMapping};
use crate::value::JdbcValue;
use crate::{MutationError, Result};

/// Statements and binders for one collection table
#[derive(Debug)]
pub struct RowMutationOperations {
    target: Arc<CollectionMutationTarget>,
    table: CollectionTableMapping,
    insert_row: OnceLock<TableMutation>,
    update_row: OnceLock<TableMutation>,
    delete_row: OnceLock<TableMutation>,
    delete_all: OnceLock<TableMutation>,
}

impl RowMutationOperations {
    /// Operations against the target's own table
    #[must_use]
    pub fn new(target: Arc<CollectionMutationTarget>) -> Self {
        let table = target.table.clone();
        Self::for_table(target, table)
    }

    /// Operations against `table`, typically one subclass table of the target
    #[must_use]
    pub fn for_table(target: Arc<CollectionMutationTarget>, table: CollectionTableMapping) -> Self {
        Self {
            target,
            table,
            insert_row: OnceLock::new(),
            update_row: OnceLock::new(),
            delete_row: OnceLock::new(),
            delete_all: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn target(&self) -> &CollectionMutationTarget {
        &self.target
    }

    #[must_use]
    pub fn table(&self) -> &CollectionTableMapping {
        &self.table
    }

    #[must_use]
    pub fn has_insert_row(&self) -> bool {
        self.target.is_writable()
    }

    #[must_use]
    pub fn has_update_row(&self) -> bool {
        self.target.is_writable() && self.target.row_update_possible && !self.table.one_to_many
    }

    #[must_use]
    pub fn has_delete_row(&self) -> bool {
        self.target.is_writable()
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Insert a row, or link an entity row for one-to-many
    pub fn insert_row(&self) -> &TableMutation {
        self.insert_row.get_or_init(|| {
            let table = &self.table;
            let dialect = self.target.dialect;
            let sql = if table.one_to_many {
                MutationSql::update(dialect, &table.table_name)
                    .set_all(&table.key_columns)
                    .set_all(&table.index_columns)
                    .restrict_all(&table.element_columns)
            } else {
                let mut sql = MutationSql::insert(dialect, &table.table_name).set_all(&table.key_columns);
                if let Some(identifier) = &table.identifier_column {
                    sql = sql.set(identifier);
                }
                sql = sql.set_all(&table.index_columns).set_all(&table.element_columns);
                if let Some(temporal) = &self.target.temporal {
                    sql = sql.set(&temporal.starting_column);
                }
                sql
            };
            sql.details(&table.insert_details).build()
        })
    }

    /// Rewrite the element of an existing join-table row
    pub fn update_row(&self) -> &TableMutation {
        self.update_row.get_or_init(|| {
            let table = &self.table;
            let sql = MutationSql::update(self.target.dialect, &table.table_name)
                .set_all(&table.element_columns)
                .restrict_all(&table.key_columns);
            self.restrict_row_identity(sql)
                .details(&table.update_details)
                .build()
        })
    }

    /// Remove one row; unlinks for one-to-many and closes the row when temporal
    pub fn delete_row(&self) -> &TableMutation {
        self.delete_row.get_or_init(|| {
            let table = &self.table;
            let dialect = self.target.dialect;
            let sql = if table.one_to_many {
                let mut sql = MutationSql::update(dialect, &table.table_name);
                for column in table.key_columns.iter().chain(&table.index_columns) {
                    sql = sql.set_null(column);
                }
                sql.restrict_all(&table.key_columns)
                    .restrict_all(&table.element_columns)
            } else if let Some(temporal) = &self.target.temporal {
                let sql = MutationSql::update(dialect, &table.table_name)
                    .set(&temporal.ending_column)
                    .restrict_all(&table.key_columns);
                self.restrict_row_identity(sql).restrict_null(&temporal.ending_column)
            } else {
                let sql = MutationSql::delete(dialect, &table.table_name).restrict_all(&table.key_columns);
                self.restrict_row_identity(sql)
            };
            sql.details(&table.delete_row_details).build()
        })
    }

    /// Remove every row of one owner
    pub fn delete_all(&self) -> &TableMutation {
        self.delete_all.get_or_init(|| {
            let table = &self.table;
            let dialect = self.target.dialect;
            let sql = if table.one_to_many {
                let mut sql = MutationSql::update(dialect, &table.table_name);
                for column in table.key_columns.iter().chain(&table.index_columns) {
                    sql = sql.set_null(column);
                }
                sql.restrict_all(&table.key_columns)
            } else if let Some(temporal) = &self.target.temporal {
                MutationSql::update(dialect, &table.table_name)
                    .set(&temporal.ending_column)
                    .restrict_all(&table.key_columns)
                    .restrict_null(&temporal.ending_column)
            } else {
                MutationSql::delete(dialect, &table.table_name).restrict_all(&table.key_columns)
            };
            sql.details(&table.delete_all_details).build()
        })
    }

    /// Row identity after the key: index, synthetic id, or the element itself
    fn restrict_row_identity(&self, sql: MutationSql) -> MutationSql {
        let table = &self.table;
        if table.is_indexed() {
            sql.restrict_all(&table.index_columns)
        } else if let Some(identifier) = &table.identifier_column {
            sql.restrict(identifier)
        } else {
            sql.restrict_all(&table.element_columns)
        }
    }

    // =========================================================================
    // Binders
    // =========================================================================

    /// Index value of the row at `position`
    pub fn index_value(&self, entry: &CollectionEntry, position: usize) -> Result<JdbcValue> {
        match self.target.nature {
            CollectionNature::Map => entry.index.clone().ok_or_else(|| {
                MutationError::execution(&self.target.role, format!("map entry at {position} has no key"))
            }),
            _ => {
                let position = i64::try_from(position).map_err(|_| {
                    MutationError::execution(&self.target.role, "collection position out of range")
                })?;
                Ok(JdbcValue::Int(position + self.target.index_base))
            }
        }
    }

    pub(crate) fn bind_index(
        &self,
        entry: &CollectionEntry,
        position: usize,
        usage: ParameterUsage,
        bindings: &mut JdbcValueBindings,
    ) -> Result<()> {
        if let [column] = self.table.index_columns.as_slice() {
            bindings.bind_value(self.index_value(entry, position)?, column, usage);
        } else if let Some(index) = &entry.index {
            for column in &self.table.index_columns {
                bindings.bind_value(index.clone(), column, usage);
            }
        }
        Ok(())
    }

    fn bind_identity(
        &self,
        entry: &CollectionEntry,
        position: usize,
        bindings: &mut JdbcValueBindings,
    ) -> Result<()> {
        if self.table.is_indexed() {
            self.bind_index(entry, position, ParameterUsage::Restrict, bindings)?;
        } else if let Some(column) = &self.table.identifier_column {
            let identifier = entry.identifier.clone().ok_or_else(|| {
                MutationError::execution(&self.target.role, "identifier bag entry has no identifier")
            })?;
            bindings.bind_value(identifier, column, ParameterUsage::Restrict);
        } else {
            bindings.bind_values(&entry.element, &self.table.element_columns, ParameterUsage::Restrict);
        }
        Ok(())
    }

    /// Values for [`Self::insert_row`]
    pub fn bind_insert_values(
        &self,
        key: &[JdbcValue],
        entry: &CollectionEntry,
        position: usize,
        session: &dyn SessionContext,
        bindings: &mut JdbcValueBindings,
    ) -> Result<()> {
        let table = &self.table;
        bindings.bind_values(key, &table.key_columns, ParameterUsage::Set);
        self.bind_index(entry, position, ParameterUsage::Set, bindings)?;
        if table.one_to_many {
            bindings.bind_values(&entry.element, &table.element_columns, ParameterUsage::Restrict);
            return Ok(());
        }
        if let Some(column) = &table.identifier_column {
            let identifier = entry.identifier.clone().unwrap_or(JdbcValue::Null);
            bindings.bind_value(identifier, column, ParameterUsage::Set);
        }
        bindings.bind_values(&entry.element, &table.element_columns, ParameterUsage::Set);
        if let Some(temporal) = &self.target.temporal {
            bindings.bind_value(session.current_timestamp(), &temporal.starting_column, ParameterUsage::Set);
        }
        Ok(())
    }

    /// Values and restrictions for [`Self::update_row`]
    pub fn bind_update_values(
        &self,
        key: &[JdbcValue],
        entry: &CollectionEntry,
        position: usize,
        bindings: &mut JdbcValueBindings,
    ) -> Result<()> {
        let table = &self.table;
        bindings.bind_values(&entry.element, &table.element_columns, ParameterUsage::Set);
        bindings.bind_values(key, &table.key_columns, ParameterUsage::Restrict);
        self.bind_identity(entry, position, bindings)
    }

    /// Restrictions for [`Self::delete_row`]; `entry` is the snapshot row
    pub fn bind_delete_restrictions(
        &self,
        key: &[JdbcValue],
        entry: &CollectionEntry,
        position: usize,
        session: &dyn SessionContext,
        bindings: &mut JdbcValueBindings,
    ) -> Result<()> {
        let table = &self.table;
        bindings.bind_values(key, &table.key_columns, ParameterUsage::Restrict);
        if table.one_to_many {
            bindings.bind_values(&entry.element, &table.element_columns, ParameterUsage::Restrict);
            return Ok(());
        }
        if let Some(temporal) = &self.target.temporal {
            bindings.bind_value(session.current_timestamp(), &temporal.ending_column, ParameterUsage::Set);
        }
        self.bind_identity(entry, position, bindings)
    }

    /// Restrictions for [`Self::delete_all`]
    pub fn bind_delete_all_restrictions(
        &self,
        key: &[JdbcValue],
        session: &dyn SessionContext,
        bindings: &mut JdbcValueBindings,
    ) {
        bindings.bind_values(key, &self.table.key_columns, ParameterUsage::Restrict);
        if !self.table.one_to_many
            && let Some(temporal) = &self.target.temporal
        {
            bindings.bind_value(session.current_timestamp(), &temporal.ending_column, ParameterUsage::Set);
        }
    }
}
