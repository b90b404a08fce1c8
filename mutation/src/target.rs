//! Mutation targets
//!
//! A [`CollectionMutationTarget`] is built once per collection role and then
//! shared read-only (behind an `Arc`) by every coordinator and session.

use quarry_types::Dialect;

// =============================================================================
// Mutation kinds
// =============================================================================

/// Shape of a table mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MutationType {
    Insert,
    Update,
    Delete,
}

impl MutationType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// Per-operation statement settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationDetails {
    pub mutation_type: MutationType,
    /// Hand-written SQL replacing the generated statement
    pub custom_sql: Option<String>,
    /// Whether the custom SQL is a procedure call
    pub callable: bool,
}

impl MutationDetails {
    #[must_use]
    pub fn new(mutation_type: MutationType) -> Self {
        Self {
            mutation_type,
            custom_sql: None,
            callable: false,
        }
    }

    #[must_use]
    pub fn custom_sql(mut self, sql: impl Into<String>, callable: bool) -> Self {
        self.custom_sql = Some(sql.into());
        self.callable = callable;
        self
    }
}

// =============================================================================
// Table mapping
// =============================================================================

/// The physical table a collection's rows live in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionTableMapping {
    pub table_name: String,
    pub key_columns: Vec<String>,
    /// List position or map key columns
    pub index_columns: Vec<String>,
    /// Synthetic row id of an identifier bag
    pub identifier_column: Option<String>,
    /// Element columns; for one-to-many, the element entity's id columns
    pub element_columns: Vec<String>,
    pub one_to_many: bool,
    pub insert_details: MutationDetails,
    pub update_details: MutationDetails,
    pub delete_row_details: MutationDetails,
    pub delete_all_details: MutationDetails,
}

impl CollectionTableMapping {
    #[must_use]
    pub fn new(table_name: impl Into<String>, key_columns: Vec<String>, element_columns: Vec<String>) -> Self {
        Self {
            table_name: table_name.into(),
            key_columns,
            index_columns: Vec::new(),
            identifier_column: None,
            element_columns,
            one_to_many: false,
            insert_details: MutationDetails::new(MutationType::Insert),
            update_details: MutationDetails::new(MutationType::Update),
            delete_row_details: MutationDetails::new(MutationType::Delete),
            delete_all_details: MutationDetails::new(MutationType::Delete),
        }
    }

    #[must_use]
    pub fn index_columns(mut self, columns: Vec<String>) -> Self {
        self.index_columns = columns;
        self
    }

    #[must_use]
    pub fn identifier_column(mut self, column: impl Into<String>) -> Self {
        self.identifier_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn one_to_many(mut self, one_to_many: bool) -> Self {
        self.one_to_many = one_to_many;
        self
    }

    /// Same column layout against another physical table
    #[must_use]
    pub fn with_table(&self, table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..self.clone()
        }
    }

    #[inline]
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        !self.index_columns.is_empty()
    }
}

// =============================================================================
// Shadow tables
// =============================================================================

/// Audit log table receiving one row per change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditTable {
    pub table_name: String,
    pub transaction_id_column: String,
    pub modification_type_column: String,
}

/// Validity-period columns
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemporalColumns {
    pub starting_column: String,
    pub ending_column: String,
}

/// Separate history table with validity-period columns
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryTable {
    pub table_name: String,
    pub columns: TemporalColumns,
}

/// Row-level modification recorded in an audit table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModificationType {
    Add,
    Modify,
    Delete,
}

impl ModificationType {
    /// Stored code: 0 add, 1 modify, 2 delete
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Add => 0,
            Self::Modify => 1,
            Self::Delete => 2,
        }
    }
}

// =============================================================================
// Target
// =============================================================================

/// Collection semantics relevant to row mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionNature {
    Bag,
    IdentifierBag,
    Set,
    List,
    Array,
    Map,
}

impl CollectionNature {
    #[inline]
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        matches!(self, Self::List | Self::Array | Self::Map)
    }
}

/// Physical table of one element subclass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubclassTable {
    pub subclass_id: usize,
    pub entity_name: String,
    pub table_name: String,
}

/// Everything a coordinator needs to mutate one collection role
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionMutationTarget {
    pub role: String,
    pub nature: CollectionNature,
    pub table: CollectionTableMapping,
    pub dialect: Dialect,
    pub inverse: bool,
    pub mutable: bool,
    pub row_update_possible: bool,
    /// Offset added to list positions
    pub index_base: i64,
    pub audit: Option<AuditTable>,
    /// Validity columns kept on the collection table itself
    pub temporal: Option<TemporalColumns>,
    pub history: Option<HistoryTable>,
    /// Per-subclass tables, indexed by subclass id, for elements stored one
    /// table per concrete subclass
    pub subclass_tables: Vec<Option<SubclassTable>>,
}

impl CollectionMutationTarget {
    #[must_use]
    pub fn new(role: impl Into<String>, nature: CollectionNature, table: CollectionTableMapping) -> Self {
        let row_update_possible = nature.is_indexed()
            || nature == CollectionNature::IdentifierBag
            || table.one_to_many;
        Self {
            role: role.into(),
            nature,
            table,
            dialect: Dialect::default(),
            inverse: false,
            mutable: true,
            row_update_possible,
            index_base: 0,
            audit: None,
            temporal: None,
            history: None,
            subclass_tables: Vec::new(),
        }
    }

    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    #[must_use]
    pub fn mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    #[must_use]
    pub fn index_base(mut self, base: i64) -> Self {
        self.index_base = base;
        self
    }

    #[must_use]
    pub fn audit(mut self, audit: AuditTable) -> Self {
        self.audit = Some(audit);
        self
    }

    #[must_use]
    pub fn temporal(mut self, columns: TemporalColumns) -> Self {
        self.temporal = Some(columns);
        self
    }

    #[must_use]
    pub fn history(mut self, history: HistoryTable) -> Self {
        self.history = Some(history);
        self
    }

    /// Register the table of one element subclass
    #[must_use]
    pub fn subclass_table(mut self, table: SubclassTable) -> Self {
        let slot = table.subclass_id;
        if self.subclass_tables.len() <= slot {
            self.subclass_tables.resize(slot + 1, None);
        }
        self.subclass_tables[slot] = Some(table);
        self
    }

    /// Whether any row write happens at all
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.mutable && !self.inverse
    }

    #[inline]
    #[must_use]
    pub fn is_one_to_many(&self) -> bool {
        self.table.one_to_many
    }

    /// Whether elements fan out to one table per subclass
    #[inline]
    #[must_use]
    pub fn has_subclass_tables(&self) -> bool {
        self.subclass_tables.iter().any(Option::is_some)
    }

    /// Target writing rows of this collection into its history table
    ///
    /// The history table shares the collection's column layout, carries the
    /// validity columns and never uses custom statements.
    #[must_use]
    pub fn history_target(&self) -> Option<CollectionMutationTarget> {
        let history = self.history.as_ref()?;
        let table = CollectionTableMapping::new(
            history.table_name.clone(),
            self.table.key_columns.clone(),
            self.table.element_columns.clone(),
        )
        .index_columns(self.table.index_columns.clone());
        let table = match &self.table.identifier_column {
            Some(column) => table.identifier_column(column.clone()),
            None => table,
        };
        Some(CollectionMutationTarget {
            role: self.role.clone(),
            nature: self.nature,
            table,
            dialect: self.dialect,
            inverse: false,
            mutable: true,
            row_update_possible: self.row_update_possible,
            index_base: self.index_base,
            audit: None,
            temporal: Some(history.columns.clone()),
            history: None,
            subclass_tables: Vec::new(),
        })
    }

    /// Table mapping redirected to subclass `subclass_id`'s table
    #[must_use]
    pub fn table_for_subclass(&self, subclass_id: usize) -> Option<CollectionTableMapping> {
        self.subclass_tables
            .get(subclass_id)
            .and_then(Option::as_ref)
            .map(|sub| self.table.with_table(sub.table_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_update_possibility() {
        let set = CollectionMutationTarget::new(
            "Order.tags",
            CollectionNature::Set,
            CollectionTableMapping::new("order_tags", vec!["order_id".into()], vec!["tag".into()]),
        );
        assert!(!set.row_update_possible);

        let list = CollectionMutationTarget::new(
            "Order.lines",
            CollectionNature::List,
            CollectionTableMapping::new("order_lines", vec!["order_id".into()], vec!["line".into()]),
        );
        assert!(list.row_update_possible);
    }

    #[test]
    fn test_subclass_table_slots() {
        let mapping = CollectionTableMapping::new("payment", vec!["order_id".into()], vec!["id".into()])
            .one_to_many(true);
        let target = CollectionMutationTarget::new("Order.payments", CollectionNature::Set, mapping)
            .subclass_table(SubclassTable {
                subclass_id: 2,
                entity_name: "CardPayment".into(),
                table_name: "card_payment".into(),
            });
        assert_eq!(target.subclass_tables.len(), 3);
        assert!(target.has_subclass_tables());
        assert!(target.table_for_subclass(1).is_none());
        assert_eq!(target.table_for_subclass(2).unwrap().table_name, "card_payment");
    }

    #[test]
    fn test_history_target() {
        let mapping = CollectionTableMapping::new("order_tags", vec!["order_id".into()], vec!["tag".into()]);
        let target = CollectionMutationTarget::new("Order.tags", CollectionNature::Set, mapping)
            .history(HistoryTable {
                table_name: "order_tags_history".into(),
                columns: TemporalColumns {
                    starting_column: "valid_from".into(),
                    ending_column: "valid_to".into(),
                },
            });
        let history = target.history_target().unwrap();
        assert_eq!(history.table.table_name, "order_tags_history");
        assert_eq!(history.temporal.as_ref().unwrap().ending_column, "valid_to");
        assert!(history.history.is_none());
    }
}
