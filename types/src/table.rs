//! Table entity
//!
//! Columns keep insertion order. Uniqueness is checked on the canonical
//! (case-folded unless quoted) name.

use crate::{
    CheckConstraint, Column, Dialect, ForeignKey, Identifier, Index, PrimaryKey, ReferentialAction,
    Result, TableId, TypesError, UniqueKey,
    naming::{FOREIGN_KEY_PREFIX, UNIQUE_KEY_PREFIX, generate_constraint_name},
};

/// A physical table, union base table or subselect
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Table {
    pub name: Identifier,
    pub schema: Option<Identifier>,
    pub catalog: Option<Identifier>,
    columns: Vec<Column>,
    primary_key: Option<PrimaryKey>,
    foreign_keys: Vec<ForeignKey>,
    unique_keys: Vec<UniqueKey>,
    indexes: Vec<Index>,
    checks: Vec<CheckConstraint>,
    pub comment: Option<String>,
    /// SQL text when the table is a subselect or view rather than physical
    pub subselect: Option<String>,
    /// Base table of a table-per-class hierarchy; never gets DDL when abstract
    pub is_abstract: bool,
    /// Table whose columns a denormalized union table repeats
    pub included_table: Option<TableId>,
    unique_integer: usize,
}

impl Table {
    /// Create an empty table
    #[must_use]
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            schema: None,
            catalog: None,
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            unique_keys: Vec::new(),
            indexes: Vec::new(),
            checks: Vec::new(),
            comment: None,
            subselect: None,
            is_abstract: false,
            included_table: None,
            unique_integer: 0,
        }
    }

    /// Set the schema
    #[must_use]
    pub fn schema(mut self, schema: Option<Identifier>) -> Self {
        self.schema = schema;
        self
    }

    /// Set the catalog
    #[must_use]
    pub fn catalog(mut self, catalog: Option<Identifier>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Mark as a subselect with the given SQL
    #[must_use]
    pub fn subselect(mut self, sql: impl Into<String>) -> Self {
        self.subselect = Some(sql.into());
        self
    }

    /// Mark as abstract
    #[must_use]
    pub fn abstract_table(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// Table name text
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.text()
    }

    /// Whether DDL should be generated for this table
    #[inline]
    #[must_use]
    pub fn is_physical_table(&self) -> bool {
        !self.is_abstract && self.subselect.is_none()
    }

    /// Whether this is a subselect or view
    #[inline]
    #[must_use]
    pub fn is_subselect(&self) -> bool {
        self.subselect.is_some()
    }

    /// Whether `other` names this table
    #[must_use]
    pub fn matches(
        &self,
        catalog: Option<&Identifier>,
        schema: Option<&Identifier>,
        name: &Identifier,
    ) -> bool {
        fn same(a: Option<&Identifier>, b: Option<&Identifier>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a.matches(b),
                _ => false,
            }
        }
        self.name.matches(name) && same(self.schema.as_ref(), schema) && same(self.catalog.as_ref(), catalog)
    }

    /// `catalog.schema.name` rendered for `dialect`
    #[must_use]
    pub fn qualified_name(&self, dialect: Dialect) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(catalog) = &self.catalog {
            parts.push(catalog.render(dialect));
        }
        if let Some(schema) = &self.schema {
            parts.push(schema.render(dialect));
        }
        parts.push(self.name.render(dialect));
        parts.join(".")
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Add a column, or return the existing one with the same canonical name
    pub fn add_column(&mut self, mut column: Column) -> &Column {
        if let Some(position) = self.position_of(&column.name) {
            return &self.columns[position];
        }
        self.unique_integer += 1;
        column.unique_integer = self.unique_integer;
        self.columns.push(column);
        let last = self.columns.len() - 1;
        &self.columns[last]
    }

    /// Next value of the table's position stamp counter
    pub fn next_unique_integer(&mut self) -> usize {
        self.unique_integer += 1;
        self.unique_integer
    }

    fn position_of(&self, name: &Identifier) -> Option<usize> {
        self.columns.iter().position(|c| c.name.matches(name))
    }

    /// Look up a column
    #[must_use]
    pub fn column(&self, name: &Identifier) -> Option<&Column> {
        self.position_of(name).map(|i| &self.columns[i])
    }

    /// Look up a column by unquoted text
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column(&Identifier::new(name, false))
            .or_else(|| self.column(&Identifier::new(name, true)))
    }

    /// Mutable column lookup
    pub fn column_mut(&mut self, name: &Identifier) -> Option<&mut Column> {
        self.position_of(name).map(move |i| &mut self.columns[i])
    }

    /// Whether the table has `name`
    #[inline]
    #[must_use]
    pub fn has_column(&self, name: &Identifier) -> bool {
        self.position_of(name).is_some()
    }

    /// Columns in insertion order
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn require_columns(&self, columns: &[Identifier]) -> Result<()> {
        for column in columns {
            if !self.has_column(column) {
                return Err(TypesError::UnknownColumn {
                    table: self.name().to_string(),
                    column: column.text().to_string(),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Primary key
    // =========================================================================

    /// Replace the primary key
    ///
    /// Every key column is forced non-nullable.
    pub fn set_primary_key(&mut self, primary_key: PrimaryKey) -> Result<()> {
        self.require_columns(&primary_key.columns)?;
        for name in &primary_key.columns {
            if let Some(column) = self.column_mut(name) {
                column.nullable = false;
            }
        }
        self.primary_key = Some(primary_key);
        Ok(())
    }

    /// Append a column to the primary key, creating the key when absent
    pub fn add_primary_key_column(&mut self, name: &Identifier) -> Result<()> {
        self.require_columns(std::slice::from_ref(name))?;
        if let Some(column) = self.column_mut(name) {
            column.nullable = false;
        }
        self.primary_key.get_or_insert_with(PrimaryKey::new).push(name.clone());
        Ok(())
    }

    /// The primary key, if one has been created
    #[inline]
    #[must_use]
    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    /// Primary key columns in key order
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.primary_key
            .iter()
            .flat_map(|pk| pk.columns.iter())
            .filter_map(|name| self.column(name))
            .collect()
    }

    // =========================================================================
    // Constraints
    // =========================================================================

    /// Create (or return the existing) foreign key over `columns`
    ///
    /// Two keys over the same column set pointing at the same entity are the
    /// same key. An empty `referenced_columns` references the target's
    /// primary key.
    pub fn create_foreign_key(
        &mut self,
        name: Option<&str>,
        columns: Vec<Identifier>,
        referenced_entity_name: Option<&str>,
        referenced_table: TableId,
        referenced_columns: Vec<Identifier>,
    ) -> Result<&mut ForeignKey> {
        self.require_columns(&columns)?;

        let existing = self.foreign_keys.iter().position(|fk| {
            fk.has_columns(&columns)
                && fk.referenced_entity_name.as_deref() == referenced_entity_name
                && fk.referenced_table == referenced_table
        });
        if let Some(position) = existing {
            return Ok(&mut self.foreign_keys[position]);
        }

        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let names: Vec<&str> = columns.iter().map(Identifier::text).collect();
                generate_constraint_name(FOREIGN_KEY_PREFIX, self.name(), &names)
            }
        };

        self.foreign_keys.push(ForeignKey {
            name,
            columns,
            referenced_entity_name: referenced_entity_name.map(str::to_string),
            referenced_table,
            referenced_columns,
            on_delete: ReferentialAction::NoAction,
            key_definition: None,
            creation_enabled: true,
        });
        let last = self.foreign_keys.len() - 1;
        Ok(&mut self.foreign_keys[last])
    }

    /// Foreign keys in creation order
    #[inline]
    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Create (or return the existing) unique key over `columns`
    pub fn create_unique_key(
        &mut self,
        name: Option<&str>,
        columns: Vec<Identifier>,
    ) -> Result<&UniqueKey> {
        self.require_columns(&columns)?;

        let existing = self.unique_keys.iter().position(|uk| {
            uk.columns.len() == columns.len()
                && uk.columns.iter().zip(&columns).all(|(a, b)| a.matches(b))
        });
        if let Some(position) = existing {
            return Ok(&self.unique_keys[position]);
        }

        let (name, name_explicit) = match name {
            Some(name) => (name.to_string(), true),
            None => {
                let names: Vec<&str> = columns.iter().map(Identifier::text).collect();
                (generate_constraint_name(UNIQUE_KEY_PREFIX, self.name(), &names), false)
            }
        };
        self.unique_keys.push(UniqueKey {
            name,
            columns,
            name_explicit,
        });
        let last = self.unique_keys.len() - 1;
        Ok(&self.unique_keys[last])
    }

    /// Unique keys in creation order
    #[inline]
    #[must_use]
    pub fn unique_keys(&self) -> &[UniqueKey] {
        &self.unique_keys
    }

    /// Look up an index by name, creating an empty one when absent
    pub fn get_or_create_index(&mut self, name: &str) -> &mut Index {
        if let Some(position) = self.indexes.iter().position(|i| i.name == name) {
            return &mut self.indexes[position];
        }
        self.indexes.push(Index {
            name: name.to_string(),
            columns: Vec::new(),
            unique: false,
        });
        let last = self.indexes.len() - 1;
        &mut self.indexes[last]
    }

    /// Indexes in creation order
    #[inline]
    #[must_use]
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Add a table-level check constraint
    pub fn add_check(&mut self, check: CheckConstraint) {
        if !self.checks.contains(&check) {
            self.checks.push(check);
        }
    }

    /// Check constraints in creation order
    #[inline]
    #[must_use]
    pub fn checks(&self) -> &[CheckConstraint] {
        &self.checks
    }
}
