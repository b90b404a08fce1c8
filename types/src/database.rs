//! Table arena
//!
//! Tables are owned by a [`Database`] and referenced everywhere else through
//! a copyable [`TableId`].

use crate::{Column, Identifier, PrimaryKey, Result, Table, TypesError};

/// Handle to a table owned by a [`Database`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableId(pub usize);

/// Every table known to one mapping run
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Database {
    tables: Vec<Table>,
}

impl Database {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, or return the id of one with the same qualified name
    ///
    /// Re-registering a table as non-abstract clears the abstract flag.
    pub fn add_table(&mut self, table: Table) -> TableId {
        if let Some(id) =
            self.find_table(table.catalog.as_ref(), table.schema.as_ref(), &table.name)
        {
            let existing = &mut self.tables[id.0];
            if !table.is_abstract {
                existing.is_abstract = false;
            }
            return id;
        }
        self.tables.push(table);
        TableId(self.tables.len() - 1)
    }

    /// Register a union table repeating the columns of `included`
    pub fn add_denormalized_table(&mut self, mut table: Table, included: TableId) -> Result<TableId> {
        self.table(included)?;
        table.included_table = Some(included);
        Ok(self.add_table(table))
    }

    /// Find a table by qualified name
    #[must_use]
    pub fn find_table(
        &self,
        catalog: Option<&Identifier>,
        schema: Option<&Identifier>,
        name: &Identifier,
    ) -> Option<TableId> {
        self.tables
            .iter()
            .position(|t| t.matches(catalog, schema, name))
            .map(TableId)
    }

    /// Borrow a table
    pub fn table(&self, id: TableId) -> Result<&Table> {
        self.tables
            .get(id.0)
            .ok_or_else(|| TypesError::UnknownTable(format!("#{}", id.0)))
    }

    /// Mutably borrow a table
    pub fn table_mut(&mut self, id: TableId) -> Result<&mut Table> {
        self.tables
            .get_mut(id.0)
            .ok_or_else(|| TypesError::UnknownTable(format!("#{}", id.0)))
    }

    /// All tables with their ids, in registration order
    pub fn tables(&self) -> impl Iterator<Item = (TableId, &Table)> {
        self.tables.iter().enumerate().map(|(i, t)| (TableId(i), t))
    }

    /// Number of registered tables
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Columns of a table including those repeated from its included tables
    ///
    /// Included columns come first, matching the column order of the
    /// denormalized DDL.
    pub fn columns_of(&self, id: TableId) -> Result<Vec<&Column>> {
        let table = self.table(id)?;
        let mut columns = match table.included_table {
            Some(included) if included != id => self.columns_of(included)?,
            _ => Vec::new(),
        };
        for column in table.columns() {
            if !columns.iter().any(|c| c.name.matches(&column.name)) {
                columns.push(column);
            }
        }
        Ok(columns)
    }
}

impl Database {
    /// Primary key of a table, falling back to its included table's key
    pub fn primary_key_of(&self, id: TableId) -> Result<Option<&PrimaryKey>> {
        let table = self.table(id)?;
        match (table.primary_key(), table.included_table) {
            (Some(pk), _) => Ok(Some(pk)),
            (None, Some(included)) if included != id => self.primary_key_of(included),
            (None, _) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_table_returns_existing() {
        let mut db = Database::new();
        let a = db.add_table(Table::new(Identifier::new("orders", false)).abstract_table(true));
        let b = db.add_table(Table::new(Identifier::new("ORDERS", false)));
        assert_eq!(a, b);
        assert_eq!(db.len(), 1);
        assert!(!db.table(a).unwrap().is_abstract);
    }

    #[test]
    fn test_schema_distinguishes_tables() {
        let mut db = Database::new();
        let a = db.add_table(Table::new(Identifier::new("orders", false)));
        let b = db.add_table(
            Table::new(Identifier::new("orders", false)).schema(Some(Identifier::new("archive", false))),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_denormalized_columns() {
        let mut db = Database::new();
        let mut base = Table::new(Identifier::new("party", false)).abstract_table(true);
        base.add_column(Column::new("id"));
        base.add_column(Column::new("name"));
        let base = db.add_table(base);

        let mut person = Table::new(Identifier::new("person", false));
        person.add_column(Column::new("birth_date"));
        let person = db.add_denormalized_table(person, base).unwrap();

        let names: Vec<&str> = db.columns_of(person).unwrap().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["id", "name", "birth_date"]);
        assert!(db.primary_key_of(person).unwrap().is_none());

        db.table_mut(base)
            .unwrap()
            .add_primary_key_column(&Identifier::new("id", false))
            .unwrap();
        let pk = db.primary_key_of(person).unwrap().unwrap();
        assert_eq!(pk.columns[0].text(), "id");
    }

    #[test]
    fn test_unknown_table() {
        let db = Database::new();
        assert!(matches!(db.table(TableId(3)), Err(TypesError::UnknownTable(_))));
    }
}
