//! DDL string assembly
//!
//! Foreign keys are emitted as separate `alter table` statements after every
//! table exists, so creation order never has to follow key dependencies.

use crate::{Column, Database, Dialect, ForeignKey, Identifier, PrimaryKey, Result, Table, TableId};

// =============================================================================
// Table DDL
// =============================================================================

impl Table {
    /// `create table` statement for this table
    ///
    /// `columns` and `primary_key` are the effective ones, which for a
    /// denormalized union table come partly from its included table.
    #[must_use]
    pub fn sql_create_string(
        &self,
        dialect: Dialect,
        columns: &[&Column],
        primary_key: Option<&PrimaryKey>,
    ) -> String {
        let mut lines = Vec::with_capacity(columns.len() + 2);

        let pk_names: Vec<&Identifier> = primary_key
            .map(|pk| pk.columns.iter().collect())
            .unwrap_or_default();

        for column in columns {
            let in_pk = pk_names.iter().any(|name| name.matches(&column.name));
            lines.push(column.to_column_sql(dialect, in_pk));
        }

        if !pk_names.is_empty() {
            let cols = pk_names
                .iter()
                .map(|name| name.render(dialect))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("primary key ({cols})"));
        }

        for unique in self.unique_keys() {
            let cols = unique
                .columns
                .iter()
                .map(|name| name.render(dialect))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!(
                "constraint {} unique ({cols})",
                dialect.quote(&unique.name)
            ));
        }

        for check in self.checks() {
            match &check.name {
                Some(name) => lines.push(format!(
                    "constraint {} check ({})",
                    dialect.quote(name),
                    check.condition
                )),
                None => lines.push(format!("check ({})", check.condition)),
            }
        }

        let mut sql = format!(
            "create table {} ({})",
            self.qualified_name(dialect),
            lines.join(", ")
        );
        if let (Some(comment), Dialect::MySQL) = (&self.comment, dialect) {
            sql.push_str(&format!(" comment='{}'", comment.replace('\'', "''")));
        }
        sql
    }

    /// `drop table` statement for this table
    #[must_use]
    pub fn sql_drop_string(&self, dialect: Dialect) -> String {
        let if_exists = if dialect.supports_if_exists_before_table_name() {
            "if exists "
        } else {
            ""
        };
        format!(
            "drop table {if_exists}{}{}",
            self.qualified_name(dialect),
            dialect.cascade_constraints_string()
        )
    }

    /// `alter table` statements adding the columns missing from `existing`
    ///
    /// `existing` holds the column names already present in the database.
    #[must_use]
    pub fn sql_alter_strings(&self, dialect: Dialect, existing: &[&str]) -> Vec<String> {
        let root = format!(
            "alter table {} {} ",
            self.qualified_name(dialect),
            dialect.add_column_string()
        );
        self.columns()
            .iter()
            .filter(|column| {
                !existing
                    .iter()
                    .any(|name| column.name.matches(&Identifier::new(*name, column.is_quoted())))
            })
            .map(|column| format!("{root}{}", column.to_column_sql(dialect, false)))
            .collect()
    }
}

// =============================================================================
// Foreign key DDL
// =============================================================================

impl ForeignKey {
    /// `alter table ... add constraint ... foreign key` for this key
    pub fn sql_constraint_string(
        &self,
        table: &Table,
        db: &Database,
        dialect: Dialect,
    ) -> Result<String> {
        let target = db.table(self.referenced_table)?;
        let referenced: Vec<String> = if self.is_referencing_primary_key() {
            db.primary_key_of(self.referenced_table)?
                .map(|pk| pk.columns.iter().map(|c| c.render(dialect)).collect())
                .unwrap_or_default()
        } else {
            self.referenced_columns.iter().map(|c| c.render(dialect)).collect()
        };
        let columns: Vec<String> = self.columns.iter().map(|c| c.render(dialect)).collect();

        let body = match &self.key_definition {
            Some(definition) => definition.clone(),
            None => format!(
                "foreign key ({}) references {} ({})",
                columns.join(", "),
                target.qualified_name(dialect),
                referenced.join(", ")
            ),
        };

        let mut sql = format!(
            "alter table {} add constraint {} {body}",
            table.qualified_name(dialect),
            dialect.quote(&self.name)
        );
        if self.is_cascade_delete() && dialect.supports_cascade_delete() {
            sql.push_str(" on delete cascade");
        }
        Ok(sql)
    }
}

// =============================================================================
// Schema DDL
// =============================================================================

impl Database {
    /// Full creation script: every physical table, then indexes, then foreign keys
    pub fn sql_create_strings(&self, dialect: Dialect) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        let physical: Vec<(TableId, &Table)> =
            self.tables().filter(|(_, t)| t.is_physical_table()).collect();

        for (id, table) in &physical {
            let columns = self.columns_of(*id)?;
            let primary_key = self.primary_key_of(*id)?;
            statements.push(table.sql_create_string(dialect, &columns, primary_key));
        }

        for (_, table) in &physical {
            for index in table.indexes().iter().filter(|i| !i.columns.is_empty()) {
                let cols = index
                    .columns
                    .iter()
                    .map(|c| c.render(dialect))
                    .collect::<Vec<_>>()
                    .join(", ");
                statements.push(format!(
                    "create {}index {} on {} ({cols})",
                    if index.unique { "unique " } else { "" },
                    dialect.quote(&index.name),
                    table.qualified_name(dialect)
                ));
            }
        }

        for (_, table) in &physical {
            for fk in table.foreign_keys().iter().filter(|fk| fk.creation_enabled) {
                let target = self.table(fk.referenced_table)?;
                if target.is_physical_table() {
                    statements.push(fk.sql_constraint_string(table, self, dialect)?);
                }
            }
        }

        Ok(statements)
    }

    /// Drop script in reverse registration order
    #[must_use]
    pub fn sql_drop_strings(&self, dialect: Dialect) -> Vec<String> {
        let mut statements: Vec<String> = self
            .tables()
            .filter(|(_, t)| t.is_physical_table())
            .map(|(_, t)| t.sql_drop_string(dialect))
            .collect();
        statements.reverse();
        statements
    }
}

#[cfg(test)]
mod tests {
    use crate::{Column, Database, Dialect, Identifier, ReferentialAction, Table};

    fn schema() -> Database {
        let mut db = Database::new();

        let mut customer = Table::new(Identifier::new("customer", false));
        customer.add_column(Column::new("id").sql_type("bigint"));
        customer.add_primary_key_column(&Identifier::new("id", false)).unwrap();
        let customer = db.add_table(customer);

        let mut order = Table::new(Identifier::to_identifier("`order`").unwrap());
        order.add_column(Column::new("id").sql_type("bigint"));
        order.add_column(Column::new("customer_id").sql_type("bigint"));
        order.add_primary_key_column(&Identifier::new("id", false)).unwrap();
        order
            .create_foreign_key(
                Some("fk_order_customer"),
                vec![Identifier::new("customer_id", false)],
                Some("Customer"),
                customer,
                Vec::new(),
            )
            .unwrap()
            .on_delete = ReferentialAction::Cascade;
        db.add_table(order);
        db
    }

    #[test]
    fn test_create_strings() {
        let statements = schema().sql_create_strings(Dialect::PostgreSQL).unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[0],
            "create table customer (id bigint not null, primary key (id))"
        );
        assert_eq!(
            statements[1],
            "create table \"order\" (id bigint not null, customer_id bigint, primary key (id))"
        );
        assert_eq!(
            statements[2],
            "alter table \"order\" add constraint \"fk_order_customer\" foreign key (customer_id) references customer (id) on delete cascade"
        );
    }

    #[test]
    fn test_drop_strings_reverse_order() {
        let drops = schema().sql_drop_strings(Dialect::PostgreSQL);
        assert_eq!(drops[0], "drop table if exists \"order\" cascade");
        assert_eq!(drops[1], "drop table if exists customer cascade");
    }

    #[test]
    fn test_alter_strings_add_missing_columns() {
        let db = schema();
        let (_, customer) = db.tables().next().unwrap();
        assert!(customer.sql_alter_strings(Dialect::MySQL, &["id"]).is_empty());

        let mut widened = customer.clone();
        widened.add_column(Column::new("email").sql_type("varchar").length(80));
        assert_eq!(
            widened.sql_alter_strings(Dialect::MySQL, &["id"]),
            vec!["alter table customer add email varchar(80)".to_string()]
        );
    }

    #[test]
    fn test_abstract_tables_skipped() {
        let mut db = Database::new();
        db.add_table(Table::new(Identifier::new("base", false)).abstract_table(true));
        db.add_table(Table::new(Identifier::new("v", false)).subselect("select 1"));
        assert!(db.sql_create_strings(Dialect::SQLite).unwrap().is_empty());
    }
}
