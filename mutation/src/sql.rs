//! Table mutation statements
//!
//! Every row write is one of three statement shapes against a single table.
//! Parameters are numbered in statement order: assignments first, then
//! restrictions.

use quarry_types::Dialect;

use crate::target::{MutationDetails, MutationType};

/// Role of a bound parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterUsage {
    /// Value written by the statement
    Set,
    /// Value in the `where` clause
    Restrict,
}

/// A parameter slot of a [`TableMutation`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnParameter {
    pub column: String,
    pub usage: ParameterUsage,
}

/// A rendered single-table statement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableMutation {
    pub table_name: String,
    pub mutation_type: MutationType,
    pub sql: String,
    pub callable: bool,
    /// Parameters in placeholder order
    pub parameters: Vec<ColumnParameter>,
}

#[derive(Clone, Debug)]
enum Assignment {
    Parameter(String),
    Null(String),
}

#[derive(Clone, Debug)]
enum Restriction {
    Parameter(String),
    IsNull(String),
}

/// Builder for [`TableMutation`]s
///
/// ```
/// use quarry_mutation::MutationSql;
/// use quarry_types::Dialect;
///
/// let update = MutationSql::update(Dialect::PostgreSQL, "order_lines")
///     .set("product")
///     .restrict("order_id")
///     .restrict("position")
///     .build();
/// assert_eq!(
///     update.sql,
///     "update order_lines set product=$1 where order_id=$2 and position=$3"
/// );
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct MutationSql {
    dialect: Dialect,
    table_name: String,
    mutation_type: MutationType,
    assignments: Vec<Assignment>,
    restrictions: Vec<Restriction>,
    custom: Option<(String, bool)>,
}

impl MutationSql {
    fn new(dialect: Dialect, table_name: impl Into<String>, mutation_type: MutationType) -> Self {
        Self {
            dialect,
            table_name: table_name.into(),
            mutation_type,
            assignments: Vec::new(),
            restrictions: Vec::new(),
            custom: None,
        }
    }

    pub fn insert(dialect: Dialect, table_name: impl Into<String>) -> Self {
        Self::new(dialect, table_name, MutationType::Insert)
    }

    pub fn update(dialect: Dialect, table_name: impl Into<String>) -> Self {
        Self::new(dialect, table_name, MutationType::Update)
    }

    pub fn delete(dialect: Dialect, table_name: impl Into<String>) -> Self {
        Self::new(dialect, table_name, MutationType::Delete)
    }

    /// Write a parameter into `column` (insert values or update assignments)
    pub fn set(mut self, column: impl Into<String>) -> Self {
        self.assignments.push(Assignment::Parameter(column.into()));
        self
    }

    pub fn set_all<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        columns.into_iter().fold(self, Self::set)
    }

    /// Assign `null` to `column`
    pub fn set_null(mut self, column: impl Into<String>) -> Self {
        self.assignments.push(Assignment::Null(column.into()));
        self
    }

    pub fn restrict(mut self, column: impl Into<String>) -> Self {
        self.restrictions.push(Restriction::Parameter(column.into()));
        self
    }

    pub fn restrict_all<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        columns.into_iter().fold(self, Self::restrict)
    }

    /// Require `column is null`
    pub fn restrict_null(mut self, column: impl Into<String>) -> Self {
        self.restrictions.push(Restriction::IsNull(column.into()));
        self
    }

    /// Use the custom statement from `details`, if any
    pub fn details(mut self, details: &MutationDetails) -> Self {
        self.custom = details
            .custom_sql
            .as_ref()
            .map(|sql| (sql.clone(), details.callable));
        self
    }

    #[must_use]
    pub fn build(self) -> TableMutation {
        let mut parameters = Vec::new();
        for assignment in &self.assignments {
            if let Assignment::Parameter(column) = assignment {
                parameters.push(ColumnParameter {
                    column: column.clone(),
                    usage: ParameterUsage::Set,
                });
            }
        }
        for restriction in &self.restrictions {
            if let Restriction::Parameter(column) = restriction {
                parameters.push(ColumnParameter {
                    column: column.clone(),
                    usage: ParameterUsage::Restrict,
                });
            }
        }

        let (sql, callable) = match self.custom.clone() {
            Some(custom) => custom,
            None => (self.render(), false),
        };

        TableMutation {
            table_name: self.table_name,
            mutation_type: self.mutation_type,
            sql,
            callable,
            parameters,
        }
    }

    fn render(&self) -> String {
        let mut position = 0;
        let mut next = || {
            position += 1;
            self.dialect.placeholder(position)
        };

        match self.mutation_type {
            MutationType::Insert => {
                let mut columns = Vec::new();
                let mut values = Vec::new();
                for assignment in &self.assignments {
                    match assignment {
                        Assignment::Parameter(column) => {
                            columns.push(column.as_str());
                            values.push(next());
                        }
                        Assignment::Null(column) => {
                            columns.push(column.as_str());
                            values.push("null".to_string());
                        }
                    }
                }
                format!(
                    "insert into {} ({}) values ({})",
                    self.table_name,
                    columns.join(", "),
                    values.join(", ")
                )
            }
            MutationType::Update => {
                let sets: Vec<String> = self
                    .assignments
                    .iter()
                    .map(|assignment| match assignment {
                        Assignment::Parameter(column) => format!("{column}={}", next()),
                        Assignment::Null(column) => format!("{column}=null"),
                    })
                    .collect();
                let mut sql = format!("update {} set {}", self.table_name, sets.join(", "));
                self.push_where(&mut sql, &mut next);
                sql
            }
            MutationType::Delete => {
                let mut sql = format!("delete from {}", self.table_name);
                self.push_where(&mut sql, &mut next);
                sql
            }
        }
    }

    fn push_where(&self, sql: &mut String, next: &mut impl FnMut() -> String) {
        if self.restrictions.is_empty() {
            return;
        }
        let predicates: Vec<String> = self
            .restrictions
            .iter()
            .map(|restriction| match restriction {
                Restriction::Parameter(column) => format!("{column}={}", next()),
                Restriction::IsNull(column) => format!("{column} is null"),
            })
            .collect();
        sql.push_str(" where ");
        sql.push_str(&predicates.join(" and "));
    }
}
