//! Column and formula entities
//!
//! A [`Selectable`] is whatever a mapped value reads from: a physical
//! [`Column`] or a read-only SQL [`Formula`].

use crate::{Dialect, Identifier};

/// Default length for character columns without an explicit length
pub const DEFAULT_LENGTH: u64 = 255;

// =============================================================================
// Column
// =============================================================================

/// A physical column
///
/// # Examples
///
/// ```
/// use quarry_types::Column;
///
/// let column = Column::new("customer_id").sql_type("bigint").not_null();
/// assert_eq!(column.name(), "customer_id");
/// assert!(!column.nullable);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Column {
    /// Column name with quoting state
    pub name: Identifier,

    /// Explicit SQL type (`columnDefinition` or a resolved type name)
    #[cfg_attr(feature = "serde", serde(default))]
    pub sql_type: Option<String>,

    /// Character length
    #[cfg_attr(feature = "serde", serde(default))]
    pub length: Option<u64>,

    /// Numeric precision
    #[cfg_attr(feature = "serde", serde(default))]
    pub precision: Option<u32>,

    /// Numeric scale
    #[cfg_attr(feature = "serde", serde(default))]
    pub scale: Option<u32>,

    /// Whether NULL is allowed
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub nullable: bool,

    /// Whether a single-column unique constraint applies
    #[cfg_attr(feature = "serde", serde(default))]
    pub unique: bool,

    /// Default value expression
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_value: Option<String>,

    /// Column-level check constraint
    #[cfg_attr(feature = "serde", serde(default))]
    pub check: Option<String>,

    /// Column comment
    #[cfg_attr(feature = "serde", serde(default))]
    pub comment: Option<String>,

    /// Position stamp assigned by the owning table
    #[cfg_attr(feature = "serde", serde(default))]
    pub unique_integer: usize,

    /// Slot in the owning value's type decomposition
    #[cfg_attr(feature = "serde", serde(default))]
    pub type_index: usize,
}

#[cfg(feature = "serde")]
const fn default_true() -> bool {
    true
}

impl Column {
    /// Create a nullable column, honoring quote markup in `name`
    #[must_use]
    pub fn new(name: &str) -> Self {
        let name = Identifier::to_identifier(name).unwrap_or_else(|| Identifier::new(name, false));
        Self::from_identifier(name)
    }

    /// Create a nullable column from an already-resolved identifier
    #[must_use]
    pub fn from_identifier(name: Identifier) -> Self {
        Self {
            name,
            sql_type: None,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            unique: false,
            default_value: None,
            check: None,
            comment: None,
            unique_integer: 0,
            type_index: 0,
        }
    }

    /// Set the SQL type
    #[must_use]
    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    /// Set the length
    #[must_use]
    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Set precision and scale
    #[must_use]
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Mark NOT NULL
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark UNIQUE
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the default value expression
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Set the type-decomposition slot
    #[must_use]
    pub fn type_index(mut self, index: usize) -> Self {
        self.type_index = index;
        self
    }

    /// Column name text without quote markup
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.text()
    }

    /// Case-normalized name used for uniqueness within a table
    #[inline]
    #[must_use]
    pub fn canonical_name(&self) -> String {
        self.name.canonical_name()
    }

    /// Name rendered for SQL
    #[inline]
    #[must_use]
    pub fn quoted_name(&self, dialect: Dialect) -> String {
        self.name.render(dialect)
    }

    /// Whether the name is quoted
    #[inline]
    #[must_use]
    pub fn is_quoted(&self) -> bool {
        self.name.is_quoted()
    }

    /// SQL type with length/precision applied, defaulting to `varchar`
    #[must_use]
    pub fn sql_type_string(&self) -> String {
        let base = self.sql_type.as_deref().unwrap_or("varchar");
        if base.contains('(') {
            return base.to_string();
        }
        match (self.length, self.precision, self.scale) {
            (_, Some(p), Some(s)) if p > 0 => format!("{base}({p},{s})"),
            (Some(len), _, _) => format!("{base}({len})"),
            _ if base.eq_ignore_ascii_case("varchar") => format!("{base}({DEFAULT_LENGTH})"),
            _ => base.to_string(),
        }
    }

    /// Render the column definition used inside `CREATE TABLE`
    #[must_use]
    pub fn to_column_sql(&self, dialect: Dialect, in_primary_key: bool) -> String {
        let mut sql = format!("{} {}", self.quoted_name(dialect), self.sql_type_string());

        if let Some(default) = &self.default_value {
            sql.push_str(" default ");
            sql.push_str(default);
        }

        if !self.nullable || in_primary_key {
            sql.push_str(" not null");
        }

        if self.unique && !in_primary_key {
            sql.push_str(" unique");
        }

        if let Some(check) = &self.check {
            sql.push_str(&format!(" check ({check})"));
        }

        sql
    }
}

// =============================================================================
// Formula
// =============================================================================

/// A derived, read-only SQL expression standing in for a column
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Formula {
    /// SQL fragment
    pub formula: String,

    /// Position stamp, shared counter with columns
    #[cfg_attr(feature = "serde", serde(default))]
    pub unique_integer: usize,
}

impl Formula {
    /// Create a formula from an SQL fragment
    #[must_use]
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            unique_integer: 0,
        }
    }

    /// The SQL fragment
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.formula
    }
}

// =============================================================================
// Selectable
// =============================================================================

/// A column or formula read by a mapped value
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Selectable {
    Column(Column),
    Formula(Formula),
}

impl Selectable {
    /// Whether this is a formula
    #[inline]
    #[must_use]
    pub const fn is_formula(&self) -> bool {
        matches!(self, Selectable::Formula(_))
    }

    /// The column, when this is one
    #[inline]
    #[must_use]
    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Selectable::Column(column) => Some(column),
            Selectable::Formula(_) => None,
        }
    }

    /// Mutable access to the column, when this is one
    #[inline]
    pub fn as_column_mut(&mut self) -> Option<&mut Column> {
        match self {
            Selectable::Column(column) => Some(column),
            Selectable::Formula(_) => None,
        }
    }

    /// Column name or formula text
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Selectable::Column(column) => column.name(),
            Selectable::Formula(formula) => formula.text(),
        }
    }
}

impl From<Column> for Selectable {
    fn from(column: Column) -> Self {
        Selectable::Column(column)
    }
}

impl From<Formula> for Selectable {
    fn from(formula: Formula) -> Self {
        Selectable::Formula(formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_column_name() {
        let column = Column::new("`Key`");
        assert!(column.is_quoted());
        assert_eq!(column.name(), "Key");
        assert_eq!(column.canonical_name(), "Key");
        assert_eq!(column.quoted_name(Dialect::PostgreSQL), "\"Key\"");
    }

    #[test]
    fn test_sql_type_string() {
        assert_eq!(Column::new("a").sql_type_string(), "varchar(255)");
        assert_eq!(Column::new("a").sql_type("varchar").length(40).sql_type_string(), "varchar(40)");
        assert_eq!(Column::new("a").sql_type("numeric").precision(19, 2).sql_type_string(), "numeric(19,2)");
        assert_eq!(Column::new("a").sql_type("bigint").sql_type_string(), "bigint");
        assert_eq!(Column::new("a").sql_type("char(1)").length(9).sql_type_string(), "char(1)");
    }

    #[test]
    fn test_column_sql() {
        let column = Column::new("email").sql_type("varchar").length(100).not_null().unique();
        assert_eq!(
            column.to_column_sql(Dialect::SQLite, false),
            "email varchar(100) not null unique"
        );
    }

    #[test]
    fn test_selectable_kinds() {
        let column: Selectable = Column::new("id").into();
        let formula: Selectable = Formula::new("upper(name)").into();
        assert!(!column.is_formula());
        assert!(formula.is_formula());
        assert!(formula.as_column().is_none());
        assert_eq!(formula.text(), "upper(name)");
    }
}
