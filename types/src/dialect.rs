//! Database dialects
//!
//! The relational model only needs a narrow slice of dialect behavior:
//! identifier quoting, parameter placeholders and a handful of DDL fragments.

/// Target database for rendered SQL
///
/// # Examples
///
/// ```
/// use quarry_types::Dialect;
///
/// let dialect = Dialect::PostgreSQL;
/// assert_eq!(dialect.quote("order"), "\"order\"");
/// assert_eq!(dialect.placeholder(2), "$2");
///
/// let sqlite = Dialect::SQLite;
/// assert_eq!(sqlite.placeholder(2), "?");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    /// Positional `?` parameters, backtick quoting
    #[default]
    SQLite,

    /// Numbered `$n` parameters, double-quote quoting
    #[cfg_attr(feature = "serde", serde(alias = "postgres"))]
    PostgreSQL,

    /// Positional `?` parameters, backtick quoting
    MySQL,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `position`
    #[must_use]
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            Dialect::PostgreSQL => format!("${position}"),
            Dialect::SQLite | Dialect::MySQL => "?".to_string(),
        }
    }

    /// Opening quote character for quoted identifiers
    #[inline]
    #[must_use]
    pub const fn open_quote(&self) -> char {
        match self {
            Dialect::PostgreSQL => '"',
            Dialect::SQLite | Dialect::MySQL => '`',
        }
    }

    /// Closing quote character for quoted identifiers
    #[inline]
    #[must_use]
    pub const fn close_quote(&self) -> char {
        self.open_quote()
    }

    /// Wrap `name` in this dialect's identifier quotes
    #[must_use]
    pub fn quote(&self, name: &str) -> String {
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push(self.open_quote());
        quoted.push_str(name);
        quoted.push(self.close_quote());
        quoted
    }

    /// Whether `on delete cascade` may be rendered on foreign keys
    #[inline]
    #[must_use]
    pub const fn supports_cascade_delete(&self) -> bool {
        true
    }

    /// Keyword(s) that add a column in `alter table`
    #[inline]
    #[must_use]
    pub const fn add_column_string(&self) -> &'static str {
        match self {
            Dialect::MySQL => "add",
            Dialect::SQLite | Dialect::PostgreSQL => "add column",
        }
    }

    /// Whether `drop table if exists` is understood
    #[inline]
    #[must_use]
    pub const fn supports_if_exists_before_table_name(&self) -> bool {
        true
    }

    /// Suffix of `drop table` statements
    #[inline]
    #[must_use]
    pub const fn cascade_constraints_string(&self) -> &'static str {
        match self {
            Dialect::PostgreSQL => " cascade",
            Dialect::SQLite | Dialect::MySQL => "",
        }
    }
}
