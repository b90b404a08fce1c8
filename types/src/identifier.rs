//! Database identifiers with explicit quoting state
//!
//! A name can end up quoted in two ways: its text carried quote markup
//! (`` `order` `` or `"order"`), or a global quoting policy selected it.
//! Both paths set [`Identifier::quoted`] so DDL rendering never has to
//! re-inspect the text.

use crate::Dialect;

/// A table, column, schema or catalog name
///
/// # Examples
///
/// ```
/// use quarry_types::{Dialect, Identifier};
///
/// let explicit = Identifier::to_identifier("`Order`").unwrap();
/// assert!(explicit.is_quoted());
/// assert_eq!(explicit.text(), "Order");
///
/// let global = Identifier::new("Order", false).quote();
/// assert_eq!(explicit.render(Dialect::SQLite), global.render(Dialect::SQLite));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identifier {
    text: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "std::ops::Not::not")
    )]
    quoted: bool,
}

impl Identifier {
    /// Create an identifier from raw text and an explicit quoting flag
    #[must_use]
    pub fn new(text: impl Into<String>, quoted: bool) -> Self {
        Self {
            text: text.into(),
            quoted,
        }
    }

    /// Parse user-supplied text, honoring backtick, double-quote and bracket markup
    ///
    /// Returns `None` for blank input.
    #[must_use]
    pub fn to_identifier(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(inner) = Self::strip_markup(trimmed) {
            return Some(Self::new(inner, true));
        }
        Some(Self::new(trimmed, false))
    }

    /// Like [`Identifier::to_identifier`] but forces quoting when `quote` is set
    #[must_use]
    pub fn to_identifier_quoted(text: &str, quote: bool) -> Option<Self> {
        Self::to_identifier(text).map(|id| if quote { id.quote() } else { id })
    }

    fn strip_markup(text: &str) -> Option<&str> {
        let len = text.len();
        if len < 2 {
            return None;
        }
        let first = text.as_bytes()[0];
        let last = text.as_bytes()[len - 1];
        match (first, last) {
            (b'`', b'`') | (b'"', b'"') | (b'[', b']') => Some(&text[1..len - 1]),
            _ => None,
        }
    }

    /// Return a quoted copy of this identifier
    #[must_use]
    pub fn quote(mut self) -> Self {
        self.quoted = true;
        self
    }

    /// The identifier text without quote markup
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the identifier renders quoted
    #[inline]
    #[must_use]
    pub const fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Name used for uniqueness checks: case-folded unless quoted
    #[must_use]
    pub fn canonical_name(&self) -> String {
        if self.quoted {
            self.text.clone()
        } else {
            self.text.to_lowercase()
        }
    }

    /// Render for SQL with the dialect's quote characters when quoted
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> String {
        if self.quoted {
            dialect.quote(&self.text)
        } else {
            self.text.clone()
        }
    }

    /// Compare two identifiers the way the database would
    #[must_use]
    pub fn matches(&self, other: &Identifier) -> bool {
        self.canonical_name() == other.canonical_name()
    }
}

impl core::fmt::Display for Identifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.quoted {
            write!(f, "`{}`", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

/// Identifier categories a global quoting policy can select
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum QuotedIdentifierTarget {
    CatalogName,
    SchemaName,
    TableName,
    SequenceName,
    ColumnName,
    ForeignKey,
    ColumnDefinition,
}

impl QuotedIdentifierTarget {
    /// Every target, used when a blanket "quote everything" switch is on
    pub const ALL: &'static [QuotedIdentifierTarget] = &[
        Self::CatalogName,
        Self::SchemaName,
        Self::TableName,
        Self::SequenceName,
        Self::ColumnName,
        Self::ForeignKey,
        Self::ColumnDefinition,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtick_markup() {
        let id = Identifier::to_identifier("`select`").unwrap();
        assert!(id.is_quoted());
        assert_eq!(id.text(), "select");
        assert_eq!(id.render(Dialect::PostgreSQL), "\"select\"");
    }

    #[test]
    fn test_double_quote_and_bracket_markup() {
        assert!(Identifier::to_identifier("\"Users\"").unwrap().is_quoted());
        assert!(Identifier::to_identifier("[Users]").unwrap().is_quoted());
    }

    #[test]
    fn test_blank_is_none() {
        assert!(Identifier::to_identifier("   ").is_none());
        assert!(Identifier::to_identifier("").is_none());
    }

    #[test]
    fn test_canonical_name_case_folding() {
        let plain = Identifier::new("OrderLine", false);
        let quoted = Identifier::new("OrderLine", true);
        assert_eq!(plain.canonical_name(), "orderline");
        assert_eq!(quoted.canonical_name(), "OrderLine");
        assert!(plain.matches(&Identifier::new("ORDERLINE", false)));
        assert!(!plain.matches(&quoted));
    }

    #[test]
    fn test_global_and_explicit_quoting_render_identically() {
        let explicit = Identifier::to_identifier("`customer`").unwrap();
        let global = Identifier::to_identifier_quoted("customer", true).unwrap();
        assert_eq!(explicit, global);
        assert_eq!(explicit.render(Dialect::MySQL), global.render(Dialect::MySQL));
    }
}
