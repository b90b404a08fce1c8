//! Key, index and check constraint entities
//!
//! Constraints refer to columns by [`Identifier`] and to other tables by
//! [`TableId`], so they stay valid while the owning table keeps growing.

use crate::{Identifier, TableId};

// =============================================================================
// Referential action
// =============================================================================

/// Foreign key `ON DELETE` action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum ReferentialAction {
    /// No action (default)
    #[default]
    NoAction,
    /// Restrict deletion
    Restrict,
    /// Cascade changes
    Cascade,
    /// Set to NULL
    SetNull,
    /// Set to default value
    SetDefault,
}

impl ReferentialAction {
    /// Get the SQL representation
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "no action",
            Self::Restrict => "restrict",
            Self::Cascade => "cascade",
            Self::SetNull => "set null",
            Self::SetDefault => "set default",
        }
    }
}

// =============================================================================
// Primary key
// =============================================================================

/// Primary key of a table; column order is the order columns were added
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimaryKey {
    pub name: Option<String>,
    pub columns: Vec<Identifier>,
}

impl PrimaryKey {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of key columns
    #[inline]
    #[must_use]
    pub fn column_span(&self) -> usize {
        self.columns.len()
    }

    /// Whether the key already lists `column`
    #[must_use]
    pub fn contains(&self, column: &Identifier) -> bool {
        self.columns.iter().any(|c| c.matches(column))
    }

    pub(crate) fn push(&mut self, column: Identifier) {
        if !self.contains(&column) {
            self.columns.push(column);
        }
    }
}

// =============================================================================
// Foreign key
// =============================================================================

/// A foreign key from columns of one table to another table
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<Identifier>,
    /// Entity the key points at, when bound from a mapping
    pub referenced_entity_name: Option<String>,
    pub referenced_table: TableId,
    /// Empty when the key references the target's primary key
    pub referenced_columns: Vec<Identifier>,
    pub on_delete: ReferentialAction,
    /// Raw key definition overriding the generated DDL
    pub key_definition: Option<String>,
    /// Whether DDL is emitted for this key
    pub creation_enabled: bool,
}

impl ForeignKey {
    /// Whether the key targets the referenced table's primary key
    #[inline]
    #[must_use]
    pub fn is_referencing_primary_key(&self) -> bool {
        self.referenced_columns.is_empty()
    }

    /// Whether the key cascades deletes
    #[inline]
    #[must_use]
    pub fn is_cascade_delete(&self) -> bool {
        self.on_delete == ReferentialAction::Cascade
    }

    /// Number of key columns
    #[inline]
    #[must_use]
    pub fn column_span(&self) -> usize {
        self.columns.len()
    }

    /// Whether the key covers exactly `columns`, in any order
    #[must_use]
    pub fn has_columns(&self, columns: &[Identifier]) -> bool {
        self.columns.len() == columns.len()
            && columns
                .iter()
                .all(|c| self.columns.iter().any(|own| own.matches(c)))
    }
}

// =============================================================================
// Unique key / index / check
// =============================================================================

/// A named unique constraint
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UniqueKey {
    pub name: String,
    pub columns: Vec<Identifier>,
    /// Whether the name was supplied rather than generated
    pub name_explicit: bool,
}

/// A named index
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Index {
    pub name: String,
    pub columns: Vec<Identifier>,
    pub unique: bool,
}

impl Index {
    /// Add a column unless already present
    pub fn add_column(&mut self, column: Identifier) {
        if !self.columns.iter().any(|c| c.matches(&column)) {
            self.columns.push(column);
        }
    }
}

/// A table-level check constraint
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckConstraint {
    pub name: Option<String>,
    pub condition: String,
}

impl CheckConstraint {
    #[must_use]
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            name: None,
            condition: condition.into(),
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_push_dedupes() {
        let mut pk = PrimaryKey::new();
        pk.push(Identifier::new("id", false));
        pk.push(Identifier::new("ID", false));
        assert_eq!(pk.column_span(), 1);
    }

    #[test]
    fn test_foreign_key_column_match_ignores_order() {
        let fk = ForeignKey {
            name: "FK1".into(),
            columns: vec![Identifier::new("a", false), Identifier::new("b", false)],
            referenced_entity_name: None,
            referenced_table: TableId(0),
            referenced_columns: Vec::new(),
            on_delete: ReferentialAction::Cascade,
            key_definition: None,
            creation_enabled: true,
        };
        assert!(fk.has_columns(&[Identifier::new("b", false), Identifier::new("a", false)]));
        assert!(fk.is_referencing_primary_key());
        assert!(fk.is_cascade_delete());
    }
}
