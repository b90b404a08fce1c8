//! Collection mappings
//!
//! Shared state lives on [`Collection`]; what differs between bags, sets,
//! lists, arrays and maps lives on [`CollectionKind`].

use std::collections::BTreeSet;

use quarry_types::{Database, PrimaryKey, Selectable, TableId};
use serde::{Deserialize, Serialize};

use super::{Metadata, SimpleValue, Value};
use crate::{MappingError, Result};

// =============================================================================
// Kinds
// =============================================================================

/// Collection semantics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CollectionKind {
    /// Unordered, duplicates allowed, no row identity
    Bag,
    /// Bag with a synthetic row identifier
    IdentifierBag { identifier: SimpleValue },
    /// Unordered, unique elements
    Set,
    /// Ordered by an index column
    List {
        index: Value,
        #[serde(default)]
        base_index: i32,
    },
    /// Object array
    Array {
        index: Value,
        #[serde(default)]
        element_class_name: Option<String>,
    },
    /// Array of primitives
    PrimitiveArray { index: Value },
    /// Keyed by an index value
    Map { index: Value },
}

impl CollectionKind {
    /// Index value of an indexed kind
    #[must_use]
    pub fn index(&self) -> Option<&Value> {
        match self {
            Self::List { index, .. }
            | Self::Array { index, .. }
            | Self::PrimitiveArray { index }
            | Self::Map { index } => Some(index),
            Self::Bag | Self::IdentifierBag { .. } | Self::Set => None,
        }
    }

    /// Synthetic identifier of an identifier bag
    #[must_use]
    pub fn identifier(&self) -> Option<&SimpleValue> {
        match self {
            Self::IdentifierBag { identifier } => Some(identifier),
            _ => None,
        }
    }

    /// Short name used in messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bag => "bag",
            Self::IdentifierBag { .. } => "idbag",
            Self::Set => "set",
            Self::List { .. } => "list",
            Self::Array { .. } => "array",
            Self::PrimitiveArray { .. } => "primitive-array",
            Self::Map { .. } => "map",
        }
    }
}

// =============================================================================
// Shadow tables
// =============================================================================

/// Audit log table written alongside the collection table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMapping {
    pub table_name: String,
    #[serde(default = "default_transaction_column")]
    pub transaction_id_column: String,
    #[serde(default = "default_modification_column")]
    pub modification_type_column: String,
}

fn default_transaction_column() -> String {
    "REV".to_string()
}

fn default_modification_column() -> String {
    "REVTYPE".to_string()
}

impl AuditMapping {
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            transaction_id_column: default_transaction_column(),
            modification_type_column: default_modification_column(),
        }
    }
}

/// Where row validity periods are kept
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "strategy")]
pub enum TemporalStrategy {
    /// Rows in the collection table carry their own validity columns
    SingleTable,
    /// A separate history table mirrors every row version
    HistoryTable { table_name: String },
}

/// Row validity columns
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalMapping {
    pub starting_column: String,
    pub ending_column: String,
    pub strategy: TemporalStrategy,
}

// =============================================================================
// Collection
// =============================================================================

/// A collection role
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// `Owner.attribute`
    pub role: String,
    pub owner_entity_name: String,
    /// Join table; `None` for one-to-many collections, whose rows live in
    /// the element entity's table
    pub collection_table: Option<TableId>,
    /// Foreign key back to the owner
    pub key: Value,
    pub element: Value,
    pub kind: CollectionKind,
    #[serde(default)]
    pub inverse: bool,
    #[serde(default = "default_true")]
    pub lazy: bool,
    #[serde(default)]
    pub extra_lazy: bool,
    #[serde(default = "default_true")]
    pub mutable: bool,
    #[serde(default)]
    pub orphan_delete: bool,
    #[serde(default)]
    pub sorted: bool,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub many_to_many_where: Option<String>,
    #[serde(default)]
    pub batch_size: Option<u32>,
    #[serde(default)]
    pub cache_region: Option<String>,
    #[serde(default)]
    pub loader_name: Option<String>,
    #[serde(default)]
    pub referenced_property_name: Option<String>,
    #[serde(default)]
    pub audit: Option<AuditMapping>,
    #[serde(default)]
    pub temporal: Option<TemporalMapping>,
}

const fn default_true() -> bool {
    true
}

impl Collection {
    /// A mutable, lazy, owning collection
    #[must_use]
    pub fn new(
        role: impl Into<String>,
        owner_entity_name: impl Into<String>,
        kind: CollectionKind,
        collection_table: Option<TableId>,
        key: Value,
        element: Value,
    ) -> Self {
        Self {
            role: role.into(),
            owner_entity_name: owner_entity_name.into(),
            collection_table,
            key,
            element,
            kind,
            inverse: false,
            lazy: true,
            extra_lazy: false,
            mutable: true,
            orphan_delete: false,
            sorted: false,
            order_by: None,
            where_clause: None,
            many_to_many_where: None,
            batch_size: None,
            cache_region: None,
            loader_name: None,
            referenced_property_name: None,
            audit: None,
            temporal: None,
        }
    }

    /// Whether elements are rows of another entity's table
    #[inline]
    #[must_use]
    pub fn is_one_to_many(&self) -> bool {
        matches!(self.element, Value::OneToMany(_))
    }

    #[inline]
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.kind.index().is_some()
    }

    #[inline]
    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.kind.identifier().is_some()
    }

    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, CollectionKind::Array { .. } | CollectionKind::PrimitiveArray { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_primitive_array(&self) -> bool {
        matches!(self.kind, CollectionKind::PrimitiveArray { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self.kind, CollectionKind::Map { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self.kind, CollectionKind::Set)
    }

    #[inline]
    #[must_use]
    pub fn has_order_by(&self) -> bool {
        self.order_by.is_some()
    }

    /// Base of the list index, zero for other kinds
    #[must_use]
    pub fn base_index(&self) -> i32 {
        match self.kind {
            CollectionKind::List { base_index, .. } => base_index,
            _ => 0,
        }
    }

    /// Whether one row of the collection may be rewritten in place
    ///
    /// Sets and bags have no row identity to update against; a one-to-many
    /// updates its foreign key instead of a collection row.
    #[must_use]
    pub fn is_row_update_possible(&self) -> bool {
        self.is_indexed() || self.is_identified() || self.is_one_to_many()
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check key, element, index and identifier spans and column reuse
    pub fn validate(&self, metadata: &Metadata) -> Result<()> {
        if self.key.is_cascade_delete_enabled() && (!self.inverse || !self.is_one_to_many()) {
            return Err(MappingError::Mapping(format!(
                "only inverse one-to-many associations may use on-delete=\"cascade\": {}",
                self.role
            )));
        }

        if !self.key.is_valid(metadata)? {
            return Err(self.span_error("foreign key", &self.key, metadata));
        }
        if !self.element.is_valid(metadata)? {
            return Err(self.span_error("element", &self.element, metadata));
        }
        if let Some(index) = self.kind.index()
            && !index.is_valid(metadata)?
        {
            return Err(self.span_error("index", index, metadata));
        }
        if let Some(identifier) = self.kind.identifier()
            && identifier.selectables.len() != 1
        {
            return Err(MappingError::Mapping(format!(
                "collection id mapping has wrong number of columns: {}",
                self.role
            )));
        }

        self.check_column_duplication()
    }

    fn span_error(&self, part: &str, value: &Value, metadata: &Metadata) -> MappingError {
        MappingError::Mapping(format!(
            "collection {part} mapping has wrong number of columns: {} ({} declared, {} required)",
            self.role,
            value.column_span(),
            value.type_span(metadata).unwrap_or_default()
        ))
    }

    /// Key, index, identifier and (for join tables) element columns must be distinct
    fn check_column_duplication(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        let mut check = |selectables: Vec<&Selectable>| -> Result<()> {
            for column in selectables.into_iter().filter_map(Selectable::as_column) {
                if !seen.insert(column.canonical_name()) {
                    return Err(MappingError::DuplicateColumn {
                        owner: format!("collection: {}", self.role),
                        column: column.name().to_string(),
                    });
                }
            }
            Ok(())
        };

        check(self.key.selectables())?;
        if let Some(index) = self.kind.index() {
            check(index.selectables())?;
        }
        if let Some(identifier) = self.kind.identifier() {
            check(identifier.selectables.iter().collect())?;
        }
        if !self.is_one_to_many() {
            check(self.element.selectables())?;
        }
        Ok(())
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Foreign key to the owner, then the primary key
    ///
    /// Maps also get a foreign key on an entity-valued index when non-inverse.
    pub fn create_all_keys(&self, metadata: &mut Metadata) -> Result<()> {
        metadata.create_foreign_key_of_entity(&self.key, &self.owner_entity_name)?;
        if self.inverse {
            return Ok(());
        }
        self.create_primary_key(&mut metadata.database)?;

        if let Some(Value::ToOne(index)) = self.kind.index() {
            let value = Value::ToOne(index.clone());
            metadata.create_foreign_key_of_entity(&value, &index.referenced_entity_name)?;
        }
        Ok(())
    }

    /// Create the collection table's primary key for this kind
    ///
    /// One-to-many collections and bags never get one.
    pub fn create_primary_key(&self, database: &mut Database) -> Result<()> {
        if self.is_one_to_many() {
            return Ok(());
        }
        let Some(table_id) = self.collection_table else {
            return Ok(());
        };

        let primary_key = match &self.kind {
            CollectionKind::Bag => return Ok(()),
            CollectionKind::Set => {
                let table = database.table(table_id)?;
                if table.primary_key().is_some() {
                    return Ok(());
                }
                let mut pk = PrimaryKey::new();
                pk.columns.extend(self.key.columns().iter().map(|c| c.name.clone()));
                for column in self.element.columns() {
                    let nullable = table
                        .column(&column.name)
                        .map_or(column.nullable, |c| c.nullable);
                    if !nullable && !pk.contains(&column.name) {
                        pk.columns.push(column.name.clone());
                    }
                }
                // A set without any non-null element column keeps no primary key.
                if pk.column_span() == self.key.column_span() {
                    return Ok(());
                }
                pk
            }
            CollectionKind::IdentifierBag { identifier } => {
                let mut pk = PrimaryKey::new();
                pk.columns.extend(
                    identifier
                        .selectables
                        .iter()
                        .filter_map(Selectable::as_column)
                        .map(|c| c.name.clone()),
                );
                pk
            }
            CollectionKind::List { index, .. }
            | CollectionKind::Array { index, .. }
            | CollectionKind::PrimitiveArray { index }
            | CollectionKind::Map { index } => {
                let table = database.table(table_id)?;
                let mut pk = PrimaryKey::new();
                pk.columns.extend(self.key.columns().iter().map(|c| c.name.clone()));

                let index_is_part_of_element = index.selectables().iter().any(|s| match s {
                    Selectable::Formula(_) => true,
                    Selectable::Column(c) => !table.has_column(&c.name),
                });
                let tail = if index_is_part_of_element {
                    self.element.columns()
                } else {
                    index.columns()
                };
                for column in tail {
                    if !pk.contains(&column.name) {
                        pk.columns.push(column.name.clone());
                    }
                }
                pk
            }
        };

        database.table_mut(table_id)?.set_primary_key(primary_key)?;
        Ok(())
    }
}
