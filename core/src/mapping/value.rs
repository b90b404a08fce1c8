//! Values: what an attribute, key or collection part maps to
//!
//! [`Value`] is a closed set of variants. Column span is what the mapping
//! declares; type span is what the resolved type needs. They must agree
//! for a value to be valid.

use std::collections::BTreeMap;

use quarry_types::{Column, Formula, Selectable, TableId};
use serde::{Deserialize, Serialize};

use super::{Metadata, Property};
use crate::{MappingError, Result};

// =============================================================================
// Identifier generation
// =============================================================================

/// How identifier values are produced
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "strategy")]
pub enum IdentifierGenerator {
    /// Application assigns the value
    Assigned,
    /// Database identity/auto-increment column
    Identity,
    /// Database sequence
    Sequence {
        sequence_name: String,
        initial_value: i64,
        allocation_size: i64,
    },
    /// Hi/lo table
    Table { table_name: String },
    /// Random UUID
    Uuid,
}

impl IdentifierGenerator {
    /// Short strategy name
    #[must_use]
    pub const fn strategy_name(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Identity => "identity",
            Self::Sequence { .. } => "sequence",
            Self::Table { .. } => "table",
            Self::Uuid => "uuid",
        }
    }
}

// =============================================================================
// SimpleValue
// =============================================================================

/// One or more columns with a basic type
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleValue {
    pub table: Option<TableId>,
    pub selectables: Vec<Selectable>,
    pub type_name: Option<String>,
    #[serde(default)]
    pub type_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub identifier_generator: Option<IdentifierGenerator>,
    #[serde(default)]
    pub foreign_key_name: Option<String>,
    #[serde(default)]
    pub cascade_delete_enabled: bool,
}

impl SimpleValue {
    /// Empty value bound to `table`
    #[must_use]
    pub fn new(table: Option<TableId>) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    /// Add a column
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Add a formula
    #[must_use]
    pub fn formula(mut self, formula: Formula) -> Self {
        self.selectables.push(Selectable::Formula(formula));
        self
    }

    /// Set the type name
    #[must_use]
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Append a column, stamping its type slot with its position
    pub fn add_column(&mut self, mut column: Column) {
        if self
            .selectables
            .iter()
            .filter_map(Selectable::as_column)
            .any(|c| c.name.matches(&column.name))
        {
            return;
        }
        column.type_index = self.selectables.len();
        self.selectables.push(Selectable::Column(column));
    }

    /// Whether the generator is database identity
    #[must_use]
    pub fn is_identity_column(&self) -> bool {
        matches!(self.identifier_generator, Some(IdentifierGenerator::Identity))
    }

    /// Whether any selectable is a formula
    #[must_use]
    pub fn has_formula(&self) -> bool {
        self.selectables.iter().any(Selectable::is_formula)
    }
}

// =============================================================================
// Component
// =============================================================================

/// An embeddable: an ordered group of properties
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub table: Option<TableId>,
    pub component_class_name: Option<String>,
    pub properties: Vec<Property>,
    /// Used as an identifier
    #[serde(default)]
    pub is_key: bool,
    #[serde(default)]
    pub embedded: bool,
    #[serde(default)]
    pub serializable: bool,
    #[serde(default)]
    pub overrides_equals: bool,
    #[serde(default)]
    pub overrides_hash_code: bool,
}

impl Component {
    #[must_use]
    pub fn new(table: Option<TableId>, component_class_name: Option<String>) -> Self {
        Self {
            table,
            component_class_name,
            ..Self::default()
        }
    }

    /// Append a property
    pub fn add_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Whether the class can serve as a composite identifier
    #[inline]
    #[must_use]
    pub fn is_serializable_id(&self) -> bool {
        self.serializable
    }

    /// Whether both `equals` and `hashCode` are overridden
    #[inline]
    #[must_use]
    pub fn overrides_equals_hash_code(&self) -> bool {
        self.overrides_equals && self.overrides_hash_code
    }
}

// =============================================================================
// Associations
// =============================================================================

/// Shape of a to-one association
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToOneKind {
    ManyToOne,
    /// Shares the primary key when `constrained`
    OneToOne { constrained: bool },
}

/// Many-to-one or one-to-one
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToOne {
    pub kind: ToOneKind,
    pub value: SimpleValue,
    pub referenced_entity_name: String,
    #[serde(default)]
    pub referenced_property_name: Option<String>,
    #[serde(default)]
    pub lazy: bool,
    #[serde(default)]
    pub unwrap_proxy: bool,
    #[serde(default)]
    pub ignore_not_found: bool,
}

impl ToOne {
    /// Many-to-one over `value` pointing at `entity`
    #[must_use]
    pub fn many_to_one(value: SimpleValue, entity: impl Into<String>) -> Self {
        Self {
            kind: ToOneKind::ManyToOne,
            value,
            referenced_entity_name: entity.into(),
            referenced_property_name: None,
            lazy: true,
            unwrap_proxy: false,
            ignore_not_found: false,
        }
    }

    /// Whether the association references the target's primary key
    #[must_use]
    pub fn is_referencing_primary_key(&self) -> bool {
        self.referenced_property_name.is_none()
    }
}

/// Element of a one-to-many collection: rows of another entity's table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneToMany {
    pub associated_entity_name: String,
    #[serde(default)]
    pub ignore_not_found: bool,
}

/// A key whose type is borrowed from another value
///
/// Collection keys and joined-subclass keys repeat the owner's identifier
/// type under their own columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependantValue {
    pub value: SimpleValue,
    /// Number of columns the wrapped key type needs
    pub prototype_span: usize,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default = "default_true")]
    pub updateable: bool,
}

const fn default_true() -> bool {
    true
}

impl DependantValue {
    #[must_use]
    pub fn new(value: SimpleValue, prototype_span: usize) -> Self {
        Self {
            value,
            prototype_span,
            nullable: true,
            updateable: true,
        }
    }
}

// =============================================================================
// Value
// =============================================================================

/// What a property, key, index or element maps to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Value {
    Basic(SimpleValue),
    Component(Component),
    ToOne(ToOne),
    OneToMany(OneToMany),
    Dependant(DependantValue),
    /// Collection-valued property, by role
    Collection { role: String },
}

impl Value {
    /// Owning table
    #[must_use]
    pub fn table(&self) -> Option<TableId> {
        match self {
            Value::Basic(v) => v.table,
            Value::Component(c) => c.table,
            Value::ToOne(t) => t.value.table,
            Value::Dependant(d) => d.value.table,
            Value::OneToMany(_) | Value::Collection { .. } => None,
        }
    }

    /// Columns and formulas in type-slot order
    #[must_use]
    pub fn selectables(&self) -> Vec<&Selectable> {
        match self {
            Value::Basic(v) => v.selectables.iter().collect(),
            Value::ToOne(t) => t.value.selectables.iter().collect(),
            Value::Dependant(d) => d.value.selectables.iter().collect(),
            Value::Component(c) => c
                .properties
                .iter()
                .flat_map(|p| p.value.selectables())
                .collect(),
            Value::OneToMany(_) | Value::Collection { .. } => Vec::new(),
        }
    }

    /// Physical columns only
    #[must_use]
    pub fn columns(&self) -> Vec<&Column> {
        self.selectables()
            .into_iter()
            .filter_map(Selectable::as_column)
            .collect()
    }

    /// Declared number of columns and formulas
    #[must_use]
    pub fn column_span(&self) -> usize {
        self.selectables().len()
    }

    /// Whether any selectable is a formula
    #[must_use]
    pub fn has_formula(&self) -> bool {
        self.selectables().iter().any(|s| s.is_formula())
    }

    /// Number of columns the resolved type needs
    pub fn type_span(&self, metadata: &Metadata) -> Result<usize> {
        match self {
            Value::Basic(_) => Ok(1),
            Value::Component(c) => c
                .properties
                .iter()
                .map(|p| p.value.type_span(metadata))
                .sum(),
            Value::ToOne(t) => match t.kind {
                ToOneKind::OneToOne { .. } if t.value.selectables.is_empty() => Ok(0),
                _ => metadata.referenced_span(&t.referenced_entity_name, t.referenced_property_name.as_deref()),
            },
            Value::Dependant(d) => Ok(d.prototype_span),
            Value::OneToMany(_) | Value::Collection { .. } => Ok(0),
        }
    }

    /// Whether column span equals type span
    pub fn is_valid(&self, metadata: &Metadata) -> Result<bool> {
        match self {
            Value::OneToMany(o) => {
                if metadata.entity_by_name(&o.associated_entity_name).is_none() {
                    return Err(MappingError::UnknownEntity(o.associated_entity_name.clone()));
                }
                Ok(true)
            }
            _ => Ok(self.column_span() == self.type_span(metadata)?),
        }
    }

    /// Whether every column accepts NULL
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            Value::Dependant(d) => d.nullable,
            _ => self.columns().iter().all(|c| c.nullable),
        }
    }

    /// Whether the key cascades deletes at the database level
    #[must_use]
    pub fn is_cascade_delete_enabled(&self) -> bool {
        match self {
            Value::Basic(v) => v.cascade_delete_enabled,
            Value::Dependant(d) => d.value.cascade_delete_enabled,
            Value::ToOne(t) => t.value.cascade_delete_enabled,
            _ => false,
        }
    }

    /// The simple value underneath, when there is one
    #[must_use]
    pub fn as_simple(&self) -> Option<&SimpleValue> {
        match self {
            Value::Basic(v) => Some(v),
            Value::ToOne(t) => Some(&t.value),
            Value::Dependant(d) => Some(&d.value),
            _ => None,
        }
    }

    /// The component, when this is one
    #[must_use]
    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Value::Component(c) => Some(c),
            _ => None,
        }
    }

    /// Whether this is a to-one association
    #[inline]
    #[must_use]
    pub fn is_to_one(&self) -> bool {
        matches!(self, Value::ToOne(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Property;

    #[test]
    fn test_add_column_stamps_type_index() {
        let value = SimpleValue::new(None)
            .column(Column::new("a"))
            .column(Column::new("b"))
            .column(Column::new("A"));
        let slots: Vec<usize> = value
            .selectables
            .iter()
            .filter_map(Selectable::as_column)
            .map(|c| c.type_index)
            .collect();
        assert_eq!(slots, vec![0, 1]);
    }

    #[test]
    fn test_basic_span_validity() {
        let metadata = Metadata::new();
        let one = Value::Basic(SimpleValue::new(None).column(Column::new("a")));
        let two = Value::Basic(
            SimpleValue::new(None)
                .column(Column::new("a"))
                .column(Column::new("b")),
        );
        assert!(one.is_valid(&metadata).unwrap());
        assert!(!two.is_valid(&metadata).unwrap());
    }

    #[test]
    fn test_component_flattens_in_property_order() {
        let mut component = Component::new(None, Some("OrderLineId".into()));
        component.add_property(Property::new(
            "orderId",
            Value::Basic(SimpleValue::new(None).column(Column::new("order_id"))),
        ));
        component.add_property(Property::new(
            "lineNo",
            Value::Basic(SimpleValue::new(None).column(Column::new("line_no"))),
        ));
        let value = Value::Component(component);
        let names: Vec<&str> = value.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["order_id", "line_no"]);
        assert_eq!(value.type_span(&Metadata::new()).unwrap(), 2);
    }

    #[test]
    fn test_formula_counts_toward_span() {
        let value = Value::Basic(SimpleValue::new(None).formula(Formula::new("upper(code)")));
        assert!(value.has_formula());
        assert!(value.columns().is_empty());
        assert!(value.is_valid(&Metadata::new()).unwrap());
    }

    #[test]
    fn test_one_to_many_requires_known_entity() {
        let value = Value::OneToMany(OneToMany {
            associated_entity_name: "Missing".into(),
            ignore_not_found: false,
        });
        assert!(matches!(
            value.is_valid(&Metadata::new()),
            Err(MappingError::UnknownEntity(_))
        ));
    }
}
