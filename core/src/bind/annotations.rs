//! Annotation usages
//!
//! Annotation attributes are read through one accessor family that returns
//! the explicit value when present and the annotation's declared default
//! otherwise. Attributes with no default must be supplied.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{MappingError, Result};

/// Annotations the binder understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnnotationKind {
    // Entity and tables
    Entity,
    MappedSuperclass,
    Embeddable,
    Table,
    View,
    Subselect,
    SecondaryTable,
    SecondaryTables,
    PrimaryKeyJoinColumn,
    PrimaryKeyJoinColumns,
    Check,
    Comment,

    // Inheritance
    Inheritance,
    DiscriminatorColumn,
    DiscriminatorFormula,
    DiscriminatorValue,

    // Identifier, version, tenant
    Id,
    EmbeddedId,
    GeneratedValue,
    SequenceGenerator,
    Version,
    TenantId,

    // Attributes
    Basic,
    Column,
    Formula,
    Transient,

    // Entity behavior
    OptimisticLocking,
    Cacheable,
    Cache,
    NaturalIdCache,
    SoftDelete,
    Filter,
    Filters,
    Immutable,
    DynamicInsert,
    DynamicUpdate,
    BatchSize,
    SQLRestriction,

    // Lifecycle callbacks
    PrePersist,
    PostPersist,
    PreUpdate,
    PostUpdate,
    PreRemove,
    PostRemove,
    PostLoad,
}

impl AnnotationKind {
    /// Annotation name without the `@`
    #[must_use]
    pub fn name(&self) -> String {
        format!("{self:?}")
    }

    /// Declared default of `attribute`, if it has one
    #[must_use]
    pub fn default_value(&self, attribute: &str) -> Option<AttributeValue> {
        use AnnotationKind as K;
        use AttributeValue as V;

        let text = |s: &str| Some(V::Str(s.to_string()));
        match (self, attribute) {
            (K::Entity, "name") => text(""),
            (K::Table, "name") => text(""),
            (K::Table | K::SecondaryTable, "schema" | "catalog") => text(""),
            (K::SecondaryTable, "pkJoinColumns") => Some(V::List(Vec::new())),
            (K::SecondaryTable, "optional") => Some(V::Bool(true)),
            (K::PrimaryKeyJoinColumn, "name" | "referencedColumnName" | "columnDefinition") => text(""),
            (K::View, "name") => text(""),
            (K::Check, "name") => text(""),

            (K::Inheritance, "strategy") => text("SINGLE_TABLE"),
            (K::DiscriminatorColumn, "name") => text("DTYPE"),
            (K::DiscriminatorColumn, "discriminatorType") => text("STRING"),
            (K::DiscriminatorColumn, "length") => Some(V::Int(31)),
            (K::DiscriminatorColumn, "columnDefinition") => text(""),
            (K::DiscriminatorFormula, "discriminatorType") => text("STRING"),

            (K::GeneratedValue, "strategy") => text("AUTO"),
            (K::GeneratedValue, "generator") => text(""),
            (K::SequenceGenerator, "sequenceName") => text(""),
            (K::SequenceGenerator, "initialValue") => Some(V::Int(1)),
            (K::SequenceGenerator, "allocationSize") => Some(V::Int(50)),

            (K::Basic, "optional") => Some(V::Bool(true)),
            (K::Basic, "fetch") => text("EAGER"),
            (K::Column, "name" | "table" | "columnDefinition" | "comment" | "check") => text(""),
            (K::Column, "nullable" | "insertable" | "updatable") => Some(V::Bool(true)),
            (K::Column, "unique") => Some(V::Bool(false)),
            (K::Column, "length") => Some(V::Int(255)),
            (K::Column, "precision" | "scale") => Some(V::Int(0)),

            (K::OptimisticLocking, "type") => text("VERSION"),
            (K::Cacheable, "value") => Some(V::Bool(true)),
            (K::Cache, "region") => text(""),
            (K::Cache, "includeLazy") => Some(V::Bool(true)),
            (K::NaturalIdCache, "region") => text(""),
            (K::SoftDelete, "columnName") => text(""),
            (K::SoftDelete, "strategy") => text("DELETED"),
            (K::Filter, "condition") => text(""),
            (K::Filter, "deduceAliasInjectionPoints") => Some(V::Bool(true)),
            (K::DynamicInsert | K::DynamicUpdate, "value") => Some(V::Bool(true)),
            _ => None,
        }
    }
}

/// An annotation attribute value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<AttributeValue>),
    Nested(Box<AnnotationUsage>),
}

/// One annotation applied to a class, member or method
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationUsage {
    pub kind: AnnotationKind,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl AnnotationUsage {
    /// Annotation with no explicit attributes
    #[must_use]
    pub fn new(kind: AnnotationKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Explicit value or the declared default
    pub fn get(&self, attribute: &str) -> Result<AttributeValue> {
        self.attributes
            .get(attribute)
            .cloned()
            .or_else(|| self.kind.default_value(attribute))
            .ok_or_else(|| {
                MappingError::Mapping(format!(
                    "@{} requires attribute '{attribute}'",
                    self.kind.name()
                ))
            })
    }

    fn type_error(&self, attribute: &str, expected: &str) -> MappingError {
        MappingError::Mapping(format!(
            "@{}.{attribute} must be a {expected}",
            self.kind.name()
        ))
    }

    /// String attribute
    pub fn get_string(&self, attribute: &str) -> Result<String> {
        match self.get(attribute)? {
            AttributeValue::Str(s) => Ok(s),
            _ => Err(self.type_error(attribute, "string")),
        }
    }

    /// String attribute, `None` when blank
    pub fn find_string(&self, attribute: &str) -> Result<Option<String>> {
        let value = self.get_string(attribute)?;
        Ok((!value.trim().is_empty()).then_some(value))
    }

    /// Boolean attribute
    pub fn get_bool(&self, attribute: &str) -> Result<bool> {
        match self.get(attribute)? {
            AttributeValue::Bool(b) => Ok(b),
            _ => Err(self.type_error(attribute, "boolean")),
        }
    }

    /// Integer attribute
    pub fn get_int(&self, attribute: &str) -> Result<i64> {
        match self.get(attribute)? {
            AttributeValue::Int(i) => Ok(i),
            _ => Err(self.type_error(attribute, "integer")),
        }
    }

    /// Nested annotations, accepting a single nested value as a one-element list
    pub fn get_nested_list(&self, attribute: &str) -> Result<Vec<AnnotationUsage>> {
        match self.get(attribute)? {
            AttributeValue::Nested(usage) => Ok(vec![*usage]),
            AttributeValue::List(values) => values
                .into_iter()
                .map(|value| match value {
                    AttributeValue::Nested(usage) => Ok(*usage),
                    _ => Err(self.type_error(attribute, "list of annotations")),
                })
                .collect(),
            _ => Err(self.type_error(attribute, "list of annotations")),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<AnnotationUsage> for AttributeValue {
    fn from(value: AnnotationUsage) -> Self {
        AttributeValue::Nested(Box::new(value))
    }
}

impl From<Vec<AnnotationUsage>> for AttributeValue {
    fn from(value: Vec<AnnotationUsage>) -> Self {
        AttributeValue::List(value.into_iter().map(AttributeValue::from).collect())
    }
}

/// Something annotations can be placed on
pub trait Annotated {
    /// Annotations in declaration order
    fn annotations(&self) -> &[AnnotationUsage];

    /// First usage of `kind`
    fn annotation(&self, kind: AnnotationKind) -> Option<&AnnotationUsage> {
        self.annotations().iter().find(|a| a.kind == kind)
    }

    /// Whether `kind` is present
    fn has_annotation(&self, kind: AnnotationKind) -> bool {
        self.annotation(kind).is_some()
    }

    /// Usages of a repeatable annotation, whether given directly or through
    /// its container's `value`
    fn repeated(&self, kind: AnnotationKind, container: AnnotationKind) -> Result<Vec<AnnotationUsage>> {
        let mut usages: Vec<AnnotationUsage> = self
            .annotations()
            .iter()
            .filter(|a| a.kind == kind)
            .cloned()
            .collect();
        if let Some(container) = self.annotation(container) {
            usages.extend(container.get_nested_list("value")?);
        }
        Ok(usages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply() {
        let column = AnnotationUsage::new(AnnotationKind::Column);
        assert!(column.get_bool("nullable").unwrap());
        assert_eq!(column.get_int("length").unwrap(), 255);
        assert_eq!(column.find_string("name").unwrap(), None);
    }

    #[test]
    fn test_explicit_wins() {
        let column = AnnotationUsage::new(AnnotationKind::Column)
            .with("name", "unit_price")
            .with("nullable", false);
        assert_eq!(column.find_string("name").unwrap().as_deref(), Some("unit_price"));
        assert!(!column.get_bool("nullable").unwrap());
    }

    #[test]
    fn test_required_attribute_missing() {
        let generator = AnnotationUsage::new(AnnotationKind::BatchSize);
        assert!(generator.get_int("size").is_err());
    }

    #[test]
    fn test_wrong_type() {
        let column = AnnotationUsage::new(AnnotationKind::Column).with("length", "long");
        assert!(column.get_int("length").is_err());
    }

    #[test]
    fn test_nested_from_json() {
        let usage: AnnotationUsage = serde_json::from_str(
            r#"{
                "kind": "SecondaryTables",
                "attributes": {
                    "value": [
                        {"kind": "SecondaryTable", "attributes": {"name": "order_details"}},
                        {"kind": "SecondaryTable", "attributes": {"name": "order_audit"}}
                    ]
                }
            }"#,
        )
        .unwrap();
        let tables = usage.get_nested_list("value").unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].get_string("name").unwrap(), "order_audit");
    }

    #[test]
    fn test_secondary_table_name_is_required() {
        let table = AnnotationUsage::new(AnnotationKind::SecondaryTable);
        assert!(table.get_string("name").is_err());
        assert_eq!(table.get_string("schema").unwrap(), "");
    }
}
