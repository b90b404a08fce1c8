//! Identifier binding
//!
//! Three shapes: a basic `@Id` attribute, an aggregated `@EmbeddedId`, and a
//! non-aggregated group of `@Id` attributes. Only the first two are bound;
//! the non-aggregated shape fails with [`MappingError::Unsupported`].

use quarry_types::TableId;

use super::annotations::{Annotated, AnnotationKind};
use super::column::ColumnBinding;
use super::model::{AttributeMetadata, AttributeNature, EntityHierarchy, KeyMapping, MemberDetails};
use super::{BindingContext, BindingState};
use crate::mapping::{Component, EntityId, IdentifierGenerator, Property, SimpleValue, Value};
use crate::{MappingError, Result, quarry_trace_bind};

/// Default name of the hi/lo table used by `GenerationType.TABLE`
pub const DEFAULT_GENERATOR_TABLE: &str = "hibernate_sequences";

/// Binds the identifier of a hierarchy root
pub struct IdentifierBinding;

impl IdentifierBinding {
    /// Bind the identifier of `entity` and its primary key on `table`
    pub fn bind(
        hierarchy: &EntityHierarchy,
        entity: EntityId,
        table: TableId,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<()> {
        let root = &hierarchy.root;
        let entity_name = state.metadata.entity(entity)?.entity_name.clone();

        let (mut property, embedded) = match &hierarchy.id_mapping {
            KeyMapping::Basic { attribute } => {
                let attribute = Self::find(root.find_attribute(attribute), &entity_name, attribute)?;
                let value = Self::bind_basic(attribute, table, state, context)?;
                (Property::new(attribute.name.clone(), Value::Basic(value)), false)
            }
            KeyMapping::Aggregated { attribute } => {
                let attribute = Self::find(root.find_attribute(attribute), &entity_name, attribute)?;
                let component = Self::bind_aggregated(attribute, &entity_name, table, state, context)?;
                (Property::new(attribute.name.clone(), Value::Component(component)), true)
            }
            KeyMapping::NonAggregated { attributes, .. } => {
                return Err(MappingError::Unsupported(format!(
                    "non-aggregated composite identifier ({}) of {entity_name}",
                    attributes.join(", ")
                )));
            }
        };

        property.insertable = true;
        property.updateable = false;
        property.optional = false;

        let root_class = state.metadata.root_class_mut(entity)?;
        root_class.identifier = Some(property.value.clone());
        root_class.identifier_property = Some(property);
        root_class.embedded_identifier = embedded;

        quarry_trace_bind!("identifier", entity = %entity_name, embedded = embedded);
        Ok(())
    }

    fn find<'a>(
        attribute: Option<&'a AttributeMetadata>,
        entity_name: &str,
        name: &str,
    ) -> Result<&'a AttributeMetadata> {
        attribute.ok_or_else(|| {
            MappingError::Mapping(format!("identifier attribute '{name}' not found on {entity_name}"))
        })
    }

    /// One not-null column appended to the primary key
    fn bind_basic(
        attribute: &AttributeMetadata,
        table: TableId,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<SimpleValue> {
        let mut bound = ColumnBinding::bind(&attribute.member, &attribute.name, context)?;
        bound.column.nullable = false;

        let table_ref = state.metadata.database.table_mut(table)?;
        let column = table_ref.add_column(bound.column).clone();
        table_ref.add_primary_key_column(&column.name)?;

        let mut value = SimpleValue::new(Some(table))
            .column(column)
            .type_name(attribute.member.type_name.clone());
        value.identifier_generator = Some(Self::generator(&attribute.member, table_ref.name())?);
        Ok(value)
    }

    fn bind_aggregated(
        attribute: &AttributeMetadata,
        entity_name: &str,
        table: TableId,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<Component> {
        let embeddable = attribute.embeddable.as_ref().ok_or_else(|| {
            MappingError::Mapping(format!(
                "embedded identifier {entity_name}.{} has no embeddable type",
                attribute.name
            ))
        })?;

        let class = &embeddable.class;
        let mut component = Component::new(Some(table), Some(class.name.clone()));
        component.is_key = true;
        component.embedded = true;
        component.serializable = class.serializable;
        component.overrides_equals = class.overrides_equals;
        component.overrides_hash_code = class.overrides_hash_code;

        for part in &embeddable.attributes {
            if part.nature != AttributeNature::Basic {
                return Err(MappingError::Unsupported(format!(
                    "{:?} attribute {}.{} in embedded identifier of {entity_name}",
                    part.nature, class.name, part.name
                )));
            }
            let path = format!("{}.{}", attribute.name, part.name);
            let mut bound = ColumnBinding::bind(&part.member, &path, context)?;
            bound.column.nullable = false;

            let table_ref = state.metadata.database.table_mut(table)?;
            let column = table_ref.add_column(bound.column).clone();
            table_ref.add_primary_key_column(&column.name)?;

            let value = SimpleValue::new(Some(table))
                .column(column)
                .type_name(part.member.type_name.clone());
            component.add_property(Property::new(part.name.clone(), Value::Basic(value)));
        }
        Ok(component)
    }

    /// Generator from `@GeneratedValue` and `@SequenceGenerator`
    fn generator(member: &MemberDetails, table_name: &str) -> Result<IdentifierGenerator> {
        let Some(generated) = member.annotation(AnnotationKind::GeneratedValue) else {
            return Ok(IdentifierGenerator::Assigned);
        };
        let sequence = |member: &MemberDetails| -> Result<IdentifierGenerator> {
            let (name, initial, allocation) = match member.annotation(AnnotationKind::SequenceGenerator) {
                Some(usage) => (
                    usage.find_string("sequenceName")?,
                    usage.get_int("initialValue")?,
                    usage.get_int("allocationSize")?,
                ),
                None => (None, 1, 50),
            };
            Ok(IdentifierGenerator::Sequence {
                sequence_name: name.unwrap_or_else(|| format!("{table_name}_SEQ")),
                initial_value: initial,
                allocation_size: allocation,
            })
        };

        match generated.get_string("strategy")?.as_str() {
            "IDENTITY" => Ok(IdentifierGenerator::Identity),
            "SEQUENCE" => sequence(member),
            "TABLE" => Ok(IdentifierGenerator::Table {
                table_name: DEFAULT_GENERATOR_TABLE.to_string(),
            }),
            "UUID" => Ok(IdentifierGenerator::Uuid),
            "AUTO" if member.type_name.ends_with("UUID") => Ok(IdentifierGenerator::Uuid),
            "AUTO" => sequence(member),
            other => Err(MappingError::Mapping(format!("unknown generation strategy {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::BindingOptions;
    use crate::bind::annotations::AnnotationUsage;
    use crate::bind::model::{ClassDetails, EmbeddableTypeMetadata, EntityTypeMetadata};
    use crate::mapping::{InheritanceType, PersistentClass};
    use quarry_types::{Identifier, Table};

    fn bind(hierarchy: &EntityHierarchy) -> Result<(BindingState, EntityId, TableId)> {
        let mut state = BindingState::new();
        let context = BindingContext::new(BindingOptions::default())?;
        let table = state
            .metadata
            .database
            .add_table(Table::new(Identifier::new("Order", false)));
        let entity = state
            .metadata
            .add_root(PersistentClass::root("Order", table, InheritanceType::SingleTable))?;
        IdentifierBinding::bind(hierarchy, entity, table, &mut state, &context)?;
        Ok((state, entity, table))
    }

    #[test]
    fn test_basic_identifier() {
        let root = EntityTypeMetadata::new(ClassDetails::new("Order")).attribute(
            AttributeMetadata::basic("id", "Long")
                .annotated(AnnotationUsage::new(AnnotationKind::Id))
                .annotated(AnnotationUsage::new(AnnotationKind::GeneratedValue).with("strategy", "IDENTITY")),
        );
        let hierarchy = EntityHierarchy::new(root, KeyMapping::Basic { attribute: "id".into() });
        let (state, entity, table) = bind(&hierarchy).unwrap();

        let identifier = state.metadata.identifier(entity).unwrap().unwrap();
        assert!(identifier.as_simple().unwrap().is_identity_column());
        let table = state.metadata.database.table(table).unwrap();
        assert_eq!(table.primary_key().unwrap().columns, vec![Identifier::new("id", false)]);
        assert!(!table.column_by_name("id").unwrap().nullable);
    }

    #[test]
    fn test_default_sequence_name() {
        let root = EntityTypeMetadata::new(ClassDetails::new("Order")).attribute(
            AttributeMetadata::basic("id", "long")
                .annotated(AnnotationUsage::new(AnnotationKind::GeneratedValue)),
        );
        let hierarchy = EntityHierarchy::new(root, KeyMapping::Basic { attribute: "id".into() });
        let (state, entity, _) = bind(&hierarchy).unwrap();
        let generator = state
            .metadata
            .identifier(entity)
            .unwrap()
            .and_then(Value::as_simple)
            .and_then(|v| v.identifier_generator.clone());
        assert_eq!(
            generator,
            Some(IdentifierGenerator::Sequence {
                sequence_name: "Order_SEQ".into(),
                initial_value: 1,
                allocation_size: 50,
            })
        );
    }

    #[test]
    fn test_embedded_identifier_keeps_column_order() {
        let mut key_class = ClassDetails::new("OrderKey");
        key_class.serializable = true;
        let mut id = AttributeMetadata::basic("key", "OrderKey");
        id.nature = AttributeNature::Embedded;
        id.embeddable = Some(EmbeddableTypeMetadata {
            class: key_class,
            attributes: vec![
                AttributeMetadata::basic("region", "String"),
                AttributeMetadata::basic("number", "long"),
            ],
        });
        let root = EntityTypeMetadata::new(ClassDetails::new("Order")).attribute(id);
        let hierarchy = EntityHierarchy::new(root, KeyMapping::Aggregated { attribute: "key".into() });
        let (state, entity, table) = bind(&hierarchy).unwrap();

        let identifier = state.metadata.identifier(entity).unwrap().unwrap();
        let names: Vec<&str> = identifier.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["region", "number"]);
        let pk = &state.metadata.database.table(table).unwrap().primary_key().unwrap().columns;
        assert_eq!(pk.iter().map(Identifier::text).collect::<Vec<_>>(), names);
        assert!(state.metadata.root_class(entity).unwrap().embedded_identifier);
    }

    #[test]
    fn test_non_aggregated_unsupported() {
        let root = EntityTypeMetadata::new(ClassDetails::new("Order"));
        let hierarchy = EntityHierarchy::new(
            root,
            KeyMapping::NonAggregated {
                attributes: vec!["region".into(), "number".into()],
                id_class: None,
            },
        );
        assert!(matches!(bind(&hierarchy), Err(MappingError::Unsupported(_))));
    }

    #[test]
    fn test_missing_identifier_attribute() {
        let root = EntityTypeMetadata::new(ClassDetails::new("Order"));
        let hierarchy = EntityHierarchy::new(root, KeyMapping::Basic { attribute: "id".into() });
        assert!(matches!(bind(&hierarchy), Err(MappingError::Mapping(_))));
    }
}
