//! Attribute binding
//!
//! Only basic attributes are bound here. Embedded, any, to-one and plural
//! attributes fail with [`MappingError::Unsupported`] instead of producing a
//! partial mapping.

use quarry_types::{Formula, Identifier, TableId};

use super::annotations::{Annotated, AnnotationKind};
use super::column::ColumnBinding;
use super::model::{AttributeMetadata, AttributeNature};
use super::{BindingContext, BindingState};
use crate::mapping::{Property, SimpleValue, Value};
use crate::{MappingError, Result, quarry_trace_bind};

/// A bound attribute and the table its columns landed in
#[derive(Clone, Debug, PartialEq)]
pub struct BoundAttribute {
    pub property: Property,
    pub table: TableId,
}

/// Binds one persistent attribute to a [`Property`]
pub struct AttributeBinding;

impl AttributeBinding {
    /// Bind `attribute` of `entity_name`, whose primary table is `table`
    ///
    /// Returns `None` for `@Transient` attributes.
    pub fn bind(
        attribute: &AttributeMetadata,
        entity_name: &str,
        table: TableId,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<Option<BoundAttribute>> {
        let member = &attribute.member;
        if member.has_annotation(AnnotationKind::Transient) {
            return Ok(None);
        }
        if attribute.nature != AttributeNature::Basic {
            return Err(MappingError::Unsupported(format!(
                "{:?} attribute {entity_name}.{}",
                attribute.nature, attribute.name
            )));
        }

        if let Some(formula) = member.annotation(AnnotationKind::Formula) {
            let value = SimpleValue::new(Some(table))
                .formula(Formula::new(formula.get_string("value")?))
                .type_name(member.type_name.clone());
            let mut property = Property::new(attribute.name.clone(), Value::Basic(value));
            property.insertable = false;
            property.updateable = false;
            return Ok(Some(BoundAttribute { property, table }));
        }

        let mut bound = ColumnBinding::bind(member, &attribute.name, context)?;
        let target = match &bound.table {
            Some(name) => Self::resolve_table(name, entity_name, table, state)?,
            None => table,
        };

        let mut property_lazy = false;
        let mut optional = true;
        if let Some(basic) = member.annotation(AnnotationKind::Basic) {
            optional = basic.get_bool("optional")?;
            property_lazy = basic.get_string("fetch")? == "LAZY";
        }
        if !optional {
            bound.column.nullable = false;
        }

        let column = state
            .metadata
            .database
            .table_mut(target)?
            .add_column(bound.column)
            .clone();
        let value = SimpleValue::new(Some(target))
            .column(column)
            .type_name(member.type_name.clone());

        let mut property = Property::new(attribute.name.clone(), Value::Basic(value));
        property.insertable = bound.insertable;
        property.updateable = bound.updatable;
        property.lazy = property_lazy;
        property.optional = optional;

        quarry_trace_bind!("attribute", entity = %entity_name, attribute = %attribute.name);
        Ok(Some(BoundAttribute {
            property,
            table: target,
        }))
    }

    /// Table named by `@Column(table = ...)`: a secondary table or the primary one
    fn resolve_table(
        name: &str,
        entity_name: &str,
        primary: TableId,
        state: &BindingState,
    ) -> Result<TableId> {
        if let Some(secondary) = state.secondary_table(entity_name, name) {
            return Ok(secondary);
        }
        let primary_name = &state.metadata.database.table(primary)?.name;
        if Identifier::to_identifier(name).is_some_and(|n| n.matches(primary_name)) {
            return Ok(primary);
        }
        Err(MappingError::Mapping(format!(
            "table '{name}' referenced by a column of {entity_name} is neither its primary nor a secondary table"
        )))
    }
}
