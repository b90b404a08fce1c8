//! Discriminator binding
//!
//! Whether a hierarchy gets a discriminator depends on its strategy:
//!
//! | Strategy | Explicit declaration | No declaration |
//! |---|---|---|
//! | `TABLE_PER_CLASS` | skipped | skipped |
//! | `JOINED` | bound unless explicit discriminators are ignored | bound only when implicit discriminators are enabled |
//! | `SINGLE_TABLE` | bound when the root has subtypes | bound when the root has subtypes |

use quarry_types::{Column, Formula, QuotedIdentifierTarget, TableId};

use super::annotations::{Annotated, AnnotationKind, AnnotationUsage};
use super::model::EntityTypeMetadata;
use super::{BindingContext, BindingState};
use crate::mapping::{DiscriminatorType, EntityId, InheritanceType, SimpleValue};
use crate::{MappingError, Result, quarry_trace_bind};

/// Binds the discriminator of a hierarchy root
pub struct DiscriminatorBinding;

impl DiscriminatorBinding {
    /// Bind the discriminator of `entity`, if its strategy calls for one
    ///
    /// Returns whether a discriminator was bound.
    pub fn bind(
        root: &EntityTypeMetadata,
        inheritance: InheritanceType,
        entity: EntityId,
        table: TableId,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<bool> {
        let class = &root.class;
        let column = class.annotation(AnnotationKind::DiscriminatorColumn);
        let formula = class.annotation(AnnotationKind::DiscriminatorFormula);
        if column.is_some() && formula.is_some() {
            return Err(MappingError::ConflictingAnnotations {
                owner: class.name.clone(),
                first: AnnotationKind::DiscriminatorColumn.name(),
                second: AnnotationKind::DiscriminatorFormula.name(),
            });
        }

        if !Self::is_needed(root, inheritance, column.is_some() || formula.is_some(), context) {
            return Ok(false);
        }

        let (value, discriminator_type) = match formula {
            Some(formula) => {
                let discriminator_type = Self::parse_type(formula)?;
                let value = SimpleValue::new(Some(table))
                    .formula(Formula::new(formula.get_string("value")?))
                    .type_name(discriminator_type_name(discriminator_type));
                (value, discriminator_type)
            }
            None => Self::bind_column(column, table, state, context)?,
        };

        let root_class = state.metadata.root_class_mut(entity)?;
        root_class.discriminator_insertable = !value.has_formula();
        root_class.discriminator = Some(value);
        root_class.discriminator_type = discriminator_type;

        quarry_trace_bind!("discriminator", entity = %class.name, strategy = ?inheritance);
        Ok(true)
    }

    fn is_needed(
        root: &EntityTypeMetadata,
        inheritance: InheritanceType,
        explicit: bool,
        context: &BindingContext,
    ) -> bool {
        let options = context.options();
        match inheritance {
            InheritanceType::TablePerClass => false,
            InheritanceType::Joined if explicit => {
                !options.ignore_explicit_discriminator_columns_for_joined_subclass
            }
            InheritanceType::Joined => options.implicit_discriminators_for_joined_inheritance,
            InheritanceType::SingleTable => root.has_sub_types(),
        }
    }

    fn parse_type(usage: &AnnotationUsage) -> Result<DiscriminatorType> {
        let text = usage.get_string("discriminatorType")?;
        DiscriminatorType::parse(&text)
            .ok_or_else(|| MappingError::Mapping(format!("unknown discriminator type {text}")))
    }

    /// Not-null column from `@DiscriminatorColumn`, or the implicit `DTYPE`
    fn bind_column(
        usage: Option<&AnnotationUsage>,
        table: TableId,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<(SimpleValue, DiscriminatorType)> {
        let (name, discriminator_type, length, definition) = match usage {
            Some(usage) => (
                usage.find_string("name")?,
                Self::parse_type(usage)?,
                usage.get_int("length")?,
                usage.find_string("columnDefinition")?,
            ),
            None => (None, DiscriminatorType::String, 31, None),
        };

        let identifier = context.naming().resolve(
            name.as_deref(),
            |s| s.discriminator_column_name().to_string(),
            QuotedIdentifierTarget::ColumnName,
        );
        let mut column = Column::from_identifier(identifier).not_null();
        match (definition, discriminator_type) {
            (Some(definition), _) => column.sql_type = Some(definition),
            (None, DiscriminatorType::String) => {
                column.sql_type = Some("varchar".into());
                column.length = u64::try_from(length).ok();
            }
            (None, DiscriminatorType::Char) => column.sql_type = Some("char(1)".into()),
            (None, DiscriminatorType::Integer) => column.sql_type = Some("integer".into()),
        }

        let column = state.metadata.database.table_mut(table)?.add_column(column).clone();
        let value = SimpleValue::new(Some(table))
            .column(column)
            .type_name(discriminator_type_name(discriminator_type));
        Ok((value, discriminator_type))
    }
}

fn discriminator_type_name(discriminator_type: DiscriminatorType) -> &'static str {
    match discriminator_type {
        DiscriminatorType::String => "String",
        DiscriminatorType::Char => "Character",
        DiscriminatorType::Integer => "Integer",
    }
}
