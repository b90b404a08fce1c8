//! Table binding
//!
//! An entity names its table through at most one of `@Table`, `@View` and
//! `@Subselect`. Table-per-class subclasses get a union table that repeats
//! the columns of their parent's table.

use quarry_types::{CheckConstraint, Table, TableId};

use super::annotations::{Annotated, AnnotationKind, AnnotationUsage};
use super::model::ClassDetails;
use super::{BindingContext, BindingState};
use crate::{MappingError, Result, quarry_trace_bind};

/// How an entity or secondary table reaches the database
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableReference {
    /// A regular table
    Physical { table: TableId, exportable: bool },
    /// A named read-only view
    View { table: TableId, query: String },
    /// An inline query aliased as a table
    InLineView { table: TableId, query: String },
    /// Table-per-class table repeating the columns of `included`
    Union { table: TableId, included: TableId },
    /// Secondary table joined to the primary table by key
    Secondary { table: TableId, optional: bool },
}

impl TableReference {
    /// The bound table
    #[must_use]
    pub fn table(&self) -> TableId {
        match self {
            Self::Physical { table, .. }
            | Self::View { table, .. }
            | Self::InLineView { table, .. }
            | Self::Union { table, .. }
            | Self::Secondary { table, .. } => *table,
        }
    }

    /// Whether DDL is generated for the table
    #[must_use]
    pub fn is_exportable(&self) -> bool {
        match self {
            Self::Physical { exportable, .. } => *exportable,
            Self::Union { .. } | Self::Secondary { .. } => true,
            Self::View { .. } | Self::InLineView { .. } => false,
        }
    }
}

/// Binds entity and secondary tables
pub struct TableBinding;

impl TableBinding {
    /// Bind the primary table of an entity
    ///
    /// `union_base` is the parent's table for a table-per-class subclass.
    /// Abstract classes of a table-per-class hierarchy get abstract tables.
    pub fn bind_entity_table(
        class: &ClassDetails,
        entity_name: &str,
        table_per_class: bool,
        union_base: Option<TableId>,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<TableReference> {
        Self::check_exclusive(class)?;

        let reference = if let Some(subselect) = class.annotation(AnnotationKind::Subselect) {
            let query = subselect.get_string("value")?;
            let table = Table::new(context.naming().table_name(None, entity_name)).subselect(query.clone());
            let table = state.metadata.database.add_table(table);
            TableReference::InLineView { table, query }
        } else if let Some(view) = class.annotation(AnnotationKind::View) {
            let query = view.get_string("query")?;
            let explicit = view.find_string("name")?;
            let table = Table::new(context.naming().table_name(explicit.as_deref(), entity_name))
                .subselect(query.clone());
            let table = state.metadata.database.add_table(table);
            TableReference::View { table, query }
        } else {
            let table = Self::named_table(class.annotation(AnnotationKind::Table), entity_name, context)?
                .abstract_table(table_per_class && class.is_abstract);
            match union_base {
                Some(included) => {
                    let table = state.metadata.database.add_denormalized_table(table, included)?;
                    TableReference::Union { table, included }
                }
                None => {
                    let table = state.metadata.database.add_table(table);
                    TableReference::Physical {
                        table,
                        exportable: true,
                    }
                }
            }
        };

        Self::apply_table_details(class, reference.table(), state)?;
        state.register_entity_table(entity_name, reference.clone());
        quarry_trace_bind!("table", entity = %entity_name, table = reference.table().0);
        Ok(reference)
    }

    /// Bind one `@SecondaryTable`
    pub fn bind_secondary_table(
        usage: &AnnotationUsage,
        entity_name: &str,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<TableReference> {
        let logical_name = usage.get_string("name")?;
        let table = Self::named_table(Some(usage), entity_name, context)?;
        let logical = table.name.clone();
        let table = state.metadata.database.add_table(table);
        let reference = TableReference::Secondary {
            table,
            optional: usage.get_bool("optional")?,
        };
        state.register_secondary_table(entity_name, &logical, reference.clone());
        quarry_trace_bind!("secondary_table", entity = %entity_name, table = %logical_name);
        Ok(reference)
    }

    fn check_exclusive(class: &ClassDetails) -> Result<()> {
        let declared: Vec<AnnotationKind> = [
            AnnotationKind::Table,
            AnnotationKind::View,
            AnnotationKind::Subselect,
        ]
        .into_iter()
        .filter(|kind| class.has_annotation(*kind))
        .collect();

        if let [first, second, ..] = declared.as_slice() {
            return Err(MappingError::ConflictingAnnotations {
                owner: class.name.clone(),
                first: first.name(),
                second: second.name(),
            });
        }
        Ok(())
    }

    fn named_table(
        usage: Option<&AnnotationUsage>,
        entity_name: &str,
        context: &BindingContext,
    ) -> Result<Table> {
        let naming = context.naming();
        let (name, schema, catalog) = match usage {
            Some(usage) => (
                usage.find_string("name")?,
                usage.find_string("schema")?,
                usage.find_string("catalog")?,
            ),
            None => (None, None, None),
        };
        Ok(Table::new(naming.table_name(name.as_deref(), entity_name))
            .schema(naming.schema_name(schema.as_deref()))
            .catalog(naming.catalog_name(catalog.as_deref())))
    }

    /// `@Comment` and `@Check` on the entity class
    fn apply_table_details(class: &ClassDetails, table: TableId, state: &mut BindingState) -> Result<()> {
        let table = state.metadata.database.table_mut(table)?;
        if let Some(comment) = class.annotation(AnnotationKind::Comment) {
            table.comment = Some(comment.get_string("value")?);
        }
        if let Some(check) = class.annotation(AnnotationKind::Check) {
            let mut constraint = CheckConstraint::new(check.get_string("constraints")?);
            if let Some(name) = check.find_string("name")? {
                constraint = constraint.named(name);
            }
            table.add_check(constraint);
        }
        Ok(())
    }
}
