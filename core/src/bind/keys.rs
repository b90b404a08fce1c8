//! Primary-key join handshakes
//!
//! A joined subclass table and a secondary table both repeat the primary key
//! of another table under their own column names, then reference it with a
//! foreign key. The referenced key may not exist yet when the joining table
//! is bound, so both handshakes run as second passes.

use quarry_types::{Column, Identifier, PrimaryKey, Table, TableId};

use super::annotations::{Annotated, AnnotationKind, AnnotationUsage};
use super::second_pass::ResolutionCallback;
use super::{BindingContext, BindingState, NamingContext};
use crate::mapping::{DependantValue, EntityId, PersistentClassKind, SimpleValue, SubclassStrategy};
use crate::{MappingError, Result};

/// One `@PrimaryKeyJoinColumn`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimaryKeyJoinColumn {
    pub name: Option<String>,
    pub referenced_column_name: Option<String>,
    pub column_definition: Option<String>,
}

impl PrimaryKeyJoinColumn {
    /// Read one annotation usage
    pub fn from_usage(usage: &AnnotationUsage) -> Result<Self> {
        Ok(Self {
            name: usage.find_string("name")?,
            referenced_column_name: usage.find_string("referencedColumnName")?,
            column_definition: usage.find_string("columnDefinition")?,
        })
    }

    /// Join columns declared directly on a class
    pub fn declared_on(annotated: &impl Annotated) -> Result<Vec<Self>> {
        annotated
            .repeated(AnnotationKind::PrimaryKeyJoinColumn, AnnotationKind::PrimaryKeyJoinColumns)?
            .iter()
            .map(Self::from_usage)
            .collect()
    }
}

/// Pair each referenced primary-key column with the name of its join column
///
/// Without declarations every key column is repeated under its implicit
/// name. Declarations that all omit `referencedColumnName` match the key
/// positionally; otherwise each must name a distinct key column.
fn match_join_columns(
    owner: &str,
    declared: &[PrimaryKeyJoinColumn],
    target: &Table,
    naming: &NamingContext,
) -> Result<Vec<(Identifier, Column)>> {
    let key: Vec<&Column> = target.primary_key_columns();
    let implicit = |referenced: &Column| {
        naming.resolve(
            None,
            |s| s.primary_key_join_column_name(target.name(), referenced.name()),
            quarry_types::QuotedIdentifierTarget::ColumnName,
        )
    };
    let explicit = |join_column: &PrimaryKeyJoinColumn, referenced: &Column| match &join_column.name {
        Some(name) => naming.column_name(Some(name), referenced.name()),
        None => implicit(referenced),
    };

    if declared.is_empty() {
        return Ok(key.iter().map(|c| (implicit(c), (*c).clone())).collect());
    }

    if declared.len() != key.len() {
        return Err(MappingError::Mapping(format!(
            "{owner}: {} primary key join column(s) declared but table '{}' has {} primary key column(s)",
            declared.len(),
            target.name(),
            key.len()
        )));
    }

    if declared.iter().all(|join_column| join_column.referenced_column_name.is_none()) {
        return Ok(declared
            .iter()
            .zip(key.iter())
            .map(|(join_column, referenced)| (explicit(join_column, referenced), (*referenced).clone()))
            .collect());
    }

    let mut matched: Vec<(Identifier, Column)> = Vec::with_capacity(declared.len());
    for join_column in declared {
        let Some(referenced_name) = &join_column.referenced_column_name else {
            return Err(MappingError::AmbiguousReferencedColumn {
                owner: owner.to_string(),
                column: join_column.name.clone().unwrap_or_default(),
                table: target.name().to_string(),
            });
        };
        let wanted = Identifier::to_identifier(referenced_name)
            .unwrap_or_else(|| Identifier::new(referenced_name.as_str(), false));
        let Some(referenced) = key.iter().find(|c| c.name.matches(&wanted)) else {
            return Err(MappingError::MissingReferencedColumn {
                owner: owner.to_string(),
                column: referenced_name.clone(),
                table: target.name().to_string(),
            });
        };
        if matched.iter().any(|(_, c)| c.name.matches(&referenced.name)) {
            return Err(MappingError::AmbiguousReferencedColumn {
                owner: owner.to_string(),
                column: referenced_name.clone(),
                table: target.name().to_string(),
            });
        }
        matched.push((explicit(join_column, referenced), (*referenced).clone()));
    }
    Ok(matched)
}

/// Copy the referenced key into `table` and reference it
///
/// Returns the key value over the new columns, or `None` while the
/// referenced table has no primary key yet.
fn repeat_primary_key(
    owner: &str,
    declared: &[PrimaryKeyJoinColumn],
    table: TableId,
    referenced_table: TableId,
    referenced_entity: &str,
    state: &mut BindingState,
    context: &BindingContext,
) -> Result<Option<DependantValue>> {
    let database = &state.metadata.database;
    let target = database.table(referenced_table)?;
    if target.primary_key().is_none_or(|pk| pk.columns.is_empty()) {
        return Ok(None);
    }
    let pairs = match_join_columns(owner, declared, target, context.naming())?;
    let type_name = state
        .metadata
        .entity_by_name(referenced_entity)
        .and_then(|id| state.metadata.identifier(id).ok().flatten())
        .and_then(|v| v.as_simple().and_then(|s| s.type_name.clone()));

    let mut value = SimpleValue::new(Some(table));
    value.type_name = type_name;
    let mut names = Vec::with_capacity(pairs.len());
    let table_ref = state.metadata.database.table_mut(table)?;
    for ((name, referenced), join_column) in pairs.into_iter().zip(
        declared
            .iter()
            .map(Some)
            .chain(std::iter::repeat(None)),
    ) {
        let mut column = Column::from_identifier(name.clone()).not_null();
        column.sql_type = referenced.sql_type.clone();
        column.length = referenced.length;
        column.precision = referenced.precision;
        column.scale = referenced.scale;
        if let Some(definition) = join_column.and_then(|s| s.column_definition.clone()) {
            column.sql_type = Some(definition);
        }
        let bound = table_ref.add_column(column).clone();
        value.add_column(bound);
        names.push(name);
    }

    let mut primary_key = PrimaryKey::new();
    primary_key.columns = names.clone();
    table_ref.set_primary_key(primary_key)?;
    table_ref.create_foreign_key(None, names, Some(referenced_entity), referenced_table, Vec::new())?;

    let span = value.selectables.len();
    let mut key = DependantValue::new(value, span);
    key.nullable = false;
    key.updateable = false;
    Ok(Some(key))
}

// =============================================================================
// Joined subclass
// =============================================================================

/// Joins a joined subclass table to its superclass table
#[derive(Debug)]
pub struct JoinedSubclassKeyCallback {
    entity: EntityId,
    entity_name: String,
    table: TableId,
    declared: Vec<PrimaryKeyJoinColumn>,
}

impl JoinedSubclassKeyCallback {
    #[must_use]
    pub fn new(
        entity: EntityId,
        entity_name: impl Into<String>,
        table: TableId,
        declared: Vec<PrimaryKeyJoinColumn>,
    ) -> Self {
        Self {
            entity,
            entity_name: entity_name.into(),
            table,
            declared,
        }
    }
}

impl ResolutionCallback for JoinedSubclassKeyCallback {
    fn resolve(&mut self, state: &mut BindingState, context: &BindingContext) -> Result<bool> {
        let superclass = state.metadata.entity(self.entity)?.superclass().ok_or_else(|| {
            MappingError::Mapping(format!("{} is not a subclass", self.entity_name))
        })?;
        let parent = state.metadata.entity(superclass)?;
        let (parent_table, parent_name) = (parent.table, parent.entity_name.clone());

        let Some(key) = repeat_primary_key(
            &self.entity_name,
            &self.declared,
            self.table,
            parent_table,
            &parent_name,
            state,
            context,
        )?
        else {
            return Ok(false);
        };

        let entity = state.metadata.entity_mut(self.entity)?;
        if let PersistentClassKind::Subclass(sub) = &mut entity.kind {
            sub.strategy = SubclassStrategy::Joined { key: Some(key) };
        }
        Ok(true)
    }

    fn description(&self) -> String {
        format!("joined subclass key of {}", self.entity_name)
    }
}

// =============================================================================
// Secondary table
// =============================================================================

/// Joins a secondary table to its entity's primary table
#[derive(Debug)]
pub struct SecondaryTableKeyCallback {
    entity: EntityId,
    entity_name: String,
    join: usize,
    table: TableId,
    declared: Vec<PrimaryKeyJoinColumn>,
}

impl SecondaryTableKeyCallback {
    /// Handshake for `join`, the position of the secondary table in the entity's joins
    ///
    /// Explicit column definitions on secondary-table join columns are not
    /// supported.
    pub fn new(
        entity: EntityId,
        entity_name: impl Into<String>,
        join: usize,
        table: TableId,
        declared: Vec<PrimaryKeyJoinColumn>,
    ) -> Result<Self> {
        let entity_name = entity_name.into();
        if declared.iter().any(|c| c.column_definition.is_some()) {
            return Err(MappingError::Unsupported(format!(
                "columnDefinition on secondary table primary key join columns of {entity_name}"
            )));
        }
        Ok(Self {
            entity,
            entity_name,
            join,
            table,
            declared,
        })
    }
}

impl ResolutionCallback for SecondaryTableKeyCallback {
    fn resolve(&mut self, state: &mut BindingState, context: &BindingContext) -> Result<bool> {
        let primary_table = state.metadata.entity(self.entity)?.table;
        let Some(key) = repeat_primary_key(
            &self.entity_name,
            &self.declared,
            self.table,
            primary_table,
            &self.entity_name,
            state,
            context,
        )?
        else {
            return Ok(false);
        };

        let entity = state.metadata.entity_mut(self.entity)?;
        let join = entity.joins.get_mut(self.join).ok_or_else(|| {
            MappingError::Mapping(format!("{} has no join #{}", self.entity_name, self.join))
        })?;
        join.key = Some(key);
        Ok(true)
    }

    fn description(&self) -> String {
        format!("secondary table key #{} of {}", self.join, self.entity_name)
    }
}
