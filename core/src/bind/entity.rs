//! Entity binding
//!
//! Binding runs in two phases. The structural phase walks every hierarchy
//! top-down and binds tables, identifiers, discriminators, versions, tenant
//! ids, caching and the rest of the hierarchy-wide state, registering key
//! handshakes as second passes. Once those are drained, the attribute phase
//! binds every remaining attribute, so attribute binding always sees the
//! complete hierarchy.

use quarry_types::{Column, QuotedIdentifierTarget, TableId};

use super::annotations::{Annotated, AnnotationKind};
use super::attribute::AttributeBinding;
use super::column::ColumnBinding;
use super::discriminator::DiscriminatorBinding;
use super::identifier::IdentifierBinding;
use super::keys::{JoinedSubclassKeyCallback, PrimaryKeyJoinColumn, SecondaryTableKeyCallback};
use super::mapped_superclass::{MappedSuperclassBinding, inherited_attributes};
use super::model::{AttributeMetadata, ClassDetails, EntityHierarchy, EntityTypeMetadata};
use super::second_pass::{SecondPassOutcome, process_second_passes};
use super::table::{TableBinding, TableReference};
use super::{BindingContext, BindingOptions, BindingState, should_cache};
use crate::mapping::{
    CacheAccessType, CallbackDefinition, CallbackType, EntityId, FilterConfiguration,
    InheritanceType, Join, Metadata, OptimisticLockStyle, PersistentClass, Property, SimpleValue,
    SoftDeleteMapping, SoftDeleteType, SubclassStrategy, ValidationReport, Value,
};
use crate::{MappingError, Result, quarry_trace_bind};

/// Output of a binding run
#[derive(Debug)]
pub struct BoundModel {
    pub metadata: Metadata,
    /// Non-fatal validation findings
    pub report: ValidationReport,
    /// Second-pass statistics; `unresolved` is only non-empty when allowed
    pub second_passes: SecondPassOutcome,
}

/// Bind every hierarchy, drain the second passes and validate the result
pub fn bind_hierarchies(hierarchies: &[EntityHierarchy], options: &BindingOptions) -> Result<BoundModel> {
    let context = BindingContext::new(options.clone())?;
    let mut state = BindingState::new();

    let roots = hierarchies
        .iter()
        .map(|hierarchy| RootEntityBinding::bind(hierarchy, &mut state, &context))
        .collect::<Result<Vec<_>>>()?;

    let second_passes = process_second_passes(&mut state, &context)?;

    for (binding, hierarchy) in roots.iter().zip(hierarchies) {
        binding.bind_attributes(hierarchy, &mut state, &context)?;
    }

    let metadata = state.into_metadata();
    let report = metadata.validate()?;
    quarry_trace_bind!("complete", entities = metadata.entities().count(), warnings = report.warnings.len());
    Ok(BoundModel {
        metadata,
        report,
        second_passes,
    })
}

// =============================================================================
// Root
// =============================================================================

/// Binding of a hierarchy root and, recursively, its subclasses
#[derive(Clone, Debug)]
pub struct RootEntityBinding {
    entity: EntityId,
    table: TableReference,
    secondary_tables: Vec<TableReference>,
    mapped_superclass: Option<MappedSuperclassBinding>,
    subclasses: Vec<SubclassEntityBinding>,
}

impl RootEntityBinding {
    /// Structural phase for a whole hierarchy
    pub fn bind(
        hierarchy: &EntityHierarchy,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<Self> {
        let root = &hierarchy.root;
        let class = &root.class;
        let entity_name = resolve_entity_name(root)?;

        let mapped_superclass = match &root.super_type {
            Some(super_type) => Some(MappedSuperclassBinding::bind(super_type, hierarchy, state)?),
            None => None,
        };

        let inheritance = resolve_inheritance(hierarchy)?;
        let table = TableBinding::bind_entity_table(
            class,
            &entity_name,
            inheritance == InheritanceType::TablePerClass,
            None,
            state,
            context,
        )?;

        let mut persistent = PersistentClass::root(entity_name.clone(), table.table(), inheritance);
        persistent.class_name = Some(class.name.clone());
        persistent.jpa_entity_name = Some(entity_name.clone());
        persistent.is_abstract = Some(class.is_abstract);
        persistent.super_mapped_superclass = mapped_superclass.as_ref().map(MappedSuperclassBinding::id);
        let entity = state.metadata.add_root(persistent)?;
        quarry_trace_bind!("entity", entity = %entity_name, inheritance = ?inheritance);

        IdentifierBinding::bind(hierarchy, entity, table.table(), state, context)?;
        DiscriminatorBinding::bind(root, inheritance, entity, table.table(), state, context)?;
        bind_version(hierarchy, entity, &entity_name, table.table(), state, context)?;
        bind_tenant_id(hierarchy, entity, &entity_name, table.table(), state, context)?;
        bind_optimistic_locking(hierarchy, class, entity, state)?;
        bind_caching(hierarchy, class, entity, &entity_name, state, context)?;
        bind_soft_delete(class, entity, table.table(), state, context)?;

        if class.has_annotation(AnnotationKind::Immutable) {
            state.metadata.root_class_mut(entity)?.mutable = false;
        }

        apply_entity_settings(root, entity, state)?;
        bind_discriminator_value(root, entity, &entity_name, state)?;
        let secondary_tables = bind_secondary_tables(class, entity, &entity_name, state, context)?;

        let subclasses = root
            .sub_types
            .iter()
            .map(|sub| SubclassEntityBinding::bind(sub, entity, hierarchy, inheritance, state, context))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            entity,
            table,
            secondary_tables,
            mapped_superclass,
            subclasses,
        })
    }

    /// Attribute phase for the whole hierarchy
    pub fn bind_attributes(
        &self,
        hierarchy: &EntityHierarchy,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<()> {
        let excluded = hierarchy.excluded_attributes();
        bind_declared_attributes(&hierarchy.root, self.entity, &excluded, state, context)?;
        for (subclass, metadata) in self.subclasses.iter().zip(&hierarchy.root.sub_types) {
            subclass.bind_attributes(metadata, &excluded, state, context)?;
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The bound root entity
    pub fn binding<'a>(&self, metadata: &'a Metadata) -> Result<&'a PersistentClass> {
        metadata.entity(self.entity)
    }

    #[must_use]
    pub fn table(&self) -> &TableReference {
        &self.table
    }

    #[must_use]
    pub fn secondary_tables(&self) -> &[TableReference] {
        &self.secondary_tables
    }

    #[must_use]
    pub fn mapped_superclass(&self) -> Option<&MappedSuperclassBinding> {
        self.mapped_superclass.as_ref()
    }

    #[must_use]
    pub fn subclasses(&self) -> &[SubclassEntityBinding] {
        &self.subclasses
    }
}

// =============================================================================
// Subclass
// =============================================================================

/// Binding of a subclass and its own subclasses
#[derive(Clone, Debug)]
pub struct SubclassEntityBinding {
    entity: EntityId,
    table: TableReference,
    secondary_tables: Vec<TableReference>,
    mapped_superclass: Option<MappedSuperclassBinding>,
    subclasses: Vec<SubclassEntityBinding>,
}

impl SubclassEntityBinding {
    /// Structural phase for a subclass of `superclass`
    pub fn bind(
        metadata: &EntityTypeMetadata,
        superclass: EntityId,
        hierarchy: &EntityHierarchy,
        inheritance: InheritanceType,
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<Self> {
        let class = &metadata.class;
        let entity_name = resolve_entity_name(metadata)?;

        if class.has_annotation(AnnotationKind::SoftDelete) {
            return Err(MappingError::Mapping(format!(
                "@SoftDelete is only supported on the root of a hierarchy, not on {entity_name}"
            )));
        }

        let mapped_superclass = match &metadata.super_type {
            Some(super_type) => Some(MappedSuperclassBinding::bind(super_type, hierarchy, state)?),
            None => None,
        };

        let parent = state.metadata.entity(superclass)?;
        let parent_table = parent.table;
        let parent_name = parent.entity_name.clone();

        let (table, strategy) = match inheritance {
            InheritanceType::SingleTable => {
                let table = state
                    .entity_table(&parent_name)
                    .cloned()
                    .unwrap_or(TableReference::Physical {
                        table: parent_table,
                        exportable: true,
                    });
                state.register_entity_table(&entity_name, table.clone());
                (table, SubclassStrategy::SingleTable)
            }
            InheritanceType::Joined => {
                let table = TableBinding::bind_entity_table(class, &entity_name, false, None, state, context)?;
                (table, SubclassStrategy::Joined { key: None })
            }
            InheritanceType::TablePerClass => {
                let table =
                    TableBinding::bind_entity_table(class, &entity_name, true, Some(parent_table), state, context)?;
                (table, SubclassStrategy::Union)
            }
        };

        let mut persistent = PersistentClass::subclass(entity_name.clone(), table.table(), superclass, strategy);
        persistent.class_name = Some(class.name.clone());
        persistent.jpa_entity_name = Some(entity_name.clone());
        persistent.is_abstract = Some(class.is_abstract);
        persistent.super_mapped_superclass = mapped_superclass.as_ref().map(MappedSuperclassBinding::id);
        let entity = state.metadata.add_subclass(persistent)?;
        quarry_trace_bind!(
            "subclass",
            entity = %entity_name,
            subclass_id = state.metadata.subclass_id(entity).unwrap_or_default()
        );

        if inheritance == InheritanceType::Joined {
            let declared = PrimaryKeyJoinColumn::declared_on(class)?;
            state.queue_second_pass(Box::new(JoinedSubclassKeyCallback::new(
                entity,
                entity_name.clone(),
                table.table(),
                declared,
            )));
        }

        apply_entity_settings(metadata, entity, state)?;
        bind_discriminator_value(metadata, entity, &entity_name, state)?;
        let secondary_tables = bind_secondary_tables(class, entity, &entity_name, state, context)?;

        let subclasses = metadata
            .sub_types
            .iter()
            .map(|sub| Self::bind(sub, entity, hierarchy, inheritance, state, context))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            entity,
            table,
            secondary_tables,
            mapped_superclass,
            subclasses,
        })
    }

    /// Attribute phase for this subclass and its subclasses
    pub fn bind_attributes(
        &self,
        metadata: &EntityTypeMetadata,
        excluded: &[&str],
        state: &mut BindingState,
        context: &BindingContext,
    ) -> Result<()> {
        bind_declared_attributes(metadata, self.entity, excluded, state, context)?;
        for (subclass, sub_metadata) in self.subclasses.iter().zip(&metadata.sub_types) {
            subclass.bind_attributes(sub_metadata, excluded, state, context)?;
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The bound subclass
    pub fn binding<'a>(&self, metadata: &'a Metadata) -> Result<&'a PersistentClass> {
        metadata.entity(self.entity)
    }

    #[must_use]
    pub fn table(&self) -> &TableReference {
        &self.table
    }

    #[must_use]
    pub fn secondary_tables(&self) -> &[TableReference] {
        &self.secondary_tables
    }

    #[must_use]
    pub fn mapped_superclass(&self) -> Option<&MappedSuperclassBinding> {
        self.mapped_superclass.as_ref()
    }

    #[must_use]
    pub fn subclasses(&self) -> &[SubclassEntityBinding] {
        &self.subclasses
    }
}

// =============================================================================
// Shared steps
// =============================================================================

/// Explicit entity name, then `@Entity(name)`, then the simple class name
fn resolve_entity_name(metadata: &EntityTypeMetadata) -> Result<String> {
    if let Some(name) = &metadata.entity_name {
        return Ok(name.clone());
    }
    if let Some(entity) = metadata.class.annotation(AnnotationKind::Entity)
        && let Some(name) = entity.find_string("name")?
    {
        return Ok(name);
    }
    Ok(metadata.class.simple_name().to_string())
}

fn resolve_inheritance(hierarchy: &EntityHierarchy) -> Result<InheritanceType> {
    if let Some(inheritance) = hierarchy.inheritance_type {
        return Ok(inheritance);
    }
    match hierarchy.root.class.annotation(AnnotationKind::Inheritance) {
        Some(usage) => {
            let strategy = usage.get_string("strategy")?;
            InheritanceType::parse(&strategy)
                .ok_or_else(|| MappingError::Mapping(format!("unknown inheritance strategy {strategy}")))
        }
        None => Ok(InheritanceType::default()),
    }
}

/// Not-null basic property used for versions and tenant ids
fn bind_special_attribute(
    attribute: &AttributeMetadata,
    entity_name: &str,
    table: TableId,
    state: &mut BindingState,
    context: &BindingContext,
) -> Result<Property> {
    let mut bound = ColumnBinding::bind(&attribute.member, &attribute.name, context)?;
    bound.column.nullable = false;
    let column = state
        .metadata
        .database
        .table_mut(table)?
        .add_column(bound.column)
        .clone();
    let value = SimpleValue::new(Some(table))
        .column(column)
        .type_name(attribute.member.type_name.clone());
    let mut property = Property::new(attribute.name.clone(), Value::Basic(value));
    property.optional = false;
    quarry_trace_bind!("attribute", entity = %entity_name, attribute = %attribute.name);
    Ok(property)
}

fn find_attribute<'a>(
    root: &'a EntityTypeMetadata,
    entity_name: &str,
    name: &str,
    role: &str,
) -> Result<&'a AttributeMetadata> {
    root.find_attribute(name).ok_or_else(|| {
        MappingError::Mapping(format!("{role} attribute '{name}' not found on {entity_name}"))
    })
}

fn bind_version(
    hierarchy: &EntityHierarchy,
    entity: EntityId,
    entity_name: &str,
    table: TableId,
    state: &mut BindingState,
    context: &BindingContext,
) -> Result<()> {
    let Some(name) = &hierarchy.version_attribute else {
        return Ok(());
    };
    let attribute = find_attribute(&hierarchy.root, entity_name, name, "version")?;
    let property = bind_special_attribute(attribute, entity_name, table, state, context)?;
    state.metadata.root_class_mut(entity)?.version = Some(property);
    Ok(())
}

fn bind_tenant_id(
    hierarchy: &EntityHierarchy,
    entity: EntityId,
    entity_name: &str,
    table: TableId,
    state: &mut BindingState,
    context: &BindingContext,
) -> Result<()> {
    let Some(name) = &hierarchy.tenant_id_attribute else {
        return Ok(());
    };
    let attribute = find_attribute(&hierarchy.root, entity_name, name, "tenant id")?;
    let mut property = bind_special_attribute(attribute, entity_name, table, state, context)?;
    property.updateable = false;
    state.metadata.root_class_mut(entity)?.tenant_id = Some(property);
    Ok(())
}

fn bind_optimistic_locking(
    hierarchy: &EntityHierarchy,
    class: &ClassDetails,
    entity: EntityId,
    state: &mut BindingState,
) -> Result<()> {
    let style = match class.annotation(AnnotationKind::OptimisticLocking) {
        Some(usage) => {
            let text = usage.get_string("type")?;
            OptimisticLockStyle::parse(&text)
                .ok_or_else(|| MappingError::Mapping(format!("unknown optimistic lock type {text}")))?
        }
        None => hierarchy.optimistic_lock_style.unwrap_or_default(),
    };
    state.metadata.root_class_mut(entity)?.optimistic_lock_style = style;
    Ok(())
}

/// Entity and natural-id cache regions
fn bind_caching(
    hierarchy: &EntityHierarchy,
    class: &ClassDetails,
    entity: EntityId,
    entity_name: &str,
    state: &mut BindingState,
    context: &BindingContext,
) -> Result<()> {
    let explicit = class
        .annotation(AnnotationKind::Cacheable)
        .map(|usage| usage.get_bool("value"))
        .transpose()?;
    let cached = should_cache(context.options().shared_cache_mode, explicit);

    let descriptor = hierarchy.cache_region.clone().unwrap_or_default();
    let cache = class.annotation(AnnotationKind::Cache);
    let region = match cache {
        Some(usage) => usage.find_string("region")?,
        None => None,
    }
    .or(descriptor.region_name)
    .unwrap_or_else(|| entity_name.to_string());
    let access_type = match cache.filter(|usage| usage.attributes.contains_key("usage")) {
        Some(usage) => {
            let text = usage.get_string("usage")?;
            Some(
                CacheAccessType::parse(&text)
                    .ok_or_else(|| MappingError::Mapping(format!("unknown cache usage {text}")))?,
            )
        }
        None => descriptor.access_type.or(context.options().default_cache_access_type),
    };
    let lazy_included = match cache {
        Some(usage) => usage.get_bool("includeLazy")?,
        None => descriptor.lazy_properties_included,
    };

    let natural_id_region = match class.annotation(AnnotationKind::NaturalIdCache) {
        Some(usage) => Some(
            usage
                .find_string("region")?
                .unwrap_or_else(|| format!("{entity_name}##NaturalId")),
        ),
        None => hierarchy.natural_id_cache_region.clone(),
    };

    let root = state.metadata.root_class_mut(entity)?;
    root.cached = cached;
    if cached {
        root.cache_region_name = Some(region);
        root.cache_access_type = access_type;
        root.lazy_properties_cacheable = lazy_included;
    }
    root.natural_id_cache_region = natural_id_region;
    Ok(())
}

/// Soft-delete indicator column on the root table
fn bind_soft_delete(
    class: &ClassDetails,
    entity: EntityId,
    table: TableId,
    state: &mut BindingState,
    context: &BindingContext,
) -> Result<()> {
    let Some(usage) = class.annotation(AnnotationKind::SoftDelete) else {
        return Ok(());
    };
    let text = usage.get_string("strategy")?;
    let strategy = SoftDeleteType::parse(&text)
        .ok_or_else(|| MappingError::Mapping(format!("unknown soft delete strategy {text}")))?;

    let name = usage
        .find_string("columnName")?
        .or_else(|| context.options().soft_delete_column.clone())
        .unwrap_or_else(|| strategy.default_column_name().to_string());
    let identifier = context
        .naming()
        .resolve(Some(&name), |_| name.clone(), QuotedIdentifierTarget::ColumnName);
    let column = match strategy {
        SoftDeleteType::Deleted | SoftDeleteType::Active => {
            Column::from_identifier(identifier).sql_type("boolean").not_null()
        }
        SoftDeleteType::Timestamp => Column::from_identifier(identifier).sql_type("timestamp"),
    };
    let column = state.metadata.database.table_mut(table)?.add_column(column).clone();
    state.metadata.root_class_mut(entity)?.soft_delete = Some(SoftDeleteMapping { column, strategy });
    Ok(())
}

/// Per-entity flags, filters and lifecycle callbacks
fn apply_entity_settings(
    metadata: &EntityTypeMetadata,
    entity: EntityId,
    state: &mut BindingState,
) -> Result<()> {
    let class = &metadata.class;

    let filters = class
        .repeated(AnnotationKind::Filter, AnnotationKind::Filters)?
        .iter()
        .map(|usage| {
            Ok(FilterConfiguration {
                name: usage.get_string("name")?,
                condition: usage.find_string("condition")?,
                auto_alias_injection: usage.get_bool("deduceAliasInjectionPoints")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut callbacks = Vec::new();
    let mut mapped = metadata.super_type.as_ref();
    let mut chain = Vec::new();
    while let Some(current) = mapped {
        chain.push(&current.class);
        mapped = current.super_type.as_deref();
    }
    for declaring in chain.into_iter().rev().chain(std::iter::once(class)) {
        callbacks.extend(bind_callbacks(declaring)?);
    }

    let dynamic_insert = match class.annotation(AnnotationKind::DynamicInsert) {
        Some(usage) => usage.get_bool("value")?,
        None => false,
    };
    let dynamic_update = match class.annotation(AnnotationKind::DynamicUpdate) {
        Some(usage) => usage.get_bool("value")?,
        None => false,
    };
    let batch_size = match class.annotation(AnnotationKind::BatchSize) {
        Some(usage) => Some(u32::try_from(usage.get_int("size")?).map_err(|_| {
            MappingError::Mapping(format!("@BatchSize on {} must be positive", class.name))
        })?),
        None => None,
    };
    let where_clause = match class.annotation(AnnotationKind::SQLRestriction) {
        Some(usage) => Some(usage.get_string("value")?),
        None => None,
    };

    let persistent = state.metadata.entity_mut(entity)?;
    persistent.filters = filters;
    persistent.callbacks = callbacks;
    persistent.dynamic_insert = dynamic_insert;
    persistent.dynamic_update = dynamic_update;
    persistent.batch_size = batch_size;
    persistent.where_clause = where_clause;
    Ok(())
}

fn callback_annotation(callback: CallbackType) -> AnnotationKind {
    match callback {
        CallbackType::PrePersist => AnnotationKind::PrePersist,
        CallbackType::PostPersist => AnnotationKind::PostPersist,
        CallbackType::PreUpdate => AnnotationKind::PreUpdate,
        CallbackType::PostUpdate => AnnotationKind::PostUpdate,
        CallbackType::PreRemove => AnnotationKind::PreRemove,
        CallbackType::PostRemove => AnnotationKind::PostRemove,
        CallbackType::PostLoad => AnnotationKind::PostLoad,
    }
}

/// Callback methods declared by one class; one method per callback type
fn bind_callbacks(class: &ClassDetails) -> Result<Vec<CallbackDefinition>> {
    let mut callbacks: Vec<CallbackDefinition> = Vec::new();
    for method in &class.methods {
        for callback_type in CallbackType::ALL {
            if !method.has_annotation(callback_annotation(*callback_type)) {
                continue;
            }
            if let Some(existing) = callbacks.iter().find(|c| c.callback_type == *callback_type) {
                return Err(MappingError::Mapping(format!(
                    "{} declares @{} on both {} and {}",
                    class.name,
                    callback_annotation(*callback_type).name(),
                    existing.method_name,
                    method.name
                )));
            }
            callbacks.push(CallbackDefinition {
                callback_type: *callback_type,
                class_name: class.name.clone(),
                method_name: method.name.clone(),
            });
        }
    }
    Ok(callbacks)
}

/// `@DiscriminatorValue`, or the implicit value when the hierarchy has a discriminator
fn bind_discriminator_value(
    metadata: &EntityTypeMetadata,
    entity: EntityId,
    entity_name: &str,
    state: &mut BindingState,
) -> Result<()> {
    let root = state.metadata.root_class(entity)?;
    if root.discriminator.is_none() {
        return Ok(());
    }
    let value = match metadata.class.annotation(AnnotationKind::DiscriminatorValue) {
        Some(usage) => usage.get_string("value")?,
        None => root.discriminator_type.default_value(entity_name),
    };
    state.metadata.entity_mut(entity)?.discriminator_value = Some(value);
    Ok(())
}

/// Secondary tables as joins, each with a queued key handshake
fn bind_secondary_tables(
    class: &ClassDetails,
    entity: EntityId,
    entity_name: &str,
    state: &mut BindingState,
    context: &BindingContext,
) -> Result<Vec<TableReference>> {
    let mut references = Vec::new();
    for usage in class.repeated(AnnotationKind::SecondaryTable, AnnotationKind::SecondaryTables)? {
        let reference = TableBinding::bind_secondary_table(&usage, entity_name, state, context)?;
        let declared = usage
            .get_nested_list("pkJoinColumns")?
            .iter()
            .map(PrimaryKeyJoinColumn::from_usage)
            .collect::<Result<Vec<_>>>()?;

        let mut join = Join::new(reference.table());
        join.optional = usage.get_bool("optional")?;
        let position = state.metadata.entity_mut(entity)?.add_join(join);

        let callback =
            SecondaryTableKeyCallback::new(entity, entity_name, position, reference.table(), declared)?;
        state.queue_second_pass(Box::new(callback));
        references.push(reference);
    }
    Ok(references)
}

/// Bind the attributes an entity declares, mapped superclass attributes first
fn bind_declared_attributes(
    metadata: &EntityTypeMetadata,
    entity: EntityId,
    excluded: &[&str],
    state: &mut BindingState,
    context: &BindingContext,
) -> Result<()> {
    let persistent = state.metadata.entity(entity)?;
    let (entity_name, table) = (persistent.entity_name.clone(), persistent.table);

    let inherited = metadata
        .super_type
        .as_ref()
        .map_or_else(Vec::new, inherited_attributes);
    for attribute in inherited.into_iter().chain(metadata.attributes.iter()) {
        if excluded.contains(&attribute.name.as_str()) {
            continue;
        }
        let Some(bound) = AttributeBinding::bind(attribute, &entity_name, table, state, context)? else {
            continue;
        };

        let persistent = state.metadata.entity_mut(entity)?;
        match persistent.joins.iter_mut().find(|join| join.table == bound.table) {
            Some(join) if bound.table != table => join.properties.push(bound.property),
            _ => persistent.add_property(bound.property),
        }
    }
    Ok(())
}
