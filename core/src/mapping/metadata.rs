//! The bound mapping model
//!
//! [`Metadata`] owns every table, entity, mapped superclass and collection of
//! one binding run. Entities refer to each other through [`EntityId`], which
//! keeps the hierarchy acyclic by construction and lets validation walk it
//! without shared ownership.

use std::collections::{BTreeMap, BTreeSet};

use quarry_types::{Database, Identifier, Selectable, TableId};

use super::{
    Collection, EntityId, MappedSuperclass, MappedSuperclassId, PersistentClass,
    PersistentClassKind, Property, RootClass, SubclassStrategy, Value,
};
use crate::{MappingError, Result, quarry_warn};

/// Non-fatal findings from [`Metadata::validate`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

/// Tables, entities and collections of one binding run
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    pub database: Database,
    classes: Vec<PersistentClass>,
    by_name: BTreeMap<String, EntityId>,
    mapped_superclasses: Vec<MappedSuperclass>,
    collections: BTreeMap<String, Collection>,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a root entity
    pub fn add_root(&mut self, class: PersistentClass) -> Result<EntityId> {
        if !class.is_root() {
            return Err(MappingError::Mapping(format!(
                "{} is not a root entity",
                class.entity_name
            )));
        }
        self.insert(class)
    }

    /// Register a subclass under its superclass
    ///
    /// The subclass id comes from the hierarchy root's counter, so ids run
    /// 1..K in registration order.
    pub fn add_subclass(&mut self, mut class: PersistentClass) -> Result<EntityId> {
        let Some(superclass) = class.superclass() else {
            return Err(MappingError::Mapping(format!(
                "{} is not a subclass",
                class.entity_name
            )));
        };
        self.entity(superclass)?;

        let mut ancestor = Some(superclass);
        while let Some(current) = ancestor {
            let entity = self.entity(current)?;
            if entity.entity_name == class.entity_name {
                return Err(MappingError::CircularInheritance(class.entity_name));
            }
            ancestor = entity.superclass();
        }

        let root = self.root_of(superclass)?;
        let subclass_id = self.root_class_mut(root)?.next_subclass_id();
        if let PersistentClassKind::Subclass(sub) = &mut class.kind {
            sub.subclass_id = subclass_id;
        }

        let id = self.insert(class)?;
        self.entity_mut(superclass)?.subclasses.push(id);
        Ok(id)
    }

    fn insert(&mut self, class: PersistentClass) -> Result<EntityId> {
        if self.by_name.contains_key(&class.entity_name) {
            return Err(MappingError::Mapping(format!(
                "Duplicate entity name: {}",
                class.entity_name
            )));
        }
        let id = EntityId(self.classes.len());
        self.by_name.insert(class.entity_name.clone(), id);
        self.classes.push(class);
        Ok(id)
    }

    /// Register a mapped superclass
    pub fn add_mapped_superclass(&mut self, mapped: MappedSuperclass) -> MappedSuperclassId {
        if let Some(position) = self
            .mapped_superclasses
            .iter()
            .position(|m| m.class_name == mapped.class_name)
        {
            return MappedSuperclassId(position);
        }
        self.mapped_superclasses.push(mapped);
        MappedSuperclassId(self.mapped_superclasses.len() - 1)
    }

    /// Register a collection role
    pub fn add_collection(&mut self, collection: Collection) -> Result<()> {
        if self.collections.contains_key(&collection.role) {
            return Err(MappingError::Mapping(format!(
                "Duplicate collection role: {}",
                collection.role
            )));
        }
        self.collections.insert(collection.role.clone(), collection);
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Borrow an entity
    pub fn entity(&self, id: EntityId) -> Result<&PersistentClass> {
        self.classes
            .get(id.0)
            .ok_or_else(|| MappingError::UnknownEntity(format!("#{}", id.0)))
    }

    /// Mutably borrow an entity
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut PersistentClass> {
        self.classes
            .get_mut(id.0)
            .ok_or_else(|| MappingError::UnknownEntity(format!("#{}", id.0)))
    }

    /// Entity id by name
    #[must_use]
    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    /// Entity by name
    pub fn entity_named(&self, name: &str) -> Result<&PersistentClass> {
        let id = self
            .entity_by_name(name)
            .ok_or_else(|| MappingError::UnknownEntity(name.to_string()))?;
        self.entity(id)
    }

    /// All entities in registration order
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &PersistentClass)> {
        self.classes.iter().enumerate().map(|(i, c)| (EntityId(i), c))
    }

    /// Mapped superclass by id
    pub fn mapped_superclass(&self, id: MappedSuperclassId) -> Result<&MappedSuperclass> {
        self.mapped_superclasses
            .get(id.0)
            .ok_or_else(|| MappingError::Mapping(format!("unknown mapped superclass #{}", id.0)))
    }

    /// Mutable mapped superclass by id
    pub fn mapped_superclass_mut(&mut self, id: MappedSuperclassId) -> Result<&mut MappedSuperclass> {
        self.mapped_superclasses
            .get_mut(id.0)
            .ok_or_else(|| MappingError::Mapping(format!("unknown mapped superclass #{}", id.0)))
    }

    /// Collection by role
    #[must_use]
    pub fn collection(&self, role: &str) -> Option<&Collection> {
        self.collections.get(role)
    }

    /// All collections ordered by role
    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    // =========================================================================
    // Hierarchy navigation
    // =========================================================================

    /// Root of the hierarchy containing `id`
    pub fn root_of(&self, id: EntityId) -> Result<EntityId> {
        let mut current = id;
        while let Some(superclass) = self.entity(current)?.superclass() {
            current = superclass;
        }
        Ok(current)
    }

    /// Root state of the hierarchy containing `id`
    pub fn root_class(&self, id: EntityId) -> Result<&RootClass> {
        let root = self.root_of(id)?;
        self.entity(root)?.as_root().ok_or_else(|| {
            MappingError::Mapping(format!("entity #{} has no root state", root.0))
        })
    }

    /// Mutable root state of the hierarchy containing `id`
    pub fn root_class_mut(&mut self, id: EntityId) -> Result<&mut RootClass> {
        let root = self.root_of(id)?;
        self.entity_mut(root)?.as_root_mut().ok_or_else(|| {
            MappingError::Mapping(format!("entity #{} has no root state", root.0))
        })
    }

    /// Subclass id of an entity; the root is 0
    pub fn subclass_id(&self, id: EntityId) -> Result<usize> {
        Ok(self.entity(id)?.subclass_id())
    }

    /// Every descendant, most-derived first
    ///
    /// Each direct subclass contributes its own descendants before the direct
    /// subclasses themselves are listed.
    pub fn subclasses(&self, id: EntityId) -> Result<Vec<EntityId>> {
        let direct = &self.entity(id)?.subclasses;
        let mut result = Vec::new();
        for sub in direct {
            result.extend(self.subclasses(*sub)?);
        }
        result.extend(direct.iter().copied());
        Ok(result)
    }

    /// The entity followed by all of its descendants
    pub fn subclass_closure(&self, id: EntityId) -> Result<Vec<EntityId>> {
        let mut closure = vec![id];
        closure.extend(self.subclasses(id)?);
        Ok(closure)
    }

    /// Tables from the root down to `id`, without repeats
    pub fn table_closure(&self, id: EntityId) -> Result<Vec<TableId>> {
        let entity = self.entity(id)?;
        let mut tables = match entity.superclass() {
            Some(superclass) => self.table_closure(superclass)?,
            None => Vec::new(),
        };
        if !tables.contains(&entity.table) {
            tables.push(entity.table);
        }
        Ok(tables)
    }

    /// Identifier value of the hierarchy containing `id`
    pub fn identifier(&self, id: EntityId) -> Result<Option<&Value>> {
        Ok(self.root_class(id)?.identifier.as_ref())
    }

    /// Column span of an entity's identifier, or of one of its properties
    pub fn referenced_span(&self, entity_name: &str, property: Option<&str>) -> Result<usize> {
        let id = self
            .entity_by_name(entity_name)
            .ok_or_else(|| MappingError::UnknownEntity(entity_name.to_string()))?;
        match property {
            None => Ok(self
                .identifier(id)?
                .map_or(0, Value::column_span)),
            Some(name) => {
                let mut current = Some(id);
                while let Some(entity_id) = current {
                    let entity = self.entity(entity_id)?;
                    if let Some(property) = entity.property(name) {
                        return Ok(property.column_span());
                    }
                    current = entity.superclass();
                }
                Err(MappingError::Mapping(format!(
                    "property '{name}' not found on {entity_name}"
                )))
            }
        }
    }

    /// Key columns linking `id`'s own table to its parent's
    ///
    /// The identifier for roots and single-table subclasses, the joined key
    /// for joined subclasses.
    pub fn key_value(&self, id: EntityId) -> Result<Option<Value>> {
        let entity = self.entity(id)?;
        match &entity.kind {
            PersistentClassKind::Root(root) => Ok(root.identifier.clone()),
            PersistentClassKind::Subclass(sub) => match &sub.strategy {
                SubclassStrategy::Joined { key } => Ok(key.clone().map(Value::Dependant)),
                SubclassStrategy::SingleTable | SubclassStrategy::Union => {
                    self.key_value(sub.superclass)
                }
            },
        }
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Create a foreign key from `value`'s columns to `entity_name`'s table
    pub fn create_foreign_key_of_entity(&mut self, value: &Value, entity_name: &str) -> Result<()> {
        let Some(table) = value.table() else {
            return Ok(());
        };
        let target = self.entity_named(entity_name)?;
        let referenced_table = target.table;

        let columns: Vec<Identifier> = value.columns().iter().map(|c| c.name.clone()).collect();
        if columns.is_empty() {
            return Ok(());
        }
        let name = value.as_simple().and_then(|v| v.foreign_key_name.clone());
        let cascade = value.is_cascade_delete_enabled();

        let fk = self.database.table_mut(table)?.create_foreign_key(
            name.as_deref(),
            columns,
            Some(entity_name),
            referenced_table,
            Vec::new(),
        )?;
        if cascade {
            fk.on_delete = quarry_types::ReferentialAction::Cascade;
        }
        Ok(())
    }

    /// Create the foreign key to the owner and the primary key of a collection
    pub fn create_collection_keys(&mut self, role: &str) -> Result<()> {
        let collection = self
            .collections
            .get(role)
            .cloned()
            .ok_or_else(|| MappingError::Mapping(format!("unknown collection role {role}")))?;
        collection.create_all_keys(self)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate every entity and collection
    ///
    /// Hard failures abort with the first error; composite identifiers that
    /// do not override `equals`/`hashCode` are reported as warnings.
    pub fn validate(&self) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();
        for (id, _) in self.entities() {
            self.validate_entity(id, &mut report)?;
        }
        for collection in self.collections.values() {
            collection.validate(self)?;
        }
        Ok(report)
    }

    fn validate_entity(&self, id: EntityId, report: &mut ValidationReport) -> Result<()> {
        let entity = self.entity(id)?;

        if let PersistentClassKind::Subclass(sub) = &entity.kind
            && sub.strategy == SubclassStrategy::SingleTable
            && self.root_class(id)?.discriminator.is_none()
        {
            let root = self.entity(self.root_of(id)?)?;
            return Err(MappingError::MissingDiscriminator(root.entity_name.clone()));
        }

        for property in entity.all_properties() {
            if !property.is_valid(self)? {
                return Err(MappingError::ColumnSpanMismatch {
                    entity: entity.entity_name.clone(),
                    property: property.name.clone(),
                    actual: property.column_span(),
                    required: property.value.type_span(self)?,
                });
            }
        }

        self.check_property_duplication(entity)?;
        self.check_column_duplication(id)?;

        if let Some(root) = entity.as_root() {
            if let Some(identifier) = &root.identifier
                && !identifier.is_valid(self)?
            {
                return Err(MappingError::Mapping(format!(
                    "identifier mapping has wrong number of columns: {}",
                    entity.entity_name
                )));
            }
            self.check_composite_identifier(entity, root, report)?;

            if root.optimistic_lock_style.is_all_or_dirty() && !entity.dynamic_update {
                return Err(MappingError::Mapping(format!(
                    "optimistic-lock=all|dirty requires dynamic-update=\"true\": {}",
                    entity.entity_name
                )));
            }
        }
        Ok(())
    }

    fn check_property_duplication(&self, entity: &PersistentClass) -> Result<()> {
        let mut names = BTreeSet::new();
        for property in entity.all_properties() {
            if !names.insert(property.name.as_str()) {
                return Err(MappingError::DuplicateProperty {
                    entity: entity.entity_name.clone(),
                    property: property.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Properties whose columns share the entity's own table
    fn unjoined_properties(&self, id: EntityId) -> Result<Vec<&Property>> {
        let entity = self.entity(id)?;
        let mut properties = match &entity.kind {
            PersistentClassKind::Subclass(sub) if sub.strategy == SubclassStrategy::SingleTable => {
                self.unjoined_properties(sub.superclass)?
            }
            _ => Vec::new(),
        };
        properties.extend(entity.properties.iter());
        Ok(properties)
    }

    fn check_column_duplication(&self, id: EntityId) -> Result<()> {
        let entity = self.entity(id)?;
        let owner = format!("entity: {}", entity.entity_name);
        let mut seen = BTreeSet::new();

        let key = self.key_value(id)?;
        if let Some(key) = &key {
            check_columns(&mut seen, &owner, key.selectables())?;
        }

        let discriminator_table = matches!(
            &entity.kind,
            PersistentClassKind::Root(_)
        ) || matches!(
            &entity.kind,
            PersistentClassKind::Subclass(sub) if sub.strategy == SubclassStrategy::SingleTable
        );
        if discriminator_table {
            let root = self.entity(self.root_of(id)?)?;
            if root.is_discriminator_insertable()
                && let Some(discriminator) = root.as_root().and_then(|r| r.discriminator.as_ref())
            {
                check_columns(&mut seen, &owner, discriminator.selectables.iter().collect())?;
            }
        }

        for property in self.unjoined_properties(id)? {
            if property.is_writable() {
                check_columns(&mut seen, &owner, property.value.selectables())?;
            }
        }

        for join in &entity.joins {
            let mut join_seen = BTreeSet::new();
            if let Some(key) = &join.key {
                check_columns(&mut join_seen, &owner, key.value.selectables.iter().collect())?;
            }
            for property in join.properties.iter().filter(|p| p.is_writable()) {
                check_columns(&mut join_seen, &owner, property.value.selectables())?;
            }
        }
        Ok(())
    }

    fn check_composite_identifier(
        &self,
        entity: &PersistentClass,
        root: &RootClass,
        report: &mut ValidationReport,
    ) -> Result<()> {
        let Some(Value::Component(id)) = &root.identifier else {
            return Ok(());
        };
        let Some(class) = &id.component_class_name else {
            return Ok(());
        };

        if !id.overrides_equals {
            let message = format!("composite-id class does not override equals(): {class}");
            quarry_warn!(entity = %entity.entity_name, "{message}");
            report.warnings.push(message);
        }
        if !id.overrides_hash_code {
            let message = format!("composite-id class does not override hashCode(): {class}");
            quarry_warn!(entity = %entity.entity_name, "{message}");
            report.warnings.push(message);
        }
        if !id.is_serializable_id() {
            return Err(MappingError::NonSerializableId {
                entity: entity.entity_name.clone(),
                class: class.clone(),
            });
        }
        Ok(())
    }
}

fn check_columns(seen: &mut BTreeSet<String>, owner: &str, selectables: Vec<&Selectable>) -> Result<()> {
    for column in selectables.into_iter().filter_map(Selectable::as_column) {
        if !seen.insert(column.canonical_name()) {
            return Err(MappingError::DuplicateColumn {
                owner: owner.to_string(),
                column: column.name().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Component, InheritanceType, SimpleValue};
    use quarry_types::{Column, Table};

    fn model() -> (Metadata, EntityId) {
        let mut metadata = Metadata::new();
        let mut table = Table::new(Identifier::new("party", false));
        table.add_column(Column::new("id").sql_type("bigint"));
        table.add_primary_key_column(&Identifier::new("id", false)).unwrap();
        let table = metadata.database.add_table(table);

        let mut root = PersistentClass::root("Party", table, InheritanceType::SingleTable);
        root.as_root_mut().unwrap().identifier = Some(Value::Basic(
            SimpleValue::new(Some(table)).column(Column::new("id").not_null()),
        ));
        let id = metadata.add_root(root).unwrap();
        (metadata, id)
    }

    fn single_table_subclass(metadata: &mut Metadata, name: &str, parent: EntityId) -> EntityId {
        let table = metadata.entity(parent).unwrap().table;
        metadata
            .add_subclass(PersistentClass::subclass(name, table, parent, SubclassStrategy::SingleTable))
            .unwrap()
    }

    #[test]
    fn test_subclass_ids_follow_addition_order() {
        let (mut metadata, root) = model();
        let person = single_table_subclass(&mut metadata, "Person", root);
        let company = single_table_subclass(&mut metadata, "Company", root);
        let employee = single_table_subclass(&mut metadata, "Employee", person);

        assert_eq!(metadata.subclass_id(root).unwrap(), 0);
        assert_eq!(metadata.subclass_id(person).unwrap(), 1);
        assert_eq!(metadata.subclass_id(company).unwrap(), 2);
        assert_eq!(metadata.subclass_id(employee).unwrap(), 3);
        assert_eq!(metadata.subclass_id(person).unwrap(), 1);
    }

    #[test]
    fn test_subclasses_most_derived_first() {
        let (mut metadata, root) = model();
        let person = single_table_subclass(&mut metadata, "Person", root);
        let company = single_table_subclass(&mut metadata, "Company", root);
        let employee = single_table_subclass(&mut metadata, "Employee", person);

        assert_eq!(metadata.subclasses(root).unwrap(), vec![employee, person, company]);
        assert_eq!(
            metadata.subclass_closure(person).unwrap(),
            vec![person, employee]
        );
        assert_eq!(metadata.root_of(employee).unwrap(), root);
    }

    #[test]
    fn test_circular_inheritance_rejected() {
        let (mut metadata, root) = model();
        let table = metadata.entity(root).unwrap().table;
        let err = metadata
            .add_subclass(PersistentClass::subclass("Party", table, root, SubclassStrategy::SingleTable))
            .unwrap_err();
        assert!(matches!(err, MappingError::CircularInheritance(_)));
    }

    #[test]
    fn test_single_table_subclass_requires_discriminator() {
        let (mut metadata, root) = model();
        single_table_subclass(&mut metadata, "Person", root);
        let err = metadata.validate().unwrap_err();
        assert!(matches!(err, MappingError::MissingDiscriminator(name) if name == "Party"));
    }

    #[test]
    fn test_property_span_mismatch() {
        let (mut metadata, root) = model();
        let table = metadata.entity(root).unwrap().table;
        metadata.entity_mut(root).unwrap().add_property(Property::new(
            "name",
            Value::Basic(
                SimpleValue::new(Some(table))
                    .column(Column::new("first_name"))
                    .column(Column::new("last_name")),
            ),
        ));
        let err = metadata.validate().unwrap_err();
        assert!(matches!(
            err,
            MappingError::ColumnSpanMismatch { actual: 2, required: 1, .. }
        ));
    }

    #[test]
    fn test_duplicate_property() {
        let (mut metadata, root) = model();
        let entity = metadata.entity_mut(root).unwrap();
        for column in ["a", "b"] {
            entity.add_property(Property::new(
                "name",
                Value::Basic(SimpleValue::new(None).column(Column::new(column))),
            ));
        }
        assert!(matches!(
            metadata.validate().unwrap_err(),
            MappingError::DuplicateProperty { .. }
        ));
    }

    #[test]
    fn test_property_reusing_id_column() {
        let (mut metadata, root) = model();
        metadata.entity_mut(root).unwrap().add_property(Property::new(
            "code",
            Value::Basic(SimpleValue::new(None).column(Column::new("ID"))),
        ));
        assert!(matches!(
            metadata.validate().unwrap_err(),
            MappingError::DuplicateColumn { .. }
        ));
    }

    #[test]
    fn test_read_only_property_may_repeat_column() {
        let (mut metadata, root) = model();
        let mut property = Property::new(
            "idCopy",
            Value::Basic(SimpleValue::new(None).column(Column::new("id"))),
        );
        property.insertable = false;
        property.updateable = false;
        metadata.entity_mut(root).unwrap().add_property(property);
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn test_composite_id_hash_code_is_warning_only() {
        let (mut metadata, root) = model();
        let mut component = Component::new(None, Some("PartyId".into()));
        component.serializable = true;
        component.overrides_equals = true;
        component.add_property(Property::new(
            "id",
            Value::Basic(SimpleValue::new(None).column(Column::new("id"))),
        ));
        metadata.root_class_mut(root).unwrap().identifier = Some(Value::Component(component));

        let report = metadata.validate().unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("hashCode"));
    }

    #[test]
    fn test_composite_id_must_be_serializable() {
        let (mut metadata, root) = model();
        let mut component = Component::new(None, Some("PartyId".into()));
        component.add_property(Property::new(
            "id",
            Value::Basic(SimpleValue::new(None).column(Column::new("id"))),
        ));
        metadata.root_class_mut(root).unwrap().identifier = Some(Value::Component(component));
        assert!(matches!(
            metadata.validate().unwrap_err(),
            MappingError::NonSerializableId { .. }
        ));
    }

    #[test]
    fn test_dirty_locking_requires_dynamic_update() {
        let (mut metadata, root) = model();
        metadata.root_class_mut(root).unwrap().optimistic_lock_style =
            crate::mapping::OptimisticLockStyle::Dirty;
        assert!(metadata.validate().is_err());
        metadata.entity_mut(root).unwrap().dynamic_update = true;
        assert!(metadata.validate().is_ok());
    }
}
