//! Entity hierarchy model
//!
//! Every entity is a [`PersistentClass`]. Hierarchy-wide state (identifier,
//! discriminator, version, caching) sits on the [`RootClass`] of the root;
//! subclasses carry their strategy and the id the root assigned them.

use quarry_types::{Column, TableId};
use serde::{Deserialize, Serialize};

use super::{DependantValue, Property, SimpleValue, Value};

/// Handle to an entity owned by [`super::Metadata`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub usize);

/// Handle to a mapped superclass owned by [`super::Metadata`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MappedSuperclassId(pub usize);

// =============================================================================
// Enumerations
// =============================================================================

/// Inheritance mapping strategy of a hierarchy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InheritanceType {
    #[default]
    SingleTable,
    Joined,
    TablePerClass,
}

impl InheritanceType {
    /// Parse the annotation spelling
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SINGLE_TABLE" => Some(Self::SingleTable),
            "JOINED" => Some(Self::Joined),
            "TABLE_PER_CLASS" => Some(Self::TablePerClass),
            _ => None,
        }
    }
}

/// Optimistic locking style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimisticLockStyle {
    None,
    #[default]
    Version,
    Dirty,
    All,
}

impl OptimisticLockStyle {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NONE" => Some(Self::None),
            "VERSION" => Some(Self::Version),
            "DIRTY" => Some(Self::Dirty),
            "ALL" => Some(Self::All),
            _ => None,
        }
    }

    /// Whether the style compares column values instead of a version
    #[must_use]
    pub const fn is_all_or_dirty(&self) -> bool {
        matches!(self, Self::Dirty | Self::All)
    }
}

/// Discriminator value type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscriminatorType {
    #[default]
    String,
    Char,
    Integer,
}

impl DiscriminatorType {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STRING" => Some(Self::String),
            "CHAR" => Some(Self::Char),
            "INTEGER" => Some(Self::Integer),
            _ => None,
        }
    }

    /// Implicit discriminator value for `entity_name`
    #[must_use]
    pub fn default_value(&self, entity_name: &str) -> String {
        match self {
            Self::String => entity_name.to_string(),
            Self::Char => entity_name.chars().next().map(String::from).unwrap_or_default(),
            Self::Integer => java_string_hash(entity_name).to_string(),
        }
    }
}

/// `String.hashCode` over UTF-16 code units
fn java_string_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Second-level cache concurrency
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheAccessType {
    ReadOnly,
    ReadWrite,
    NonstrictReadWrite,
    Transactional,
}

impl CacheAccessType {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "READ_ONLY" => Some(Self::ReadOnly),
            "READ_WRITE" => Some(Self::ReadWrite),
            "NONSTRICT_READ_WRITE" => Some(Self::NonstrictReadWrite),
            "TRANSACTIONAL" => Some(Self::Transactional),
            _ => None,
        }
    }
}

/// Soft-delete indicator strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoftDeleteType {
    #[default]
    Deleted,
    Active,
    Timestamp,
}

impl SoftDeleteType {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DELETED" => Some(Self::Deleted),
            "ACTIVE" => Some(Self::Active),
            "TIMESTAMP" => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// Column name used when none is given
    #[must_use]
    pub const fn default_column_name(&self) -> &'static str {
        match self {
            Self::Deleted | Self::Timestamp => "deleted",
            Self::Active => "active",
        }
    }
}

/// Entity lifecycle callback kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CallbackType {
    PrePersist,
    PostPersist,
    PreUpdate,
    PostUpdate,
    PreRemove,
    PostRemove,
    PostLoad,
}

impl CallbackType {
    pub const ALL: &'static [CallbackType] = &[
        Self::PrePersist,
        Self::PostPersist,
        Self::PreUpdate,
        Self::PostUpdate,
        Self::PreRemove,
        Self::PostRemove,
        Self::PostLoad,
    ];
}

// =============================================================================
// Supporting records
// =============================================================================

/// Soft-delete indicator column
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftDeleteMapping {
    pub column: Column,
    pub strategy: SoftDeleteType,
}

/// A filter applied to an entity or collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfiguration {
    pub name: String,
    pub condition: Option<String>,
    #[serde(default = "default_true")]
    pub auto_alias_injection: bool,
}

/// A lifecycle callback method
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackDefinition {
    pub callback_type: CallbackType,
    /// Class declaring the method
    pub class_name: String,
    pub method_name: String,
}

/// Secondary table holding some of an entity's properties
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Join {
    pub table: TableId,
    /// Key columns; set once the key handshake resolves
    pub key: Option<DependantValue>,
    pub properties: Vec<Property>,
    #[serde(default)]
    pub inverse: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub sequential_select: bool,
}

impl Join {
    #[must_use]
    pub fn new(table: TableId) -> Self {
        Self {
            table,
            key: None,
            properties: Vec::new(),
            inverse: false,
            optional: false,
            sequential_select: false,
        }
    }
}

/// A non-entity class contributing attributes to entities
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedSuperclass {
    pub class_name: String,
    pub superclass: Option<MappedSuperclassId>,
    /// Attributes it declares, in declaration order
    pub declared_properties: Vec<String>,
    pub identifier_property: Option<String>,
    pub version: Option<String>,
}

// =============================================================================
// Root / subclass
// =============================================================================

/// State owned by the root of a hierarchy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootClass {
    pub inheritance: InheritanceType,
    /// Basic or component key value
    pub identifier: Option<Value>,
    pub identifier_property: Option<Property>,
    #[serde(default)]
    pub embedded_identifier: bool,
    pub discriminator: Option<SimpleValue>,
    #[serde(default)]
    pub discriminator_type: DiscriminatorType,
    #[serde(default = "default_true")]
    pub discriminator_insertable: bool,
    #[serde(default)]
    pub force_discriminator: bool,
    pub version: Option<Property>,
    pub tenant_id: Option<Property>,
    #[serde(default = "default_true")]
    pub polymorphic: bool,
    #[serde(default)]
    pub explicit_polymorphism: bool,
    #[serde(default = "default_true")]
    pub mutable: bool,
    #[serde(default)]
    pub cached: bool,
    pub cache_region_name: Option<String>,
    pub cache_access_type: Option<CacheAccessType>,
    #[serde(default = "default_true")]
    pub lazy_properties_cacheable: bool,
    pub natural_id_cache_region: Option<String>,
    #[serde(default)]
    pub optimistic_lock_style: OptimisticLockStyle,
    pub soft_delete: Option<SoftDeleteMapping>,
    next_subclass_id: usize,
}

const fn default_true() -> bool {
    true
}

impl RootClass {
    #[must_use]
    pub fn new(inheritance: InheritanceType) -> Self {
        Self {
            inheritance,
            identifier: None,
            identifier_property: None,
            embedded_identifier: false,
            discriminator: None,
            discriminator_type: DiscriminatorType::String,
            discriminator_insertable: true,
            force_discriminator: false,
            version: None,
            tenant_id: None,
            polymorphic: true,
            explicit_polymorphism: false,
            mutable: true,
            cached: false,
            cache_region_name: None,
            cache_access_type: None,
            lazy_properties_cacheable: true,
            natural_id_cache_region: None,
            optimistic_lock_style: OptimisticLockStyle::Version,
            soft_delete: None,
            next_subclass_id: 0,
        }
    }

    /// Hand out the next subclass id; the root itself is 0
    pub fn next_subclass_id(&mut self) -> usize {
        self.next_subclass_id += 1;
        self.next_subclass_id
    }

    /// Number of subclass ids handed out so far
    #[inline]
    #[must_use]
    pub fn subclass_count(&self) -> usize {
        self.next_subclass_id
    }

    /// Whether the identifier is composite
    #[must_use]
    pub fn has_composite_identifier(&self) -> bool {
        matches!(self.identifier, Some(Value::Component(_)))
    }
}

/// How a subclass stores its state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "strategy")]
pub enum SubclassStrategy {
    /// Shares the root table
    SingleTable,
    /// Own table joined to the superclass table by `key`
    Joined { key: Option<DependantValue> },
    /// Own table repeating every inherited column
    Union,
}

/// State owned by a subclass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subclass {
    pub superclass: EntityId,
    pub strategy: SubclassStrategy,
    pub subclass_id: usize,
}

/// Root or subclass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PersistentClassKind {
    Root(Box<RootClass>),
    Subclass(Subclass),
}

// =============================================================================
// PersistentClass
// =============================================================================

/// An entity mapping
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentClass {
    pub entity_name: String,
    pub class_name: Option<String>,
    pub jpa_entity_name: Option<String>,
    /// Table rows of this class live in (the root table for single-table subclasses)
    pub table: TableId,
    pub properties: Vec<Property>,
    pub joins: Vec<Join>,
    pub discriminator_value: Option<String>,
    pub is_abstract: Option<bool>,
    #[serde(default = "default_true")]
    pub lazy: bool,
    #[serde(default)]
    pub dynamic_insert: bool,
    #[serde(default)]
    pub dynamic_update: bool,
    #[serde(default)]
    pub select_before_update: bool,
    pub batch_size: Option<u32>,
    pub where_clause: Option<String>,
    #[serde(default)]
    pub filters: Vec<FilterConfiguration>,
    #[serde(default)]
    pub callbacks: Vec<CallbackDefinition>,
    pub super_mapped_superclass: Option<MappedSuperclassId>,
    /// Direct subclasses in addition order
    #[serde(default)]
    pub subclasses: Vec<EntityId>,
    pub kind: PersistentClassKind,
}

impl PersistentClass {
    /// A root entity
    #[must_use]
    pub fn root(entity_name: impl Into<String>, table: TableId, inheritance: InheritanceType) -> Self {
        Self::with_kind(entity_name, table, PersistentClassKind::Root(Box::new(RootClass::new(inheritance))))
    }

    /// A subclass of `superclass`; the id is assigned on registration
    #[must_use]
    pub fn subclass(
        entity_name: impl Into<String>,
        table: TableId,
        superclass: EntityId,
        strategy: SubclassStrategy,
    ) -> Self {
        Self::with_kind(
            entity_name,
            table,
            PersistentClassKind::Subclass(Subclass {
                superclass,
                strategy,
                subclass_id: 0,
            }),
        )
    }

    fn with_kind(entity_name: impl Into<String>, table: TableId, kind: PersistentClassKind) -> Self {
        Self {
            entity_name: entity_name.into(),
            class_name: None,
            jpa_entity_name: None,
            table,
            properties: Vec::new(),
            joins: Vec::new(),
            discriminator_value: None,
            is_abstract: None,
            lazy: true,
            dynamic_insert: false,
            dynamic_update: false,
            select_before_update: false,
            batch_size: None,
            where_clause: None,
            filters: Vec::new(),
            callbacks: Vec::new(),
            super_mapped_superclass: None,
            subclasses: Vec::new(),
            kind,
        }
    }

    /// Whether this is the hierarchy root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self.kind, PersistentClassKind::Root(_))
    }

    /// Root state, when this is the root
    #[must_use]
    pub fn as_root(&self) -> Option<&RootClass> {
        match &self.kind {
            PersistentClassKind::Root(root) => Some(root),
            PersistentClassKind::Subclass(_) => None,
        }
    }

    /// Mutable root state, when this is the root
    pub fn as_root_mut(&mut self) -> Option<&mut RootClass> {
        match &mut self.kind {
            PersistentClassKind::Root(root) => Some(root),
            PersistentClassKind::Subclass(_) => None,
        }
    }

    /// Subclass state, when this is a subclass
    #[must_use]
    pub fn as_subclass(&self) -> Option<&Subclass> {
        match &self.kind {
            PersistentClassKind::Subclass(sub) => Some(sub),
            PersistentClassKind::Root(_) => None,
        }
    }

    /// Direct superclass
    #[must_use]
    pub fn superclass(&self) -> Option<EntityId> {
        self.as_subclass().map(|s| s.superclass)
    }

    /// Subclass id; 0 for the root
    #[must_use]
    pub fn subclass_id(&self) -> usize {
        self.as_subclass().map_or(0, |s| s.subclass_id)
    }

    /// Whether any subclass was registered
    #[inline]
    #[must_use]
    pub fn has_subclasses(&self) -> bool {
        !self.subclasses.is_empty()
    }

    /// Add a property
    pub fn add_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Declared property by name, including join properties
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.all_properties().find(|p| p.name == name)
    }

    /// Declared properties followed by every join's properties
    pub fn all_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties
            .iter()
            .chain(self.joins.iter().flat_map(|j| j.properties.iter()))
    }

    /// Add a secondary table, returning its position
    pub fn add_join(&mut self, join: Join) -> usize {
        self.joins.push(join);
        self.joins.len() - 1
    }

    /// Join for a given table
    #[must_use]
    pub fn join_for_table(&self, table: TableId) -> Option<&Join> {
        self.joins.iter().find(|j| j.table == table)
    }

    /// Whether the discriminator is written by inserts (root only)
    #[must_use]
    pub fn is_discriminator_insertable(&self) -> bool {
        self.as_root()
            .is_some_and(|r| r.discriminator_insertable && r.discriminator.as_ref().is_some_and(|d| !d.has_formula()))
    }
}
