//! The mapping model: values, properties, collections and entity hierarchies

mod collection;
mod metadata;
mod persistent_class;
mod property;
mod value;

pub use collection::{AuditMapping, Collection, CollectionKind, TemporalMapping, TemporalStrategy};
pub use metadata::{Metadata, ValidationReport};
pub use persistent_class::{
    CacheAccessType, CallbackDefinition, CallbackType, DiscriminatorType, EntityId,
    FilterConfiguration, InheritanceType, Join, MappedSuperclass, MappedSuperclassId,
    OptimisticLockStyle, PersistentClass, PersistentClassKind, RootClass, SoftDeleteMapping,
    SoftDeleteType, Subclass, SubclassStrategy,
};
pub use property::{Property, PropertyGeneration};
pub use value::{
    Component, DependantValue, IdentifierGenerator, OneToMany, SimpleValue, ToOne, ToOneKind, Value,
};
