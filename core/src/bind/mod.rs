//! Metadata binding
//!
//! Turns a categorized domain model ([`EntityHierarchy`] descriptors) into
//! the mapping model held by [`Metadata`](crate::mapping::Metadata).

mod annotations;
mod attribute;
mod caching;
mod column;
mod config;
mod discriminator;
mod entity;
mod identifier;
mod keys;
mod mapped_superclass;
mod model;
mod naming;
mod second_pass;
mod state;
mod table;

pub use annotations::{Annotated, AnnotationKind, AnnotationUsage, AttributeValue};
pub use attribute::{AttributeBinding, BoundAttribute};
pub use caching::{SharedCacheMode, should_cache};
pub use column::{BoundColumn, ColumnBinding, sql_type_for};
pub use config::{BindingOptions, CONFIG_FILE};
pub use discriminator::DiscriminatorBinding;
pub use entity::{BoundModel, RootEntityBinding, SubclassEntityBinding, bind_hierarchies};
pub use identifier::{DEFAULT_GENERATOR_TABLE, IdentifierBinding};
pub use keys::{JoinedSubclassKeyCallback, PrimaryKeyJoinColumn, SecondaryTableKeyCallback};
pub use mapped_superclass::{MappedSuperclassBinding, inherited_attributes};
pub use model::{
    AttributeMetadata, AttributeNature, CacheRegion, ClassDetails, EmbeddableTypeMetadata,
    EntityHierarchy, EntityTypeMetadata, KeyMapping, MappedSuperclassTypeMetadata, MemberDetails,
    MethodDetails, load_hierarchies,
};
pub use naming::{ImplicitNamingStrategy, NamingContext, PhysicalNamingStrategy};
pub use second_pass::{ResolutionCallback, SecondPassOutcome, SecondPassQueue, process_second_passes};
pub use state::{BindingContext, BindingState};
pub use table::{TableBinding, TableReference};
