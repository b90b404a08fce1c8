//! # Quarry
//!
//! Object/relational mapping core: bind annotated entity hierarchies into a
//! mapping model, then coordinate the SQL writes that keep a persistent
//! collection's rows in step with its in-memory state.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use quarry::prelude::*;
//!
//! let root = EntityTypeMetadata::new(ClassDetails::new("com.shop.Order"))
//!     .attribute(AttributeMetadata::basic("id", "Long"));
//! let hierarchy = EntityHierarchy::new(root, KeyMapping::Basic { attribute: "id".into() });
//! let model = bind_hierarchies(&[hierarchy], &BindingOptions::default()).unwrap();
//! assert!(model.metadata.entity_named("Order").is_ok());
//!
//! let table = CollectionTableMapping::new("order_tags", vec!["order_id".into()], vec!["tag".into()]);
//! let target = CollectionMutationTarget::new("Order.tags", CollectionNature::Set, table);
//! let coordinators = CollectionCoordinatorFactory::build(Arc::new(target));
//! assert_eq!(coordinators.insert.target().role, "Order.tags");
//! ```
//!
//! ## Crates
//!
//! | Crate             | Re-exported as | Contents                                   |
//! |-------------------|----------------|--------------------------------------------|
//! | `quarry-types`    | [`ddl`]        | Tables, columns, keys, dialects            |
//! | `quarry-core`     | [`core`]       | Mapping model and the binding pipeline     |
//! | `quarry-mutation` | [`mutation`]   | Collection mutation targets and coordinators |

#![cfg_attr(docsrs, feature(doc_cfg))]

// =============================================================================
// Member crates
// =============================================================================

/// Relational model entities
pub use quarry_types as ddl;

/// Mapping model and metadata binding
pub use quarry_core as core;

/// Collection mutation coordination
pub use quarry_mutation as mutation;

// =============================================================================
// Root-level exports
// =============================================================================

pub use quarry_core::{MappingError, Result};
pub use quarry_mutation::MutationError;
pub use quarry_types::Dialect;

/// Everything needed to bind a model and flush its collections
pub mod prelude {
    pub use quarry_types::{Column, Database, Dialect, Identifier, Table, TableId};

    pub use quarry_core::bind::{
        AttributeMetadata, BindingOptions, BoundModel, ClassDetails, EntityHierarchy,
        EntityTypeMetadata, KeyMapping, bind_hierarchies, load_hierarchies,
    };
    pub use quarry_core::mapping::{Collection, CollectionKind, Metadata, SimpleValue, Value};
    pub use quarry_core::{MappingError, Result};

    pub use quarry_mutation::{
        CollectionCoordinatorFactory, CollectionCoordinators, CollectionEntry, CollectionMutationTarget,
        CollectionNature, CollectionOperationCoordinator, CollectionSemantics, CollectionTableMapping,
        DeleteRowsCoordinator, InsertRowsCoordinator, JdbcValue, MutationError, PersistentCollection,
        RemoveCoordinator, SessionContext, SnapshotCollection, UpdateRowsCoordinator,
        build_mutation_target,
    };
}
