//! # quarry-core
//!
//! The mapping model ([`mapping`]) and the binding pipeline ([`bind`]) that
//! populates it from annotated entity hierarchies.
//!
//! ```
//! use quarry_core::bind::{
//!     AttributeMetadata, BindingOptions, ClassDetails, EntityHierarchy, EntityTypeMetadata,
//!     KeyMapping, bind_hierarchies,
//! };
//!
//! let root = EntityTypeMetadata::new(ClassDetails::new("com.shop.Customer"))
//!     .attribute(AttributeMetadata::basic("id", "Long"))
//!     .attribute(AttributeMetadata::basic("name", "String"));
//! let hierarchy = EntityHierarchy::new(root, KeyMapping::Basic { attribute: "id".into() });
//!
//! let model = bind_hierarchies(&[hierarchy], &BindingOptions::default()).unwrap();
//! let customer = model.metadata.entity_named("Customer").unwrap();
//! assert_eq!(customer.properties[0].name, "name");
//! ```

pub mod bind;
pub mod error;
pub mod mapping;
mod tracing;

pub use error::{MappingError, Result};
