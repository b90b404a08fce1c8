use std::path::PathBuf;

use quarry_types::TypesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// Generic mapping error
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// The same column is mapped twice by one entity, join or collection
    #[error("Repeated column in mapping for {owner}: {column}")]
    DuplicateColumn { owner: String, column: String },

    /// A value's column count disagrees with its type
    #[error("Property '{entity}.{property}' maps to {actual} columns but {required} columns are required")]
    ColumnSpanMismatch {
        entity: String,
        property: String,
        actual: usize,
        required: usize,
    },

    /// Two properties with one name
    #[error("Duplicate property mapping of {property} found in {entity}")]
    DuplicateProperty { entity: String, property: String },

    /// An entity would become its own ancestor
    #[error("Circular inheritance mapping detected: {0}")]
    CircularInheritance(String),

    /// Mutually exclusive annotations on one class or member
    #[error("{owner} declares both @{first} and @{second}")]
    ConflictingAnnotations {
        owner: String,
        first: String,
        second: String,
    },

    /// A referenced column is not part of the target key
    #[error("{owner}: referenced column '{column}' not found in table '{table}'")]
    MissingReferencedColumn {
        owner: String,
        column: String,
        table: String,
    },

    /// A join column cannot be matched to exactly one target column
    #[error("{owner}: join column '{column}' is ambiguous against table '{table}'")]
    AmbiguousReferencedColumn {
        owner: String,
        column: String,
        table: String,
    },

    /// Single-table hierarchy with subclasses but no discriminator
    #[error("No discriminator defined by '{0}' which is a root class in a 'SINGLE_TABLE' inheritance hierarchy")]
    MissingDiscriminator(String),

    /// Composite identifier class is not serializable
    #[error("Composite-id class must implement Serializable: {class} (entity {entity})")]
    NonSerializableId { entity: String, class: String },

    /// Deferred work that made no progress in a full pass
    #[error("{count} second pass(es) could not be resolved: {}", .descriptions.join("; "))]
    UnresolvedSecondPasses {
        count: usize,
        descriptions: Vec<String>,
    },

    /// Branch that is explicitly not implemented
    #[error("Unsupported mapping: {0}")]
    Unsupported(String),

    /// Unknown entity name
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Relational model error
    #[error(transparent)]
    Types(#[from] TypesError),

    /// Mapping document could not be parsed
    #[error("Invalid mapping document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to read {}: {}", .0.display(), .1)]
    ConfigIo(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    ConfigParse(PathBuf, #[source] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for mapping and binding operations
pub type Result<T> = std::result::Result<T, MappingError>;
