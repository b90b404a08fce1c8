use quarry_core::MappingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MutationError {
    /// Failure reported by a mutation executor
    #[error("Mutation execution failed for {role}: {message}")]
    Execution { role: String, message: String },

    /// An element's subclass has no physical table in a table-per-subclass collection
    #[error("{role}: no table mapped for element subclass #{subclass_id}")]
    MissingSubclassMapping { role: String, subclass_id: usize },

    /// Coordinator request that the target cannot satisfy
    #[error("Unsupported collection mutation: {0}")]
    Unsupported(String),

    /// Mapping model could not be turned into a mutation target
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl MutationError {
    /// Execution failure for `role`
    pub fn execution(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            role: role.into(),
            message: message.into(),
        }
    }
}

/// Result type for collection mutations
pub type Result<T> = std::result::Result<T, MutationError>;
