//! Relational model errors

/// Errors raised while assembling tables and keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// Column name already present on the table under a different definition
    #[error("duplicate column '{column}' on table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// A key or index names a column the table does not have
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    /// A table id or name did not resolve
    #[error("unknown table '{0}'")]
    UnknownTable(String),
}

/// Result type for relational model operations
pub type Result<T> = std::result::Result<T, TypesError>;
