//! # quarry-mutation
//!
//! Writes the rows of collection roles that changed since the last flush.
//!
//! A [`CollectionMutationTarget`] describes one role's physical table (or
//! tables), its statement shapes and its shadow tables. The
//! [`CollectionCoordinatorFactory`] turns a target into insert, update,
//! delete and remove coordinators, and each coordinator compares a
//! [`PersistentCollection`]'s snapshot against its current state, binds the
//! changed rows and hands them to executors from the caller's
//! [`MutationExecutorService`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use quarry_mutation::{
//!     CollectionCoordinatorFactory, CollectionMutationTarget, CollectionNature,
//!     CollectionOperationCoordinator, CollectionTableMapping,
//! };
//!
//! let table = CollectionTableMapping::new("order_lines", vec!["order_id".into()], vec!["product".into()])
//!     .index_columns(vec!["position".into()]);
//! let target = CollectionMutationTarget::new("Order.lines", CollectionNature::List, table);
//! let coordinators = CollectionCoordinatorFactory::build(Arc::new(target));
//! assert_eq!(coordinators.update.target().role, "Order.lines");
//! ```

mod collection;
pub mod coordinator;
mod descriptor;
mod error;
mod jdbc;
mod operations;
mod sql;
mod target;
#[cfg(test)]
mod testing;
mod tracing;
mod value;

pub use collection::{CollectionEntry, CollectionSemantics, PersistentCollection, SnapshotCollection};
pub use coordinator::{
    CollectionCoordinatorFactory, CollectionCoordinators, CollectionOperationCoordinator,
    DeleteRowsCoordinator, EntryChecker, InsertRowsCoordinator, NoOpCoordinator, RemoveCoordinator,
    UpdateRowsCoordinator,
};
pub use descriptor::build_mutation_target;
pub use error::{MutationError, Result};
pub use jdbc::{
    BatchKey, BoundValue, ExecutorScope, JdbcValueBindings, MutationExecutor, MutationExecutorService,
    MutationOperationGroup, SessionContext,
};
pub use operations::RowMutationOperations;
pub use sql::{ColumnParameter, MutationSql, ParameterUsage, TableMutation};
pub use target::{
    AuditTable, CollectionMutationTarget, CollectionNature, CollectionTableMapping, HistoryTable,
    ModificationType, MutationDetails, MutationType, SubclassTable, TemporalColumns,
};
pub use value::JdbcValue;
