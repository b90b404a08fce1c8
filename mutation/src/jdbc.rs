//! Executor contracts
//!
//! Statement execution and batching belong to the caller. Coordinators only
//! ask a [`MutationExecutorService`] for an executor, bind values and call
//! `execute` once per row.

use core::fmt;

use crate::sql::{ParameterUsage, TableMutation};
use crate::target::MutationType;
use crate::value::JdbcValue;
use crate::{MutationError, Result};

// =============================================================================
// Batch keys
// =============================================================================

/// Scope of statement batching
///
/// Statements only batch together when their keys are equal, so each key
/// names one statement shape: the role, the operation and, for
/// table-per-subclass collections, the element subclass.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchKey(String);

impl BatchKey {
    /// `role#OPERATION`
    #[must_use]
    pub fn new(role: &str, operation: &str) -> Self {
        Self(format!("{role}#{operation}"))
    }

    /// Key for a row operation of `mutation_type`
    #[must_use]
    pub fn for_mutation(role: &str, mutation_type: MutationType) -> Self {
        Self::new(role, mutation_type.as_str())
    }

    /// Narrow the key to one element subclass
    #[must_use]
    pub fn subclass(&self, subclass_id: usize) -> Self {
        Self(format!("{}#{subclass_id}", self.0))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Operation groups
// =============================================================================

/// Statements an executor runs for one logical operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationOperationGroup {
    pub role: String,
    pub mutation_type: MutationType,
    pub operations: Vec<TableMutation>,
}

impl MutationOperationGroup {
    /// Group holding one statement
    #[must_use]
    pub fn single(role: impl Into<String>, operation: TableMutation) -> Self {
        Self {
            role: role.into(),
            mutation_type: operation.mutation_type,
            operations: vec![operation],
        }
    }

    /// The single statement of a one-statement group
    #[must_use]
    pub fn operation(&self) -> Option<&TableMutation> {
        match self.operations.as_slice() {
            [operation] => Some(operation),
            _ => None,
        }
    }
}

// =============================================================================
// Value bindings
// =============================================================================

/// A value bound for the next execution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundValue {
    pub column: String,
    pub usage: ParameterUsage,
    pub value: JdbcValue,
}

/// Values bound for the next `execute` call
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JdbcValueBindings {
    values: Vec<BoundValue>,
}

impl JdbcValueBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `column`, replacing an earlier binding with the same usage
    pub fn bind_value(&mut self, value: JdbcValue, column: &str, usage: ParameterUsage) {
        match self
            .values
            .iter_mut()
            .find(|bound| bound.column == column && bound.usage == usage)
        {
            Some(bound) => bound.value = value,
            None => self.values.push(BoundValue {
                column: column.to_string(),
                usage,
                value,
            }),
        }
    }

    /// Bind one value per column, pairwise
    pub fn bind_values(&mut self, values: &[JdbcValue], columns: &[String], usage: ParameterUsage) {
        for (value, column) in values.iter().zip(columns) {
            self.bind_value(value.clone(), column, usage);
        }
    }

    #[must_use]
    pub fn values(&self) -> &[BoundValue] {
        &self.values
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound values in `mutation`'s placeholder order
    pub fn ordered_for(&self, mutation: &TableMutation) -> Result<Vec<JdbcValue>> {
        mutation
            .parameters
            .iter()
            .map(|parameter| {
                self.values
                    .iter()
                    .find(|bound| bound.column == parameter.column && bound.usage == parameter.usage)
                    .map(|bound| bound.value.clone())
                    .ok_or_else(|| {
                        MutationError::execution(
                            mutation.table_name.clone(),
                            format!("no value bound for column {}", parameter.column),
                        )
                    })
            })
            .collect()
    }

    /// Forget every binding; called after each statement
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

// =============================================================================
// Executors
// =============================================================================

/// Runs the statements of one operation group
pub trait MutationExecutor {
    /// Bindings for the next execution
    fn jdbc_value_bindings(&mut self) -> &mut JdbcValueBindings;

    /// Execute (or add to the batch) with the current bindings, then clear them
    fn execute(&mut self) -> Result<()>;

    /// Free resources; called exactly once
    fn release(&mut self);
}

/// Hands out executors
pub trait MutationExecutorService {
    fn create_executor(
        &self,
        batch_key: &BatchKey,
        group: &MutationOperationGroup,
    ) -> Result<Box<dyn MutationExecutor>>;
}

/// Session facilities coordinators depend on
pub trait SessionContext {
    fn mutation_executor_service(&self) -> &dyn MutationExecutorService;

    /// Current transaction id written into audit rows
    fn transaction_id(&self) -> JdbcValue;

    /// Timestamp written into validity-period columns
    fn current_timestamp(&self) -> JdbcValue;
}

/// An executor released when the scope ends, on every exit path
pub struct ExecutorScope {
    executor: Box<dyn MutationExecutor>,
}

impl ExecutorScope {
    /// Create an executor for `group` through the session's service
    pub fn open(
        session: &dyn SessionContext,
        batch_key: &BatchKey,
        group: &MutationOperationGroup,
    ) -> Result<Self> {
        let executor = session
            .mutation_executor_service()
            .create_executor(batch_key, group)?;
        Ok(Self { executor })
    }

    pub fn bindings(&mut self) -> &mut JdbcValueBindings {
        self.executor.jdbc_value_bindings()
    }

    pub fn execute(&mut self) -> Result<()> {
        self.executor.execute()
    }
}

impl fmt::Debug for ExecutorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorScope").finish_non_exhaustive()
    }
}

impl Drop for ExecutorScope {
    fn drop(&mut self) {
        self.executor.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MutationSql;
    use quarry_types::Dialect;

    #[test]
    fn test_batch_keys() {
        let insert = BatchKey::for_mutation("Order.lines", MutationType::Insert);
        assert_eq!(insert.as_str(), "Order.lines#INSERT");
        assert_eq!(insert.subclass(3).as_str(), "Order.lines#INSERT#3");
        assert_ne!(insert, BatchKey::for_mutation("Order.lines", MutationType::Delete));
    }

    #[test]
    fn test_bindings_follow_placeholder_order() {
        let update = MutationSql::update(Dialect::SQLite, "order_lines")
            .set("product")
            .restrict("order_id")
            .restrict("position")
            .build();
        let mut bindings = JdbcValueBindings::new();
        bindings.bind_value(JdbcValue::Int(1), "position", ParameterUsage::Restrict);
        bindings.bind_value(JdbcValue::Int(7), "order_id", ParameterUsage::Restrict);
        bindings.bind_value("widget".into(), "product", ParameterUsage::Set);

        let ordered = bindings.ordered_for(&update).unwrap();
        assert_eq!(ordered, vec!["widget".into(), JdbcValue::Int(7), JdbcValue::Int(1)]);
    }

    #[test]
    fn test_missing_binding() {
        let delete = MutationSql::delete(Dialect::SQLite, "order_lines")
            .restrict("order_id")
            .build();
        assert!(JdbcValueBindings::new().ordered_for(&delete).is_err());
    }
}
