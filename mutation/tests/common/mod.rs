#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use quarry_mutation::{
    BatchKey, JdbcValue, JdbcValueBindings, MutationExecutor, MutationExecutorService,
    MutationOperationGroup, Result, SessionContext,
};

/// One executed statement with its values in placeholder order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub batch_key: String,
    pub sql: String,
    pub values: Vec<JdbcValue>,
}

#[derive(Debug, Default)]
struct Log {
    created: Vec<String>,
    released: Vec<String>,
    statements: Vec<Statement>,
}

/// Session whose executors record instead of running statements
#[derive(Debug, Default)]
pub struct RecordingSession {
    log: Rc<RefCell<Log>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.log.borrow().statements.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.log.borrow().created.clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.log.borrow().released.clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.sql).collect()
    }
}

struct RecordingExecutor {
    batch_key: String,
    group: MutationOperationGroup,
    bindings: JdbcValueBindings,
    log: Rc<RefCell<Log>>,
}

impl MutationExecutor for RecordingExecutor {
    fn jdbc_value_bindings(&mut self) -> &mut JdbcValueBindings {
        &mut self.bindings
    }

    fn execute(&mut self) -> Result<()> {
        for operation in &self.group.operations {
            let values = self.bindings.ordered_for(operation)?;
            self.log.borrow_mut().statements.push(Statement {
                batch_key: self.batch_key.clone(),
                sql: operation.sql.clone(),
                values,
            });
        }
        self.bindings.clear();
        Ok(())
    }

    fn release(&mut self) {
        self.log.borrow_mut().released.push(self.batch_key.clone());
    }
}

impl MutationExecutorService for RecordingSession {
    fn create_executor(
        &self,
        batch_key: &BatchKey,
        group: &MutationOperationGroup,
    ) -> Result<Box<dyn MutationExecutor>> {
        self.log.borrow_mut().created.push(batch_key.to_string());
        Ok(Box::new(RecordingExecutor {
            batch_key: batch_key.to_string(),
            group: group.clone(),
            bindings: JdbcValueBindings::new(),
            log: Rc::clone(&self.log),
        }))
    }
}

impl SessionContext for RecordingSession {
    fn mutation_executor_service(&self) -> &dyn MutationExecutorService {
        self
    }

    fn transaction_id(&self) -> JdbcValue {
        JdbcValue::Int(1001)
    }

    fn current_timestamp(&self) -> JdbcValue {
        JdbcValue::Text("2024-06-01T12:00:00".into())
    }
}
