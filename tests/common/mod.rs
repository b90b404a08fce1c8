#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use quarry::core::bind::{BindingOptions, bind_hierarchies, load_hierarchies};
use quarry::core::mapping::Metadata;
use quarry::mutation::{
    BatchKey, JdbcValue, JdbcValueBindings, MutationExecutor, MutationExecutorService,
    MutationOperationGroup, Result, SessionContext,
};

/// Bind a JSON hierarchy document with default options
pub fn bind_json(json: &str) -> Metadata {
    let hierarchies = load_hierarchies(json).unwrap();
    bind_hierarchies(&hierarchies, &BindingOptions::default())
        .unwrap()
        .metadata
}

/// One executed statement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub batch_key: String,
    pub sql: String,
    pub values: Vec<JdbcValue>,
}

#[derive(Debug, Default)]
struct Journal {
    created: Vec<String>,
    released: Vec<String>,
    statements: Vec<Statement>,
}

/// Session that records statements instead of running them
#[derive(Debug, Default)]
pub struct RecordingSession {
    journal: Rc<RefCell<Journal>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.journal.borrow().statements.clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.sql).collect()
    }

    pub fn created(&self) -> Vec<String> {
        self.journal.borrow().created.clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.journal.borrow().released.clone()
    }
}

struct JournalExecutor {
    batch_key: String,
    group: MutationOperationGroup,
    bindings: JdbcValueBindings,
    journal: Rc<RefCell<Journal>>,
}

impl MutationExecutor for JournalExecutor {
    fn jdbc_value_bindings(&mut self) -> &mut JdbcValueBindings {
        &mut self.bindings
    }

    fn execute(&mut self) -> Result<()> {
        for operation in &self.group.operations {
            let values = self.bindings.ordered_for(operation)?;
            self.journal.borrow_mut().statements.push(Statement {
                batch_key: self.batch_key.clone(),
                sql: operation.sql.clone(),
                values,
            });
        }
        self.bindings.clear();
        Ok(())
    }

    fn release(&mut self) {
        self.journal.borrow_mut().released.push(self.batch_key.clone());
    }
}

impl MutationExecutorService for RecordingSession {
    fn create_executor(
        &self,
        batch_key: &BatchKey,
        group: &MutationOperationGroup,
    ) -> Result<Box<dyn MutationExecutor>> {
        self.journal.borrow_mut().created.push(batch_key.to_string());
        Ok(Box::new(JournalExecutor {
            batch_key: batch_key.to_string(),
            group: group.clone(),
            bindings: JdbcValueBindings::new(),
            journal: Rc::clone(&self.journal),
        }))
    }
}

impl SessionContext for RecordingSession {
    fn mutation_executor_service(&self) -> &dyn MutationExecutorService {
        self
    }

    fn transaction_id(&self) -> JdbcValue {
        JdbcValue::Int(7)
    }

    fn current_timestamp(&self) -> JdbcValue {
        JdbcValue::Text("2025-03-01T09:30:00".into())
    }
}
