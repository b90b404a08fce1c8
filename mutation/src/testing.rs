//! Recording executor service for coordinator tests

use std::cell::RefCell;
use std::rc::Rc;

use crate::jdbc::{
    BatchKey, JdbcValueBindings, MutationExecutor, MutationExecutorService, MutationOperationGroup,
    SessionContext,
};
use crate::value::JdbcValue;
use crate::{MutationError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Executed {
    pub batch_key: String,
    pub sql: String,
    pub values: Vec<JdbcValue>,
}

#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub created: Vec<String>,
    pub released: Vec<String>,
    pub executed: Vec<Executed>,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSession {
    pub recorder: Rc<RefCell<Recorder>>,
    /// Batch key whose executions fail
    pub failing: Option<String>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(batch_key: &str) -> Self {
        Self {
            failing: Some(batch_key.to_string()),
            ..Self::default()
        }
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.recorder.borrow().executed.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.recorder.borrow().created.clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.recorder.borrow().released.clone()
    }
}

struct RecordingExecutor {
    batch_key: String,
    group: MutationOperationGroup,
    bindings: JdbcValueBindings,
    recorder: Rc<RefCell<Recorder>>,
    fail: bool,
}

impl MutationExecutor for RecordingExecutor {
    fn jdbc_value_bindings(&mut self) -> &mut JdbcValueBindings {
        &mut self.bindings
    }

    fn execute(&mut self) -> Result<()> {
        if self.fail {
            return Err(MutationError::execution(&self.group.role, "constraint violation"));
        }
        for operation in &self.group.operations {
            let values = self.bindings.ordered_for(operation)?;
            self.recorder.borrow_mut().executed.push(Executed {
                batch_key: self.batch_key.clone(),
                sql: operation.sql.clone(),
                values,
            });
        }
        self.bindings.clear();
        Ok(())
    }

    fn release(&mut self) {
        self.recorder.borrow_mut().released.push(self.batch_key.clone());
    }
}

impl MutationExecutorService for RecordingSession {
    fn create_executor(
        &self,
        batch_key: &BatchKey,
        group: &MutationOperationGroup,
    ) -> Result<Box<dyn MutationExecutor>> {
        self.recorder.borrow_mut().created.push(batch_key.to_string());
        Ok(Box::new(RecordingExecutor {
            batch_key: batch_key.to_string(),
            group: group.clone(),
            bindings: JdbcValueBindings::new(),
            recorder: Rc::clone(&self.recorder),
            fail: self.failing.as_deref() == Some(batch_key.as_str()),
        }))
    }
}

impl SessionContext for RecordingSession {
    fn mutation_executor_service(&self) -> &dyn MutationExecutorService {
        self
    }

    fn transaction_id(&self) -> JdbcValue {
        JdbcValue::Int(42)
    }

    fn current_timestamp(&self) -> JdbcValue {
        JdbcValue::Text("2024-01-01T00:00:00".into())
    }
}
