//! Deferred binding work
//!
//! A [`ResolutionCallback`] stands for binding work whose target (usually
//! another entity's primary key) may not exist yet. [`process_second_passes`]
//! drains the queue to a fixed point: every full pass must resolve at least
//! one callback, otherwise the remainder is unsatisfiable.

use std::fmt::Debug;

use super::{BindingContext, BindingState};
use crate::{MappingError, Result, quarry_trace_bind, quarry_warn};

/// A unit of deferred binding work
pub trait ResolutionCallback: Debug {
    /// Try to complete the work
    ///
    /// `Ok(true)` resolves the callback. `Ok(false)` and errors keep it
    /// queued for the next pass.
    fn resolve(&mut self, state: &mut BindingState, context: &BindingContext) -> Result<bool>;

    /// Human-readable description used in errors and logs
    fn description(&self) -> String;
}

/// Pending callbacks in registration order
#[derive(Debug, Default)]
pub struct SecondPassQueue {
    pending: Vec<Box<dyn ResolutionCallback>>,
}

impl SecondPassQueue {
    pub fn push(&mut self, callback: Box<dyn ResolutionCallback>) {
        self.pending.push(callback);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Descriptions of the pending callbacks
    #[must_use]
    pub fn descriptions(&self) -> Vec<String> {
        self.pending.iter().map(|c| c.description()).collect()
    }
}

/// Result of draining the queue
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecondPassOutcome {
    /// Callbacks resolved
    pub resolved: usize,
    /// Full passes made over the queue
    pub passes: usize,
    /// Descriptions of callbacks left queued when unresolved work is allowed
    pub unresolved: Vec<String>,
}

/// Drain the second-pass queue to a fixed point
///
/// Callbacks queued while resolving are picked up by the next pass. A pass
/// that resolves nothing ends processing: with
/// `allow_unresolved_second_passes` the remainder stays queued, otherwise the
/// first error seen in that pass (or [`MappingError::UnresolvedSecondPasses`])
/// is returned.
pub fn process_second_passes(
    state: &mut BindingState,
    context: &BindingContext,
) -> Result<SecondPassOutcome> {
    let mut outcome = SecondPassOutcome::default();

    while !state.second_passes.is_empty() {
        let pending = std::mem::take(&mut state.second_passes.pending);
        outcome.passes += 1;

        let mut remaining = Vec::with_capacity(pending.len());
        let mut first_error = None;
        let mut progress = 0usize;

        for mut callback in pending {
            match callback.resolve(state, context) {
                Ok(true) => {
                    progress += 1;
                    quarry_trace_bind!("second_pass", resolved = %callback.description());
                }
                Ok(false) => remaining.push(callback),
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                    remaining.push(callback);
                }
            }
        }

        // callbacks queued during this pass run after the survivors
        remaining.append(&mut state.second_passes.pending);
        state.second_passes.pending = remaining;
        outcome.resolved += progress;

        if progress == 0 {
            if context.options().allow_unresolved_second_passes {
                outcome.unresolved = state.second_passes.descriptions();
                quarry_warn!(
                    count = outcome.unresolved.len(),
                    "leaving unresolved second passes queued"
                );
                break;
            }
            if let Some(error) = first_error {
                return Err(error);
            }
            let descriptions = state.second_passes.descriptions();
            return Err(MappingError::UnresolvedSecondPasses {
                count: descriptions.len(),
                descriptions,
            });
        }
    }

    Ok(outcome)
}
