//! Tracing utilities for collection mutations.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled.

/// Emit a debug-level event for a coordinator operation.
///
/// ```ignore
/// quarry_trace_mutation!("insert-rows", role = %role, rows = count);
/// ```
#[macro_export]
macro_rules! quarry_trace_mutation {
    ($operation:literal $(, $($field:tt)+)?) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(operation = $operation $(, $($field)+)?, "quarry.mutation");
    };
}

/// Emit a trace-level event for a single row mutation.
#[macro_export]
macro_rules! quarry_trace_row {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)+);
    };
}
