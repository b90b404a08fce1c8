//! Tracing utilities for binding observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a debug-level event for a binding step.
///
/// ```ignore
/// quarry_trace_bind!("entity", entity = %name);
/// ```
#[macro_export]
macro_rules! quarry_trace_bind {
    ($step:literal $(, $($field:tt)+)?) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(step = $step $(, $($field)+)?, "quarry.bind");
    };
}

/// Emit a warn-level event for a non-fatal mapping problem.
///
/// ```ignore
/// quarry_warn!(entity = %name, "composite id class does not override equals");
/// ```
#[macro_export]
macro_rules! quarry_warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!($($arg)+);
    };
}
