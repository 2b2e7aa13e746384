//! Small concurrency primitives shared by the capture components.

pub mod deferred;
pub mod queue;

pub use deferred::Deferred;
pub use queue::SerialQueue;

/// Log an invariant violation and trip a debug assertion.
///
/// Release builds log and continue; debug builds stop so the violation
/// cannot be missed during development.
pub(crate) fn debug_failure(context: &str) {
    log::error!("{}", context);
    debug_assert!(false, "{}", context);
}
