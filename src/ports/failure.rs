//! Failure Port - where transports report failed calls.

use crate::domain::failure::FailureCategory;

/// Receives one report per failed venue call.
///
/// Called concurrently from every transport; implementations must be
/// cheap and must never fail back into the caller.
pub trait FailureSink: Send + Sync + 'static {
    fn report(&self, category: FailureCategory, source: &str, info: &str);
}
