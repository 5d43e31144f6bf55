//! Reconciliation of a local adapter against a remote one.
//!
//! [`Synchronizer`] performs one full-state pass; [`IntervalSynchronizer`]
//! throttles passes to at most one per interval with single-flight exclusion
//! for concurrent callers.

mod interval;
mod synchronizer;

pub use interval::{IntervalSynchronizer, DEFAULT_INTERVAL};
pub use synchronizer::{PassStats, Synchronizer};
