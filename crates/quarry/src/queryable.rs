//! The query provider seam.
//!
//! Filters and orderings never touch data themselves. They hand a
//! [`Predicate`] and sort keys to a [`Queryable`], which decides how to run
//! them: a SQL translation layer, a remote API, or [`MemoryQuery`] for
//! slices.
//!
//! [`MemoryQuery`]: crate::MemoryQuery

use crate::ordering::Dir;
use crate::predicate::Predicate;
use crate::schema::{KeyPath, Record};

/// A lazily composed query over records of type [`Queryable::Item`].
///
/// Every method consumes the query and returns the extended one; nothing
/// runs until the provider materializes it.
pub trait Queryable: Sized {
    type Item: Record;

    /// Restricts results to records satisfying `predicate`.
    ///
    /// Calling this more than once conjoins the predicates.
    fn filter(self, predicate: Predicate) -> Self;

    /// Replaces any existing ordering with `key` as the primary sort key.
    fn order_by(self, key: &KeyPath, dir: Dir) -> Self;

    /// Adds a tie-breaking sort key after the existing ones.
    fn then_by(self, key: &KeyPath, dir: Dir) -> Self;

    /// Limits the number of results.
    fn take(self, count: usize) -> Self;
}
