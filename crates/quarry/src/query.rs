//! In-memory query provider.
//!
//! [`MemoryQuery`] runs predicates and orderings over a slice. It is the
//! reference implementation of [`Queryable`] and what the tests page
//! through; a database-backed provider would translate the same calls into
//! its own query language instead.

use std::sync::Arc;

use crate::error::EvalError;
use crate::ordering::{compare_by_keys, Dir, SortKey};
use crate::predicate::Predicate;
use crate::queryable::Queryable;
use crate::schema::{KeyPath, Record};

/// A query over a borrowed slice of records.
///
/// Building the query is free; [`MemoryQuery::materialize`] filters, sorts
/// with a stable sort and truncates, cloning only the retained records.
///
/// # Example
///
/// ```ignore
/// use quarry::{Filter, MemoryQuery, Queryable, SortOrder};
///
/// let filter = Filter::<Task>::parse("priority >= 3")?;
/// let order = SortOrder::<Task>::parse("priority desc, id")?;
/// let query = order.apply_to(filter.apply_to(MemoryQuery::new(&tasks)))?;
/// let top = query.take(10).materialize()?;
/// ```
#[derive(Debug)]
pub struct MemoryQuery<'a, T> {
    items: &'a [T],
    predicates: Vec<Predicate>,
    keys: Vec<SortKey>,
    limit: Option<usize>,
}

impl<'a, T: Record> MemoryQuery<'a, T> {
    /// Creates a query over `items` that matches everything.
    pub fn new(items: &'a [T]) -> Self {
        MemoryQuery {
            items,
            predicates: Vec::new(),
            keys: Vec::new(),
            limit: None,
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Conjunction of every filter added so far.
    pub fn predicate(&self) -> Predicate {
        Predicate::and(self.predicates.iter().cloned())
    }

    /// Returns the sort keys, primary first.
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Returns the limit, if set.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Tests if a single item matches every filter.
    pub fn matches(&self, item: &T) -> Result<bool, EvalError> {
        for predicate in &self.predicates {
            if !predicate.evaluate(item)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Filters, sorts and limits, returning references into the slice.
    pub fn run(&self) -> Result<Vec<&'a T>, EvalError> {
        let mut results = Vec::new();
        for item in self.items {
            if self.matches(item)? {
                results.push(item);
            }
        }

        if !self.keys.is_empty() {
            results.sort_by(|a, b| compare_by_keys(&self.keys, *a, *b));
        }

        if let Some(limit) = self.limit {
            results.truncate(limit);
        }

        Ok(results)
    }

    /// Counts matching items, ignoring ordering and limit.
    pub fn count(&self) -> Result<usize, EvalError> {
        let mut count = 0;
        for item in self.items {
            if self.matches(item)? {
                count += 1;
            }
        }
        Ok(count)
    }
}

impl<T: Record + Clone> MemoryQuery<'_, T> {
    /// Runs the query and clones the results.
    pub fn materialize(&self) -> Result<Vec<T>, EvalError> {
        Ok(self.run()?.into_iter().cloned().collect())
    }
}

impl<T> Clone for MemoryQuery<'_, T> {
    fn clone(&self) -> Self {
        MemoryQuery {
            items: self.items,
            predicates: self.predicates.clone(),
            keys: self.keys.clone(),
            limit: self.limit,
        }
    }
}

impl<T: Record> Queryable for MemoryQuery<'_, T> {
    type Item = T;

    fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    fn order_by(mut self, key: &KeyPath, dir: Dir) -> Self {
        self.keys = vec![SortKey::new(Arc::new(key.clone()), dir)];
        self
    }

    fn then_by(mut self, key: &KeyPath, dir: Dir) -> Self {
        self.keys.push(SortKey::new(Arc::new(key.clone()), dir));
        self
    }

    fn take(mut self, count: usize) -> Self {
        self.limit = Some(self.limit.map_or(count, |limit| limit.min(count)));
        self
    }
}
