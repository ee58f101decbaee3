//! Ordering model for keyset pagination.
//!
//! Provides [`Dir`] for sort direction, [`SortKey`] for a single resolved key
//! and [`SortOrder`] for the ordered key list a query is sorted by.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::cursor::KeyType;
use crate::error::{CompileError, PaginationError};
use crate::predicate::sort_order;
use crate::queryable::Queryable;
use crate::schema::{KeyPath, Record};
use crate::value::Scalar;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Returns `true` if this is ascending order.
    pub fn is_asc(self) -> bool {
        matches!(self, Dir::Asc)
    }

    /// Returns the opposite direction.
    pub fn reversed(self) -> Dir {
        match self {
            Dir::Asc => Dir::Desc,
            Dir::Desc => Dir::Asc,
        }
    }

    /// Applies this direction to an ordering.
    ///
    /// For `Asc`, returns the ordering unchanged.
    /// For `Desc`, reverses the ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    /// Returns the display name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl fmt::Display for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single ordering clause: a resolved key path and its direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub key: Arc<KeyPath>,
    pub dir: Dir,
}

impl SortKey {
    pub fn new(key: Arc<KeyPath>, dir: Dir) -> Self {
        SortKey { key, dir }
    }

    /// The same key in the opposite direction.
    pub fn reversed(&self) -> Self {
        SortKey {
            key: Arc::clone(&self.key),
            dir: self.dir.reversed(),
        }
    }

    /// Compares two records on this key alone. Nulls sort first.
    pub fn compare(&self, a: &dyn Record, b: &dyn Record) -> Ordering {
        self.dir
            .apply(sort_order(&self.key.read(a), &self.key.read(b)))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.dir)
    }
}

/// An ordered list of sort keys over records of type `T`.
///
/// The first key is the primary ordering; each later key breaks ties left by
/// the ones before it. Every operation returns a new value.
///
/// # Example
///
/// ```ignore
/// let order = SortOrder::<Product>::new()
///     .then_desc("price")?
///     .then_asc("id")?;
/// ```
pub struct SortOrder<T> {
    keys: Vec<SortKey>,
    _record: PhantomData<fn(&T)>,
}

impl<T> SortOrder<T> {
    /// Creates an empty ordering.
    ///
    /// An empty ordering cannot be applied; add at least one key first.
    pub fn new() -> Self {
        SortOrder {
            keys: Vec::new(),
            _record: PhantomData,
        }
    }

    /// Returns a copy with `key` appended as the lowest-priority clause.
    pub fn append(&self, key: SortKey) -> Self {
        let mut keys = self.keys.clone();
        keys.push(key);
        SortOrder {
            keys,
            _record: PhantomData,
        }
    }

    /// Returns a copy with every clause's direction flipped.
    pub fn reverse(&self) -> Self {
        SortOrder {
            keys: self.keys.iter().map(SortKey::reversed).collect(),
            _record: PhantomData,
        }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Declared type of every key, in clause order.
    pub fn key_types(&self) -> Vec<KeyType> {
        self.keys.iter().map(|k| KeyType::of(&k.key)).collect()
    }

    /// Sorts `query` by the first clause and breaks ties with the rest.
    pub fn apply_to<Q>(&self, query: Q) -> Result<Q, PaginationError>
    where
        Q: Queryable<Item = T>,
    {
        let (first, rest) = self
            .keys
            .split_first()
            .ok_or(PaginationError::EmptyOrdering)?;
        let query = query.order_by(&first.key, first.dir);
        Ok(rest
            .iter()
            .fold(query, |query, key| query.then_by(&key.key, key.dir)))
    }
}

impl<T: Record> SortOrder<T> {
    /// Returns a copy with the dotted `path` appended in direction `dir`.
    pub fn then(&self, path: &str, dir: Dir) -> Result<Self, CompileError> {
        let key = T::schema().resolve(path)?;
        Ok(self.append(SortKey::new(key, dir)))
    }

    /// Appends an ascending clause.
    pub fn then_asc(&self, path: &str) -> Result<Self, CompileError> {
        self.then(path, Dir::Asc)
    }

    /// Appends a descending clause.
    pub fn then_desc(&self, path: &str) -> Result<Self, CompileError> {
        self.then(path, Dir::Desc)
    }

    /// Parses a comma-separated ordering such as `"price desc, id"`.
    ///
    /// Each clause is a dotted path optionally followed by `asc` or `desc`.
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let mut order = SortOrder::new();
        for clause in text.split(',') {
            let mut words = clause.split_whitespace();
            let path = words.next().ok_or_else(|| CompileError::InvalidOrderingKey {
                path: clause.trim().to_string(),
            })?;
            let dir = match words.next() {
                None | Some("asc") => Dir::Asc,
                Some("desc") => Dir::Desc,
                Some(_) => {
                    return Err(CompileError::InvalidOrderingKey {
                        path: clause.trim().to_string(),
                    })
                }
            };
            if words.next().is_some() {
                return Err(CompileError::InvalidOrderingKey {
                    path: clause.trim().to_string(),
                });
            }
            order = order.then(path, dir)?;
        }
        Ok(order)
    }

    /// Reads every key of `record`, in clause order.
    pub fn key_values(&self, record: &T) -> Vec<Scalar> {
        self.keys
            .iter()
            .map(|k| k.key.read(record).to_scalar().unwrap_or(Scalar::Null))
            .collect()
    }

    /// Compares two records by the full key list.
    ///
    /// Uses the first clause as the primary sort key, the second to break
    /// ties, and so on. Equal on every clause returns `Equal`.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        compare_by_keys(&self.keys, a, b)
    }
}

/// Compares two records clause by clause.
pub(crate) fn compare_by_keys(keys: &[SortKey], a: &dyn Record, b: &dyn Record) -> Ordering {
    for key in keys {
        let ordering = key.compare(a, b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl<T> Default for SortOrder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SortOrder<T> {
    fn clone(&self) -> Self {
        SortOrder {
            keys: self.keys.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SortOrder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys.iter().map(|k| k.to_string())).finish()
    }
}

impl<T> fmt::Display for SortOrder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}
