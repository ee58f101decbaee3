//! Keyset pagination executor.
//!
//! A page is fetched in one round trip: the query is ordered (reversed when
//! paging backward), restricted to rows after the cursor with a seek
//! predicate, and asked for one row more than the page size. The extra row
//! only signals that more rows exist in the traversal direction and is
//! dropped before the page is returned.
//!
//! # Example
//!
//! ```ignore
//! use quarry::{paginate, CursorState, MemoryQuery, SortOrder};
//!
//! let order = SortOrder::<Task>::parse("priority desc, id")?;
//! let state = CursorState::new(order);
//!
//! let first = paginate(MemoryQuery::new(&tasks), &state, 20, |q| q.materialize())?;
//! if let Some(end) = &first.end_cursor {
//!     let second = paginate(MemoryQuery::new(&tasks), &state.after(end), 20, |q| q.materialize())?;
//! }
//! ```

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::cursor;
use crate::error::{BoxError, PaginationError};
use crate::keyset;
use crate::ordering::SortOrder;
use crate::queryable::Queryable;
use crate::schema::Record;

/// Where a page starts relative to the ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// The beginning of the ordering.
    Start,
    /// Rows strictly after the cursor.
    After(String),
    /// Rows strictly before the cursor.
    Before(String),
}

/// Traversal direction of a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// An ordering plus a position in it.
///
/// Each method returns a new state, so one state can seed both the next and
/// the previous page request.
pub struct CursorState<T> {
    ordering: SortOrder<T>,
    position: Position,
}

impl<T> CursorState<T> {
    /// Starts at the beginning of `ordering`.
    pub fn new(ordering: SortOrder<T>) -> Self {
        CursorState {
            ordering,
            position: Position::Start,
        }
    }

    /// Requests the rows after `cursor`.
    pub fn after(&self, cursor: impl Into<String>) -> Self {
        self.at(Position::After(cursor.into()))
    }

    /// Requests the rows before `cursor`.
    pub fn before(&self, cursor: impl Into<String>) -> Self {
        self.at(Position::Before(cursor.into()))
    }

    /// Requests the first page.
    pub fn first(&self) -> Self {
        self.at(Position::Start)
    }

    fn at(&self, position: Position) -> Self {
        CursorState {
            ordering: self.ordering.clone(),
            position,
        }
    }

    pub fn ordering(&self) -> &SortOrder<T> {
        &self.ordering
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// The anchor cursor, if any.
    pub fn cursor(&self) -> Option<&str> {
        match &self.position {
            Position::Start => None,
            Position::After(c) | Position::Before(c) => Some(c),
        }
    }

    pub fn direction(&self) -> Direction {
        match self.position {
            Position::Before(_) => Direction::Backward,
            Position::Start | Position::After(_) => Direction::Forward,
        }
    }
}

impl<T> Clone for CursorState<T> {
    fn clone(&self) -> Self {
        self.at(self.position.clone())
    }
}

impl<T> fmt::Debug for CursorState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorState")
            .field("ordering", &self.ordering)
            .field("position", &self.position)
            .finish()
    }
}

/// One page of results in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor of the first item; `None` for an empty page.
    pub start_cursor: Option<String>,
    /// Cursor of the last item; `None` for an empty page.
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maps the items, keeping cursors and flags.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            start_cursor: self.start_cursor,
            end_cursor: self.end_cursor,
            has_next_page: self.has_next_page,
            has_previous_page: self.has_previous_page,
        }
    }
}

/// Page size limits, loadable from host configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLimits {
    /// Largest page a caller may request. `None` means unbounded.
    pub max_page_size: Option<usize>,
}

/// Runs page requests against a [`Queryable`].
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    limits: PageLimits,
    parameterize_values: bool,
}

impl Paginator {
    pub fn new(limits: PageLimits) -> Self {
        Paginator {
            limits,
            parameterize_values: false,
        }
    }

    /// Marks cursor values in seek predicates as bindable parameters.
    pub fn parameterize_values(mut self, parameterize: bool) -> Self {
        self.parameterize_values = parameterize;
        self
    }

    pub fn limits(&self) -> &PageLimits {
        &self.limits
    }

    /// Fetches one page.
    ///
    /// `materialize` runs the prepared query and returns its rows in query
    /// order; its error is surfaced as [`PaginationError::Materialize`].
    pub fn paginate<Q, F, E>(
        &self,
        source: Q,
        state: &CursorState<Q::Item>,
        page_size: usize,
        materialize: F,
    ) -> Result<Page<Q::Item>, PaginationError>
    where
        Q: Queryable,
        F: FnOnce(Q) -> Result<Vec<Q::Item>, E>,
        E: Into<BoxError>,
    {
        let query = self.prepare(source, state, page_size)?;
        let rows = materialize(query).map_err(|e| PaginationError::Materialize(e.into()))?;
        assemble(rows, state, page_size)
    }

    /// Fetches one page with an asynchronous materializer.
    pub async fn paginate_async<Q, F, Fut, E>(
        &self,
        source: Q,
        state: &CursorState<Q::Item>,
        page_size: usize,
        materialize: F,
    ) -> Result<Page<Q::Item>, PaginationError>
    where
        Q: Queryable,
        F: FnOnce(Q) -> Fut,
        Fut: Future<Output = Result<Vec<Q::Item>, E>>,
        E: Into<BoxError>,
    {
        let query = self.prepare(source, state, page_size)?;
        let rows = materialize(query)
            .await
            .map_err(|e| PaginationError::Materialize(e.into()))?;
        assemble(rows, state, page_size)
    }

    /// Validates the request and builds the over-fetching query.
    fn prepare<Q: Queryable>(
        &self,
        source: Q,
        state: &CursorState<Q::Item>,
        page_size: usize,
    ) -> Result<Q, PaginationError> {
        if page_size == 0 {
            return Err(PaginationError::ZeroPageSize);
        }
        if let Some(max) = self.limits.max_page_size {
            if page_size > max {
                return Err(PaginationError::PageSizeTooLarge {
                    requested: page_size,
                    max,
                });
            }
        }

        let ordering = state.ordering();
        if ordering.is_empty() {
            return Err(PaginationError::EmptyOrdering);
        }

        let direction = state.direction();
        let effective = match direction {
            Direction::Forward => ordering.clone(),
            Direction::Backward => ordering.reverse(),
        };
        let mut query = effective.apply_to(source)?;

        if let Some(token) = state.cursor() {
            let values = cursor::decode(token, &ordering.key_types())?;
            let seek = keyset::seek(effective.keys(), &values, self.parameterize_values)?;
            tracing::trace!(seek = %seek, "applying seek predicate");
            query = query.filter(seek);
        }

        tracing::debug!(
            ordering = %effective,
            direction = ?direction,
            page_size,
            "fetching page"
        );
        Ok(query.take(page_size.saturating_add(1)))
    }
}

/// Fetches one page with default limits.
///
/// See [`Paginator::paginate`].
pub fn paginate<Q, F, E>(
    source: Q,
    state: &CursorState<Q::Item>,
    page_size: usize,
    materialize: F,
) -> Result<Page<Q::Item>, PaginationError>
where
    Q: Queryable,
    F: FnOnce(Q) -> Result<Vec<Q::Item>, E>,
    E: Into<BoxError>,
{
    Paginator::default().paginate(source, state, page_size, materialize)
}

/// Fetches one page with default limits and an asynchronous materializer.
pub async fn paginate_async<Q, F, Fut, E>(
    source: Q,
    state: &CursorState<Q::Item>,
    page_size: usize,
    materialize: F,
) -> Result<Page<Q::Item>, PaginationError>
where
    Q: Queryable,
    F: FnOnce(Q) -> Fut,
    Fut: Future<Output = Result<Vec<Q::Item>, E>>,
    E: Into<BoxError>,
{
    Paginator::default()
        .paginate_async(source, state, page_size, materialize)
        .await
}

/// Trims the over-fetched row, restores presentation order and derives
/// cursors from the caller's ordering.
fn assemble<T: Record>(
    mut rows: Vec<T>,
    state: &CursorState<T>,
    page_size: usize,
) -> Result<Page<T>, PaginationError> {
    let has_more = rows.len() > page_size;
    rows.truncate(page_size);

    let direction = state.direction();
    if direction == Direction::Backward {
        rows.reverse();
    }

    let ordering = state.ordering();
    let start_cursor = rows
        .first()
        .map(|row| cursor::encode(&ordering.key_values(row)))
        .transpose()?;
    let end_cursor = rows
        .last()
        .map(|row| cursor::encode(&ordering.key_values(row)))
        .transpose()?;

    let (has_next_page, has_previous_page) = if rows.is_empty() {
        (false, false)
    } else {
        match direction {
            Direction::Forward => (has_more, state.cursor().is_some()),
            Direction::Backward => (true, has_more),
        }
    };

    tracing::debug!(
        returned = rows.len(),
        has_more,
        has_next_page,
        has_previous_page,
        "assembled page"
    );

    Ok(Page {
        items: rows,
        start_cursor,
        end_cursor,
        has_next_page,
        has_previous_page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CursorError, EvalError};
    use crate::query::MemoryQuery;
    use crate::schema::tests::Customer;

    fn sample(n: i64) -> Vec<Customer> {
        (1..=n)
            .map(|id| Customer {
                id,
                rank: None,
                address: None,
                tags: vec![],
            })
            .collect()
    }

    fn state() -> CursorState<Customer> {
        CursorState::new(SortOrder::parse("id").unwrap())
    }

    fn ids(page: &Page<Customer>) -> Vec<i64> {
        page.items.iter().map(|c| c.id).collect()
    }

    #[test]
    fn state_transitions_are_pure() {
        let start = state();
        let after = start.after("abc");
        assert_eq!(start.position(), &Position::Start);
        assert_eq!(after.cursor(), Some("abc"));
        assert_eq!(after.direction(), Direction::Forward);
        assert_eq!(after.before("xyz").direction(), Direction::Backward);
        assert_eq!(after.first().cursor(), None);
    }

    #[test]
    fn forward_then_backward() {
        let items = sample(5);
        let first = paginate(MemoryQuery::new(&items), &state(), 2, |q| q.materialize()).unwrap();
        assert_eq!(ids(&first), vec![1, 2]);
        assert!(first.has_next_page);
        assert!(!first.has_previous_page);

        let end = first.end_cursor.clone().unwrap();
        let second =
            paginate(MemoryQuery::new(&items), &state().after(end), 2, |q| q.materialize()).unwrap();
        assert_eq!(ids(&second), vec![3, 4]);
        assert!(second.has_next_page);
        assert!(second.has_previous_page);

        let start = second.start_cursor.clone().unwrap();
        let back =
            paginate(MemoryQuery::new(&items), &state().before(start), 2, |q| q.materialize()).unwrap();
        assert_eq!(ids(&back), vec![1, 2]);
        assert!(back.has_next_page);
        assert!(!back.has_previous_page);
        assert_eq!(back.start_cursor, first.start_cursor);
    }

    #[test]
    fn empty_page_has_no_cursors() {
        let items = sample(0);
        let page = paginate(MemoryQuery::new(&items), &state(), 3, |q| q.materialize()).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.start_cursor, None);
        assert_eq!(page.end_cursor, None);
        assert!(!page.has_next_page);
        assert!(!page.has_previous_page);
    }

    #[test]
    fn contract_errors() {
        let items = sample(3);
        assert!(matches!(
            paginate(MemoryQuery::new(&items), &state(), 0, |q| q.materialize()),
            Err(PaginationError::ZeroPageSize)
        ));

        let empty = CursorState::<Customer>::new(SortOrder::new());
        assert!(matches!(
            paginate(MemoryQuery::new(&items), &empty, 2, |q| q.materialize()),
            Err(PaginationError::EmptyOrdering)
        ));

        let limited = Paginator::new(PageLimits {
            max_page_size: Some(10),
        });
        assert!(matches!(
            limited.paginate(MemoryQuery::new(&items), &state(), 11, |q| q.materialize()),
            Err(PaginationError::PageSizeTooLarge {
                requested: 11,
                max: 10
            })
        ));
    }

    #[test]
    fn bad_cursor_is_rejected() {
        let items = sample(3);
        assert!(matches!(
            paginate(MemoryQuery::new(&items), &state().after("%%%"), 2, |q| q.materialize()),
            Err(PaginationError::Cursor(CursorError::Encoding))
        ));
    }

    #[test]
    fn materializer_error_is_boxed() {
        let items = sample(3);
        let result = paginate(MemoryQuery::new(&items), &state(), 2, |_q| {
            Err::<Vec<Customer>, _>(EvalError::NullReference {
                path: "address".into(),
            })
        });
        match result {
            Err(PaginationError::Materialize(err)) => {
                assert_eq!(err.to_string(), "null reference while reading 'address'")
            }
            other => panic!("expected materialize error, got {other:?}"),
        }
    }

    #[test]
    fn map_keeps_cursors() {
        let items = sample(3);
        let page = paginate(MemoryQuery::new(&items), &state(), 2, |q| q.materialize()).unwrap();
        let mapped = page.clone().map(|c| c.id * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.end_cursor, page.end_cursor);
        assert_eq!(mapped.len(), 2);
    }

    #[test]
    fn limits_deserialize() {
        let limits: PageLimits = serde_json::from_str(r#"{"max_page_size": 50}"#).unwrap();
        assert_eq!(limits.max_page_size, Some(50));
        let limits: PageLimits = serde_json::from_str("{}").unwrap();
        assert_eq!(limits, PageLimits::default());
    }
}
