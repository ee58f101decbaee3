//! Keyset pagination scenarios against the in-memory provider.

use quarry::{
    decode_cursor, encode_cursor, paginate, paginate_async, CursorError, CursorState, Dir,
    Filter, MemoryQuery, Number, Page, PageLimits, PaginationError, Paginator, Queryable, Record,
    Scalar, SortOrder,
};

#[derive(Debug, Clone, PartialEq, Record)]
struct Row {
    #[field(Int)]
    id: i64,
    #[field(Int)]
    rank: Option<i64>,
    #[field(String)]
    name: String,
}

fn row(id: i64, rank: Option<i64>) -> Row {
    Row {
        id,
        rank,
        name: format!("row {id}"),
    }
}

fn numbered(n: i64) -> Vec<Row> {
    (1..=n).map(|id| row(id, None)).collect()
}

fn by_id() -> CursorState<Row> {
    CursorState::new(SortOrder::parse("id").unwrap())
}

fn cursor_at(id: i64) -> String {
    encode_cursor(&[Scalar::from(id)]).unwrap()
}

fn fetch(items: &[Row], state: &CursorState<Row>, size: usize) -> Page<Row> {
    paginate(MemoryQuery::new(items), state, size, |q| q.materialize()).unwrap()
}

fn ids(page: &Page<Row>) -> Vec<i64> {
    page.items.iter().map(|r| r.id).collect()
}

fn ranks(page: &Page<Row>) -> Vec<Option<i64>> {
    page.items.iter().map(|r| r.rank).collect()
}

// ============================================================================
// Boundary scenarios
// ============================================================================

#[test]
fn first_page() {
    let items = numbered(10);
    let state = by_id();
    let page = fetch(&items, &state, 3);

    assert_eq!(ids(&page), vec![1, 2, 3]);
    assert!(page.has_next_page);
    assert!(!page.has_previous_page);

    let end = page.end_cursor.unwrap();
    let values = decode_cursor(&end, &state.ordering().key_types()).unwrap();
    assert_eq!(values, vec![Scalar::Number(Number::I64(3))]);
}

#[test]
fn middle_page() {
    let items = numbered(10);
    let page = fetch(&items, &by_id().after(cursor_at(3)), 3);
    assert_eq!(ids(&page), vec![4, 5, 6]);
    assert!(page.has_next_page);
    assert!(page.has_previous_page);
}

#[test]
fn last_page() {
    let items = numbered(10);
    let page = fetch(&items, &by_id().after(cursor_at(7)), 3);
    assert_eq!(ids(&page), vec![8, 9, 10]);
    assert!(!page.has_next_page);
    assert!(page.has_previous_page);
}

#[test]
fn before_first_item_is_empty() {
    let items = numbered(10);
    let page = fetch(&items, &by_id().before(cursor_at(1)), 3);
    assert!(page.is_empty());
    assert!(!page.has_next_page);
    assert!(!page.has_previous_page);
    assert_eq!(page.start_cursor, None);
    assert_eq!(page.end_cursor, None);
}

#[test]
fn backward_page_is_in_presentation_order() {
    let items = numbered(10);
    let page = fetch(&items, &by_id().before(cursor_at(8)), 3);
    assert_eq!(ids(&page), vec![5, 6, 7]);
    assert!(page.has_next_page);
    assert!(page.has_previous_page);

    let page = fetch(&items, &by_id().before(cursor_at(3)), 3);
    assert_eq!(ids(&page), vec![1, 2]);
    assert!(page.has_next_page);
    assert!(!page.has_previous_page);
}

#[test]
fn page_flags_imply_cursors() {
    let items = numbered(7);
    let mut state = by_id();
    loop {
        let page = fetch(&items, &state, 2);
        if page.has_next_page {
            assert!(page.end_cursor.is_some());
        }
        if page.has_previous_page {
            assert!(page.start_cursor.is_some());
        }
        match page.end_cursor {
            Some(end) if page.has_next_page => state = state.after(end),
            _ => break,
        }
    }
}

// ============================================================================
// Null ordering
// ============================================================================

fn ranked() -> Vec<Row> {
    vec![
        row(1, Some(2)),
        row(2, None),
        row(3, Some(1)),
        row(4, None),
    ]
}

#[test]
fn nulls_sort_first_ascending() {
    let items = ranked();
    let state = CursorState::new(SortOrder::parse("rank, id").unwrap());
    let page = fetch(&items, &state, 10);
    assert_eq!(ranks(&page), vec![None, None, Some(1), Some(2)]);
}

#[test]
fn nulls_sort_last_descending() {
    let items = ranked();
    let state = CursorState::new(SortOrder::parse("rank desc, id desc").unwrap());
    let page = fetch(&items, &state, 10);
    assert_eq!(ranks(&page), vec![Some(2), Some(1), None, None]);
}

fn walk(items: &[Row], state: &CursorState<Row>, size: usize) -> Vec<i64> {
    let mut seen = Vec::new();
    let mut state = state.clone();
    loop {
        let page = fetch(items, &state, size);
        seen.extend(ids(&page));
        match page.end_cursor {
            Some(end) if page.has_next_page => state = state.after(end),
            _ => return seen,
        }
    }
}

#[test]
fn walks_across_nulls_in_both_directions() {
    let items = ranked();
    let asc = CursorState::new(SortOrder::parse("rank, id").unwrap());
    assert_eq!(walk(&items, &asc, 1), vec![2, 4, 3, 1]);

    let desc = CursorState::new(SortOrder::parse("rank desc, id desc").unwrap());
    assert_eq!(walk(&items, &desc, 1), vec![1, 3, 4, 2]);
}

#[test]
fn null_anchor_on_descending_key_matches_nothing() {
    let items = ranked();
    let order = SortOrder::<Row>::new().then_desc("rank").unwrap();
    let anchor = encode_cursor(&[Scalar::Null]).unwrap();
    let page = fetch(&items, &CursorState::new(order).after(anchor), 10);
    assert!(page.is_empty());
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn filters_compose_with_pagination() {
    let items = numbered(10);
    let filter = Filter::<Row>::parse("id > 2 && id != 5").unwrap();
    let state = CursorState::new(SortOrder::parse("id desc").unwrap());

    let page = paginate(filter.apply_to(MemoryQuery::new(&items)), &state, 3, |q| {
        q.materialize()
    })
    .unwrap();
    assert_eq!(ids(&page), vec![10, 9, 8]);

    let end = page.end_cursor.unwrap();
    let page = paginate(
        filter.apply_to(MemoryQuery::new(&items)),
        &state.after(end),
        3,
        |q| q.materialize(),
    )
    .unwrap();
    assert_eq!(ids(&page), vec![7, 6, 4]);
    assert!(page.has_next_page);
}

#[test]
fn string_keys_page_ordinally() {
    let items: Vec<Row> = ["b", "B", "a", "ab"]
        .iter()
        .enumerate()
        .map(|(i, name)| Row {
            id: i as i64,
            rank: None,
            name: name.to_string(),
        })
        .collect();
    let state = CursorState::new(SortOrder::parse("name").unwrap());
    let first = fetch(&items, &state, 2);
    assert_eq!(first.items[0].name, "B");
    assert_eq!(first.items[1].name, "a");

    let rest = fetch(&items, &state.after(first.end_cursor.unwrap()), 2);
    let names: Vec<_> = rest.items.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["ab", "b"]);
}

#[test]
fn parameterized_seek_gives_same_rows() {
    let items = numbered(6);
    let paginator = Paginator::new(PageLimits::default()).parameterize_values(true);
    let page = paginator
        .paginate(MemoryQuery::new(&items), &by_id().after(cursor_at(2)), 2, |q| {
            let seek = q.predicate();
            assert!(seek.to_string().contains("param(2)"));
            q.materialize()
        })
        .unwrap();
    assert_eq!(ids(&page), vec![3, 4]);
}

#[test]
fn limit_from_provider_is_over_fetched() {
    let items = numbered(6);
    paginate(MemoryQuery::new(&items), &by_id(), 4, |q| {
        assert_eq!(q.limit(), Some(5));
        assert_eq!(q.keys().len(), 1);
        assert_eq!(q.keys()[0].dir, Dir::Asc);
        q.materialize()
    })
    .unwrap();

    paginate(MemoryQuery::new(&items), &by_id().before(cursor_at(4)), 4, |q| {
        assert_eq!(q.keys()[0].dir, Dir::Desc);
        q.materialize()
    })
    .unwrap();
}

#[test]
fn provider_take_is_respected() {
    let items = numbered(6);
    let page = paginate(MemoryQuery::new(&items).take(2), &by_id(), 4, |q| {
        q.materialize()
    })
    .unwrap();
    assert_eq!(ids(&page), vec![1, 2]);
    assert!(!page.has_next_page);
}

// ============================================================================
// Cursor errors
// ============================================================================

#[test]
fn cursor_from_other_ordering_is_rejected() {
    let items = numbered(4);
    let two_keys = encode_cursor(&[Scalar::from(1i64), Scalar::from(2i64)]).unwrap();
    assert!(matches!(
        paginate(MemoryQuery::new(&items), &by_id().after(two_keys), 2, |q| q.materialize()),
        Err(PaginationError::Cursor(CursorError::Arity {
            expected: 1,
            actual: 2
        }))
    ));

    let text = encode_cursor(&[Scalar::from("x")]).unwrap();
    assert!(matches!(
        paginate(MemoryQuery::new(&items), &by_id().after(text), 2, |q| q.materialize()),
        Err(PaginationError::Cursor(CursorError::TypeMismatch { index: 0, .. }))
    ));

    let null = encode_cursor(&[Scalar::Null]).unwrap();
    assert!(matches!(
        paginate(MemoryQuery::new(&items), &by_id().after(null), 2, |q| q.materialize()),
        Err(PaginationError::Cursor(CursorError::TypeMismatch { index: 0, .. }))
    ));
}

#[test]
fn garbage_cursor_is_rejected() {
    let items = numbered(4);
    assert!(matches!(
        paginate(MemoryQuery::new(&items), &by_id().after("not a cursor!"), 2, |q| {
            q.materialize()
        }),
        Err(PaginationError::Cursor(CursorError::Encoding))
    ));
    assert!(matches!(
        paginate(MemoryQuery::new(&items), &by_id().after("e30"), 2, |q| {
            q.materialize()
        }),
        Err(PaginationError::Cursor(CursorError::Payload(_)))
    ));
}

// ============================================================================
// Async
// ============================================================================

#[tokio::test]
async fn async_materializer() {
    let items = numbered(5);
    let state = by_id();
    let first = paginate_async(MemoryQuery::new(&items), &state, 2, |q| async move {
        tokio::task::yield_now().await;
        q.materialize()
    })
    .await
    .unwrap();
    assert_eq!(ids(&first), vec![1, 2]);

    let next = paginate_async(
        MemoryQuery::new(&items),
        &state.after(first.end_cursor.clone().unwrap()),
        2,
        |q| async move { q.materialize() },
    )
    .await
    .unwrap();
    assert_eq!(ids(&next), vec![3, 4]);
    assert!(next.has_previous_page);
    assert!(next.has_next_page);
}

#[tokio::test(flavor = "multi_thread")]
async fn async_materializer_error() {
    let items = numbered(5);
    let result = paginate_async(MemoryQuery::new(&items), &by_id(), 2, |_q| async {
        Err::<Vec<Row>, _>(std::io::Error::other("connection reset"))
    })
    .await;
    match result {
        Err(PaginationError::Materialize(err)) => assert_eq!(err.to_string(), "connection reset"),
        other => panic!("expected materialize error, got {other:?}"),
    }
}
