//! Pagination engine behaviour against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use folio_query::{Cursor, CursorError, Direction, Page, PaginationEngine, QueryError};
use folio_store::{DocumentStore, Filter, MemoryStore, Order, SortSpec, StoreOp};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Row {
    #[serde(rename = "_id")]
    id: String,
    owner: String,
    n: u64,
}

const MAX_PAGE: usize = 50;

/// `count` rows for "alice" with n = 1..=count, in insertion order.
async fn seeded(count: u64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for n in 1..=count {
        store
            .insert(json!({"owner": "alice", "n": n}))
            .await
            .unwrap();
    }
    store
}

fn engine(store: &Arc<MemoryStore>) -> PaginationEngine {
    PaginationEngine::new(store.clone(), MAX_PAGE)
}

fn ns(page: &Page<Row>) -> Vec<u64> {
    page.items.iter().map(|r| r.n).collect()
}

async fn list(
    engine: &PaginationEngine,
    cursor: &Cursor,
    size: usize,
    direction: Direction,
) -> Result<Page<Row>, QueryError> {
    engine
        .list(
            &Filter::new(),
            &SortSpec::insertion_order(),
            cursor,
            size,
            direction,
        )
        .await
}

// ──────────────────────────────────────────────
// Forward paging
// ──────────────────────────────────────────────

#[tokio::test]
async fn twenty_five_records_page_in_three_calls() {
    let store = seeded(25).await;
    let engine = engine(&store);

    let first = list(&engine, &Cursor::start(), 10, Direction::Forward)
        .await
        .unwrap();
    assert_eq!(ns(&first), (1..=10).collect::<Vec<_>>());
    assert_eq!(first.total_count, 25);
    assert!(first.has_next);
    assert!(!first.has_prev);

    let cursor = first.end_cursor.clone().unwrap();
    let second = list(&engine, &cursor, 10, Direction::Forward).await.unwrap();
    assert_eq!(ns(&second), (11..=20).collect::<Vec<_>>());
    assert!(second.has_next);
    assert!(second.has_prev);

    let cursor = second.end_cursor.clone().unwrap();
    let third = list(&engine, &cursor, 10, Direction::Forward).await.unwrap();
    assert_eq!(ns(&third), (21..=25).collect::<Vec<_>>());
    assert!(!third.has_next);
    assert!(third.has_prev);
    assert_eq!(third.total_count, 25);
}

#[tokio::test]
async fn page_size_bounds_and_has_next_hold_for_every_size() {
    let store = seeded(25).await;
    let engine = engine(&store);

    for size in 1..=30 {
        let mut cursor = Cursor::start();
        let mut seen = Vec::new();
        loop {
            let page = list(&engine, &cursor, size, Direction::Forward)
                .await
                .unwrap();
            assert!(page.len() <= size, "size {size}: page of {}", page.len());
            seen.extend(ns(&page));
            let remaining = 25 - seen.len();
            assert_eq!(
                page.has_next,
                remaining > 0,
                "size {size}: has_next with {remaining} left"
            );
            match (page.has_next, page.end_cursor) {
                (true, Some(next)) => cursor = next,
                _ => break,
            }
        }
        assert_eq!(seen, (1..=25).collect::<Vec<_>>(), "size {size}");
    }
}

#[tokio::test]
async fn exact_multiple_has_no_trailing_page() {
    let store = seeded(20).await;
    let engine = engine(&store);

    let first = list(&engine, &Cursor::start(), 10, Direction::Forward)
        .await
        .unwrap();
    assert!(first.has_next);
    let second = list(&engine, first.end_cursor.as_ref().unwrap(), 10, Direction::Forward)
        .await
        .unwrap();
    assert_eq!(ns(&second), (11..=20).collect::<Vec<_>>());
    assert!(!second.has_next);
}

#[tokio::test]
async fn empty_collection_yields_empty_first_page() {
    let store = seeded(0).await;
    let engine = engine(&store);

    for direction in [Direction::Forward, Direction::Backward] {
        let page = list(&engine, &Cursor::start(), 10, direction).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_count, 0);
        assert!(!page.has_next);
        assert!(!page.has_before);
        assert!(!page.has_prev);
        assert!(page.start_cursor.is_none() && page.end_cursor.is_none());
    }
}

// ──────────────────────────────────────────────
// Backward paging
// ──────────────────────────────────────────────

#[tokio::test]
async fn backward_without_cursor_returns_last_page_in_declared_order() {
    let store = seeded(25).await;
    let engine = engine(&store);

    let page = list(&engine, &Cursor::start(), 10, Direction::Backward)
        .await
        .unwrap();
    assert_eq!(ns(&page), (16..=25).collect::<Vec<_>>());
    assert!(!page.has_next, "nothing follows the last page");
    assert!(page.has_before, "records remain before the last page");
    assert!(!page.has_prev);
    assert_eq!(page.total_count, 25);
}

#[tokio::test]
async fn flags_describe_the_declared_order_in_both_directions() {
    let store = seeded(25).await;
    let engine = engine(&store);

    let last = list(&engine, &Cursor::start(), 10, Direction::Backward)
        .await
        .unwrap();
    let middle = list(
        &engine,
        last.start_cursor.as_ref().unwrap(),
        10,
        Direction::Backward,
    )
    .await
    .unwrap();
    assert_eq!(ns(&middle), (6..=15).collect::<Vec<_>>());
    assert!(middle.has_next && middle.has_before && middle.has_prev);

    let head = list(
        &engine,
        middle.start_cursor.as_ref().unwrap(),
        10,
        Direction::Backward,
    )
    .await
    .unwrap();
    assert_eq!(ns(&head), (1..=5).collect::<Vec<_>>());
    assert!(head.has_next);
    assert!(!head.has_before);
    assert!(!head.has_more(Direction::Backward));

    let forward_second = list(&engine, head.end_cursor.as_ref().unwrap(), 10, Direction::Forward)
        .await
        .unwrap();
    assert_eq!(ns(&forward_second), (6..=15).collect::<Vec<_>>());
    assert_eq!(
        (forward_second.has_next, forward_second.has_before),
        (middle.has_next, middle.has_before),
        "the same window reports the same flags whichever way it was reached"
    );

    let forward_first = list(&engine, &Cursor::start(), 10, Direction::Forward)
        .await
        .unwrap();
    assert!(!forward_first.has_before);
}

#[tokio::test]
async fn backward_walk_then_forward_walk_cover_the_same_records() {
    let store = seeded(23).await;
    let engine = engine(&store);

    let mut backward = Vec::new();
    let mut cursor = Cursor::start();
    loop {
        let page = list(&engine, &cursor, 7, Direction::Backward)
            .await
            .unwrap();
        assert!(page.len() <= 7);
        let mut chunk = ns(&page);
        chunk.extend(backward);
        backward = chunk;
        match (page.has_more(Direction::Backward), page.continuation(Direction::Backward)) {
            (true, Some(prev)) => cursor = prev.clone(),
            _ => break,
        }
    }

    let mut forward = Vec::new();
    let mut cursor = Cursor::start();
    loop {
        let page = list(&engine, &cursor, 7, Direction::Forward).await.unwrap();
        forward.extend(ns(&page));
        match (page.has_more(Direction::Forward), page.continuation(Direction::Forward)) {
            (true, Some(next)) => cursor = next.clone(),
            _ => break,
        }
    }

    assert_eq!(backward, (1..=23).collect::<Vec<_>>());
    assert_eq!(backward, forward);
}

#[tokio::test]
async fn switching_direction_returns_to_previous_page() {
    let store = seeded(25).await;
    let engine = engine(&store);

    let first = list(&engine, &Cursor::start(), 10, Direction::Forward)
        .await
        .unwrap();
    let second = list(&engine, first.end_cursor.as_ref().unwrap(), 10, Direction::Forward)
        .await
        .unwrap();
    let back = list(
        &engine,
        second.start_cursor.as_ref().unwrap(),
        10,
        Direction::Backward,
    )
    .await
    .unwrap();
    assert_eq!(back.items, first.items);
    assert!(!back.has_before, "nothing precedes the first page");
    assert!(back.has_next, "the second page follows");
    assert!(back.has_prev, "a cursor was supplied");
}

#[tokio::test]
async fn unbounded_page_size_reads_everything() {
    let store = seeded(12).await;
    let engine = PaginationEngine::new(store.clone(), usize::MAX);

    for direction in [Direction::Forward, Direction::Backward] {
        let page = list(&engine, &Cursor::start(), usize::MAX, direction)
            .await
            .unwrap();
        assert_eq!(ns(&page), (1..=12).collect::<Vec<_>>());
        assert!(!page.has_next && !page.has_before);
    }
}

// ──────────────────────────────────────────────
// Filter and sort
// ──────────────────────────────────────────────

#[tokio::test]
async fn filter_and_descending_sort_are_applied() {
    let store = seeded(10).await;
    for n in 1..=5 {
        store
            .insert(json!({"owner": "bob", "n": n}))
            .await
            .unwrap();
    }
    let engine = engine(&store);
    let filter = Filter::new().eq("owner", "alice");
    let sort = SortSpec::by("n", Order::Desc);

    let page: Page<Row> = engine
        .list(&filter, &sort, &Cursor::start(), 4, Direction::Forward)
        .await
        .unwrap();
    assert_eq!(ns(&page), vec![10, 9, 8, 7]);
    assert_eq!(page.total_count, 10);
    assert!(page.items.iter().all(|r| r.owner == "alice"));

    let next: Page<Row> = engine
        .list(&filter, &sort, page.end_cursor.as_ref().unwrap(), 4, Direction::Forward)
        .await
        .unwrap();
    assert_eq!(ns(&next), vec![6, 5, 4, 3]);
    assert!(next.items.iter().all(|r| !r.id.is_empty()));
}

// ──────────────────────────────────────────────
// Invalid input
// ──────────────────────────────────────────────

#[tokio::test]
async fn zero_or_oversized_page_is_rejected_before_touching_the_store() {
    let store = seeded(5).await;
    let engine = engine(&store);

    for size in [0, MAX_PAGE + 1] {
        let err = list(&engine, &Cursor::start(), size, Direction::Forward)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)), "{err:?}");
    }
    let stats = store.stats();
    assert_eq!(stats.counts, 0);
    assert_eq!(stats.finds, 0);
}

#[tokio::test]
async fn undecodable_cursor_is_rejected() {
    let store = seeded(5).await;
    let engine = engine(&store);

    let err = list(&engine, &Cursor::from("%%%"), 2, Direction::Forward)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::MalformedCursor(CursorError::Base64(_))
    ));
    assert_eq!(store.stats().finds, 0);
}

#[tokio::test]
async fn cursor_from_a_different_filter_is_rejected() {
    let store = seeded(10).await;
    let engine = engine(&store);

    let page: Page<Row> = engine
        .list(
            &Filter::new().eq("owner", "alice"),
            &SortSpec::insertion_order(),
            &Cursor::start(),
            3,
            Direction::Forward,
        )
        .await
        .unwrap();
    let foreign = page.end_cursor.unwrap();

    let err = list(&engine, &foreign, 3, Direction::Forward)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::MalformedCursor(CursorError::ScopeMismatch)
    );
}

// ──────────────────────────────────────────────
// Failures release the scan
// ──────────────────────────────────────────────

#[tokio::test]
async fn count_failure_is_reported_with_context() {
    let store = seeded(5).await;
    store.fail_next(StoreOp::Count);
    let err = list(&engine(&store), &Cursor::start(), 2, Direction::Forward)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Store { operation: "count", .. }), "{err:?}");
}

#[tokio::test]
async fn find_failure_returns_store_error() {
    let store = seeded(5).await;
    store.fail_next(StoreOp::Find);
    let err = list(&engine(&store), &Cursor::start(), 2, Direction::Forward)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Store { operation: "find", .. }), "{err:?}");
    assert_eq!(store.stats().open_scans, 0);
}

#[tokio::test]
async fn mid_scan_failure_returns_no_page_and_releases_scan() {
    let store = seeded(5).await;
    store.fail_next(StoreOp::Scan);
    let err = list(&engine(&store), &Cursor::start(), 3, Direction::Forward)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Store { operation: "scan", .. }), "{err:?}");
    assert_eq!(store.stats().open_scans, 0);
}

#[tokio::test]
async fn undecodable_record_aborts_the_page() {
    let store = seeded(2).await;
    store
        .insert(json!({"owner": "alice", "n": "not a number"}))
        .await
        .unwrap();
    store
        .insert(json!({"owner": "alice", "n": 4}))
        .await
        .unwrap();

    let err = list(&engine(&store), &Cursor::start(), 10, Direction::Forward)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Decode { .. }), "{err:?}");
    assert_eq!(store.stats().open_scans, 0);
}

#[tokio::test]
async fn close_failure_does_not_discard_the_page() {
    let store = seeded(5).await;
    store.fail_next(StoreOp::Close);
    let page = list(&engine(&store), &Cursor::start(), 3, Direction::Forward)
        .await
        .unwrap();
    assert_eq!(ns(&page), vec![1, 2, 3]);
    assert_eq!(store.stats().open_scans, 0);
}

#[tokio::test]
async fn cancelled_list_releases_its_scan() {
    let store = Arc::new(MemoryStore::new().with_scan_latency(Duration::from_millis(50)));
    for n in 1..=5 {
        store
            .insert(json!({"owner": "alice", "n": n}))
            .await
            .unwrap();
    }
    let engine = engine(&store);

    let outcome = tokio::time::timeout(
        Duration::from_millis(75),
        list(&engine, &Cursor::start(), 5, Direction::Forward),
    )
    .await;
    assert!(outcome.is_err(), "list should still be scanning");
    assert_eq!(store.stats().finds, 1);
    assert_eq!(store.stats().open_scans, 0);
}
