use std::future::Future;
use std::sync::Arc;

use super::{drain, make_doc, TestResult};
use crate::{DocumentStore, Filter, InsertOutcome, SortSpec, StoreError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::record(
        "concurrent",
        "concurrent_duplicate_inserts_store_one_copy",
        concurrent_duplicate_inserts_store_one_copy(factory).await,
    ));
    results.push(TestResult::record(
        "concurrent",
        "concurrent_distinct_inserts_all_stored",
        concurrent_distinct_inserts_all_stored(factory).await,
    ));
    results.push(TestResult::record(
        "concurrent",
        "concurrent_deletes_of_same_identity_all_succeed",
        concurrent_deletes_of_same_identity_all_succeed(factory).await,
    ));
    results.push(TestResult::record(
        "concurrent",
        "parallel_scans_see_same_sequence",
        parallel_scans_see_same_sequence(factory).await,
    ));

    results
}

// ── Concurrent duplicate insert: exactly one copy ───────────────────────────

/// N tasks insert the same identity at once. Every call succeeds, exactly
/// one reports `Inserted`, and the collection ends with one copy.
async fn concurrent_duplicate_inserts_store_one_copy<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move { s.insert(make_doc("alice", 1)).await }));
    }

    let mut inserted = 0usize;
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StoreError| format!("store error: {e}"))?;
        if let InsertOutcome::Inserted { .. } = outcome {
            inserted += 1;
        }
    }
    if inserted != 1 {
        return Err(format!("expected exactly 1 Inserted, got {inserted}"));
    }

    let n = store
        .count(&Filter::new())
        .await
        .map_err(|e| format!("count: {e}"))?;
    if n != 1 {
        return Err(format!("expected 1 stored copy, got {n}"));
    }
    Ok(())
}

// ── Concurrent distinct inserts: no false duplicates ────────────────────────

async fn concurrent_distinct_inserts_all_stored<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.insert(make_doc("alice", i as u64)).await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let outcome = handle
            .await
            .map_err(|e| format!("task {i} panic: {e}"))?
            .map_err(|e| format!("task {i} failed: {e}"))?;
        if !outcome.is_inserted() {
            return Err(format!("task {i}: expected Inserted, got {outcome:?}"));
        }
    }

    let n = store
        .count(&Filter::new())
        .await
        .map_err(|e| format!("count: {e}"))?;
    if n != N as u64 {
        return Err(format!("expected {N} documents, got {n}"));
    }
    Ok(())
}

// ── Concurrent delete: every caller succeeds ────────────────────────────────

async fn concurrent_deletes_of_same_identity_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    store
        .insert(make_doc("alice", 1))
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.delete(&Filter::new().eq("owner", "alice").eq("item", 1))
                .await
        }));
    }

    let mut removed = 0u64;
    for handle in handles {
        removed += handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StoreError| format!("store error: {e}"))?;
    }
    if removed != 1 {
        return Err(format!("expected 1 document removed in total, got {removed}"));
    }
    Ok(())
}

// ── Parallel readers share the store ────────────────────────────────────────

async fn parallel_scans_see_same_sequence<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    for i in 0..N {
        store
            .insert(make_doc("alice", i as u64))
            .await
            .map_err(|e| format!("insert {i}: {e}"))?;
    }

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            let scan = s
                .find(&Filter::new(), &SortSpec::insertion_order(), 2, 5)
                .await
                .map_err(|e| format!("find: {e}"))?;
            drain(scan).await
        }));
    }

    let mut first: Option<Vec<serde_json::Value>> = None;
    for handle in handles {
        let rows = handle.await.map_err(|e| format!("task panic: {e}"))??;
        match &first {
            None => first = Some(rows),
            Some(expected) if *expected != rows => {
                return Err("parallel scans returned different rows".into())
            }
            Some(_) => {}
        }
    }
    Ok(())
}
