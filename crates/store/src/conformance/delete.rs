use std::future::Future;

use super::{make_doc, TestResult};
use crate::{DocumentStore, Filter};

pub(super) async fn run_delete_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::record(
        "delete",
        "delete_removes_matching_only",
        delete_removes_matching_only(factory).await,
    ));
    results.push(TestResult::record(
        "delete",
        "delete_absent_is_success",
        delete_absent_is_success(factory).await,
    ));
    results.push(TestResult::record(
        "delete",
        "reinsert_after_delete_stores_again",
        reinsert_after_delete_stores_again(factory).await,
    ));

    results
}

async fn delete_removes_matching_only<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    for (owner, item) in [("alice", 1), ("alice", 2), ("bob", 1)] {
        store
            .insert(make_doc(owner, item))
            .await
            .map_err(|e| format!("insert: {e}"))?;
    }
    let removed = store
        .delete(&Filter::new().eq("owner", "alice").eq("item", 2))
        .await
        .map_err(|e| format!("delete: {e}"))?;
    if removed != 1 {
        return Err(format!("expected 1 removed, got {removed}"));
    }
    let left = store
        .count(&Filter::new())
        .await
        .map_err(|e| format!("count: {e}"))?;
    if left != 2 {
        return Err(format!("expected 2 documents left, got {left}"));
    }
    Ok(())
}

/// Deleting something that is not there returns Ok(0), twice in a row.
async fn delete_absent_is_success<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let filter = Filter::new().eq("owner", "nobody");
    for attempt in 1..=2 {
        let removed = store
            .delete(&filter)
            .await
            .map_err(|e| format!("delete attempt {attempt}: {e}"))?;
        if removed != 0 {
            return Err(format!("attempt {attempt}: expected 0 removed, got {removed}"));
        }
    }
    Ok(())
}

async fn reinsert_after_delete_stores_again<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .insert(make_doc("alice", 1))
        .await
        .map_err(|e| format!("insert: {e}"))?;
    store
        .delete(&Filter::new().eq("owner", "alice"))
        .await
        .map_err(|e| format!("delete: {e}"))?;
    let outcome = store
        .insert(make_doc("alice", 1))
        .await
        .map_err(|e| format!("reinsert: {e}"))?;
    if !outcome.is_inserted() {
        return Err(format!("expected Inserted after delete, got {outcome:?}"));
    }
    Ok(())
}
