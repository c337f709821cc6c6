use std::future::Future;

use serde_json::json;

use super::{make_doc, TestResult};
use crate::{DocumentStore, Filter, InsertOutcome, ID_FIELD};

pub(super) async fn run_insert_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::record(
        "insert",
        "insert_assigns_id_when_missing",
        insert_assigns_id_when_missing(factory).await,
    ));
    results.push(TestResult::record(
        "insert",
        "insert_keeps_caller_id",
        insert_keeps_caller_id(factory).await,
    ));
    results.push(TestResult::record(
        "insert",
        "duplicate_identity_is_ignored",
        duplicate_identity_is_ignored(factory).await,
    ));
    results.push(TestResult::record(
        "insert",
        "duplicate_id_is_ignored",
        duplicate_id_is_ignored(factory).await,
    ));
    results.push(TestResult::record(
        "insert",
        "assigned_ids_follow_insertion_order",
        assigned_ids_follow_insertion_order(factory).await,
    ));

    results
}

/// A document without `_id` gets a non-empty store-assigned id.
async fn insert_assigns_id_when_missing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store
        .insert(make_doc("alice", 1))
        .await
        .map_err(|e| format!("insert: {e}"))?
    {
        InsertOutcome::Inserted { id } if !id.is_empty() => Ok(()),
        other => Err(format!("expected Inserted with an id, got {other:?}")),
    }
}

/// A caller-supplied `_id` is stored as-is.
async fn insert_keeps_caller_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut doc = make_doc("alice", 1);
    doc[ID_FIELD] = json!("custom-id");
    let outcome = store
        .insert(doc)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    if outcome
        != (InsertOutcome::Inserted {
            id: "custom-id".to_string(),
        })
    {
        return Err(format!("expected Inserted(custom-id), got {outcome:?}"));
    }
    let n = store
        .count(&Filter::new().eq(ID_FIELD, "custom-id"))
        .await
        .map_err(|e| format!("count: {e}"))?;
    if n != 1 {
        return Err(format!("expected 1 document with custom-id, got {n}"));
    }
    Ok(())
}

/// Inserting the same identity twice succeeds both times and stores one copy.
async fn duplicate_identity_is_ignored<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let first = store
        .insert(make_doc("alice", 1))
        .await
        .map_err(|e| format!("first insert: {e}"))?;
    if !first.is_inserted() {
        return Err(format!("first insert should store, got {first:?}"));
    }
    let second = store
        .insert(make_doc("alice", 1))
        .await
        .map_err(|e| format!("second insert must not fail: {e}"))?;
    if second != InsertOutcome::DuplicateIgnored {
        return Err(format!("expected DuplicateIgnored, got {second:?}"));
    }
    let n = store
        .count(&Filter::new())
        .await
        .map_err(|e| format!("count: {e}"))?;
    if n != 1 {
        return Err(format!("expected exactly 1 copy, got {n}"));
    }
    Ok(())
}

/// Re-inserting an existing `_id` is absorbed even when other fields differ.
async fn duplicate_id_is_ignored<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let id = match store
        .insert(make_doc("alice", 1))
        .await
        .map_err(|e| format!("insert: {e}"))?
    {
        InsertOutcome::Inserted { id } => id,
        other => return Err(format!("expected Inserted, got {other:?}")),
    };
    let mut again = make_doc("bob", 2);
    again[ID_FIELD] = json!(id);
    let outcome = store
        .insert(again)
        .await
        .map_err(|e| format!("re-insert: {e}"))?;
    if outcome != InsertOutcome::DuplicateIgnored {
        return Err(format!("expected DuplicateIgnored, got {outcome:?}"));
    }
    Ok(())
}

/// Store-assigned ids sort in insertion order.
async fn assigned_ids_follow_insertion_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut ids = Vec::new();
    for item in 0..5 {
        match store
            .insert(make_doc("alice", item))
            .await
            .map_err(|e| format!("insert {item}: {e}"))?
        {
            InsertOutcome::Inserted { id } => ids.push(id),
            other => return Err(format!("insert {item}: expected Inserted, got {other:?}")),
        }
    }
    let mut sorted = ids.clone();
    sorted.sort();
    if sorted != ids {
        return Err(format!("assigned ids are not increasing: {ids:?}"));
    }
    Ok(())
}
