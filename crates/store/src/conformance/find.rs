use std::future::Future;

use serde_json::json;

use super::{drain, field_u64, make_doc, TestResult};
use crate::{DocumentStore, Filter, Op, Order, SortSpec, ID_FIELD};

pub(super) async fn run_find_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::record(
        "find",
        "count_matches_filter",
        count_matches_filter(factory).await,
    ));
    results.push(TestResult::record(
        "find",
        "find_returns_declared_order",
        find_returns_declared_order(factory).await,
    ));
    results.push(TestResult::record(
        "find",
        "equal_primary_keys_break_ties_on_id",
        equal_primary_keys_break_ties_on_id(factory).await,
    ));
    results.push(TestResult::record(
        "find",
        "skip_and_limit_select_a_window",
        skip_and_limit_select_a_window(factory).await,
    ));
    results.push(TestResult::record(
        "find",
        "skip_past_end_is_empty",
        skip_past_end_is_empty(factory).await,
    ));
    results.push(TestResult::record(
        "find",
        "repeated_scans_are_stable",
        repeated_scans_are_stable(factory).await,
    ));

    results
}

async fn seed<S: DocumentStore>(store: &S, owner: &str, items: u64) -> Result<(), String> {
    for item in 0..items {
        store
            .insert(make_doc(owner, item))
            .await
            .map_err(|e| format!("seed insert {item}: {e}"))?;
    }
    Ok(())
}

async fn count_matches_filter<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "alice", 6).await?;
    seed(&store, "bob", 3).await?;

    let checks = [
        (Filter::new(), 9),
        (Filter::new().eq("owner", "alice"), 6),
        (Filter::new().eq("owner", "bob").with("item", Op::Gte, 1), 2),
        (Filter::new().eq("owner", "carol"), 0),
    ];
    for (filter, expected) in checks {
        let n = store
            .count(&filter)
            .await
            .map_err(|e| format!("count: {e}"))?;
        if n != expected {
            return Err(format!(
                "count({}) = {n}, expected {expected}",
                filter.to_canonical_json()
            ));
        }
    }
    Ok(())
}

async fn find_returns_declared_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "alice", 5).await?;

    let scan = store
        .find(&Filter::new(), &SortSpec::by("item", Order::Desc), 0, 0)
        .await
        .map_err(|e| format!("find: {e}"))?;
    let items = drain(scan)
        .await?
        .iter()
        .map(|d| field_u64(d, "item"))
        .collect::<Result<Vec<_>, _>>()?;
    if items != vec![4, 3, 2, 1, 0] {
        return Err(format!("expected descending items, got {items:?}"));
    }
    Ok(())
}

async fn equal_primary_keys_break_ties_on_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    for (id, item) in [("c", 1), ("a", 1), ("b", 1)] {
        let mut doc = make_doc("alice", item);
        doc["item"] = json!(id);
        doc[ID_FIELD] = json!(id);
        doc["rank"] = json!(7);
        store
            .insert(doc)
            .await
            .map_err(|e| format!("insert {id}: {e}"))?;
    }
    let scan = store
        .find(&Filter::new(), &SortSpec::by("rank", Order::Asc), 0, 0)
        .await
        .map_err(|e| format!("find: {e}"))?;
    let ids: Vec<String> = drain(scan)
        .await?
        .iter()
        .filter_map(|d| d.get(ID_FIELD).and_then(|v| v.as_str()).map(String::from))
        .collect();
    if ids != ["a", "b", "c"] {
        return Err(format!("expected ties broken by _id, got {ids:?}"));
    }
    Ok(())
}

async fn skip_and_limit_select_a_window<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "alice", 10).await?;

    let scan = store
        .find(&Filter::new(), &SortSpec::by("item", Order::Asc), 3, 4)
        .await
        .map_err(|e| format!("find: {e}"))?;
    let items = drain(scan)
        .await?
        .iter()
        .map(|d| field_u64(d, "item"))
        .collect::<Result<Vec<_>, _>>()?;
    if items != vec![3, 4, 5, 6] {
        return Err(format!("expected window [3..7), got {items:?}"));
    }
    Ok(())
}

async fn skip_past_end_is_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "alice", 3).await?;
    let scan = store
        .find(&Filter::new(), &SortSpec::insertion_order(), 10, 5)
        .await
        .map_err(|e| format!("find: {e}"))?;
    let rows = drain(scan).await?;
    if !rows.is_empty() {
        return Err(format!("expected no rows, got {}", rows.len()));
    }
    Ok(())
}

async fn repeated_scans_are_stable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "alice", 4).await?;
    seed(&store, "bob", 4).await?;

    let sort = SortSpec::by("item", Order::Asc);
    let mut runs = Vec::new();
    for _ in 0..3 {
        let scan = store
            .find(&Filter::new(), &sort, 0, 0)
            .await
            .map_err(|e| format!("find: {e}"))?;
        runs.push(drain(scan).await?);
    }
    if runs.windows(2).any(|w| w[0] != w[1]) {
        return Err("scans with the same filter and sort returned different sequences".into());
    }
    Ok(())
}
