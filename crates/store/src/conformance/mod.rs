//! Conformance test suite for `DocumentStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `DocumentStore` implementation can run to verify the guarantees the
//! query layer relies on:
//!
//! - **Insert**: id assignment, duplicate identities absorbed as no-ops
//! - **Delete**: matching documents removed, deleting nothing is success
//! - **Count**: filtered counts agree with the stored documents
//! - **Find**: declared order, tie-breaks, skip/limit windows, scan release
//! - **Concurrent**: parallel duplicate inserts leave exactly one copy
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty store for each test. The store must enforce a
//! unique index over [`IDENTITY_FIELDS`]:
//!
//! ```ignore
//! use folio_store::conformance::{run_conformance_suite, IDENTITY_FIELDS};
//!
//! #[tokio::test]
//! async fn mongo_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_collection(IDENTITY_FIELDS).await
//!     }).await;
//!     assert!(report.is_conformant(), "{report}");
//! }
//! ```

mod concurrent;
mod delete;
mod find;
mod insert;

use std::fmt;
use std::future::Future;

use serde_json::json;

use crate::{Document, DocumentStore, ScanCursor, StoreError};

/// Fields the conformance store must treat as a composite identity.
pub const IDENTITY_FIELDS: &[&str] = &["owner", "item"];

/// Outcome of one conformance check, e.g. `insert/duplicate_identity_is_ignored`.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub category: &'static str,
    pub name: &'static str,
    /// Why the check failed; `None` when it passed.
    pub failure: Option<String>,
}

impl TestResult {
    fn record(category: &'static str, name: &'static str, result: Result<(), String>) -> Self {
        Self {
            category,
            name,
            failure: result.err(),
        }
    }

    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Every check of one suite run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
}

impl ConformanceReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    pub fn is_conformant(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failures().count();
        writeln!(
            f,
            "document store conformance: {} checks, {} failing",
            self.total(),
            failed
        )?;
        for r in self.failures() {
            writeln!(
                f,
                "  {}/{}: {}",
                r.category,
                r.name,
                r.failure.as_deref().unwrap_or_default()
            )?;
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(insert::run_insert_tests(&factory).await);
    results.extend(delete::run_delete_tests(&factory).await);
    results.extend(find::run_find_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    ConformanceReport { results }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_doc(owner: &str, item: u64) -> Document {
    json!({
        "owner": owner,
        "item": item,
        "label": format!("{owner}-{item}"),
    })
}

/// Drain a scan to the end and close it.
async fn drain(mut scan: Box<dyn ScanCursor>) -> Result<Vec<Document>, String> {
    let mut rows = Vec::new();
    let outcome: Result<(), StoreError> = async {
        while let Some(doc) = scan.next().await? {
            rows.push(doc);
        }
        Ok(())
    }
    .await;
    scan.close().await.map_err(|e| format!("close: {e}"))?;
    outcome.map_err(|e| format!("scan: {e}"))?;
    Ok(rows)
}

fn field_u64(doc: &Document, field: &str) -> Result<u64, String> {
    doc.get(field)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| format!("document missing numeric {field}: {doc}"))
}
