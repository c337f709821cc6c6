use async_trait::async_trait;

use crate::error::StoreError;
use crate::filter::Filter;
use crate::sort::SortSpec;

/// A stored document: a JSON object carrying a string `_id`.
pub type Document = serde_json::Value;

/// Outcome of an insert. A duplicate identity is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The document was stored under the given `_id`.
    Inserted { id: String },
    /// A document with the same identity already exists; nothing was written.
    DuplicateIgnored,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

/// A live, ordered scan over a store.
///
/// The scan holds backend resources (a server-side cursor, a connection)
/// until it is closed. `close` is the orderly path; dropping an unclosed
/// scan MUST also release it, since a caller may be cancelled mid-scan.
#[async_trait]
pub trait ScanCursor: Send {
    /// Produce the next document, or `None` once the scan is exhausted.
    async fn next(&mut self) -> Result<Option<Document>, StoreError>;

    /// Release the scan.
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}

/// The storage trait for folio collections.
///
/// A `DocumentStore` is one collection of documents supporting filtered
/// counts, ordered scans with skip/limit, and idempotent insert/delete.
///
/// ## Ordering
///
/// `find` returns documents in exactly the order given by the `SortSpec`.
/// Two scans with the same filter and sort over an unchanged collection
/// return the same sequence.
///
/// ## Idempotent writes
///
/// Inserting a document whose identity already exists returns
/// `InsertOutcome::DuplicateIgnored`. Deleting with a filter that matches
/// nothing returns `Ok(0)`. Neither is an error, so concurrent duplicate
/// requests all succeed.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static`; one store instance is
/// shared by all concurrent callers without exclusive locking.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Number of documents matching `filter`.
    async fn count(&self, filter: &Filter) -> Result<u64, StoreError>;

    /// Open an ordered scan over documents matching `filter`, skipping the
    /// first `skip` and yielding at most `limit` (0 = no limit).
    async fn find(
        &self,
        filter: &Filter,
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Box<dyn ScanCursor>, StoreError>;

    /// Insert a document. A missing or empty `_id` is assigned by the store.
    async fn insert(&self, doc: Document) -> Result<InsertOutcome, StoreError>;

    /// Delete every document matching `filter`, returning how many went away.
    async fn delete(&self, filter: &Filter) -> Result<u64, StoreError>;
}
