/// All errors that can be returned by a DocumentStore implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached (connection refused, pool exhausted, etc.).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A document was rejected before being written (not an object, bad `_id`).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A live scan failed while producing rows.
    #[error("scan failed: {0}")]
    Scan(String),

    /// A backend-specific storage error (driver failure, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
