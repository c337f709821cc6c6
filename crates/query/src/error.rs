use folio_store::StoreError;

/// Reasons a cursor token cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("cursor is empty")]
    Empty,

    #[error("cursor is not valid base64: {0}")]
    Base64(String),

    #[error("cursor payload is not valid: {0}")]
    Json(String),

    #[error("unsupported cursor version {0}")]
    UnsupportedVersion(u32),

    /// The cursor was issued for a different filter or sort order.
    #[error("cursor was issued for a different query")]
    ScopeMismatch,
}

/// Errors returned by pagination and list operations.
///
/// A caller gets either a complete page or exactly one of these; never both.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Bad page size or other caller input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The cursor token could not be resumed from.
    #[error("malformed cursor: {0}")]
    MalformedCursor(#[from] CursorError),

    /// The store failed; `operation` names the step that failed.
    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// A stored document did not decode into the requested record type.
    #[error("can not decode record: {message}")]
    Decode { message: String },
}

impl QueryError {
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| QueryError::Store { operation, source }
    }
}
