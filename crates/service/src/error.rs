use folio_query::QueryError;
use folio_store::StoreError;

use crate::lifecycle::LifecycleError;

/// Errors returned by [`LikeService`](crate::LikeService) operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    /// Caller input was rejected before reaching the store.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A paginated list query failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A write or count against the store failed.
    #[error("can not {operation} token like: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ServiceError {
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| ServiceError::Store { operation, source }
    }
}
