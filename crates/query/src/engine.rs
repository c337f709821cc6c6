//! Bidirectional, cursor-based pagination over a [`DocumentStore`].
//!
//! ## Scan planning
//!
//! A cursor holds an absolute boundary `p` under the declared sort.
//!
//! - **Forward**: scan the declared sort, `skip = p`, so the page is
//!   `[p, p + n)`. An empty cursor starts at `p = 0`.
//! - **Backward**: scan the reversed sort from the far edge,
//!   `skip = total - p`, so the page is `[p - n, p)`. An empty cursor
//!   starts at `p = total`, i.e. the last page. The fetched rows are
//!   reversed in memory before returning.
//!
//! Either way the scan asks for `n + 1` rows; the extra row is never
//! returned. It only tells whether more records lie beyond the page on the
//! side the scan is moving toward: `has_next` for a forward page,
//! `has_before` for a backward one. The opposite flag follows from the
//! page's absolute position, so both flags always describe the declared
//! order.

use std::sync::Arc;

use folio_store::{DocumentStore, Filter, ScanCursor, SortSpec};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cursor::{Cursor, CursorCodec, Position};
use crate::error::QueryError;
use crate::page::{Direction, Page};

/// Turns (filter, sort, cursor, page size, direction) into a [`Page`].
///
/// The engine holds no per-query state; one instance serves any number of
/// concurrent callers over a shared store.
#[derive(Clone)]
pub struct PaginationEngine {
    store: Arc<dyn DocumentStore>,
    max_page_size: usize,
}

impl PaginationEngine {
    pub fn new(store: Arc<dyn DocumentStore>, max_page_size: usize) -> Self {
        Self {
            store,
            max_page_size,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Fetch one page.
    ///
    /// `has_prev` is true exactly when `cursor` is non-empty: a cursor is
    /// only ever issued with records before it, so no extra query is made
    /// to confirm it.
    ///
    /// The store scan is closed on every path. A store failure or a record
    /// that fails to decode aborts the call without a partial page.
    #[tracing::instrument(
        skip(self, filter, sort, cursor),
        fields(sort = %sort.fingerprint(), resumed = !cursor.is_empty())
    )]
    pub async fn list<R>(
        &self,
        filter: &Filter,
        sort: &SortSpec,
        cursor: &Cursor,
        page_size: usize,
        direction: Direction,
    ) -> Result<Page<R>, QueryError>
    where
        R: DeserializeOwned + Send,
    {
        if page_size == 0 {
            return Err(QueryError::InvalidArgument(
                "page size must be a positive integer".into(),
            ));
        }
        if page_size > self.max_page_size {
            return Err(QueryError::InvalidArgument(format!(
                "page size {page_size} exceeds the maximum of {}",
                self.max_page_size
            )));
        }

        let codec = CursorCodec::for_query(filter, sort);
        let boundary = if cursor.is_empty() {
            None
        } else {
            Some(codec.decode(cursor)?)
        };

        let total_count = self
            .store
            .count(filter)
            .await
            .map_err(QueryError::store("count"))?;

        let (scan_sort, skip, anchor) = match direction {
            Direction::Forward => {
                let p = boundary.map_or(0, |p| p.offset);
                (sort.clone(), p, p)
            }
            Direction::Backward => {
                let p = boundary.map_or(total_count, |p| p.offset.min(total_count));
                (sort.reversed(), total_count - p, p)
            }
        };

        let mut scan = self
            .store
            .find(filter, &scan_sort, skip, (page_size as u64).saturating_add(1))
            .await
            .map_err(QueryError::store("find"))?;
        let fetched = read_window::<R>(scan.as_mut(), page_size).await;
        if let Err(e) = scan.close().await {
            warn!(error = %e, "can not close list scan");
        }
        let (mut items, more_in_scan) = fetched.map_err(|e| {
            warn!(error = %e, "list scan aborted");
            e
        })?;

        let len = items.len() as u64;
        let (first, has_next, has_before) = match direction {
            Direction::Forward => (anchor, more_in_scan, anchor > 0 && total_count > 0),
            Direction::Backward => {
                items.reverse();
                (anchor.saturating_sub(len), anchor < total_count, more_in_scan)
            }
        };
        let (start_cursor, end_cursor) = if items.is_empty() {
            (None, None)
        } else {
            (
                Some(codec.encode(Position::new(first))),
                Some(codec.encode(Position::new(first + len))),
            )
        };

        debug!(items = len, total_count, has_next, has_before, "page loaded");
        Ok(Page {
            items,
            total_count,
            has_next,
            has_prev: !cursor.is_empty(),
            has_before,
            start_cursor,
            end_cursor,
        })
    }
}

/// Rows reserved up front; larger pages grow as they are read.
const PREALLOCATE_MAX: usize = 256;

/// Read up to `page_size` records plus one look-ahead row.
async fn read_window<R>(
    scan: &mut dyn ScanCursor,
    page_size: usize,
) -> Result<(Vec<R>, bool), QueryError>
where
    R: DeserializeOwned + Send,
{
    let mut items = Vec::with_capacity(page_size.min(PREALLOCATE_MAX));
    while let Some(doc) = scan.next().await.map_err(QueryError::store("scan"))? {
        if items.len() == page_size {
            return Ok((items, true));
        }
        let row = serde_json::from_value(doc).map_err(|e| QueryError::Decode {
            message: e.to_string(),
        })?;
        items.push(row);
    }
    Ok((items, false))
}
