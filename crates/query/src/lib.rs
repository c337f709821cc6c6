//! Query layer for paging through large, changing collections.
//!
//! - [`CursorCodec`] turns a scan position into an opaque [`Cursor`] token
//!   bound to one filter + sort, and back.
//! - [`PaginationEngine`] produces one [`Page`] per call, in either
//!   [`Direction`], with a total count and `has_next`/`has_prev` flags.
//! - [`RequestCoalescer`] collapses identical concurrent queries into a
//!   single execution.

mod coalesce;
mod cursor;
mod engine;
mod error;
mod page;

pub use coalesce::{Coalesced, CoalescingKey, RequestCoalescer};
pub use cursor::{Cursor, CursorCodec, Position};
pub use engine::PaginationEngine;
pub use error::{CursorError, QueryError};
pub use page::{Direction, Page};
