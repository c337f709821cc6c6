use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;

/// Which way a caller is walking the sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn from_backward(backward: bool) -> Self {
        if backward {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    pub fn is_backward(self) -> bool {
        self == Direction::Backward
    }
}

/// One window of an ordered collection.
///
/// `items` are always in the declared sort order, whichever direction the
/// page was fetched in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<R> {
    pub items: Vec<R>,
    /// Matching records in the whole collection, independent of the window.
    pub total_count: u64,
    /// More records follow this page in the declared order.
    pub has_next: bool,
    /// The request carried a cursor, i.e. this is not the first page.
    pub has_prev: bool,
    /// More records precede this page in the declared order.
    ///
    /// Unlike `has_prev` this is observed, not inferred from the cursor; it
    /// is what a backward walk continues on.
    pub has_before: bool,
    /// Boundary before the first item; resume here walking backward.
    pub start_cursor: Option<Cursor>,
    /// Boundary after the last item; resume here walking forward.
    pub end_cursor: Option<Cursor>,
}

impl<R> Page<R> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a walk in `direction` has another page after this one.
    pub fn has_more(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.has_next,
            Direction::Backward => self.has_before,
        }
    }

    /// The cursor that continues in `direction`.
    pub fn continuation(&self, direction: Direction) -> Option<&Cursor> {
        match direction {
            Direction::Forward => self.end_cursor.as_ref(),
            Direction::Backward => self.start_cursor.as_ref(),
        }
    }
}
