mod error;
mod filter;
mod memory;
mod sort;
mod traits;

pub mod conformance;

pub use error::StoreError;
pub use filter::{Filter, Op, Predicate};
pub use memory::{MemoryStore, StoreOp, StoreStats};
pub use sort::{compare_values, Order, SortKey, SortSpec, ID_FIELD};
pub use traits::{Document, DocumentStore, InsertOutcome, ScanCursor};
