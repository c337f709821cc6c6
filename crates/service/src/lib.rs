//! Service layer for folio.
//!
//! [`LikeService`] is what the resolver layer calls: it records and removes
//! token likes, counts them, pages through them, and fans change events
//! out to subscribers from a background broadcaster whose start and stop
//! are governed by [`ServiceLifecycle`].

mod config;
mod error;
mod events;
mod lifecycle;
mod likes;

pub use config::{Config, ConfigError, EventsConfig, LogConfig, PaginationConfig, ServiceConfig};
pub use error::ServiceError;
pub use events::LikeEvent;
pub use lifecycle::{LifecycleError, LifecycleState, ServiceLifecycle, Shutdown};
pub use likes::{LikeService, TokenLike, IDENTITY_FIELDS};
