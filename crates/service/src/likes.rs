//! Token likes: a user following an NFT token.
//!
//! Likes are created and deleted by explicit caller actions, never updated
//! in place. A like's identity is (contract, token, follower); the backing
//! store must enforce uniqueness over [`IDENTITY_FIELDS`] so duplicate
//! likes are absorbed rather than stored twice.

use std::sync::Arc;

use folio_query::{
    CoalescingKey, Cursor, Direction, Page, PaginationEngine, QueryError, RequestCoalescer,
};
use folio_store::{DocumentStore, Filter, InsertOutcome, SortSpec};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::ServiceError;
use crate::events::{run_broadcaster, LikeEvent};
use crate::lifecycle::{LifecycleError, LifecycleState, ServiceLifecycle};

const FIELD_CONTRACT: &str = "contractAddress";
const FIELD_TOKEN: &str = "tokenID";
const FIELD_USER: &str = "follower";

/// Fields that together identify one like.
pub const IDENTITY_FIELDS: &[&str] = &[FIELD_CONTRACT, FIELD_TOKEN, FIELD_USER];

/// A stored like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLike {
    /// Store-assigned id; empty until stored.
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "contractAddress")]
    pub contract: String,
    #[serde(rename = "tokenID")]
    pub token_id: String,
    #[serde(rename = "follower")]
    pub user: String,
}

impl TokenLike {
    /// A not-yet-stored like. Addresses and token ids are compared
    /// case-insensitively, so they are kept lowercase.
    pub fn new(contract: &str, token_id: &str, user: &str) -> Self {
        Self {
            id: String::new(),
            contract: normalize(contract),
            token_id: normalize(token_id),
            user: normalize(user),
        }
    }

    fn normalized(&self) -> Self {
        Self {
            id: self.id.clone(),
            ..Self::new(&self.contract, &self.token_id, &self.user)
        }
    }

    fn validate(&self) -> Result<(), ServiceError> {
        for (field, value) in [
            (FIELD_CONTRACT, &self.contract),
            (FIELD_TOKEN, &self.token_id),
            (FIELD_USER, &self.user),
        ] {
            if value.is_empty() {
                return Err(ServiceError::InvalidArgument(format!(
                    "no value to store: {field} is empty"
                )));
            }
        }
        Ok(())
    }

    fn identity_filter(&self) -> Filter {
        Filter::new()
            .eq(FIELD_CONTRACT, self.contract.as_str())
            .eq(FIELD_TOKEN, self.token_id.as_str())
            .eq(FIELD_USER, self.user.as_str())
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

struct Background {
    lifecycle: ServiceLifecycle,
    intake: Option<mpsc::Receiver<LikeEvent>>,
}

/// Entry point for the resolver layer: like/unlike, counts, paged lists,
/// change subscriptions, and the broadcaster's lifecycle.
///
/// One instance is shared by every concurrent caller.
pub struct LikeService {
    config: Config,
    engine: PaginationEngine,
    lists: RequestCoalescer<CoalescingKey, Page<TokenLike>, QueryError>,
    publish: mpsc::Sender<LikeEvent>,
    fanout: broadcast::Sender<LikeEvent>,
    background: Mutex<Background>,
}

impl LikeService {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let capacity = config.events.capacity.max(1);
        let (publish, intake) = mpsc::channel(capacity);
        let (fanout, _) = broadcast::channel(capacity);
        let engine = PaginationEngine::new(store, config.pagination.max_page_size);
        let lifecycle = ServiceLifecycle::new(config.service.name.clone());
        Self {
            config,
            engine,
            lists: RequestCoalescer::new(),
            publish,
            fanout,
            background: Mutex::new(Background {
                lifecycle,
                intake: Some(intake),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Service name and crate version, e.g. `"folio 0.1.0"`.
    pub fn version(&self) -> String {
        format!("{} {}", self.config.service.name, env!("CARGO_PKG_VERSION"))
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Start the event broadcaster. Only valid once, from `Created`.
    pub async fn start(&self) -> Result<(), ServiceError> {
        let mut background = self.background.lock().await;
        let state = background.lifecycle.state();
        let intake = match background.intake.take() {
            Some(intake) if state == LifecycleState::Created => intake,
            other => {
                background.intake = other;
                return Err(LifecycleError::InvalidState {
                    service: background.lifecycle.name().to_string(),
                    state,
                }
                .into());
            }
        };
        let fanout = self.fanout.clone();
        background
            .lifecycle
            .start(move |shutdown| run_broadcaster(intake, fanout, shutdown))?;
        Ok(())
    }

    /// Stop the broadcaster and wait for it to exit. Later calls are no-ops.
    pub async fn close(&self) -> Result<(), ServiceError> {
        info!(service = %self.config.service.name, "service is closing");
        let mut background = self.background.lock().await;
        background.lifecycle.stop().await?;
        Ok(())
    }

    pub async fn state(&self) -> LifecycleState {
        self.background.lock().await.lifecycle.state()
    }

    /// Receive every like change published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LikeEvent> {
        self.fanout.subscribe()
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Record a like. Liking twice is not an error; the second call reports
    /// `InsertOutcome::DuplicateIgnored` and publishes nothing.
    pub async fn add_like(&self, like: &TokenLike) -> Result<InsertOutcome, ServiceError> {
        let mut like = like.normalized();
        like.validate()?;

        let doc = serde_json::to_value(&like)
            .map_err(|e| ServiceError::InvalidArgument(format!("can not encode like: {e}")))?;
        let outcome = self.engine.store().insert(doc).await.map_err(|e| {
            error!(error = %e, "can not add token like");
            ServiceError::store("add")(e)
        })?;

        match &outcome {
            InsertOutcome::Inserted { id } => {
                like.id = id.clone();
                self.emit(LikeEvent::Added(like));
            }
            InsertOutcome::DuplicateIgnored => {
                debug!(contract = %like.contract, token = %like.token_id, "like already exists");
            }
        }
        Ok(outcome)
    }

    /// Remove a like. Returns whether anything was removed; removing a like
    /// that does not exist succeeds with `false`.
    pub async fn remove_like(&self, like: &TokenLike) -> Result<bool, ServiceError> {
        let like = like.normalized();
        like.validate()?;

        let removed = self
            .engine
            .store()
            .delete(&like.identity_filter())
            .await
            .map_err(|e| {
                error!(error = %e, "can not remove token like");
                ServiceError::store("remove")(e)
            })?;
        if removed > 0 {
            self.emit(LikeEvent::Removed(like));
        }
        Ok(removed > 0)
    }

    fn emit(&self, event: LikeEvent) {
        if let Err(e) = self.publish.try_send(event) {
            debug!(error = %e, "like event not queued");
        }
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Number of likes a token has.
    pub async fn likes_count(&self, contract: &str, token_id: &str) -> Result<u64, ServiceError> {
        let filter = Filter::new()
            .eq(FIELD_CONTRACT, normalize(contract))
            .eq(FIELD_TOKEN, normalize(token_id));
        self.engine
            .store()
            .count(&filter)
            .await
            .map_err(ServiceError::store("count"))
    }

    /// Likes made by `user`, in the order they were made.
    pub async fn list_user_likes(
        &self,
        user: &str,
        cursor: &Cursor,
        count: i32,
        backward: bool,
    ) -> Result<Page<TokenLike>, ServiceError> {
        let filter = Filter::new().eq(FIELD_USER, normalize(user));
        self.list("user_likes", filter, cursor, count, backward)
            .await
    }

    /// Likes a token has received, in the order they were made.
    pub async fn list_token_likes(
        &self,
        contract: &str,
        token_id: &str,
        cursor: &Cursor,
        count: i32,
        backward: bool,
    ) -> Result<Page<TokenLike>, ServiceError> {
        let filter = Filter::new()
            .eq(FIELD_CONTRACT, normalize(contract))
            .eq(FIELD_TOKEN, normalize(token_id));
        self.list("token_likes", filter, cursor, count, backward)
            .await
    }

    async fn list(
        &self,
        operation: &'static str,
        filter: Filter,
        cursor: &Cursor,
        count: i32,
        backward: bool,
    ) -> Result<Page<TokenLike>, ServiceError> {
        let page_size = usize::try_from(count)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                QueryError::InvalidArgument(format!("count must be positive, got {count}"))
            })?;
        let sort = SortSpec::insertion_order();
        let direction = Direction::from_backward(backward);

        let page = if self.config.pagination.coalesce_lists {
            let key = CoalescingKey::new(operation, &filter, &sort, cursor, page_size, direction);
            self.lists
                .run(key, || {
                    self.engine
                        .list(&filter, &sort, cursor, page_size, direction)
                })
                .await
                .into_result()
        } else {
            self.engine
                .list(&filter, &sort, cursor, page_size, direction)
                .await
        };

        page.map_err(|e| {
            error!(operation, error = %e, "can not list token likes");
            e.into()
        })
    }
}
