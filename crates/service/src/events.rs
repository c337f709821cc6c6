use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::lifecycle::Shutdown;
use crate::likes::TokenLike;

/// A change to the set of stored likes, delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "like", rename_all = "camelCase")]
pub enum LikeEvent {
    Added(TokenLike),
    Removed(TokenLike),
}

/// Broadcaster loop: forwards queued events to every subscriber until
/// stopped or until every publisher is gone.
pub(crate) async fn run_broadcaster(
    mut intake: mpsc::Receiver<LikeEvent>,
    fanout: broadcast::Sender<LikeEvent>,
    mut shutdown: Shutdown,
) {
    info!("broadcaster started");
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            event = intake.recv() => match event {
                Some(event) => {
                    // Zero subscribers is not an error.
                    let delivered = fanout.send(event).unwrap_or(0);
                    debug!(delivered, "event broadcast");
                }
                None => break,
            },
        }
    }
    info!("broadcaster done");
}
