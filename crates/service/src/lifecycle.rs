//! Start/stop management for one long-lived background task.
//!
//! ```text
//!   Created ──start()──▶ Running ──stop()──▶ Stopped
//!      └────────────────stop()─────────────────▲
//! ```
//!
//! `stop()` sends a one-shot signal and then waits for the task to exit, so
//! once it returns nothing the task owned is still alive. It takes
//! `&mut self`, which rules out two concurrent stops; calling it again after
//! it returned is a no-op.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Where a [`ServiceLifecycle`] is in its one-way progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// `start()` was called on a lifecycle that already left `Created`.
    #[error("{service}: can not start while {state}")]
    InvalidState {
        service: String,
        state: LifecycleState,
    },

    /// The background task ended abnormally (panic or abort).
    #[error("{service}: background task failed: {reason}")]
    WorkerFailed { service: String, reason: String },
}

/// Stop signal handed to the background task.
///
/// Resolves once a stop is requested, or when the lifecycle owning the
/// sending half is dropped.
pub struct Shutdown(oneshot::Receiver<()>);

impl Future for Shutdown {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.0).poll(cx).map(|_| ())
    }
}

/// Owns one background task and its stop signal.
pub struct ServiceLifecycle {
    name: String,
    state: LifecycleState,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ServiceLifecycle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: LifecycleState::Created,
            stop_tx: None,
            task: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Spawn the background task. Must be called inside a Tokio runtime.
    ///
    /// `worker` receives the [`Shutdown`] future and is expected to return
    /// soon after it resolves.
    pub fn start<F, Fut>(&mut self, worker: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(Shutdown) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.state != LifecycleState::Created {
            return Err(LifecycleError::InvalidState {
                service: self.name.clone(),
                state: self.state,
            });
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        self.task = Some(tokio::spawn(worker(Shutdown(stop_rx))));
        self.stop_tx = Some(stop_tx);
        self.state = LifecycleState::Running;
        info!(service = %self.name, "background task started");
        Ok(())
    }

    /// Signal the background task and wait until it has exited.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            LifecycleState::Stopped => {
                debug!(service = %self.name, "already stopped");
                return Ok(());
            }
            LifecycleState::Created => {
                self.state = LifecycleState::Stopped;
                debug!(service = %self.name, "stopped before start");
                return Ok(());
            }
            LifecycleState::Running => {}
        }

        info!(service = %self.name, "closing");
        if let Some(stop_tx) = self.stop_tx.take() {
            // The task may already have returned on its own.
            let _ = stop_tx.send(());
        }
        let joined = match self.task.take() {
            Some(task) => task.await,
            None => Ok(()),
        };
        self.state = LifecycleState::Stopped;

        match joined {
            Ok(()) => {
                info!(service = %self.name, "done");
                Ok(())
            }
            Err(e) => {
                warn!(service = %self.name, error = %e, "background task failed");
                Err(LifecycleError::WorkerFailed {
                    service: self.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl Drop for ServiceLifecycle {
    fn drop(&mut self) {
        if self.state == LifecycleState::Running {
            warn!(service = %self.name, "dropped while running; signalling stop without waiting");
            if let Some(stop_tx) = self.stop_tx.take() {
                let _ = stop_tx.send(());
            }
        }
    }
}
