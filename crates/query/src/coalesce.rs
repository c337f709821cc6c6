//! Request coalescing: at most one execution per key is in flight.
//!
//! Callers that arrive while an execution for their key is running wait
//! for it and receive a clone of its outcome. The key is dropped from the
//! in-flight map before the outcome is published, so a caller arriving
//! after completion starts a fresh execution. Nothing is cached across
//! calls, failures included.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use folio_store::{Filter, SortSpec};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::cursor::Cursor;
use crate::page::Direction;

/// Outcome delivered to one caller of [`RequestCoalescer::run`].
#[derive(Debug, Clone)]
pub struct Coalesced<T, E> {
    pub result: Result<T, E>,
    /// The same outcome was handed to more than one caller.
    pub shared: bool,
}

impl<T, E> Coalesced<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

struct Flight<T, E> {
    outcome: OnceCell<Result<T, E>>,
    /// Callers still attached: waiting, or already served.
    callers: AtomicUsize,
}

type InFlight<K, T, E> = Mutex<HashMap<K, Arc<Flight<T, E>>>>;

/// One caller's membership in a flight.
///
/// Dropped unserved (the caller was cancelled), it detaches from the flight;
/// the last caller to leave a flight with no outcome removes its key.
struct Attached<'a, K: Hash + Eq, T, E> {
    in_flight: &'a InFlight<K, T, E>,
    key: K,
    flight: Arc<Flight<T, E>>,
    served: bool,
}

impl<K: Hash + Eq, T, E> Drop for Attached<'_, K, T, E> {
    fn drop(&mut self) {
        if self.served {
            return;
        }
        let mut map = self.in_flight.lock();
        let left = self.flight.callers.fetch_sub(1, Ordering::SeqCst) - 1;
        if left == 0
            && !self.flight.outcome.initialized()
            && map
                .get(&self.key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.flight))
        {
            map.remove(&self.key);
        }
    }
}

/// Deduplicates concurrent executions by key.
///
/// This is a pure synchronization primitive with no knowledge of what the
/// executions do.
pub struct RequestCoalescer<K, T, E> {
    in_flight: InFlight<K, T, E>,
}

impl<K, T, E> Default for RequestCoalescer<K, T, E> {
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T, E> RequestCoalescer<K, T, E>
where
    K: Hash + Eq + Clone,
    T: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Run `f` for `key`, or join the execution already running for it.
    ///
    /// If the caller driving the execution is cancelled, one of the waiters
    /// takes over with its own `f`.
    pub async fn run<F, Fut>(&self, key: K, f: F) -> Coalesced<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attached = {
            let mut map = self.in_flight.lock();
            let flight = map
                .entry(key.clone())
                .or_insert_with(|| {
                    Arc::new(Flight {
                        outcome: OnceCell::new(),
                        callers: AtomicUsize::new(0),
                    })
                })
                .clone();
            flight.callers.fetch_add(1, Ordering::SeqCst);
            Attached {
                in_flight: &self.in_flight,
                key,
                flight,
                served: false,
            }
        };

        let result = attached
            .flight
            .outcome
            .get_or_init(|| async {
                let result = f().await;
                let mut map = self.in_flight.lock();
                if map
                    .get(&attached.key)
                    .is_some_and(|current| Arc::ptr_eq(current, &attached.flight))
                {
                    map.remove(&attached.key);
                }
                result
            })
            .await
            .clone();
        attached.served = true;

        Coalesced {
            result,
            shared: attached.flight.callers.load(Ordering::SeqCst) > 1,
        }
    }
}

/// Deterministic identity of a logical list query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoalescingKey(String);

impl CoalescingKey {
    pub fn new(
        operation: &str,
        filter: &Filter,
        sort: &SortSpec,
        cursor: &Cursor,
        page_size: usize,
        direction: Direction,
    ) -> Self {
        #[derive(Serialize)]
        struct KeyParts<'a> {
            op: &'a str,
            filter: &'a Filter,
            sort: String,
            cursor: &'a str,
            size: usize,
            direction: Direction,
        }
        let parts = KeyParts {
            op: operation,
            filter,
            sort: sort.fingerprint(),
            cursor: cursor.as_str(),
            size: page_size,
            direction,
        };
        Self(serde_json::to_string(&parts).unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
