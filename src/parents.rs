//! Thread-parent resolution for replies rendered without their parent.
//!
//! A reply only carries the id of its thread parent (`tmid`). When the
//! parent is not in the local store the cache fetches it, keeping at most
//! one fetch in flight per id: renders that arrive while a fetch is running
//! get [`ParentLookup::InFlight`] instead of starting another one. Entries
//! are dropped as soon as the fetch finishes, successfully or not, so a
//! failed parent is simply requested again on the next render.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::buffer::MessageRecord;
use crate::error::{FetchError, FetchResult};

/// Source of messages that are not in the local store.
#[async_trait]
pub trait ParentFetcher: Send + Sync {
    async fn fetch_message(&self, id: &str) -> FetchResult<MessageRecord>;
}

/// Outcome of asking for a thread parent during a render.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentLookup {
    /// Parent is in the local store.
    Available(MessageRecord),
    /// Another render already started the fetch; no result yet.
    InFlight,
    /// This call started the fetch.
    Requested,
}

/// Sent to the view when a fetch finishes so it can re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentEvent {
    Resolved { tmid: String },
    Failed { tmid: String, error: FetchError },
}

/// The thread parent id a record still has to resolve, if any.
pub fn needs_parent(msg: &MessageRecord) -> Option<&str> {
    match (&msg.tmid, &msg.thread_excerpt) {
        (Some(tmid), None) => Some(tmid),
        _ => None,
    }
}

/// Handle of a fetch that has not completed.
#[derive(Debug, Default)]
struct InFlightFetch {
    /// Set for spawned fetches, `None` when a caller awaits it directly.
    task: Option<AbortHandle>,
}

/// Parents kept per session; oldest entries are evicted past this.
pub const DEFAULT_STORE_CAPACITY: usize = 2500;

/// Known messages keyed by id, evicted in insertion order.
#[derive(Debug)]
struct ParentStore {
    records: HashMap<String, MessageRecord>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ParentStore {
    fn new(capacity: usize) -> Self {
        Self {
            records: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, id: &str) -> Option<&MessageRecord> {
        self.records.get(id)
    }

    fn insert(&mut self, msg: MessageRecord) {
        if self.records.insert(msg.id.clone(), msg.clone()).is_none() {
            self.order.push_back(msg.id);
        }
        while self.records.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.records.remove(&oldest);
        }
    }
}

type Store = Arc<Mutex<ParentStore>>;
type InFlight = Arc<Mutex<HashMap<String, InFlightFetch>>>;

/// Session-scoped parent cache. Dropping it aborts spawned fetches.
pub struct ParentCache {
    fetcher: Arc<dyn ParentFetcher>,
    store: Store,
    in_flight: InFlight,
    events: Sender<ParentEvent>,
    runtime: Handle,
}

impl ParentCache {
    pub fn new(fetcher: Arc<dyn ParentFetcher>, runtime: Handle, events: Sender<ParentEvent>) -> Self {
        Self::with_capacity(fetcher, runtime, events, DEFAULT_STORE_CAPACITY)
    }

    /// Cache holding at most `capacity` known messages.
    pub fn with_capacity(
        fetcher: Arc<dyn ParentFetcher>,
        runtime: Handle,
        events: Sender<ParentEvent>,
        capacity: usize,
    ) -> Self {
        Self {
            fetcher,
            store: Arc::new(Mutex::new(ParentStore::new(capacity))),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            events,
            runtime,
        }
    }

    /// Make already loaded messages available as parents.
    pub fn seed<I>(&self, messages: I)
    where
        I: IntoIterator<Item = MessageRecord>,
    {
        let mut store = self.store.lock();
        for msg in messages {
            store.insert(msg);
        }
    }

    pub fn get(&self, id: &str) -> Option<MessageRecord> {
        self.store.lock().get(id).cloned()
    }

    /// Number of messages currently held as potential parents.
    pub fn stored_count(&self) -> usize {
        self.store.lock().records.len()
    }

    pub fn is_in_flight(&self, tmid: &str) -> bool {
        self.in_flight.lock().contains_key(tmid)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Look up a parent without blocking the render; starts a background
    /// fetch when nothing is known about it yet.
    pub fn request(&self, tmid: &str) -> ParentLookup {
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains_key(tmid) {
            return ParentLookup::InFlight;
        }
        if let Some(parent) = self.store.lock().get(tmid) {
            return ParentLookup::Available(parent.clone());
        }

        // The task cannot clear its entry before we release the lock
        let handle = self.runtime.spawn(self.job(tmid).run());
        in_flight.insert(
            tmid.to_string(),
            InFlightFetch {
                task: Some(handle.abort_handle()),
            },
        );
        tracing::debug!(tmid, "requested thread parent");
        ParentLookup::Requested
    }

    /// Fetch a parent and wait for it.
    ///
    /// Shares de-duplication with [`request`](Self::request): returns
    /// `Ok(None)` while another fetch for the same id is running.
    pub async fn resolve(&self, tmid: &str) -> FetchResult<Option<MessageRecord>> {
        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.contains_key(tmid) {
                return Ok(None);
            }
            if let Some(parent) = self.store.lock().get(tmid) {
                return Ok(Some(parent.clone()));
            }
            in_flight.insert(tmid.to_string(), InFlightFetch::default());
        }
        self.job(tmid).run().await.map(Some)
    }

    /// Wait until no fetch is in flight or `timeout` passes.
    /// Returns whether the cache went idle.
    pub async fn settle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight_count() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    fn job(&self, tmid: &str) -> FetchJob {
        FetchJob {
            tmid: tmid.to_string(),
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            in_flight: Arc::clone(&self.in_flight),
            events: self.events.clone(),
        }
    }
}

impl Drop for ParentCache {
    fn drop(&mut self) {
        // Release the lock first: aborted tasks clear their own entries
        let fetches: Vec<_> = self.in_flight.lock().drain().collect();
        for (tmid, fetch) in fetches {
            if let Some(task) = fetch.task {
                tracing::debug!(tmid = %tmid, "aborting thread parent fetch");
                task.abort();
            }
        }
    }
}

struct FetchJob {
    tmid: String,
    fetcher: Arc<dyn ParentFetcher>,
    store: Store,
    in_flight: InFlight,
    events: Sender<ParentEvent>,
}

impl FetchJob {
    async fn run(self) -> FetchResult<MessageRecord> {
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            tmid: self.tmid.clone(),
        };
        let started = Instant::now();
        let result = self.fetcher.fetch_message(&self.tmid).await;

        if let Ok(parent) = &result {
            self.store.lock().insert(parent.clone());
        }
        // Clear the entry before notifying so a re-render sees the outcome
        drop(guard);

        let event = match &result {
            Ok(_) => {
                tracing::debug!(
                    tmid = %self.tmid,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "thread parent resolved"
                );
                ParentEvent::Resolved {
                    tmid: self.tmid.clone(),
                }
            }
            Err(err) => {
                tracing::warn!(tmid = %self.tmid, error = %err, "failed to fetch thread parent");
                ParentEvent::Failed {
                    tmid: self.tmid.clone(),
                    error: err.clone(),
                }
            }
        };
        // The view may already be gone
        let _ = self.events.send(event);
        result
    }
}

/// Removes the in-flight entry however the fetch ends, including abort.
struct InFlightGuard {
    in_flight: InFlight,
    tmid: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.tmid);
    }
}

/// Fetcher backed by a fixed set of messages, e.g. an archive file.
#[derive(Debug, Default, Clone)]
pub struct ArchiveFetcher {
    messages: HashMap<String, MessageRecord>,
    latency: Option<Duration>,
}

impl ArchiveFetcher {
    pub fn new<I>(messages: I) -> Self
    where
        I: IntoIterator<Item = MessageRecord>,
    {
        Self {
            messages: messages.into_iter().map(|m| (m.id.clone(), m)).collect(),
            latency: None,
        }
    }

    /// Delay every fetch, to mimic a round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl ParentFetcher for ArchiveFetcher {
    async fn fetch_message(&self, id: &str) -> FetchResult<MessageRecord> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.messages
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(id.to_string()))
    }
}
