//! Keyed query cache with staleness, invalidation and in-flight de-duplication.
//!
//! # Design
//! Each `QueryKey` owns one entry. An access either hits a fresh cached value,
//! joins a fetch that is already running for the key, or starts a new fetch.
//! The entry lock is a plain `Mutex` and is never held across an `.await`.
//!
//! Every fetch carries the entry's generation at the time it started. The
//! result is written back only if the generation still matches, so a fetch
//! that was invalidated or abandoned cannot overwrite newer state. Dropping
//! the future that owns a fetch releases the entry; callers that were waiting
//! on it start a fetch of their own.
//!
//! Values are stored type-erased and handed out as `Arc<V>`, so two hits on
//! the same fresh entry return the same allocation.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::types::BookId;

/// Identifies one cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The full book collection.
    Books,
    /// A single book.
    Book(BookId),
}

/// Observable state of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched (or removed).
    Idle,
    /// A fetch is outstanding.
    Loading,
    /// Cached and younger than the stale threshold.
    Fresh,
    /// Cached but past the threshold or invalidated; next access refetches.
    Stale,
    /// The last fetch failed. The next access refetches.
    Errored(ApiError),
}

type Data = Arc<dyn Any + Send + Sync>;
type Outcome = Result<Data, ApiError>;

struct Cached {
    data: Data,
    fetched_at: Instant,
}

#[derive(Default)]
struct Entry {
    cached: Option<Cached>,
    error: Option<ApiError>,
    invalidated: bool,
    generation: u64,
    in_flight: Option<watch::Receiver<Option<Outcome>>>,
}

enum Step<'a> {
    Hit(Data),
    Wait(watch::Receiver<Option<Outcome>>),
    Fetch(Ticket<'a>),
}

/// Cache of query results shared by the presentation layer.
pub struct QueryClient {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    // Client-wide so a removed and recreated entry never reuses a generation.
    generations: AtomicU64,
    stale_after: Duration,
}

impl QueryClient {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
            stale_after,
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Return the cached value for `key` if it is fresh, otherwise run
    /// `fetcher` (or wait for a fetch already running for `key`).
    ///
    /// Failures are cached as the key's error state and returned; nothing is
    /// retried.
    pub async fn fetch<V, F, Fut>(&self, key: QueryKey, mut fetcher: F) -> Result<Arc<V>, ApiError>
    where
        V: Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, ApiError>>,
    {
        loop {
            match self.step::<V>(&key) {
                Step::Hit(data) => {
                    tracing::debug!(?key, "query cache hit");
                    if let Ok(value) = data.downcast::<V>() {
                        return Ok(value);
                    }
                }
                Step::Wait(mut receiver) => {
                    tracing::debug!(?key, "joining in-flight query");
                    let outcome = match receiver.wait_for(Option::is_some).await {
                        Ok(outcome) => outcome.clone(),
                        // The fetching caller went away; try again ourselves.
                        Err(_) => continue,
                    };
                    match outcome {
                        Some(Ok(data)) => {
                            if let Ok(value) = data.downcast::<V>() {
                                return Ok(value);
                            }
                        }
                        Some(Err(err)) => return Err(err),
                        None => continue,
                    }
                }
                Step::Fetch(ticket) => {
                    tracing::debug!(?key, "query cache miss, fetching");
                    let result = fetcher().await.map(Arc::new);
                    ticket.complete(result.clone().map(|value| value as Data));
                    return result;
                }
            }
        }
    }

    /// Force the next access of `key` to refetch regardless of age.
    ///
    /// A fetch that is running for `key` keeps serving the callers already
    /// waiting on it, but its result is no longer written to the cache.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.invalidated = true;
            if entry.in_flight.take().is_some() {
                entry.generation = self.next_generation();
            }
            tracing::debug!(?key, "query invalidated");
        }
    }

    /// The cached value for `key`, fresh or not.
    pub fn peek<V: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<V>> {
        let entries = self.lock();
        let data = entries.get(key)?.cached.as_ref()?.data.clone();
        data.downcast::<V>().ok()
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        let entries = self.lock();
        let Some(entry) = entries.get(key) else {
            return QueryStatus::Idle;
        };
        if entry.in_flight.is_some() {
            return QueryStatus::Loading;
        }
        if let Some(err) = &entry.error {
            return QueryStatus::Errored(err.clone());
        }
        match &entry.cached {
            Some(cached) if !entry.invalidated && cached.fetched_at.elapsed() < self.stale_after => {
                QueryStatus::Fresh
            }
            Some(_) => QueryStatus::Stale,
            None => QueryStatus::Idle,
        }
    }

    /// Drop the entry for `key`; in-flight results for it are discarded.
    pub fn remove(&self, key: &QueryKey) {
        self.lock().remove(key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn step<V: Send + Sync + 'static>(&self, key: &QueryKey) -> Step<'_> {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_default();

        if let Some(cached) = &entry.cached {
            let fresh = entry.error.is_none()
                && !entry.invalidated
                && cached.fetched_at.elapsed() < self.stale_after;
            if fresh && cached.data.is::<V>() {
                return Step::Hit(cached.data.clone());
            }
        }
        if let Some(receiver) = &entry.in_flight {
            return Step::Wait(receiver.clone());
        }

        entry.generation = self.next_generation();
        let (sender, receiver) = watch::channel(None);
        entry.in_flight = Some(receiver);
        Step::Fetch(Ticket {
            client: self,
            key: key.clone(),
            generation: entry.generation,
            sender,
            done: false,
        })
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The right to write one fetch result back to one entry.
struct Ticket<'a> {
    client: &'a QueryClient,
    key: QueryKey,
    generation: u64,
    sender: watch::Sender<Option<Outcome>>,
    done: bool,
}

impl Ticket<'_> {
    fn complete(mut self, outcome: Outcome) {
        self.done = true;
        {
            let mut entries = self.client.lock();
            match entries.get_mut(&self.key) {
                Some(entry) if entry.generation == self.generation => {
                    entry.in_flight = None;
                    match &outcome {
                        Ok(data) => {
                            entry.cached = Some(Cached {
                                data: data.clone(),
                                fetched_at: Instant::now(),
                            });
                            entry.error = None;
                            entry.invalidated = false;
                        }
                        Err(err) => entry.error = Some(err.clone()),
                    }
                }
                _ => tracing::debug!(key = ?self.key, "discarding superseded query result"),
            }
        }
        self.sender.send_replace(Some(outcome));
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut entries = self.client.lock();
        if let Some(entry) = entries.get_mut(&self.key) {
            if entry.generation == self.generation {
                entry.in_flight = None;
                tracing::debug!(key = ?self.key, "query fetch abandoned");
            }
        }
    }
}
