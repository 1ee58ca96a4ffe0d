//! Keyed cache for asynchronous fetch results.
//!
//! One [`ResourceCache`] holds every key of one resource family (teams,
//! standings, player stats, ...). A key has at most one fetch in flight;
//! callers arriving while it runs share the same [`PendingFetch`]. Observers
//! registered with [`ResourceCache::subscribe`] are called after every state
//! change of their key.
//!
//! State is replaced wholesale under the lock and listeners are invoked after
//! the lock is released, so a listener may read the cache it observes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Duration, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;

use crate::error::FetchError;

pub type PendingFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

type Listener = Arc<dyn Fn() + Send + Sync>;
type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Idle,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleTime {
    Never,
    After(Duration),
}

impl StaleTime {
    pub fn minutes(minutes: i64) -> Self {
        StaleTime::After(Duration::minutes(minutes))
    }

    pub fn is_stale(&self, updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self {
            StaleTime::Never => false,
            StaleTime::After(threshold) => match updated_at {
                None => true,
                Some(updated) => now - updated >= *threshold,
            },
        }
    }
}

impl Default for StaleTime {
    fn default() -> Self {
        StaleTime::minutes(5)
    }
}

#[derive(Clone)]
pub struct ResourceState<T> {
    pub status: ResourceStatus,
    pub data: Option<T>,
    pub error: Option<FetchError>,
    pub is_fetching: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pending: Option<PendingFetch<T>>,
}

impl<T> ResourceState<T> {
    fn initial(initial_data: Option<T>) -> Self {
        Self {
            status: if initial_data.is_some() {
                ResourceStatus::Success
            } else {
                ResourceStatus::Idle
            },
            data: initial_data,
            error: None,
            is_fetching: false,
            updated_at: None,
            pending: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == ResourceStatus::Idle && self.is_fetching
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ResourceState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceState")
            .field("status", &self.status)
            .field("data", &self.data)
            .field("error", &self.error)
            .field("is_fetching", &self.is_fetching)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[derive(Clone)]
pub struct ConsumeOptions<T> {
    pub enabled: bool,
    pub stale_time: StaleTime,
    pub initial_data: Option<T>,
}

impl<T> Default for ConsumeOptions<T> {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: StaleTime::default(),
            initial_data: None,
        }
    }
}

impl<T> ConsumeOptions<T> {
    pub fn stale_after(stale_time: StaleTime) -> Self {
        Self {
            stale_time,
            ..Self::default()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn initial_data(mut self, data: T) -> Self {
        self.initial_data = Some(data);
        self
    }
}

struct Inner<T> {
    states: HashMap<String, ResourceState<T>>,
    listeners: HashMap<String, HashMap<u64, Listener>>,
    next_listener_id: u64,
}

pub struct ResourceCache<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ResourceCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResourceCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                states: HashMap::new(),
                listeners: HashMap::new(),
                next_listener_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Existing state for `key`, or a fresh entry seeded with `initial_data`.
    pub fn get_or_create(&self, key: &str, initial_data: Option<T>) -> ResourceState<T> {
        self.lock()
            .states
            .entry(key.to_string())
            .or_insert_with(|| ResourceState::initial(initial_data))
            .clone()
    }

    pub fn snapshot(&self, key: &str) -> ResourceState<T> {
        self.get_or_create(key, None)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().states.keys().cloned().collect()
    }

    pub fn subscribe<F>(&self, key: &str, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.lock();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner
                .listeners
                .entry(key.to_string())
                .or_default()
                .insert(id, Arc::new(listener));
            id
        };

        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        let key = key.to_string();
        Subscription {
            remove: Some(Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(set) = inner.listeners.get_mut(&key) {
                    set.remove(&id);
                    if set.is_empty() {
                        inner.listeners.remove(&key);
                    }
                }
            })),
        }
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.lock().listeners.get(key).map_or(0, HashMap::len)
    }

    fn notify(&self, listeners: Vec<Listener>) {
        for listener in listeners {
            listener();
        }
    }

    fn collect_listeners(inner: &Inner<T>, key: &str) -> Vec<Listener> {
        inner
            .listeners
            .get(key)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Replace the state of `key` with an updated copy and notify its observers.
    fn set_state<F>(&self, key: &str, update: F) -> ResourceState<T>
    where
        F: FnOnce(&mut ResourceState<T>),
    {
        let (next, listeners) = {
            let mut inner = self.lock();
            let mut next = inner
                .states
                .get(key)
                .cloned()
                .unwrap_or_else(|| ResourceState::initial(None));
            update(&mut next);
            inner.states.insert(key.to_string(), next.clone());
            (next, Self::collect_listeners(&inner, key))
        };
        self.notify(listeners);
        next
    }

    fn in_flight(inner: &Inner<T>, key: &str) -> Option<PendingFetch<T>> {
        inner
            .states
            .get(key)
            .filter(|state| state.is_fetching)
            .and_then(|state| state.pending.clone())
    }

    /// Start fetching `key`, or join the fetch already in flight.
    ///
    /// The fetch runs to completion on the current tokio runtime even if every
    /// returned handle is dropped. Failures are stored on the entry (keeping
    /// any previous data) and also reject the returned future.
    pub fn start_fetch<F, Fut>(&self, key: &str, fetcher: F) -> PendingFetch<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        if let Some(pending) = Self::in_flight(&self.lock(), key) {
            return pending;
        }

        // The fetcher may read this cache, so it runs without the lock.
        let fetch = fetcher();

        let (pending, listeners) = {
            let mut inner = self.lock();
            if let Some(pending) = Self::in_flight(&inner, key) {
                return pending;
            }

            let cache = self.clone();
            let owned_key = key.to_string();
            let pending = async move {
                match fetch.await {
                    Ok(value) => {
                        cache.set_state(&owned_key, |state| {
                            state.data = Some(value.clone());
                            state.error = None;
                            state.status = ResourceStatus::Success;
                            state.is_fetching = false;
                            state.pending = None;
                            state.updated_at = Some(Utc::now());
                        });
                        Ok(value)
                    }
                    Err(err) => {
                        let error = FetchError::from(err);
                        tracing::warn!("Fetch for '{}' failed: {}", owned_key, error);
                        cache.set_state(&owned_key, |state| {
                            state.error = Some(error.clone());
                            state.status = ResourceStatus::Error;
                            state.is_fetching = false;
                            state.pending = None;
                            state.updated_at = Some(Utc::now());
                        });
                        Err(error)
                    }
                }
            }
            .boxed()
            .shared();

            let mut next = inner
                .states
                .get(key)
                .cloned()
                .unwrap_or_else(|| ResourceState::initial(None));
            next.is_fetching = true;
            next.error = None;
            next.pending = Some(pending.clone());
            inner.states.insert(key.to_string(), next);
            (pending, Self::collect_listeners(&inner, key))
        };

        self.notify(listeners);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(pending.clone().map(|_| ()));
        }

        pending
    }

    /// Expire `key` so the next staleness check refetches it. Data is kept.
    pub fn invalidate(&self, key: &str) {
        self.set_state(key, |state| state.updated_at = None);
    }

    pub fn invalidate_where<P>(&self, predicate: P)
    where
        P: Fn(&str) -> bool,
    {
        let keys: Vec<String> = self
            .keys()
            .into_iter()
            .filter(|key| predicate(key))
            .collect();
        for key in keys {
            self.invalidate(&key);
        }
    }

    /// Seed `key`, start a fetch when it is idle or stale, and return a view
    /// of the entry.
    pub fn consume<F, Fut>(&self, key: &str, fetcher: F, options: ConsumeOptions<T>) -> ResourceView<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || fetcher().boxed());
        let mut snapshot = self.get_or_create(key, options.initial_data);

        if options.enabled && !snapshot.is_fetching {
            let stale = options.stale_time.is_stale(snapshot.updated_at, Utc::now());
            let should_fetch = snapshot.status == ResourceStatus::Idle
                || (snapshot.status == ResourceStatus::Success && stale);

            if should_fetch {
                let run = Arc::clone(&fetcher);
                self.start_fetch(key, move || run());
                snapshot = self.snapshot(key);
            }
        }

        ResourceView {
            key: key.to_string(),
            state: snapshot,
            cache: self.clone(),
            fetcher,
        }
    }
}

/// Removes its listener when dropped or when [`Subscription::unsubscribe`] is
/// called.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

/// Snapshot returned by [`ResourceCache::consume`].
pub struct ResourceView<T> {
    pub key: String,
    pub state: ResourceState<T>,
    cache: ResourceCache<T>,
    fetcher: Fetcher<T>,
}

impl<T> ResourceView<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn data(&self) -> Option<&T> {
        self.state.data.as_ref()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.state.error.as_ref()
    }

    pub fn status(&self) -> ResourceStatus {
        self.state.status
    }

    pub fn is_fetching(&self) -> bool {
        self.state.is_fetching
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn is_success(&self) -> bool {
        self.state.status == ResourceStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.state.status == ResourceStatus::Error
    }

    pub fn refetch(&self) -> PendingFetch<T> {
        let run = Arc::clone(&self.fetcher);
        self.cache.start_fetch(&self.key, move || run())
    }

    pub fn invalidate(&self) {
        self.cache.invalidate(&self.key);
    }

    /// Data for a blocking reader.
    ///
    /// Waits for the in-flight fetch when nothing has been fetched yet (seeded
    /// initial data does not count); otherwise returns the cached value, even
    /// while a background refresh runs.
    pub async fn resolve(self) -> Result<T, FetchError> {
        let fetched = self.state.updated_at.is_some() && self.state.status == ResourceStatus::Success;

        if !fetched {
            if let Some(pending) = self.state.pending.clone() {
                return pending.await;
            }
        }

        match (self.state.status, self.state.data, self.state.error) {
            (ResourceStatus::Success, Some(data), _) => Ok(data),
            (ResourceStatus::Error, _, Some(error)) => Err(error),
            _ => Err(FetchError::msg(format!("resource '{}' has not been loaded", self.key))),
        }
    }
}
