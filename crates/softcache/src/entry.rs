// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key controller implementing serve-stale-while-refreshing.

use std::{borrow::Cow, fmt, time::Duration, time::SystemTime};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use softcache_ports::{Error, Scheduler, Store};
use tick::Stopwatch;

use crate::{
    SoftCache,
    envelope::{self, Envelope, Status, Wrapped, default_task_id, unix_seconds},
    telemetry::{SoftActivity, SoftOperation},
};

/// Outcome of [`SoftEntry::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// A fresh value, or a value stored without expiration.
    Hit(V),
    /// An expired value served while its refresh is outstanding.
    Stale(V),
    /// Nothing usable is stored under the key.
    Miss,
}

impl<V> Lookup<V> {
    /// Returns the value, fresh or stale.
    #[must_use]
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Hit(value) | Self::Stale(value) => Some(value),
            Self::Miss => None,
        }
    }

    /// Returns a reference to the value, fresh or stale.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        match self {
            Self::Hit(value) | Self::Stale(value) => Some(value),
            Self::Miss => None,
        }
    }

    /// Returns `true` for a fresh value.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// Returns `true` for a stale value.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }

    /// Returns `true` if nothing was found.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}

/// Stored state of an entry, as reported by [`SoftEntry::peek`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Nothing is stored.
    Absent,
    /// A value is stored without an envelope.
    Bare,
    /// An envelope is stored.
    Soft {
        /// Unix seconds after which the value is stale.
        expiration: Option<u64>,
        /// Whether a refresh is outstanding.
        status: Status,
        /// Stuck refreshes re-enqueued since the value was stored.
        retries: u32,
    },
}

/// Controller for a single key.
///
/// An entry holds no cached state: every operation reads or writes the store, so any number of
/// entries for the same key can exist at once. Create one with [`SoftCache::entry`].
///
/// The task identity configured here is written into envelopes by [`set`](Self::set), and is
/// what [`schedule_refresh`](Self::schedule_refresh) acts on. When an expired value is read, the
/// identity stored in its envelope is used instead; [`delete`](Self::delete) cancels both.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use serde_json::json;
/// use softcache::SoftCache;
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let cache = SoftCache::builder(Clock::new_frozen())
///     .memory()
///     .memory_scheduler()
///     .build();
///
/// let entry = cache
///     .entry("weather:berlin")
///     .with_task_id("refresh_weather")
///     .with_task_args([json!("metric")]);
///
/// assert!(entry.set(&21.5, Duration::from_secs(600)).await);
/// assert_eq!(entry.get::<f64>().await.into_value(), Some(21.5));
/// # });
/// ```
pub struct SoftEntry<S, D> {
    cache: SoftCache<S, D>,
    key: String,
    task_id: Option<String>,
    task_args: Vec<Value>,
    retry_interval: Option<Duration>,
}

impl<S, D> SoftEntry<S, D> {
    pub(crate) fn new(cache: SoftCache<S, D>, key: String) -> Self {
        Self {
            cache,
            key,
            task_id: None,
            task_args: Vec::new(),
            retry_interval: None,
        }
    }

    /// Sets the refresh task id. Defaults to `transient_refresh_<key>`.
    #[must_use]
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Sets the arguments passed to the refresh task after the key.
    #[must_use]
    pub fn with_task_args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.task_args = args.into_iter().collect();
        self
    }

    /// Overrides the base interval of [`RefreshPolicy::escalating_retry`](crate::RefreshPolicy::escalating_retry)
    /// for this key.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the effective refresh task id.
    #[must_use]
    pub fn task_id(&self) -> Cow<'_, str> {
        self.task_id
            .as_deref()
            .map_or_else(|| Cow::Owned(default_task_id(&self.key)), Cow::Borrowed)
    }

    /// Returns the configured task arguments, without the leading key.
    #[must_use]
    pub fn task_args(&self) -> &[Value] {
        &self.task_args
    }

    /// Returns the per-key retry interval, if any.
    #[must_use]
    pub fn retry_interval(&self) -> Option<Duration> {
        self.retry_interval
    }

    /// Returns the cache this entry belongs to.
    #[must_use]
    pub fn cache(&self) -> &SoftCache<S, D> {
        &self.cache
    }

    fn scheduled_args(&self) -> Vec<Value> {
        envelope::task_args(&self.key, &self.task_args)
    }

    fn record(&self, operation: SoftOperation, activity: SoftActivity, duration: Option<Duration>) {
        self.cache
            .telemetry()
            .record(self.cache.name(), operation, activity, &self.key, duration);
    }
}

impl<S: Store, D: Scheduler> SoftEntry<S, D> {
    /// Reads the value, scheduling a refresh when it has expired.
    ///
    /// A fresh value is returned without touching the scheduler. The first read of an expired
    /// value enqueues its refresh task to run now, marks the envelope as loading and returns the
    /// stale value. Later reads return the stale value and leave the entry alone, unless the
    /// cache's [`RefreshPolicy`](crate::RefreshPolicy) considers the refresh lost and the
    /// scheduler no longer knows the task, in which case it is enqueued again.
    ///
    /// Store and scheduler failures never surface here: an unreadable entry is a
    /// [`Lookup::Miss`], and a failed enqueue or status write still returns the stale value.
    /// A stored value that does not deserialize as `V` is also reported as a miss.
    pub async fn get<V: DeserializeOwned>(&self) -> Lookup<V> {
        let watch = self.cache.clock().stopwatch();

        let raw = match self.cache.store().read(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.record(SoftOperation::Get, SoftActivity::Miss, Some(watch.elapsed()));
                return Lookup::Miss;
            }
            Err(_) => {
                self.record(SoftOperation::Get, SoftActivity::StoreError, Some(watch.elapsed()));
                return Lookup::Miss;
            }
        };

        let mut envelope = match Wrapped::<Value>::from_raw(raw) {
            Ok(Wrapped::Soft(envelope)) => envelope,
            Ok(Wrapped::Bare(value)) => {
                return self.finish(value, SoftActivity::Bare, &watch).map_or(Lookup::Miss, Lookup::Hit);
            }
            Err(_) => {
                self.record(SoftOperation::Get, SoftActivity::DecodeFailed, Some(watch.elapsed()));
                return Lookup::Miss;
            }
        };

        let now = self.cache.clock().system_time();
        if !envelope.is_expired(now) {
            return self.finish(envelope.data, SoftActivity::Hit, &watch).map_or(Lookup::Miss, Lookup::Hit);
        }

        self.refresh_expired(&mut envelope, now).await;
        self.finish(envelope.data, SoftActivity::Stale, &watch)
            .map_or(Lookup::Miss, Lookup::Stale)
    }

    /// Stores `value`, expiring after `ttl`.
    ///
    /// A zero `ttl` stores the value verbatim, without expiration. Otherwise the value is
    /// wrapped in a fresh envelope carrying this entry's task identity, which clears any
    /// outstanding refresh. Returns the store's verdict; encoding or store failures return `false`.
    ///
    /// A store that skips identical writes reports `false` for a repeated bare value. An enveloped
    /// value is still reported as stored in that case: expirations have whole-second resolution,
    /// so a repeat within the same second leaves exactly the requested envelope in place.
    pub async fn set<V: Serialize + ?Sized>(&self, value: &V, ttl: Duration) -> bool {
        let watch = self.cache.clock().stopwatch();
        let now = self.cache.clock().system_time();

        let wrapped = envelope::wrap(value, ttl, now, self.task_id.clone(), self.task_args.clone());
        let soft = matches!(wrapped, Wrapped::Soft(_));
        let Ok(raw) = wrapped.into_raw() else {
            self.record(SoftOperation::Set, SoftActivity::EncodeFailed, Some(watch.elapsed()));
            return false;
        };

        let (stored, activity) = match self.cache.store().write(&self.key, raw).await {
            Ok(true) => (true, SoftActivity::Stored),
            Ok(false) if soft => (true, SoftActivity::Stored),
            Ok(false) => (false, SoftActivity::StoreRejected),
            Err(_) => (false, SoftActivity::StoreError),
        };

        self.record(SoftOperation::Set, activity, Some(watch.elapsed()));
        stored
    }

    /// Cancels pending refresh tasks for the key, then removes it.
    ///
    /// Both this entry's task identity and the identity recorded in the stored envelope are
    /// cancelled, so a refresh scheduled through a differently configured entry cannot write the
    /// key back. The key is removed even if cancelling fails. Returns the store's verdict, so
    /// removing a missing key returns `false`.
    pub async fn delete(&self) -> bool {
        let watch = self.cache.clock().stopwatch();

        let mut identities = vec![(self.task_id().into_owned(), self.scheduled_args())];
        match self.cache.store().read(&self.key).await {
            Ok(Some(raw)) => {
                if let Ok(Wrapped::<Value>::Soft(envelope)) = Wrapped::from_raw(raw) {
                    let stored = (envelope.task_id(&self.key), envelope.task_args(&self.key));
                    if !identities.contains(&stored) {
                        identities.push(stored);
                    }
                }
            }
            Ok(None) => {}
            Err(_) => self.record(SoftOperation::Delete, SoftActivity::StoreError, None),
        }

        for (task_id, args) in &identities {
            self.cancel_scheduled(task_id, args).await;
        }

        let (removed, activity) = match self.cache.store().remove(&self.key).await {
            Ok(true) => (true, SoftActivity::Deleted),
            Ok(false) => (false, SoftActivity::Miss),
            Err(_) => (false, SoftActivity::StoreError),
        };

        self.record(SoftOperation::Delete, activity, Some(watch.elapsed()));
        removed
    }

    /// Enqueues this entry's refresh task to run now.
    ///
    /// Refresh handlers call this when they fail to produce a new value, so the entry does not
    /// wait for stuck recovery. The stored envelope is left untouched.
    pub async fn schedule_refresh(&self) -> bool {
        let now = self.cache.clock().system_time();
        let enqueued = self
            .cache
            .scheduler()
            .enqueue(&self.task_id(), now, &self.scheduled_args())
            .await;

        let (scheduled, activity) = match enqueued {
            Ok(()) => (true, SoftActivity::RefreshScheduled),
            Err(_) => (false, SoftActivity::SchedulerError),
        };

        self.record(SoftOperation::Refresh, activity, None);
        scheduled
    }

    /// Reads the stored state of the entry without changing it.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the read fails.
    pub async fn peek(&self) -> Result<EntryState, Error> {
        let Some(raw) = self.cache.store().read(&self.key).await? else {
            return Ok(EntryState::Absent);
        };

        Ok(match Wrapped::<Value>::from_raw(raw) {
            Ok(Wrapped::Soft(envelope)) => EntryState::Soft {
                expiration: envelope.expiration,
                status: envelope.status,
                retries: envelope.retries,
            },
            Ok(Wrapped::Bare(_)) | Err(_) => EntryState::Bare,
        })
    }

    async fn cancel_scheduled(&self, task_id: &str, args: &[Value]) {
        let scheduler = self.cache.scheduler();

        match scheduler.find_scheduled(task_id, args).await {
            Ok(Some(run_at)) => {
                let activity = match scheduler.cancel(task_id, run_at, args).await {
                    Ok(()) => SoftActivity::TaskCancelled,
                    Err(_) => SoftActivity::SchedulerError,
                };
                self.record(SoftOperation::Delete, activity, None);
            }
            Ok(None) => {}
            Err(_) => self.record(SoftOperation::Delete, SoftActivity::SchedulerError, None),
        }
    }

    async fn refresh_expired(&self, envelope: &mut Envelope<Value>, now: SystemTime) {
        match envelope.status {
            Status::Ok => self.begin_refresh(envelope, now, SoftActivity::RefreshScheduled).await,
            Status::Loading => {
                let due = self.cache.policy().recovery_due(
                    envelope.expiration.unwrap_or_default(),
                    unix_seconds(now),
                    envelope.retries,
                    self.retry_interval,
                );

                if due && !self.task_pending(envelope).await {
                    envelope.retries = envelope.retries.saturating_add(1);
                    self.begin_refresh(envelope, now, SoftActivity::RefreshRecovered).await;
                } else {
                    self.record(SoftOperation::Refresh, SoftActivity::RefreshPending, None);
                }
            }
        }
    }

    async fn task_pending(&self, envelope: &Envelope<Value>) -> bool {
        let found = self
            .cache
            .scheduler()
            .find_scheduled(&envelope.task_id(&self.key), &envelope.task_args(&self.key))
            .await;

        match found {
            Ok(run_at) => run_at.is_some(),
            Err(_) => {
                // Assume the task exists rather than risk a second one.
                self.record(SoftOperation::Refresh, SoftActivity::SchedulerError, None);
                true
            }
        }
    }

    async fn begin_refresh(&self, envelope: &mut Envelope<Value>, now: SystemTime, activity: SoftActivity) {
        let enqueued = self
            .cache
            .scheduler()
            .enqueue(&envelope.task_id(&self.key), now, &envelope.task_args(&self.key))
            .await;

        // Marked as loading even when the enqueue failed; stuck recovery picks it up later.
        envelope.status = Status::Loading;
        self.persist(envelope.clone()).await;

        if enqueued.is_ok() {
            self.record(SoftOperation::Refresh, activity, None);
            self.cache.notify(&self.key, self);
        } else {
            self.record(SoftOperation::Refresh, SoftActivity::SchedulerError, None);
        }
    }

    async fn persist(&self, envelope: Envelope<Value>) {
        let Ok(raw) = envelope.into_raw() else {
            self.record(SoftOperation::Refresh, SoftActivity::EncodeFailed, None);
            return;
        };

        if self.cache.store().write(&self.key, raw).await.is_err() {
            self.record(SoftOperation::Refresh, SoftActivity::StoreError, None);
        }
    }

    fn finish<V: DeserializeOwned>(&self, data: Value, activity: SoftActivity, watch: &Stopwatch) -> Option<V> {
        match serde_json::from_value(data) {
            Ok(value) => {
                self.record(SoftOperation::Get, activity, Some(watch.elapsed()));
                Some(value)
            }
            Err(_) => {
                self.record(SoftOperation::Get, SoftActivity::DecodeFailed, Some(watch.elapsed()));
                None
            }
        }
    }
}

impl<S, D> Clone for SoftEntry<S, D> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            key: self.key.clone(),
            task_id: self.task_id.clone(),
            task_args: self.task_args.clone(),
            retry_interval: self.retry_interval,
        }
    }
}

impl<S, D> fmt::Debug for SoftEntry<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftEntry")
            .field("cache", &self.cache.name())
            .field("key", &self.key)
            .field("task_id", &self.task_id())
            .field("task_args", &self.task_args)
            .field("retry_interval", &self.retry_interval)
            .finish()
    }
}
