// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The shared soft cache context.

use std::{fmt, sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use softcache_ports::{Scheduler, Store};
use tick::Clock;

use crate::{
    builder::SoftCacheBuilder,
    entry::{Lookup, SoftEntry},
    policy::RefreshPolicy,
    telemetry::SoftTelemetry,
};

/// Static name identifying a soft cache in logs and metrics.
pub type CacheName = &'static str;

pub(crate) type Observer<S, D> = Box<dyn Fn(&str, &SoftEntry<S, D>) + Send + Sync>;

/// Soft cache context shared by every entry.
///
/// Holds the store, the scheduler, the clock and the refresh policy. Cloning is cheap and clones
/// share everything. Per-key operations live on [`SoftEntry`], created with [`entry`](Self::entry);
/// `get`, `set` and `delete` on the cache are shorthands for an entry with default task identity.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use softcache::{Lookup, SoftCache};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let cache = SoftCache::builder(Clock::new_frozen())
///     .memory()
///     .memory_scheduler()
///     .build();
///
/// assert!(cache.set("greeting", "hello", Duration::from_secs(60)).await);
/// assert_eq!(cache.get::<String>("greeting").await, Lookup::Hit("hello".to_string()));
/// # });
/// ```
pub struct SoftCache<S, D> {
    inner: Arc<Inner<S, D>>,
}

pub(crate) struct Inner<S, D> {
    pub(crate) name: CacheName,
    pub(crate) store: S,
    pub(crate) scheduler: D,
    pub(crate) clock: Clock,
    pub(crate) policy: RefreshPolicy,
    pub(crate) observer: Option<Observer<S, D>>,
    pub(crate) telemetry: SoftTelemetry,
}

impl SoftCache<(), ()> {
    /// Creates a builder; time for expirations and scheduling comes from `clock`.
    #[must_use]
    pub fn builder(clock: Clock) -> SoftCacheBuilder {
        SoftCacheBuilder::new(clock)
    }
}

impl<S, D> SoftCache<S, D> {
    pub(crate) fn from_inner(inner: Inner<S, D>) -> Self {
        Self { inner: Arc::new(inner) }
    }

    /// Returns the cache name.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.inner.name
    }

    /// Returns the clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Returns the underlying scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &D {
        &self.inner.scheduler
    }

    /// Returns the refresh policy.
    #[must_use]
    pub fn policy(&self) -> RefreshPolicy {
        self.inner.policy
    }

    pub(crate) fn telemetry(&self) -> &SoftTelemetry {
        &self.inner.telemetry
    }

    pub(crate) fn notify(&self, key: &str, entry: &SoftEntry<S, D>) {
        if let Some(observer) = &self.inner.observer {
            observer(key, entry);
        }
    }
}

impl<S: Store, D: Scheduler> SoftCache<S, D> {
    /// Creates the controller for `key`.
    #[must_use]
    pub fn entry(&self, key: impl Into<String>) -> SoftEntry<S, D> {
        SoftEntry::new(self.clone(), key.into())
    }

    /// Reads `key`; see [`SoftEntry::get`].
    pub async fn get<V: DeserializeOwned>(&self, key: &str) -> Lookup<V> {
        self.entry(key).get().await
    }

    /// Stores `value` under `key`; see [`SoftEntry::set`].
    pub async fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Duration) -> bool {
        self.entry(key).set(value, ttl).await
    }

    /// Removes `key`; see [`SoftEntry::delete`].
    pub async fn delete(&self, key: &str) -> bool {
        self.entry(key).delete().await
    }
}

impl<S, D> Clone for SoftCache<S, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, D> fmt::Debug for SoftCache<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftCache")
            .field("name", &self.inner.name)
            .field("policy", &self.inner.policy)
            .field("observer", &self.inner.observer.is_some())
            .finish_non_exhaustive()
    }
}
