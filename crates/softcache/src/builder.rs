// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for soft caches.
//!
//! The store and the scheduler are set through type-changing methods, so a cache cannot be
//! built until both are present.

use std::{fmt, time::Duration};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::MeterProvider;
#[cfg(feature = "memory")]
use softcache_memory::{MemoryScheduler, MemoryStore};
use softcache_ports::{Scheduler, Store};
use tick::Clock;

use crate::{
    SoftCache, SoftEntry,
    cache::{CacheName, Inner, Observer},
    policy::RefreshPolicy,
    telemetry::config::TelemetryConfig,
};

const DEFAULT_NAME: CacheName = "softcache";

/// Builder for a [`SoftCache`].
///
/// Created by [`SoftCache::builder`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use softcache::{RefreshPolicy, SoftCache};
/// use tick::Clock;
///
/// let cache = SoftCache::builder(Clock::new_frozen())
///     .name("profiles")
///     .memory()
///     .memory_scheduler()
///     .policy(RefreshPolicy::escalating_retry(Duration::from_secs(30)))
///     .build();
///
/// assert_eq!(cache.name(), "profiles");
/// ```
pub struct SoftCacheBuilder<S = (), D = ()> {
    name: CacheName,
    store: S,
    scheduler: D,
    clock: Clock,
    policy: RefreshPolicy,
    observer: Option<Observer<S, D>>,
    telemetry: TelemetryConfig,
}

impl SoftCacheBuilder {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            name: DEFAULT_NAME,
            store: (),
            scheduler: (),
            clock,
            policy: RefreshPolicy::default(),
            observer: None,
            telemetry: TelemetryConfig::new(),
        }
    }
}

impl<D> SoftCacheBuilder<(), D> {
    /// Sets the store holding raw values.
    #[must_use]
    pub fn store<S: Store>(self, store: S) -> SoftCacheBuilder<S, D> {
        SoftCacheBuilder {
            name: self.name,
            store,
            scheduler: self.scheduler,
            clock: self.clock,
            policy: self.policy,
            observer: None,
            telemetry: self.telemetry,
        }
    }

    /// Stores values in an unbounded [`MemoryStore`].
    #[cfg(feature = "memory")]
    #[must_use]
    pub fn memory(self) -> SoftCacheBuilder<MemoryStore, D> {
        self.store(MemoryStore::new())
    }
}

impl<S> SoftCacheBuilder<S, ()> {
    /// Sets the scheduler that runs refresh tasks.
    #[must_use]
    pub fn scheduler<D: Scheduler>(self, scheduler: D) -> SoftCacheBuilder<S, D> {
        SoftCacheBuilder {
            name: self.name,
            store: self.store,
            scheduler,
            clock: self.clock,
            policy: self.policy,
            observer: None,
            telemetry: self.telemetry,
        }
    }

    /// Queues refresh tasks in a [`MemoryScheduler`].
    ///
    /// Obtain the scheduler with [`SoftCache::scheduler`] to drain due tasks, for example
    /// with [`Refresher::run_due`](crate::Refresher::run_due).
    #[cfg(feature = "memory")]
    #[must_use]
    pub fn memory_scheduler(self) -> SoftCacheBuilder<S, MemoryScheduler> {
        self.scheduler(MemoryScheduler::new())
    }
}

impl<S, D> SoftCacheBuilder<S, D> {
    /// Sets the name reported in logs and metrics. Defaults to `softcache`.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Sets how stuck refreshes are recovered. Defaults to a one hour grace window.
    #[must_use]
    pub fn policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shorthand for [`RefreshPolicy::grace_window`].
    #[must_use]
    pub fn grace_window(self, window: Duration) -> Self {
        self.policy(RefreshPolicy::grace_window(window))
    }

    /// Emits a structured `tracing` event for every operation.
    #[cfg(feature = "logs")]
    #[must_use]
    pub fn enable_logs(mut self) -> Self {
        self.telemetry = self.telemetry.with_logs();
        self
    }

    /// Records operation counts and durations with a meter from `provider`.
    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn enable_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.telemetry = self.telemetry.with_metrics(provider);
        self
    }
}

impl<S: Store, D: Scheduler> SoftCacheBuilder<S, D> {
    /// Calls `observer` with the key and entry whenever an expired read schedules a refresh.
    ///
    /// This covers the first stale read of an entry and every stuck refresh that gets
    /// re-enqueued. The observer runs inline on the reading task.
    #[must_use]
    pub fn on_refresh_scheduled<F>(mut self, observer: F) -> Self
    where
        F: Fn(&str, &SoftEntry<S, D>) + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> SoftCache<S, D> {
        SoftCache::from_inner(Inner {
            name: self.name,
            store: self.store,
            scheduler: self.scheduler,
            clock: self.clock,
            policy: self.policy,
            observer: self.observer,
            telemetry: self.telemetry.build(),
        })
    }
}

impl<S, D> fmt::Debug for SoftCacheBuilder<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftCacheBuilder")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use softcache_ports::testing::{MockScheduler, MockStore};

    use super::*;

    #[test]
    fn defaults() {
        let builder = SoftCacheBuilder::new(Clock::new_frozen());

        assert_eq!(builder.name, "softcache");
        assert_eq!(builder.policy, RefreshPolicy::default());
        assert!(builder.observer.is_none());
    }

    #[test]
    fn settings_survive_type_changes() {
        let cache = SoftCache::builder(Clock::new_frozen())
            .name("early")
            .grace_window(Duration::from_secs(5))
            .store(MockStore::new())
            .scheduler(MockScheduler::new())
            .build();

        assert_eq!(cache.name(), "early");
        assert_eq!(cache.policy(), RefreshPolicy::grace_window(Duration::from_secs(5)));
    }

    #[test]
    fn scheduler_can_be_set_first() {
        let cache = SoftCache::builder(Clock::new_frozen())
            .scheduler(MockScheduler::new())
            .store(MockStore::new())
            .policy(RefreshPolicy::schedule_once())
            .build();

        assert_eq!(cache.policy(), RefreshPolicy::schedule_once());
    }

    #[test]
    fn observer_is_installed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let cache = SoftCache::builder(Clock::new_frozen())
            .store(MockStore::new())
            .scheduler(MockScheduler::new())
            .on_refresh_scheduled(move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let entry = cache.entry("k");
        cache.notify("k", &entry);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_output() {
        let builder = SoftCache::builder(Clock::new_frozen()).name("dbg");
        let debug = format!("{builder:?}");

        assert!(debug.contains("SoftCacheBuilder"), "{debug}");
        assert!(debug.contains("dbg"), "{debug}");
    }
}
