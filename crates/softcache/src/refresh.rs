// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dispatching scheduled refresh tasks to application handlers.
//!
//! The scheduler only knows task ids and arguments. A [`Refresher`] maps task ids to async
//! handlers and turns each scheduled task back into the [`SoftEntry`] it was enqueued for, so a
//! handler can store the new value with [`SoftEntry::set`] or retry with
//! [`SoftEntry::schedule_refresh`].

use std::{collections::HashMap, fmt, time::SystemTime};

use futures::{FutureExt, future::BoxFuture};
use serde_json::Value;
#[cfg(feature = "memory")]
use softcache_memory::MemoryScheduler;
use softcache_ports::{ScheduledTask, Scheduler, Store};

use crate::{
    SoftCache, SoftEntry,
    envelope::default_task_id,
    telemetry::{SoftActivity, SoftOperation},
};

type Handler<S, D> = Box<dyn Fn(RefreshRequest<S, D>) -> BoxFuture<'static, ()> + Send + Sync>;

/// A scheduled refresh handed to a handler.
pub struct RefreshRequest<S, D> {
    entry: SoftEntry<S, D>,
    run_at: SystemTime,
}

impl<S, D> RefreshRequest<S, D> {
    /// Returns the entry to refresh.
    #[must_use]
    pub fn entry(&self) -> &SoftEntry<S, D> {
        &self.entry
    }

    /// Consumes the request, returning the entry to refresh.
    #[must_use]
    pub fn into_entry(self) -> SoftEntry<S, D> {
        self.entry
    }

    /// Returns the key to refresh.
    #[must_use]
    pub fn key(&self) -> &str {
        self.entry.key()
    }

    /// Returns the task arguments that followed the key.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        self.entry.task_args()
    }

    /// Returns when the task was scheduled to run.
    #[must_use]
    pub fn run_at(&self) -> SystemTime {
        self.run_at
    }
}

impl<S, D> fmt::Debug for RefreshRequest<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("entry", &self.entry)
            .field("run_at", &self.run_at)
            .finish()
    }
}

/// Registry of refresh handlers keyed by task id.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use softcache::{Lookup, Refresher, SoftCache};
/// use tick::ClockControl;
///
/// # futures::executor::block_on(async {
/// let control = ClockControl::new();
/// let cache = SoftCache::builder(control.to_clock())
///     .memory()
///     .memory_scheduler()
///     .build();
///
/// let refresher = Refresher::new(cache.clone()).register("transient_refresh_rate", |request| async move {
///     request.entry().set(&1.25, Duration::from_secs(60)).await;
/// });
///
/// cache.set("rate", &1.0, Duration::from_secs(60)).await;
/// control.advance(Duration::from_secs(61));
///
/// // The expired value is served while a refresh is queued.
/// assert_eq!(cache.get::<f64>("rate").await, Lookup::Stale(1.0));
/// assert_eq!(refresher.run_due(cache.scheduler()).await, 1);
/// assert_eq!(cache.get::<f64>("rate").await, Lookup::Hit(1.25));
/// # });
/// ```
pub struct Refresher<S, D> {
    cache: SoftCache<S, D>,
    handlers: HashMap<String, Handler<S, D>>,
}

impl<S: Store + 'static, D: Scheduler + 'static> Refresher<S, D> {
    /// Creates a registry with no handlers.
    #[must_use]
    pub fn new(cache: SoftCache<S, D>) -> Self {
        Self {
            cache,
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for tasks named `task_id`, replacing any previous one.
    #[must_use]
    pub fn register<F, Fut>(mut self, task_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RefreshRequest<S, D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handlers.insert(task_id.into(), Box::new(move |request| handler(request).boxed()));
        self
    }

    /// Returns `true` if a handler is registered for `task_id`.
    #[must_use]
    pub fn is_registered(&self, task_id: &str) -> bool {
        self.handlers.contains_key(task_id)
    }

    /// Runs the handler for `task`.
    ///
    /// The first argument is the key; the rest become the entry's task arguments. Returns
    /// `false` without running anything if no handler is registered or the task has no key.
    pub async fn dispatch(&self, task: ScheduledTask) -> bool {
        let watch = self.cache.clock().stopwatch();
        let ScheduledTask { task_id, run_at, args } = task;

        let mut args = args.into_iter();
        let key = match args.next() {
            Some(Value::String(key)) => key,
            _ => {
                self.record(SoftActivity::UnhandledTask, "", None);
                return false;
            }
        };

        let Some(handler) = self.handlers.get(&task_id) else {
            self.record(SoftActivity::UnhandledTask, &key, None);
            return false;
        };

        let mut entry = self.cache.entry(key).with_task_args(args);
        if task_id != default_task_id(entry.key()) {
            entry = entry.with_task_id(task_id);
        }

        let key = entry.key().to_string();
        handler(RefreshRequest { entry, run_at }).await;
        self.record(SoftActivity::Dispatched, &key, Some(watch.elapsed()));
        true
    }

    /// Runs every task in `scheduler` that is due at the cache clock's current time.
    ///
    /// Tasks run one after another, earliest first. Tasks enqueued by the handlers themselves
    /// are left for the next call. Returns the number of tasks a handler ran for.
    #[cfg(feature = "memory")]
    pub async fn run_due(&self, scheduler: &MemoryScheduler) -> usize {
        let mut ran = 0;
        for task in scheduler.take_due(self.cache.clock().system_time()) {
            if self.dispatch(task).await {
                ran += 1;
            }
        }
        ran
    }

    fn record(&self, activity: SoftActivity, key: &str, duration: Option<std::time::Duration>) {
        self.cache
            .telemetry()
            .record(self.cache.name(), SoftOperation::Dispatch, activity, key, duration);
    }
}

impl<S, D> fmt::Debug for Refresher<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut task_ids: Vec<_> = self.handlers.keys().collect();
        task_ids.sort();

        f.debug_struct("Refresher")
            .field("cache", &self.cache)
            .field("task_ids", &task_ids)
            .finish()
    }
}
