// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Soft-expiring cache entries that serve stale data while a single refresh is scheduled.
//!
//! A soft entry has a time-to-live like any cache value, but expiring does not make it
//! disappear. The first read after expiration returns the old value, enqueues a refresh task
//! and marks the entry as loading, so later reads keep getting the old value without queuing
//! the same work again. The refresh task runs out of band and stores the new value.
//!
//! - [`SoftCache`] bundles a [`Store`], a [`Scheduler`], a clock and a [`RefreshPolicy`].
//! - [`SoftEntry`] is the controller for one key: [`get`](SoftEntry::get),
//!   [`set`](SoftEntry::set) and [`delete`](SoftEntry::delete).
//! - [`Refresher`] routes scheduled tasks to application handlers.
//! - [`envelope`] defines how soft entries are stored.
//!
//! Failures of the store or the scheduler never reach the caller. Reads degrade to the best
//! value available, writes report `false`, and every failure is recorded through telemetry.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use softcache::{Lookup, SoftCache};
//! use tick::ClockControl;
//!
//! # futures::executor::block_on(async {
//! let control = ClockControl::new();
//! let cache = SoftCache::builder(control.to_clock())
//!     .memory()
//!     .memory_scheduler()
//!     .build();
//!
//! cache.set("k", "v1", Duration::from_secs(100)).await;
//! assert_eq!(cache.get::<String>("k").await, Lookup::Hit("v1".to_string()));
//!
//! control.advance(Duration::from_secs(150));
//! assert_eq!(cache.get::<String>("k").await, Lookup::Stale("v1".to_string()));
//! assert_eq!(cache.scheduler().len(), 1);
//!
//! // Reading again does not queue a second refresh.
//! assert_eq!(cache.get::<String>("k").await, Lookup::Stale("v1".to_string()));
//! assert_eq!(cache.scheduler().len(), 1);
//! # });
//! ```
//!
//! # Features
//!
//! - `memory` (default): [`MemoryStore`] and [`MemoryScheduler`] plus builder shorthands.
//! - `logs` (default): structured `tracing` events, enabled with `enable_logs()`.
//! - `metrics`: OpenTelemetry counters and histograms, enabled with `enable_metrics()`.
//! - `test-util`: recording mocks with failure injection in [`testing`].

mod builder;
mod cache;
mod entry;
pub mod envelope;
mod policy;
mod refresh;
mod telemetry;

#[doc(inline)]
pub use builder::SoftCacheBuilder;
#[doc(inline)]
pub use cache::{CacheName, SoftCache};
#[doc(inline)]
pub use entry::{EntryState, Lookup, SoftEntry};
#[doc(inline)]
pub use envelope::{Envelope, Status, Wrapped};
#[doc(inline)]
pub use policy::{DEFAULT_GRACE_WINDOW, RefreshPolicy};
#[doc(inline)]
pub use refresh::{RefreshRequest, Refresher};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use softcache_memory::{MemoryScheduler, MemoryStore, MemoryStoreBuilder};
#[doc(inline)]
pub use softcache_ports::{Error, Result, ScheduledTask, Scheduler, Store};

/// Recording mocks for testing code built on soft caches.
#[cfg(feature = "test-util")]
pub mod testing {
    #[doc(inline)]
    pub use softcache_ports::testing::{MockScheduler, MockStore, SchedulerOp, StoreOp};
}
