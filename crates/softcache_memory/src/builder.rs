// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory stores.
//!
//! The builder keeps moka's configuration types out of the public API.

use std::time::Duration;

use crate::store::MemoryStore;

/// Builder for configuring a [`MemoryStore`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use softcache_memory::MemoryStore;
///
/// let store = MemoryStore::builder()
///     .max_capacity(1000)
///     .initial_capacity(100)
///     .time_to_live(Duration::from_secs(24 * 60 * 60))
///     .name("soft-entries")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) name: Option<String>,
}

impl MemoryStoreBuilder {
    /// Creates a builder for an unbounded store with no eviction by age.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of stored keys.
    ///
    /// Once reached, keys are evicted with moka's `TinyLFU` policy. Evicting a soft entry
    /// simply turns the next lookup into a miss.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the initial capacity (pre-allocation hint).
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets a hard time-to-live after which the store drops a key.
    ///
    /// This is independent of soft expiration: a soft entry keeps being served stale until
    /// the store itself drops it, so this bounds how long stale data can live.
    #[must_use]
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Sets a name for the underlying cache, used by moka's own diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the store.
    #[must_use]
    pub fn build(self) -> MemoryStore {
        MemoryStore::from_builder(&self)
    }
}
