// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory store backed by moka.

use std::sync::Arc;

use moka::future::Cache;
use serde_json::Value;
use softcache_ports::{Error, Store};

use crate::builder::MemoryStoreBuilder;

/// A concurrent in-memory [`Store`].
///
/// Writing the value that is already stored under a key is treated as a no-op and reports
/// `false`, matching stores that compare before they write. The compare and the write are
/// two separate steps, so two concurrent identical writes may both report `true`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use softcache_memory::MemoryStore;
/// use softcache_ports::Store;
///
/// # futures::executor::block_on(async {
/// let store = MemoryStore::new();
/// assert!(store.write("k", json!(1)).await?);
/// assert!(!store.write("k", json!(1)).await?);
/// # Ok::<(), softcache_ports::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Cache<String, Value>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a store holding at most `max_capacity` keys.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a builder for configuring a store.
    #[must_use]
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    pub(crate) fn from_builder(builder: &MemoryStoreBuilder) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(ttl) = builder.time_to_live {
            moka_builder = moka_builder.time_to_live(ttl);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: Arc::new(moka_builder.build()),
        }
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

impl Store for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.inner.get(key).await)
    }

    async fn write(&self, key: &str, raw: Value) -> Result<bool, Error> {
        if self.inner.get(key).await.as_ref() == Some(&raw) {
            return Ok(false);
        }
        self.inner.insert(key.to_string(), raw).await;
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool, Error> {
        Ok(self.inner.remove(key).await.is_some())
    }
}
