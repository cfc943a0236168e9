// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Collaborator ports for soft-expiring cache entries.
//!
//! A soft cache entry needs two things from the outside world: somewhere to keep the
//! stored value, and something that runs a refresh callback later. This crate defines
//! both as traits so the orchestration layer in `softcache` never depends on a concrete
//! storage engine or job runner.
//!
//! - [`Store`] persists raw values by key.
//! - [`Scheduler`] enqueues, finds and cancels deferred tasks identified by a task id
//!   and an ordered argument list.
//!
//! # Implementing a Store
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! use serde_json::Value;
//! use softcache_ports::{Error, Store};
//!
//! struct SimpleStore(Mutex<HashMap<String, Value>>);
//!
//! impl Store for SimpleStore {
//!     async fn read(&self, key: &str) -> Result<Option<Value>, Error> {
//!         Ok(self.0.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn write(&self, key: &str, raw: Value) -> Result<bool, Error> {
//!         self.0.lock().unwrap().insert(key.to_string(), raw);
//!         Ok(true)
//!     }
//!
//!     async fn remove(&self, key: &str) -> Result<bool, Error> {
//!         Ok(self.0.lock().unwrap().remove(key).is_some())
//!     }
//! }
//! ```

pub mod error;
mod scheduler;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use scheduler::{ScheduledTask, Scheduler};
#[doc(inline)]
pub use store::Store;
