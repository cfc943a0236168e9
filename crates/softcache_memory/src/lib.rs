// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process store and scheduler for soft cache entries.
//!
//! [`MemoryStore`] keeps raw values in a moka cache; [`MemoryScheduler`] keeps pending
//! refresh tasks in memory and hands them out once they are due. Both are cheap to clone
//! and share their state between clones.
//!
//! # Quick Start
//!
//! ```
//! use std::time::{Duration, SystemTime};
//!
//! use serde_json::json;
//! use softcache_memory::{MemoryScheduler, MemoryStore};
//! use softcache_ports::{Scheduler, Store};
//!
//! # futures::executor::block_on(async {
//! let store = MemoryStore::builder().max_capacity(10_000).build();
//! store.write("k", json!("v")).await?;
//! assert_eq!(store.read("k").await?, Some(json!("v")));
//!
//! let scheduler = MemoryScheduler::new();
//! let at = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
//! scheduler.enqueue("refresh", at, &[json!("k")]).await?;
//!
//! assert!(scheduler.take_due(SystemTime::UNIX_EPOCH).is_empty());
//! assert_eq!(scheduler.take_due(at).len(), 1);
//! # Ok::<(), softcache_ports::Error>(())
//! # });
//! ```

pub mod builder;
mod scheduler;
mod store;

#[doc(inline)]
pub use builder::MemoryStoreBuilder;
#[doc(inline)]
pub use scheduler::MemoryScheduler;
#[doc(inline)]
pub use store::MemoryStore;
