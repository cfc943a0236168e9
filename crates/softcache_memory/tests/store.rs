// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `MemoryStore`.

use std::time::Duration;

use serde_json::json;
use softcache_memory::{MemoryStore, MemoryStoreBuilder};
use softcache_ports::Store;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[test]
fn read_missing_key_returns_none() {
    block_on(async {
        let store = MemoryStore::new();
        assert_eq!(store.read("missing").await.expect("read failed"), None);
    });
}

#[test]
fn write_then_read_returns_raw_value() {
    block_on(async {
        let store = MemoryStore::new();
        let raw = json!({"name": "beach", "temps": [18, 19]});

        assert!(store.write("k", raw.clone()).await.expect("write failed"));
        assert_eq!(store.read("k").await.expect("read failed"), Some(raw));
        assert!(store.contains_key("k"));
    });
}

#[test]
fn identical_write_is_a_no_op() {
    block_on(async {
        let store = MemoryStore::new();

        assert!(store.write("k", json!("v")).await.expect("write failed"));
        assert!(!store.write("k", json!("v")).await.expect("write failed"));
        assert!(store.write("k", json!("w")).await.expect("write failed"));
        assert_eq!(store.read("k").await.expect("read failed"), Some(json!("w")));
    });
}

#[test]
fn remove_reports_whether_key_existed() {
    block_on(async {
        let store = MemoryStore::new();
        store.write("k", json!(1)).await.expect("write failed");

        assert!(store.remove("k").await.expect("remove failed"));
        assert!(!store.remove("k").await.expect("remove failed"));
        assert_eq!(store.read("k").await.expect("read failed"), None);
    });
}

#[test]
fn clones_share_state() {
    block_on(async {
        let store = MemoryStore::with_capacity(100);
        let clone = store.clone();
        store.write("k", json!(true)).await.expect("write failed");

        assert_eq!(clone.read("k").await.expect("read failed"), Some(json!(true)));
    });
}

#[test]
fn configured_store_is_usable() {
    block_on(async {
        let store = MemoryStoreBuilder::new()
            .max_capacity(10)
            .initial_capacity(4)
            .time_to_live(Duration::from_secs(3600))
            .name("test")
            .build();

        store.write("k", json!(null)).await.expect("write failed");
        assert_eq!(store.read("k").await.expect("read failed"), Some(json!(null)));
    });
}
