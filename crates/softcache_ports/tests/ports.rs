// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for implementing the `Store` and `Scheduler` ports.

use std::{collections::HashMap, sync::Mutex, time::SystemTime};

use serde_json::{Value, json};
use softcache_ports::{Error, ScheduledTask, Scheduler, Store};

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

/// Store that treats writing an identical value as a no-op.
struct DedupStore {
    data: Mutex<HashMap<String, Value>>,
}

impl Store for DedupStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.data.lock().expect("lock poisoned").get(key).cloned())
    }

    async fn write(&self, key: &str, raw: Value) -> Result<bool, Error> {
        let mut data = self.data.lock().expect("lock poisoned");
        if data.get(key) == Some(&raw) {
            return Ok(false);
        }
        data.insert(key.to_string(), raw);
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool, Error> {
        Ok(self.data.lock().expect("lock poisoned").remove(key).is_some())
    }
}

/// Scheduler that is always down.
struct Unavailable;

impl Scheduler for Unavailable {
    async fn enqueue(&self, _task_id: &str, _run_at: SystemTime, _args: &[Value]) -> Result<(), Error> {
        Err(Error::from_message("scheduler unavailable"))
    }

    async fn find_scheduled(&self, _task_id: &str, _args: &[Value]) -> Result<Option<SystemTime>, Error> {
        Err(Error::from_message("scheduler unavailable"))
    }

    async fn cancel(&self, _task_id: &str, _run_at: SystemTime, _args: &[Value]) -> Result<(), Error> {
        Err(Error::from_message("scheduler unavailable"))
    }
}

#[test]
fn store_identical_write_reports_false() {
    block_on(async {
        let store = DedupStore {
            data: Mutex::new(HashMap::new()),
        };

        assert!(store.write("k", json!({"a": 1})).await.expect("write failed"));
        assert!(!store.write("k", json!({"a": 1})).await.expect("write failed"));
        assert!(store.write("k", json!({"a": 2})).await.expect("write failed"));
    });
}

#[test]
fn store_read_after_remove_is_none() {
    block_on(async {
        let store = DedupStore {
            data: Mutex::new(HashMap::new()),
        };
        store.write("k", json!("v")).await.expect("write failed");

        assert!(store.remove("k").await.expect("remove failed"));
        assert_eq!(store.read("k").await.expect("read failed"), None);
        assert!(!store.remove("k").await.expect("remove failed"));
    });
}

#[test]
fn scheduler_errors_carry_message() {
    block_on(async {
        let err = Unavailable
            .enqueue("t", SystemTime::UNIX_EPOCH, &[json!("k")])
            .await
            .expect_err("enqueue should fail");
        assert!(err.to_string().contains("scheduler unavailable"));
    });
}

#[test]
fn scheduled_task_equality_includes_run_at() {
    let a = ScheduledTask::new("t", SystemTime::UNIX_EPOCH, vec![json!("k")]);
    let b = ScheduledTask::new("t", SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1), vec![json!("k")]);

    assert_ne!(a, b);
    assert!(b.matches("t", &[json!("k")]));
}
