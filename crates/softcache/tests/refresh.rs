// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(feature = "memory")]

//! End-to-end refresh cycles with the in-memory store and scheduler.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};

use serde_json::json;
use softcache::{Lookup, MemoryScheduler, MemoryStore, Refresher, ScheduledTask, SoftCache, Store};
use tick::ClockControl;

type TestCache = SoftCache<MemoryStore, MemoryScheduler>;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn setup() -> (ClockControl, TestCache) {
    let control = ClockControl::new_at(SystemTime::UNIX_EPOCH);
    let cache = SoftCache::builder(control.to_clock())
        .memory()
        .memory_scheduler()
        .build();
    (control, cache)
}

#[test]
fn handler_stores_fresh_value() {
    block_on(async {
        let (control, cache) = setup();
        let refresher = Refresher::new(cache.clone()).register("transient_refresh_price", |request| async move {
            assert_eq!(request.key(), "price");
            request.entry().set(&11, Duration::from_secs(60)).await;
        });

        cache.set("price", &10, Duration::from_secs(60)).await;
        control.advance(Duration::from_secs(60));

        assert_eq!(cache.get::<i32>("price").await, Lookup::Stale(10));
        assert_eq!(refresher.run_due(cache.scheduler()).await, 1);
        assert!(cache.scheduler().is_empty());
        assert_eq!(cache.get::<i32>("price").await, Lookup::Hit(11));
    });
}

#[test]
fn failing_handler_reschedules_itself() {
    block_on(async {
        let (control, cache) = setup();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let refresher = Refresher::new(cache.clone()).register("reload", move |request| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    request.entry().schedule_refresh().await;
                } else {
                    request.entry().set("fresh", Duration::from_secs(60)).await;
                }
            }
        });

        cache
            .entry("k")
            .with_task_id("reload")
            .set("old", Duration::from_secs(60))
            .await;
        control.advance(Duration::from_secs(60));
        assert!(cache.get::<String>("k").await.is_stale());

        // The retry enqueued by the handler waits for the next pass.
        assert_eq!(refresher.run_due(cache.scheduler()).await, 1);
        assert_eq!(cache.scheduler().len(), 1);
        assert!(cache.get::<String>("k").await.is_stale());

        assert_eq!(refresher.run_due(cache.scheduler()).await, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get::<String>("k").await, Lookup::Hit("fresh".to_string()));
    });
}

#[test]
fn task_args_reach_handler() {
    block_on(async {
        let (control, cache) = setup();
        let refresher = Refresher::new(cache.clone()).register("fetch_user", |request| async move {
            let tenant = request.args()[0].as_str().unwrap_or_default().to_string();
            request.entry().set(&format!("{tenant}/{}", request.key()), Duration::from_secs(60)).await;
        });

        let entry = cache
            .entry("alice")
            .with_task_id("fetch_user")
            .with_task_args([json!("contoso")]);
        entry.set("stale", Duration::from_secs(1)).await;
        control.advance(Duration::from_secs(1));
        entry.get::<String>().await;

        assert_eq!(refresher.run_due(cache.scheduler()).await, 1);
        assert_eq!(entry.get::<String>().await, Lookup::Hit("contoso/alice".to_string()));
    });
}

#[test]
fn unhandled_tasks_are_dropped() {
    block_on(async {
        let (control, cache) = setup();
        let refresher = Refresher::new(cache.clone());

        cache.set("k", "v", Duration::from_secs(1)).await;
        control.advance(Duration::from_secs(1));
        cache.get::<String>("k").await;

        assert_eq!(refresher.run_due(cache.scheduler()).await, 0);
        assert!(cache.scheduler().is_empty());
    });
}

#[test]
fn future_tasks_are_not_run() {
    block_on(async {
        let (control, cache) = setup();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let refresher = Refresher::new(cache.clone()).register("later", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        });

        let run_at = SystemTime::UNIX_EPOCH + Duration::from_secs(30);
        softcache::Scheduler::enqueue(cache.scheduler(), "later", run_at, &[json!("k")])
            .await
            .expect("enqueue failed");

        assert_eq!(refresher.run_due(cache.scheduler()).await, 0);
        control.advance(Duration::from_secs(30));
        assert_eq!(refresher.run_due(cache.scheduler()).await, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn racing_readers_collapse_into_one_task() {
    block_on(async {
        let (control, cache) = setup();
        cache.set("k", "v", Duration::from_secs(5)).await;
        control.advance(Duration::from_secs(5));

        // Both readers saw the entry before either marked it as loading.
        let before = cache.store().read("k").await.expect("read failed").expect("missing");
        cache.get::<String>("k").await;
        cache.store().write("k", before).await.expect("write failed");
        cache.get::<String>("k").await;

        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(5);
        assert_eq!(
            cache.scheduler().pending(),
            vec![ScheduledTask::new("transient_refresh_k", now, vec![json!("k")])]
        );
    });
}

#[test]
fn delete_drops_queued_refresh() {
    block_on(async {
        let (control, cache) = setup();
        cache.set("k", "v", Duration::from_secs(5)).await;
        control.advance(Duration::from_secs(5));
        cache.get::<String>("k").await;
        assert_eq!(cache.scheduler().len(), 1);

        assert!(cache.delete("k").await);
        assert!(cache.scheduler().is_empty());
        assert!(!cache.store().contains_key("k"));
        assert!(!cache.delete("k").await);
    });
}

#[test]
fn identical_bare_write_is_rejected() {
    block_on(async {
        let (_, cache) = setup();

        assert!(cache.set("k", "same", Duration::ZERO).await);
        assert!(!cache.set("k", "same", Duration::ZERO).await);
        assert!(cache.set("k", "other", Duration::ZERO).await);
    });
}

#[test]
fn enveloped_rewrite_within_same_second_is_accepted() {
    block_on(async {
        let (control, cache) = setup();

        assert!(cache.set("k", "same", Duration::from_secs(10)).await);
        assert!(cache.set("k", "same", Duration::from_secs(10)).await);

        control.advance(Duration::from_millis(300));
        assert!(cache.set("k", "same", Duration::from_secs(10)).await);
        assert_eq!(cache.get::<String>("k").await, Lookup::Hit("same".to_string()));
    });
}

#[test]
fn enveloped_writes_are_accepted_as_expiration_moves() {
    block_on(async {
        let (control, cache) = setup();

        assert!(cache.set("k", "same", Duration::from_secs(10)).await);
        control.advance(Duration::from_secs(1));
        assert!(cache.set("k", "same", Duration::from_secs(10)).await);
    });
}

#[test]
fn delete_through_cache_drops_custom_refresh() {
    block_on(async {
        let (control, cache) = setup();
        let refresher = Refresher::new(cache.clone()).register("reload", |request| async move {
            request.entry().set("resurrected", Duration::from_secs(60)).await;
        });

        let entry = cache.entry("k").with_task_id("reload").with_task_args([json!(1)]);
        entry.set("v", Duration::from_secs(10)).await;
        control.advance(Duration::from_secs(10));
        assert!(cache.get::<String>("k").await.is_stale());
        assert_eq!(cache.scheduler().len(), 1);

        assert!(cache.delete("k").await);
        assert!(cache.scheduler().is_empty());

        assert_eq!(refresher.run_due(cache.scheduler()).await, 0);
        assert_eq!(cache.get::<String>("k").await, Lookup::Miss);
    });
}
