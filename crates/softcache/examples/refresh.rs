// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Serve stale prices while a single refresh is queued, then drain the queue.
//! Time is driven manually so the expiration boundaries are easy to follow.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use softcache::{Refresher, SoftCache};
use tick::ClockControl;

const TTL: Duration = Duration::from_secs(30);

fn main() {
    futures::executor::block_on(run());
}

async fn run() {
    let control = ClockControl::new();
    let cache = SoftCache::builder(control.to_clock())
        .name("prices")
        .memory()
        .memory_scheduler()
        .on_refresh_scheduled(|key, entry| println!("refresh queued for {key} as {}", entry.task_id()))
        .build();

    // Stands in for a slow upstream service.
    let upstream_calls = Arc::new(AtomicU32::new(0));
    let calls = Arc::clone(&upstream_calls);
    let refresher = Refresher::new(cache.clone()).register("reprice", move |request| {
        let version = calls.fetch_add(1, Ordering::Relaxed) + 2;
        async move {
            let price = format!("{}@v{version}", request.key());
            request.entry().set(&price, TTL).await;
        }
    });

    let entry = cache.entry("EUR").with_task_id("reprice");
    entry.set("EUR@v1", TTL).await;
    println!("fresh: {:?}", entry.get::<String>().await);

    control.advance(TTL);

    // Both reads return the old price; only the first one queues work.
    println!("stale: {:?}", entry.get::<String>().await);
    println!("stale: {:?}", entry.get::<String>().await);
    println!("queued tasks: {}", cache.scheduler().len());

    let ran = refresher.run_due(cache.scheduler()).await;
    println!("refreshes run: {ran} (upstream calls: {})", upstream_calls.load(Ordering::Relaxed));
    println!("fresh: {:?}", entry.get::<String>().await);
}
