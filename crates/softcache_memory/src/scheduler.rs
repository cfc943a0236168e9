// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory scheduler for deferred refresh tasks.

use std::{sync::Arc, time::SystemTime};

use parking_lot::Mutex;
use serde_json::Value;
use softcache_ports::{Error, ScheduledTask, Scheduler};

/// A [`Scheduler`] that keeps pending tasks in process memory.
///
/// Enqueuing a task that is already pending with the same id, arguments and run time is a
/// no-op, so concurrent callers racing to schedule the same refresh collapse into one task.
/// The scheduler never runs anything on its own: whoever drives it calls
/// [`take_due`](Self::take_due) and executes what comes back.
///
/// # Examples
///
/// ```
/// use std::time::SystemTime;
///
/// use serde_json::json;
/// use softcache_memory::MemoryScheduler;
/// use softcache_ports::Scheduler;
///
/// # futures::executor::block_on(async {
/// let scheduler = MemoryScheduler::new();
/// let now = SystemTime::UNIX_EPOCH;
///
/// scheduler.enqueue("refresh", now, &[json!("k")]).await?;
/// scheduler.enqueue("refresh", now, &[json!("k")]).await?;
/// assert_eq!(scheduler.len(), 1);
/// # Ok::<(), softcache_ports::Error>(())
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryScheduler {
    pending: Arc<Mutex<Vec<ScheduledTask>>>,
}

impl MemoryScheduler {
    /// Creates a scheduler with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Returns a snapshot of the pending tasks ordered by run time.
    #[must_use]
    pub fn pending(&self) -> Vec<ScheduledTask> {
        let mut tasks = self.pending.lock().clone();
        tasks.sort_by_key(|task| task.run_at);
        tasks
    }

    /// Removes and returns every task due at or before `now`, earliest first.
    pub fn take_due(&self, now: SystemTime) -> Vec<ScheduledTask> {
        let mut pending = self.pending.lock();
        let (mut due, rest): (Vec<_>, Vec<_>) = pending.drain(..).partition(|task| task.run_at <= now);
        *pending = rest;
        due.sort_by_key(|task| task.run_at);
        due
    }

    /// Drops every pending task.
    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}

impl Scheduler for MemoryScheduler {
    async fn enqueue(&self, task_id: &str, run_at: SystemTime, args: &[Value]) -> Result<(), Error> {
        let mut pending = self.pending.lock();
        let duplicate = pending.iter().any(|task| task.run_at == run_at && task.matches(task_id, args));
        if !duplicate {
            pending.push(ScheduledTask::new(task_id, run_at, args.to_vec()));
        }
        Ok(())
    }

    async fn find_scheduled(&self, task_id: &str, args: &[Value]) -> Result<Option<SystemTime>, Error> {
        Ok(self
            .pending
            .lock()
            .iter()
            .filter(|task| task.matches(task_id, args))
            .map(|task| task.run_at)
            .min())
    }

    async fn cancel(&self, task_id: &str, run_at: SystemTime, args: &[Value]) -> Result<(), Error> {
        self.pending
            .lock()
            .retain(|task| !(task.run_at == run_at && task.matches(task_id, args)));
        Ok(())
    }
}
