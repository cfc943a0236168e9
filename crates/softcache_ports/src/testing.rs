// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recording mocks for testing.
//!
//! [`MockStore`] and [`MockScheduler`] keep their state in memory, record every call, and
//! can be told to fail selected operations so error paths can be exercised.

use std::{collections::HashMap, sync::Arc, time::SystemTime};

use parking_lot::Mutex;
use serde_json::Value;

use crate::{Error, ScheduledTask, Scheduler, Store};

/// Recorded store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// A read of the given key.
    Read(String),
    /// A write of `raw` under `key`.
    Write {
        /// The key that was written.
        key: String,
        /// The raw value that was written.
        raw: Value,
    },
    /// A removal of the given key.
    Remove(String),
}

/// Recorded scheduler operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerOp {
    /// A task was enqueued.
    Enqueue(ScheduledTask),
    /// A lookup for a task with this id and arguments.
    FindScheduled {
        /// The task id looked up.
        task_id: String,
        /// The arguments looked up.
        args: Vec<Value>,
    },
    /// A task was cancelled.
    Cancel(ScheduledTask),
}

type FailPredicate<Op> = Box<dyn Fn(&Op) -> bool + Send + Sync>;

struct Recorder<Op> {
    operations: Mutex<Vec<Op>>,
    fail_when: Mutex<Option<FailPredicate<Op>>>,
}

impl<Op: Clone> Recorder<Op> {
    fn new() -> Self {
        Self {
            operations: Mutex::new(Vec::new()),
            fail_when: Mutex::new(None),
        }
    }

    /// Records `op` and returns `true` if it should fail.
    fn record(&self, op: Op) -> bool {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);
        fail
    }
}

/// An in-memory [`Store`] that records operations and supports failure injection.
///
/// Every `write` is accepted and reports `true`; `remove` reports whether the key existed.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use softcache_ports::{Store, testing::{MockStore, StoreOp}};
///
/// # futures::executor::block_on(async {
/// let store = MockStore::new();
/// store.write("k", json!(1)).await.unwrap();
/// assert_eq!(store.read("k").await.unwrap(), Some(json!(1)));
///
/// store.fail_when(|op| matches!(op, StoreOp::Write { .. }));
/// assert!(store.write("k", json!(2)).await.is_err());
/// # });
/// ```
pub struct MockStore {
    data: Arc<Mutex<HashMap<String, Value>>>,
    recorder: Arc<Recorder<StoreOp>>,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("data", &self.data)
            .field("operations", &self.recorder.operations)
            .field("fail_when", &self.recorder.fail_when.lock().is_some())
            .finish()
    }
}

impl Clone for MockStore {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            recorder: Arc::clone(&self.recorder),
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Creates an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(HashMap::new())
    }

    /// Creates a mock store with pre-populated raw values.
    #[must_use]
    pub fn with_data(data: HashMap<String, Value>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            recorder: Arc::new(Recorder::new()),
        }
    }

    /// Returns the raw value currently stored under `key`, bypassing recording.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Sets a predicate that decides which operations fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.recorder.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate.
    pub fn clear_failures(&self) {
        *self.recorder.fail_when.lock() = None;
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.recorder.operations.lock().clone()
    }

    /// Returns the number of recorded writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.recorder
            .operations
            .lock()
            .iter()
            .filter(|op| matches!(op, StoreOp::Write { .. }))
            .count()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.recorder.operations.lock().clear();
    }
}

impl Store for MockStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, Error> {
        if self.recorder.record(StoreOp::Read(key.to_string())) {
            return Err(Error::caused_by("mock: read failed"));
        }
        Ok(self.data.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, raw: Value) -> Result<bool, Error> {
        let op = StoreOp::Write {
            key: key.to_string(),
            raw: raw.clone(),
        };
        if self.recorder.record(op) {
            return Err(Error::caused_by("mock: write failed"));
        }
        self.data.lock().insert(key.to_string(), raw);
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool, Error> {
        if self.recorder.record(StoreOp::Remove(key.to_string())) {
            return Err(Error::caused_by("mock: remove failed"));
        }
        Ok(self.data.lock().remove(key).is_some())
    }
}

/// An in-memory [`Scheduler`] that records operations and supports failure injection.
///
/// Unlike a production scheduler it never deduplicates: every successful `enqueue` adds a
/// pending task, which makes it easy to count how often scheduling happened.
///
/// # Examples
///
/// ```
/// use std::time::SystemTime;
///
/// use serde_json::json;
/// use softcache_ports::{Scheduler, testing::MockScheduler};
///
/// # futures::executor::block_on(async {
/// let scheduler = MockScheduler::new();
/// scheduler.enqueue("refresh", SystemTime::UNIX_EPOCH, &[json!("k")]).await.unwrap();
///
/// let found = scheduler.find_scheduled("refresh", &[json!("k")]).await.unwrap();
/// assert_eq!(found, Some(SystemTime::UNIX_EPOCH));
/// assert_eq!(scheduler.enqueued().len(), 1);
/// # });
/// ```
pub struct MockScheduler {
    pending: Arc<Mutex<Vec<ScheduledTask>>>,
    accepted: Arc<Mutex<Vec<ScheduledTask>>>,
    recorder: Arc<Recorder<SchedulerOp>>,
}

impl std::fmt::Debug for MockScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockScheduler")
            .field("pending", &self.pending)
            .field("operations", &self.recorder.operations)
            .field("fail_when", &self.recorder.fail_when.lock().is_some())
            .finish()
    }
}

impl Clone for MockScheduler {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
            accepted: Arc::clone(&self.accepted),
            recorder: Arc::clone(&self.recorder),
        }
    }
}

impl Default for MockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScheduler {
    /// Creates a scheduler with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::new())),
            accepted: Arc::new(Mutex::new(Vec::new())),
            recorder: Arc::new(Recorder::new()),
        }
    }

    /// Returns the tasks currently pending.
    #[must_use]
    pub fn pending(&self) -> Vec<ScheduledTask> {
        self.pending.lock().clone()
    }

    /// Forgets all pending tasks, as if they had run or been lost.
    pub fn clear_pending(&self) {
        self.pending.lock().clear();
    }

    /// Returns every task that was successfully enqueued, in order.
    #[must_use]
    pub fn enqueued(&self) -> Vec<ScheduledTask> {
        self.accepted.lock().clone()
    }

    /// Sets a predicate that decides which operations fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&SchedulerOp) -> bool + Send + Sync + 'static,
    {
        *self.recorder.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate.
    pub fn clear_failures(&self) {
        *self.recorder.fail_when.lock() = None;
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<SchedulerOp> {
        self.recorder.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.recorder.operations.lock().clear();
    }
}

impl Scheduler for MockScheduler {
    async fn enqueue(&self, task_id: &str, run_at: SystemTime, args: &[Value]) -> Result<(), Error> {
        let task = ScheduledTask::new(task_id, run_at, args.to_vec());
        if self.recorder.record(SchedulerOp::Enqueue(task.clone())) {
            return Err(Error::caused_by("mock: enqueue failed"));
        }
        self.accepted.lock().push(task.clone());
        self.pending.lock().push(task);
        Ok(())
    }

    async fn find_scheduled(&self, task_id: &str, args: &[Value]) -> Result<Option<SystemTime>, Error> {
        let op = SchedulerOp::FindScheduled {
            task_id: task_id.to_string(),
            args: args.to_vec(),
        };
        if self.recorder.record(op) {
            return Err(Error::caused_by("mock: find_scheduled failed"));
        }
        Ok(self
            .pending
            .lock()
            .iter()
            .find(|task| task.matches(task_id, args))
            .map(|task| task.run_at))
    }

    async fn cancel(&self, task_id: &str, run_at: SystemTime, args: &[Value]) -> Result<(), Error> {
        let task = ScheduledTask::new(task_id, run_at, args.to_vec());
        if self.recorder.record(SchedulerOp::Cancel(task.clone())) {
            return Err(Error::caused_by("mock: cancel failed"));
        }
        self.pending.lock().retain(|pending| *pending != task);
        Ok(())
    }
}
