// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The deferred task scheduling port.

use std::time::SystemTime;

use serde_json::Value;

use crate::Error;

/// A deferred task as seen by a [`Scheduler`].
///
/// Tasks are identified by their `task_id` and their ordered `args`; two tasks with the
/// same id and equal arguments are the same task for [`Scheduler::find_scheduled`] and
/// [`Scheduler::cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    /// Name under which the task callback is registered.
    pub task_id: String,
    /// When the task should run.
    pub run_at: SystemTime,
    /// Ordered arguments handed to the callback.
    pub args: Vec<Value>,
}

impl ScheduledTask {
    /// Creates a new task description.
    #[must_use]
    pub fn new(task_id: impl Into<String>, run_at: SystemTime, args: Vec<Value>) -> Self {
        Self {
            task_id: task_id.into(),
            run_at,
            args,
        }
    }

    /// Returns `true` if this task has the given identity.
    #[must_use]
    pub fn matches(&self, task_id: &str, args: &[Value]) -> bool {
        self.task_id == task_id && self.args == args
    }
}

/// A time-driven job runner that executes registered callbacks at a given time.
///
/// The soft cache only needs to enqueue work, check whether matching work is pending,
/// and cancel it. Running the work is entirely up to the implementation.
pub trait Scheduler: Send + Sync {
    /// Enqueues `task_id` to run at `run_at` with `args`.
    fn enqueue(&self, task_id: &str, run_at: SystemTime, args: &[Value]) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns the run time of a pending task with exactly this id and arguments.
    fn find_scheduled(&self, task_id: &str, args: &[Value]) -> impl Future<Output = Result<Option<SystemTime>, Error>> + Send;

    /// Cancels the pending task with this id, run time and arguments.
    fn cancel(&self, task_id: &str, run_at: SystemTime, args: &[Value]) -> impl Future<Output = Result<(), Error>> + Send;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn matches_requires_same_id_and_args() {
        let task = ScheduledTask::new("transient_refresh_k", SystemTime::UNIX_EPOCH, vec![json!("k"), json!(1)]);

        assert!(task.matches("transient_refresh_k", &[json!("k"), json!(1)]));
        assert!(!task.matches("transient_refresh_k", &[json!("k")]));
        assert!(!task.matches("transient_refresh_k", &[json!(1), json!("k")]));
        assert!(!task.matches("other", &[json!("k"), json!(1)]));
    }
}
