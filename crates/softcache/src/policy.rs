// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recovery of refreshes that never completed.

use std::time::Duration;

/// Default time an entry may sit expired in the loading state before its refresh is considered lost.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Decides when an expired entry that is still marked as loading gets its refresh re-enqueued.
///
/// The first expired read of an entry always schedules a refresh. If that refresh never stores
/// a new value and is no longer known to the scheduler, the entry is stuck; the policy decides
/// how long to wait before scheduling again.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use softcache::RefreshPolicy;
///
/// // Re-enqueue once the entry has been expired for an hour (default)
/// let policy = RefreshPolicy::default();
///
/// // Re-enqueue after 1, 2, 4, ... minutes past expiration
/// let policy = RefreshPolicy::escalating_retry(Duration::from_secs(60));
///
/// // Never re-enqueue
/// let policy = RefreshPolicy::schedule_once();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy(PolicyType);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyType {
    GraceWindow(Duration),
    ScheduleOnce,
    EscalatingRetry(Duration),
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::grace_window(DEFAULT_GRACE_WINDOW)
    }
}

impl RefreshPolicy {
    /// Re-enqueues a stuck refresh once the entry has been expired for at least `window`.
    #[must_use]
    pub fn grace_window(window: Duration) -> Self {
        Self(PolicyType::GraceWindow(window))
    }

    /// Schedules only when an entry first goes stale and never recovers a stuck refresh.
    #[must_use]
    pub fn schedule_once() -> Self {
        Self(PolicyType::ScheduleOnce)
    }

    /// Re-enqueues a stuck refresh after `interval * 2^retries` past expiration.
    ///
    /// `retries` counts the recoveries since the value was last stored, so each lost refresh
    /// doubles the wait before the next one. An entry can override `interval` with
    /// [`SoftEntry::with_retry_interval`](crate::SoftEntry::with_retry_interval).
    #[must_use]
    pub fn escalating_retry(interval: Duration) -> Self {
        Self(PolicyType::EscalatingRetry(interval))
    }

    /// Returns `true` if an entry expired at `expiration` may be recovered at `now`.
    ///
    /// Both times are unix seconds. This only covers timing; the caller still checks that no
    /// refresh task is pending.
    pub(crate) fn recovery_due(self, expiration: u64, now: u64, retries: u32, interval_override: Option<Duration>) -> bool {
        let wait = match self.0 {
            PolicyType::ScheduleOnce => return false,
            PolicyType::GraceWindow(window) => whole_seconds(window),
            PolicyType::EscalatingRetry(interval) => {
                whole_seconds(interval_override.unwrap_or(interval)).saturating_mul(2_u64.saturating_pow(retries))
            }
        };

        expiration <= now.saturating_sub(wait)
    }
}

fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs().saturating_add(u64::from(duration.subsec_nanos() > 0))
}
