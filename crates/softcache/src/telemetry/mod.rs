// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Soft cache telemetry integration with OpenTelemetry.
//!
//! Every controller operation reports one activity. With the `logs` feature the activity is
//! emitted as a structured `tracing` event, with the `metrics` feature it is counted and timed
//! through an OpenTelemetry meter.

use std::time::Duration;

#[cfg(any(feature = "logs", test))]
use opentelemetry::logs::Severity;
#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Counter, Histogram};

pub(crate) mod attributes;
pub(crate) mod config;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SoftOperation {
    Get,
    Set,
    Delete,
    Refresh,
    Dispatch,
}

impl SoftOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "softcache.get",
            Self::Set => "softcache.set",
            Self::Delete => "softcache.delete",
            Self::Refresh => "softcache.refresh",
            Self::Dispatch => "softcache.dispatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SoftActivity {
    Hit,
    Miss,
    Bare,
    Stale,
    RefreshScheduled,
    RefreshPending,
    RefreshRecovered,
    Stored,
    StoreRejected,
    Deleted,
    TaskCancelled,
    DecodeFailed,
    EncodeFailed,
    StoreError,
    SchedulerError,
    Dispatched,
    UnhandledTask,
}

impl SoftActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "softcache.hit",
            Self::Miss => "softcache.miss",
            Self::Bare => "softcache.bare",
            Self::Stale => "softcache.stale",
            Self::RefreshScheduled => "softcache.refresh_scheduled",
            Self::RefreshPending => "softcache.refresh_pending",
            Self::RefreshRecovered => "softcache.refresh_recovered",
            Self::Stored => "softcache.stored",
            Self::StoreRejected => "softcache.store_rejected",
            Self::Deleted => "softcache.deleted",
            Self::TaskCancelled => "softcache.task_cancelled",
            Self::DecodeFailed => "softcache.decode_failed",
            Self::EncodeFailed => "softcache.encode_failed",
            Self::StoreError => "softcache.store_error",
            Self::SchedulerError => "softcache.scheduler_error",
            Self::Dispatched => "softcache.dispatched",
            Self::UnhandledTask => "softcache.unhandled_task",
        }
    }

    #[cfg(any(feature = "logs", test))]
    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::Bare | Self::RefreshPending | Self::Stored | Self::Dispatched => Severity::Debug,
            Self::Stale
            | Self::RefreshScheduled
            | Self::RefreshRecovered
            | Self::StoreRejected
            | Self::Deleted
            | Self::TaskCancelled => Severity::Info,
            Self::DecodeFailed | Self::EncodeFailed | Self::UnhandledTask => Severity::Warn,
            Self::StoreError | Self::SchedulerError => Severity::Error,
        }
    }
}

/// Records soft cache activities as logs and metrics.
#[derive(Clone, Debug, Default)]
pub(crate) struct SoftTelemetry {
    #[cfg(any(feature = "logs", test))]
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
    #[cfg(any(feature = "metrics", test))]
    operation_duration: Option<Histogram<f64>>,
}

impl SoftTelemetry {
    /// Records one activity of an operation on `key`.
    ///
    /// Keys are only written to logs, see [`attributes`].
    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(unused_variables, reason = "telemetry is compiled out")
    )]
    #[cfg_attr(
        all(feature = "metrics", not(any(feature = "logs", test))),
        expect(unused_variables, reason = "keys only go to logs")
    )]
    #[inline]
    pub(crate) fn record(&self, name: &'static str, operation: SoftOperation, activity: SoftActivity, key: &str, duration: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        {
            let attrs = attributes::metric_attributes(name, operation, activity);

            if let Some(c) = &self.event_counter {
                c.add(1, &attrs);
            }

            if let (Some(d), Some(h)) = (duration, &self.operation_duration) {
                h.record(d.as_secs_f64(), &attrs);
            }
        }

        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            Self::emit(name, operation, activity, key, duration);
        }
    }

    #[cfg(any(feature = "logs", test))]
    fn emit(name: &str, operation: SoftOperation, activity: SoftActivity, key: &str, duration: Option<Duration>) {
        let op = operation.as_str();
        let ac = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // Tracing level must be constant, so a macro selects it per severity.
        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    softcache.name = name,
                    softcache.operation = op,
                    softcache.activity = ac,
                    softcache.key = key,
                    softcache.duration_ns = ?duration_ns,
                    "softcache.event"
                )
            };
        }

        match activity.severity() {
            Severity::Error => emit_event!(error),
            Severity::Warn => emit_event!(warn),
            Severity::Info => emit_event!(info),
            Severity::Debug => emit_event!(debug),
            _ => {}
        }
    }
}
