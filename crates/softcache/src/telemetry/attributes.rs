// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Attribute and log field names.
//!
//! Metric points carry only the cache name, the operation and the activity, each drawn from a
//! small fixed set. Keys are unbounded, so they are written to log events only; a key attribute
//! would create one time series per cached key.

#[cfg(any(feature = "metrics", test))]
use opentelemetry::KeyValue;

#[cfg(any(feature = "metrics", test))]
use super::{SoftActivity, SoftOperation};

#[cfg(any(feature = "metrics", test))]
pub(crate) const SOFTCACHE_NAME: &str = "softcache.name";

#[cfg(any(feature = "metrics", test))]
pub(crate) const SOFTCACHE_OPERATION_NAME: &str = "softcache.operation";

#[cfg(any(feature = "metrics", test))]
pub(crate) const SOFTCACHE_ACTIVITY_NAME: &str = "softcache.activity";

// Log-only fields. `emit` spells these out as `tracing` field names, which must be literals.

#[cfg(test)]
pub(crate) const SOFTCACHE_EVENT_NAME: &str = "softcache.event";

#[cfg(test)]
pub(crate) const SOFTCACHE_KEY_NAME: &str = "softcache.key";

#[cfg(test)]
pub(crate) const SOFTCACHE_DURATION_NAME: &str = "softcache.duration_ns";

/// Attributes attached to every metric point of one activity.
#[cfg(any(feature = "metrics", test))]
pub(crate) fn metric_attributes(name: &'static str, operation: SoftOperation, activity: SoftActivity) -> [KeyValue; 3] {
    [
        KeyValue::new(SOFTCACHE_NAME, name),
        KeyValue::new(SOFTCACHE_OPERATION_NAME, operation.as_str()),
        KeyValue::new(SOFTCACHE_ACTIVITY_NAME, activity.as_str()),
    ]
}
