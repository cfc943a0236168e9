// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! OpenTelemetry instruments.
//!
//! One counter tallies activities and one histogram times whole operations. Both share the
//! attributes from [`metric_attributes`](super::attributes::metric_attributes), so a dashboard
//! can split either by activity, for example stale reads against refreshes actually scheduled.

use opentelemetry::{
    InstrumentationScope,
    metrics::{Counter, Histogram, Meter, MeterProvider},
};

const METER_NAME: &str = "softcache";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

pub(crate) const EVENT_COUNT_NAME: &str = "softcache.event.count";
pub(crate) const OPERATION_DURATION_NAME: &str = "softcache.operation.duration";

/// Creates the meter, scoped to this crate's version.
pub(crate) fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
}

/// Counts every recorded activity, including failures and misses.
pub(crate) fn create_event_counter(meter: &Meter) -> Counter<u64> {
    meter
        .u64_counter(EVENT_COUNT_NAME)
        .with_description("Soft cache activities, by operation and outcome")
        .with_unit("{event}")
        .build()
}

/// Times operations that report a duration. Refresh scheduling steps nested in a read do not.
pub(crate) fn create_operation_duration_histogram(meter: &Meter) -> Histogram<f64> {
    meter
        .f64_histogram(OPERATION_DURATION_NAME)
        .with_description("Duration of soft cache reads, writes, deletes and dispatches")
        .with_unit("s")
        .build()
}
