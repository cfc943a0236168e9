// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Telemetry configuration collected by the builder.

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Meter, MeterProvider};

use crate::telemetry::SoftTelemetry;

/// Which telemetry sinks a soft cache reports to.
///
/// Everything is disabled until switched on through the builder.
#[derive(Clone, Debug, Default)]
pub(crate) struct TelemetryConfig {
    #[cfg(any(feature = "logs", test))]
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<Meter>,
}

impl TelemetryConfig {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Emits a structured `tracing` event for every activity.
    #[cfg(any(feature = "logs", test))]
    #[must_use]
    pub(crate) fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Counts and times every activity with a meter from `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub(crate) fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(crate::telemetry::metrics::create_meter(provider));
        self
    }

    pub(crate) fn build(self) -> SoftTelemetry {
        #[cfg(any(feature = "metrics", test))]
        let (event_counter, operation_duration) = {
            use crate::telemetry::metrics::{create_event_counter, create_operation_duration_histogram};
            (
                self.meter.as_ref().map(create_event_counter),
                self.meter.as_ref().map(create_operation_duration_histogram),
            )
        };

        SoftTelemetry {
            #[cfg(any(feature = "logs", test))]
            logs_enabled: self.logs_enabled,
            #[cfg(any(feature = "metrics", test))]
            event_counter,
            #[cfg(any(feature = "metrics", test))]
            operation_duration,
        }
    }
}
