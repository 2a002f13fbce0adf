//! Latency of like-count reads, recorded in milliseconds.

use opentelemetry::{
    InstrumentationScope,
    metrics::{Histogram, Meter, MeterProvider},
};
use std::time::Instant;

const METER_NAME: &str = "postboard";
const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const LIKES_LATENCY_NAME: &str = "likes_latency";
const LIKES_LATENCY_BOUNDARIES_MS: [f64; 11] = [
    0.0, 20.0, 40.0, 60.0, 80.0, 100.0, 120.0, 140.0, 160.0, 180.0, 200.0,
];

pub fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(VERSION)
            .build(),
    )
}

/// Histogram of like-count round trips; cheap to clone, clones record into the same instrument.
#[derive(Clone, Debug)]
pub struct LikesLatency(Histogram<f64>);

impl LikesLatency {
    #[must_use]
    pub fn new(meter: &Meter) -> Self {
        let histogram = meter
            .f64_histogram(LIKES_LATENCY_NAME)
            .with_description("Duration of like count reads")
            .with_unit("ms")
            .with_boundaries(LIKES_LATENCY_BOUNDARIES_MS.to_vec())
            .build();

        Self(histogram)
    }

    pub fn record_since(&self, start: Instant) {
        self.0.record(start.elapsed().as_secs_f64() * 1000.0, &[]);
    }
}

#[cfg(test)]
pub mod testing {
    use crate::listing::metrics::{LIKES_LATENCY_NAME, LikesLatency, create_meter};
    use opentelemetry_sdk::metrics::{
        InMemoryMetricExporter, SdkMeterProvider,
        data::{AggregatedMetrics, MetricData, ResourceMetrics, ScopeMetrics},
    };

    /// Collects everything recorded through [`MetricTester::likes_latency`] in memory.
    #[derive(Debug)]
    pub struct MetricTester {
        exporter: InMemoryMetricExporter,
        provider: SdkMeterProvider,
    }

    impl MetricTester {
        pub fn new() -> Self {
            let exporter = InMemoryMetricExporter::default();

            Self {
                provider: SdkMeterProvider::builder()
                    .with_periodic_exporter(exporter.clone())
                    .build(),
                exporter,
            }
        }

        pub fn likes_latency(&self) -> LikesLatency {
            LikesLatency::new(&create_meter(&self.provider))
        }

        /// Number of like-count reads recorded so far.
        pub fn recorded_reads(&self) -> u64 {
            self.provider.force_flush().unwrap();

            self.exporter
                .get_finished_metrics()
                .unwrap()
                .iter()
                .flat_map(ResourceMetrics::scope_metrics)
                .flat_map(ScopeMetrics::metrics)
                .filter(|metric| metric.name() == LIKES_LATENCY_NAME)
                .map(|metric| match metric.data() {
                    AggregatedMetrics::F64(MetricData::Histogram(histogram)) => histogram
                        .data_points()
                        .map(|point| point.count())
                        .sum::<u64>(),
                    _ => panic!("{LIKES_LATENCY_NAME} is not an f64 histogram"),
                })
                .max()
                .unwrap_or(0)
        }
    }

    /// Latency recorded into a provider without readers.
    pub fn discarded_latency() -> LikesLatency {
        LikesLatency::new(&create_meter(&SdkMeterProvider::builder().build()))
    }
}
