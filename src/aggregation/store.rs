//! Nested aggregation state: resource -> instrumentation library -> metric key.
//!
//! Call count and latency distribution are collapsed into one combined
//! struct per leaf so `sum(latency_buckets) == latency_count` holds by
//! construction instead of by convention across parallel maps.

use std::collections::HashMap;

/// The call count and latency distribution recorded for one `(resource,
/// library, metric)` tuple within the current emission window.
#[derive(Clone, Debug)]
pub struct MetricAggregate {
    /// Number of spans folded into this aggregate.
    pub call_count: u64,
    /// Sum of all recorded latencies, milliseconds.
    pub latency_sum_ms: f64,
    /// Count of latency samples (equal to `call_count` in this design, since
    /// every call produces exactly one latency sample).
    pub latency_count: u64,
    /// Per-bucket sample counts, indexed the same as the shared
    /// [`crate::histogram::HistogramBuckets`].
    pub latency_buckets: Vec<u64>,
}

impl MetricAggregate {
    fn new(bucket_count: usize) -> Self {
        Self {
            call_count: 0,
            latency_sum_ms: 0.0,
            latency_count: 0,
            latency_buckets: vec![0; bucket_count],
        }
    }

    fn record(&mut self, latency_ms: f64, bucket_index: usize) {
        self.call_count += 1;
        self.latency_sum_ms += latency_ms;
        self.latency_count += 1;
        self.latency_buckets[bucket_index] += 1;
    }
}

type MetricMap = HashMap<String, MetricAggregate>;
type LibraryMap = HashMap<String, MetricMap>;

/// The full nested aggregation state for one emission window.
#[derive(Default)]
pub struct AggregationStore {
    resources: HashMap<String, LibraryMap>,
}

impl AggregationStore {
    /// Build an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one span's latency sample into the `(resource_key,
    /// library_key, metric_key)` aggregate, creating it if needed.
    pub fn record(
        &mut self,
        resource_key: &str,
        library_key: &str,
        metric_key: &str,
        latency_ms: f64,
        bucket_index: usize,
        bucket_count: usize,
    ) {
        let libraries = self.resources.entry(resource_key.to_string()).or_default();
        let metrics = libraries.entry(library_key.to_string()).or_default();
        let aggregate = metrics
            .entry(metric_key.to_string())
            .or_insert_with(|| MetricAggregate::new(bucket_count));
        aggregate.record(latency_ms, bucket_index);
    }

    /// Look up the library map for a resource, if any spans were recorded
    /// under it this window.
    pub fn resource(&self, resource_key: &str) -> Option<&LibraryMap> {
        self.resources.get(resource_key)
    }

    /// Iterate all resource keys with recorded aggregates.
    pub fn resource_keys(&self) -> impl Iterator<Item = &String> {
        self.resources.keys()
    }

    /// Drop all aggregation state. Called at the end of a delta-temporality
    /// emission.
    pub fn reset_all(&mut self) {
        self.resources.clear();
    }
}
