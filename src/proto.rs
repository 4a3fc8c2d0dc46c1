//! Emitted metric schema.
//!
//! Shaped after the OTel metrics data model the same way
//! `downstream::opentelemetry_downstream` maps goodmetrics aggregations into
//! `opentelemetry::metrics::v1` types, but these are plain value types with no
//! `prost` derive: wire encoding is the host's exporter's job, not ours.

use crate::span::AttributeValue;

/// Whether a data point reports a running total or an increment since the last emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregationTemporality {
    /// Each data point is the total since `start_time_unix_nano`.
    Cumulative,
    /// Each data point is the increment since the previous emission.
    Delta,
}

/// A label attached to a metric data point or a resource.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    /// Label name.
    pub key: String,
    /// Label value.
    pub value: AttributeValue,
}

impl KeyValue {
    /// Build a `KeyValue` from any attribute-value-like pair.
    pub fn new(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Identifies the code that produced a scope of metrics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstrumentationScope {
    /// Scope name.
    pub name: String,
}

/// The resource (service instance) a group of metrics describes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    /// Resource-level labels (e.g. `service.name`).
    pub attributes: Vec<KeyValue>,
}

/// A single sample tied back to the trace that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Exemplar {
    /// Trace id the sample came from.
    pub trace_id: String,
    /// The recorded value (milliseconds, for the latency histogram).
    pub value: f64,
    /// Timestamp this exemplar was recorded at, nanoseconds since epoch.
    pub time_unix_nano: u64,
}

/// One data point of a monotonic sum.
#[derive(Clone, Debug, PartialEq)]
pub struct NumberDataPoint {
    /// Per-data-point labels.
    pub attributes: Vec<KeyValue>,
    /// Window start, nanoseconds since epoch.
    pub start_time_unix_nano: u64,
    /// Emission timestamp, nanoseconds since epoch.
    pub time_unix_nano: u64,
    /// The counter value.
    pub value: u64,
}

/// One data point of a histogram.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramDataPoint {
    /// Per-data-point labels.
    pub attributes: Vec<KeyValue>,
    /// Window start, nanoseconds since epoch.
    pub start_time_unix_nano: u64,
    /// Emission timestamp, nanoseconds since epoch.
    pub time_unix_nano: u64,
    /// Number of samples folded into this data point.
    pub count: u64,
    /// Sum of all sample values (milliseconds).
    pub sum: f64,
    /// Upper bound of each bucket, ascending, terminating in a catch-all.
    pub explicit_bounds: Vec<f64>,
    /// Per-bucket sample counts; `bucket_counts.len() == explicit_bounds.len()`.
    pub bucket_counts: Vec<u64>,
    /// Representative samples for this window.
    pub exemplars: Vec<Exemplar>,
}

/// A monotonic counter metric.
#[derive(Clone, Debug, PartialEq)]
pub struct Sum {
    /// Temporality of the data points below.
    pub aggregation_temporality: AggregationTemporality,
    /// Whether successive values can only increase (always true for `calls_total`).
    pub is_monotonic: bool,
    /// The data points.
    pub data_points: Vec<NumberDataPoint>,
}

/// A histogram metric.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    /// Temporality of the data points below.
    pub aggregation_temporality: AggregationTemporality,
    /// The data points.
    pub data_points: Vec<HistogramDataPoint>,
}

/// The payload of one metric: its shape-specific data.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricData {
    /// A sum metric (`calls_total`).
    Sum(Sum),
    /// A histogram metric (`latency`).
    Histogram(Histogram),
}

/// One named metric.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    /// Metric name (`calls_total` or `latency`).
    pub name: String,
    /// Unit string (`"1"` for counts, `"ms"` for latency).
    pub unit: String,
    /// The metric's data.
    pub data: MetricData,
}

/// All metrics produced by one instrumentation scope, within one resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeMetrics {
    /// The producing scope.
    pub scope: InstrumentationScope,
    /// Its metrics.
    pub metrics: Vec<Metric>,
}

/// All scope-metrics groups belonging to one resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceMetrics {
    /// The described resource.
    pub resource: Resource,
    /// Its scope-metrics groups.
    pub scope_metrics: Vec<ScopeMetrics>,
}

/// The full emission for one `consume` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Resource-grouped metrics.
    pub resource_metrics: Vec<ResourceMetrics>,
}
