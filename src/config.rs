//! Validated configuration surface.

/// A configured extra label, resolved from span attributes, then resource
/// attributes, then an optional static default.
#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    /// Attribute name to look up.
    pub name: String,
    /// Value to substitute when the attribute is absent everywhere. `None`
    /// means "drop this dimension from the key/label set when absent", as
    /// distinct from `Some(String::new())` which substitutes the empty string.
    pub default: Option<String>,
}

impl Dimension {
    /// Build a dimension with no default (absent means dropped).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Build a dimension with a fallback value.
    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// Emission temporality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Temporality {
    /// Each emission reports totals since start.
    Cumulative,
    /// Each emission reports the increment since the previous one; state
    /// resets after every `consume` call.
    Delta,
}

/// Default latency histogram bucket bounds, in milliseconds: sub-10ms
/// granularity rising to tens of seconds, covering typical request latencies
/// without requiring callers to configure bounds up front.
pub const DEFAULT_LATENCY_HISTOGRAM_BOUNDS_MS: &[f64] = &[
    2.0, 4.0, 6.0, 8.0, 10.0, 50.0, 100.0, 200.0, 400.0, 800.0, 1000.0, 1400.0, 2000.0, 5000.0,
    10_000.0, 15_000.0,
];

/// Fixed name of this connector, used as the instrumentation scope name
/// unless `inherit_instrumentation_library_name` is set.
pub const ENGINE_SCOPE_NAME: &str = "spanmetrics_connector";

/// Unvalidated configuration input. `Processor::new` is the single
/// validation boundary that turns this into live internal state or a
/// [`crate::Error::Config`] failure.
#[derive(Clone, Debug)]
pub struct Config {
    /// Cumulative or delta emission.
    pub aggregation_temporality: Temporality,
    /// Latency histogram bucket bounds in milliseconds, ascending, excluding
    /// the terminal catch-all (the engine appends `f64::MAX` itself). `None`
    /// selects [`DEFAULT_LATENCY_HISTOGRAM_BOUNDS_MS`].
    pub latency_histogram_buckets_ms: Option<Vec<f64>>,
    /// Extra per-metric dimensions, applied in this order.
    pub dimensions: Vec<Dimension>,
    /// Extra per-resource attributes, applied in this order.
    pub resource_attributes: Vec<Dimension>,
    /// Capacity of the per-metric-key attribute cache.
    pub dimensions_cache_size: usize,
    /// Capacity of the per-resource-key attribute cache.
    pub resource_attributes_cache_size: usize,
    /// Identifier of the downstream metrics exporter to forward snapshots to.
    pub metrics_exporter: String,
    /// Whether to attach `span.id`/`trace.id` to the metric key and labels.
    pub attach_span_and_trace_id: bool,
    /// Whether to use the producing span's instrumentation library name as
    /// the emitted scope name, instead of [`ENGINE_SCOPE_NAME`].
    pub inherit_instrumentation_library_name: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aggregation_temporality: Temporality::Cumulative,
            latency_histogram_buckets_ms: None,
            dimensions: Vec::new(),
            resource_attributes: Vec::new(),
            dimensions_cache_size: 1000,
            resource_attributes_cache_size: 1000,
            metrics_exporter: String::new(),
            attach_span_and_trace_id: false,
            inherit_instrumentation_library_name: false,
        }
    }
}
