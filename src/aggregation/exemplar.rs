//! Per-metric exemplar samples for the current emission window.

use std::collections::HashMap;

/// One exemplar: a value tied back to the trace that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct ExemplarSample {
    /// Trace id the sample came from.
    pub trace_id: String,
    /// The recorded value (milliseconds).
    pub value_ms: f64,
}

type MetricExemplars = HashMap<String, Vec<ExemplarSample>>;
type LibraryExemplars = HashMap<String, MetricExemplars>;

/// Append-only exemplar lists, keyed the same way as
/// [`crate::aggregation::store::AggregationStore`]. Always reset every
/// window, regardless of temporality.
#[derive(Default)]
pub struct ExemplarStore {
    resources: HashMap<String, LibraryExemplars>,
}

impl ExemplarStore {
    /// Build an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample, unless `trace_id` is empty. Filtering empty trace
    /// ids here (at ingest) rather than at emit time is the equivalence the
    /// spec permits.
    pub fn append(&mut self, resource_key: &str, library_key: &str, metric_key: &str, trace_id: &str, value_ms: f64) {
        if trace_id.is_empty() {
            return;
        }
        self.resources
            .entry(resource_key.to_string())
            .or_default()
            .entry(library_key.to_string())
            .or_default()
            .entry(metric_key.to_string())
            .or_default()
            .push(ExemplarSample {
                trace_id: trace_id.to_string(),
                value_ms,
            });
    }

    /// Look up the exemplars recorded for a metric this window.
    pub fn get(&self, resource_key: &str, library_key: &str, metric_key: &str) -> &[ExemplarSample] {
        self.resources
            .get(resource_key)
            .and_then(|l| l.get(library_key))
            .and_then(|m| m.get(metric_key))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Discard every recorded exemplar.
    pub fn reset(&mut self) {
        self.resources.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn appends_and_retrieves() {
        let mut store = ExemplarStore::new();
        store.append("r1", "l1", "m1", "trace-a", 11.0);
        let samples = store.get("r1", "l1", "m1");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].trace_id, "trace-a");
    }

    #[test]
    fn empty_trace_id_is_dropped() {
        let mut store = ExemplarStore::new();
        store.append("r1", "l1", "m1", "", 11.0);
        assert!(store.get("r1", "l1", "m1").is_empty());
    }

    #[test]
    fn reset_clears_all_samples() {
        let mut store = ExemplarStore::new();
        store.append("r1", "l1", "m1", "trace-a", 11.0);
        store.reset();
        assert!(store.get("r1", "l1", "m1").is_empty());
    }
}
