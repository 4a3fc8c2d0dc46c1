//! Aggregation state: call counts, latency distributions, and exemplars for
//! the current emission window.

mod exemplar;
mod store;

pub use exemplar::{ExemplarSample, ExemplarStore};
pub use store::{AggregationStore, MetricAggregate};
