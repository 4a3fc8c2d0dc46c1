//! Aggregates spans into `calls_total`/`latency` metrics, broken down by
//! service, operation, span kind, status code, and configurable extra
//! dimensions, while forwarding the original spans unmodified.
//!
//! [`Processor`] is the entry point: build one with [`Processor::new`],
//! resolve a downstream metrics sink with [`Processor::start`], then feed it
//! span batches via [`Processor::consume`].

#![deny(missing_docs)]

mod aggregation;
mod cache;
mod config;
mod dimension;
mod error;
mod histogram;
mod key;
mod processor;
mod proto;
mod sanitizer;
mod snapshot;
mod span;

pub use config::{Config, Dimension, Temporality, DEFAULT_LATENCY_HISTOGRAM_BOUNDS_MS};
pub use error::Error;
pub use processor::{Exporter, Host, MetricsConsumer, Processor, TraceConsumer};
pub use proto::{
    AggregationTemporality, Exemplar, Histogram, HistogramDataPoint, InstrumentationScope,
    KeyValue, Metric, MetricData, MetricsSnapshot, NumberDataPoint, Resource, ResourceMetrics,
    ScopeMetrics, Sum,
};
pub use span::{
    AttributeValue, Attributes, InstrumentationLibrary, InstrumentationLibrarySpans,
    Resource as SpanResource, ResourceSpans, Span, SpanKind, StatusCode, TraceBatch,
};
