//! The orchestrator: aggregates a span batch, builds a metric snapshot,
//! resets state per the configured temporality, then forwards the snapshot
//! and the original batch downstream. Metrics are always forwarded before
//! traces, and the state lock is released before either forwarding call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::aggregation::{AggregationStore, ExemplarStore};
use crate::cache::BoundedKeyCache;
use crate::config::{Config, Temporality, DEFAULT_LATENCY_HISTOGRAM_BOUNDS_MS, ENGINE_SCOPE_NAME};
use crate::dimension::resolve_dimension;
use crate::error::Error;
use crate::histogram::HistogramBuckets;
use crate::key::KeyBuilder;
use crate::proto::{KeyValue, MetricsSnapshot};
use crate::sanitizer::{
    find_collision, RESERVED_METRIC_DIMENSIONS, RESERVED_RESOURCE_DIMENSIONS,
};
use crate::snapshot::build_snapshot;
use crate::span::TraceBatch;

/// A downstream metrics sink.
#[async_trait]
pub trait MetricsConsumer: Send + Sync {
    /// Accept one emitted snapshot.
    async fn consume(&self, snapshot: MetricsSnapshot) -> Result<(), Error>;
}

/// A downstream trace sink. Declared read-only: spans are forwarded by
/// value, never mutated in transit.
#[async_trait]
pub trait TraceConsumer: Send + Sync {
    /// Forward one batch of spans, unmodified.
    async fn consume(&self, batch: TraceBatch) -> Result<(), Error>;
}

/// One exporter the host knows about.
pub enum Exporter {
    /// A metrics-shaped exporter.
    Metrics(Arc<dyn MetricsConsumer>),
    /// Some other kind of exporter, not usable as a metrics sink.
    Other,
}

/// The surrounding pipeline framework, queried at `start()` to resolve the
/// configured metrics exporter by name.
pub trait Host: Send + Sync {
    /// All exporters the host currently has configured, by identifier.
    fn list_metrics_exporters(&self) -> HashMap<String, Exporter>;
}

fn now_unix_nano() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

struct ProcessorState {
    store: AggregationStore,
    exemplars: ExemplarStore,
    resource_cache: BoundedKeyCache<Vec<KeyValue>>,
    metric_cache: BoundedKeyCache<Vec<KeyValue>>,
}

/// Validated connector state. Construct with [`Processor::new`], resolve a
/// downstream sink with [`Processor::start`], then feed batches to
/// [`Processor::consume`].
pub struct Processor {
    temporality: Temporality,
    buckets: HistogramBuckets,
    dimensions: Vec<crate::config::Dimension>,
    resource_attributes: Vec<crate::config::Dimension>,
    attach_span_and_trace_id: bool,
    scope_name: String,
    metrics_exporter_name: String,
    start_time_unix_nano: u64,
    state: Mutex<ProcessorState>,
    metrics_sink: OnceLock<Arc<dyn MetricsConsumer>>,
    trace_consumer: Arc<dyn TraceConsumer>,
}

impl Processor {
    /// Validate `config` and build a connector. Fails on duplicate dimension
    /// names (raw or sanitized) or a non-positive cache size.
    pub fn new(config: Config, trace_consumer: Arc<dyn TraceConsumer>) -> Result<Self, Error> {
        let dimension_names: Vec<String> =
            config.dimensions.iter().map(|d| d.name.clone()).collect();
        if let Some(duplicate) = find_collision(RESERVED_METRIC_DIMENSIONS, &dimension_names) {
            return Err(Error::Config(format!(
                "duplicate dimension `{duplicate}` after sanitization"
            )));
        }
        let resource_attribute_names: Vec<String> = config
            .resource_attributes
            .iter()
            .map(|d| d.name.clone())
            .collect();
        if let Some(duplicate) =
            find_collision(RESERVED_RESOURCE_DIMENSIONS, &resource_attribute_names)
        {
            return Err(Error::Config(format!(
                "duplicate resource attribute `{duplicate}` after sanitization"
            )));
        }

        let resource_cache = BoundedKeyCache::new(config.resource_attributes_cache_size)?;
        let metric_cache = BoundedKeyCache::new(config.dimensions_cache_size)?;

        let buckets = HistogramBuckets::new(
            config
                .latency_histogram_buckets_ms
                .clone()
                .unwrap_or_else(|| DEFAULT_LATENCY_HISTOGRAM_BOUNDS_MS.to_vec()),
        );

        let scope_name = if config.inherit_instrumentation_library_name {
            String::new() // resolved per-span; see `aggregate`
        } else {
            ENGINE_SCOPE_NAME.to_string()
        };

        log::debug!(
            "spanmetrics_connector configured: temporality={:?}, buckets={}, dimensions={}, resource_attributes={}",
            config.aggregation_temporality,
            buckets.len(),
            config.dimensions.len(),
            config.resource_attributes.len(),
        );

        Ok(Self {
            temporality: config.aggregation_temporality,
            buckets,
            dimensions: config.dimensions,
            resource_attributes: config.resource_attributes,
            attach_span_and_trace_id: config.attach_span_and_trace_id,
            scope_name,
            metrics_exporter_name: config.metrics_exporter,
            start_time_unix_nano: now_unix_nano(),
            state: Mutex::new(ProcessorState {
                store: AggregationStore::new(),
                exemplars: ExemplarStore::new(),
                resource_cache,
                metric_cache,
            }),
            metrics_sink: OnceLock::new(),
            trace_consumer,
        })
    }

    /// Resolve the configured metrics exporter against the host's exporter
    /// set. May only be called once.
    pub fn start(&self, host: &dyn Host) -> Result<(), Error> {
        if self.metrics_sink.get().is_some() {
            return Err(Error::Config("start() called more than once".to_string()));
        }

        let mut exporters = host.list_metrics_exporters();
        match exporters.remove(&self.metrics_exporter_name) {
            Some(Exporter::Metrics(sink)) => {
                log::info!(
                    "spanmetrics_connector resolved metrics exporter `{}`",
                    self.metrics_exporter_name
                );
                self.metrics_sink
                    .set(sink)
                    .map_err(|_| Error::Config("start() called more than once".to_string()))?;
                Ok(())
            }
            Some(Exporter::Other) => Err(Error::ExporterResolution(format!(
                "exporter `{}` is not a metrics exporter",
                self.metrics_exporter_name
            ))),
            None => {
                let available: Vec<&String> = exporters.keys().collect();
                Err(Error::ExporterResolution(format!(
                    "no exporter named `{}`; available metrics exporters: {:?}",
                    self.metrics_exporter_name, available
                )))
            }
        }
    }

    fn instrumentation_library_key(&self, library_name: &str) -> String {
        if self.scope_name.is_empty() {
            library_name.to_string()
        } else {
            self.scope_name.clone()
        }
    }

    fn build_resource_bag(&self, resource: &crate::span::Resource) -> (String, Vec<KeyValue>) {
        let mut key = KeyBuilder::new();
        let service_name = resource.service_name().unwrap_or_default();
        key.push(service_name);

        let mut bag = vec![KeyValue::new("service.name", service_name.to_string())];
        for dimension in &self.resource_attributes {
            if let Some(value) = resolve_dimension(dimension, None, &resource.attributes) {
                key.push(&value.stringify());
                bag.push(KeyValue::new(dimension.name.clone(), value));
            }
        }
        (key.build(), bag)
    }

    fn build_metric_bag(
        &self,
        span: &crate::span::Span,
        resource_attributes: &crate::span::Attributes,
    ) -> (String, Vec<KeyValue>) {
        let mut key = KeyBuilder::new();
        key.push(&span.name);
        key.push(&span.kind.to_string());
        key.push(&span.status_code.to_string());

        let mut bag = vec![
            KeyValue::new("operation", span.name.clone()),
            KeyValue::new("span.kind", span.kind.to_string()),
            KeyValue::new("status.code", span.status_code.to_string()),
        ];

        if self.attach_span_and_trace_id {
            key.push(&span.span_id);
            key.push(&span.trace_id);
            bag.push(KeyValue::new("span.id", span.span_id.clone()));
            bag.push(KeyValue::new("trace.id", span.trace_id.clone()));
        }

        for dimension in &self.dimensions {
            if let Some(value) = resolve_dimension(dimension, Some(&span.attributes), resource_attributes) {
                key.push(&value.stringify());
                bag.push(KeyValue::new(dimension.name.clone(), value));
            }
        }
        (key.build(), bag)
    }

    fn aggregate(&self, state: &mut ProcessorState, batch: &TraceBatch) {
        for resource_spans in &batch.resource_spans {
            if resource_spans.resource.service_name().is_none() {
                continue;
            }
            let (resource_key, resource_bag) = self.build_resource_bag(&resource_spans.resource);
            state
                .resource_cache
                .contains_or_add(&resource_key, || resource_bag);

            for ils in &resource_spans.instrumentation_library_spans {
                let library_key = self.instrumentation_library_key(&ils.instrumentation_library.name);

                for span in &ils.spans {
                    let (metric_key, metric_bag) =
                        self.build_metric_bag(span, &resource_spans.resource.attributes);
                    state
                        .metric_cache
                        .contains_or_add(&metric_key, || metric_bag);

                    let latency_ms = span.latency_ms();
                    let bucket_index = self.buckets.bucket_index(latency_ms);
                    state.store.record(
                        &resource_key,
                        &library_key,
                        &metric_key,
                        latency_ms,
                        bucket_index,
                        self.buckets.len(),
                    );
                    state.exemplars.append(
                        &resource_key,
                        &library_key,
                        &metric_key,
                        &span.trace_id,
                        latency_ms,
                    );
                }
            }
        }
    }

    /// Aggregate one batch, emit a metric snapshot, reset state per the
    /// configured temporality, then forward the snapshot and the original
    /// batch downstream. Metrics are always forwarded before traces.
    pub async fn consume(&self, batch: TraceBatch) -> Result<(), Error> {
        let sink = self.metrics_sink.get().ok_or(Error::NotStarted)?.clone();

        let snapshot = {
            let mut state = self.state.lock().expect("processor state mutex poisoned");

            self.aggregate(&mut state, &batch);

            let snapshot = build_snapshot(
                &state.store,
                &state.exemplars,
                &state.resource_cache,
                &state.metric_cache,
                &self.buckets,
                self.temporality,
                self.start_time_unix_nano,
                now_unix_nano(),
            )?;

            match self.temporality {
                Temporality::Delta => {
                    state.store.reset_all();
                    state.resource_cache.purge();
                    state.metric_cache.purge();
                }
                Temporality::Cumulative => {
                    state.resource_cache.sweep();
                    state.metric_cache.sweep();
                }
            }
            state.exemplars.reset();

            snapshot
        };

        sink.consume(snapshot).await.map_err(|err| {
            log::error!("failed to forward metrics snapshot: {err}");
            Error::forwarding(err)
        })?;

        self.trace_consumer.consume(batch).await.map_err(|err| {
            log::error!("failed to forward trace batch: {err}");
            Error::forwarding(err)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Dimension;
    use crate::span::{
        AttributeValue as AV, InstrumentationLibrary, InstrumentationLibrarySpans, Resource,
        ResourceSpans, Span, SpanKind, StatusCode,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Default)]
    struct RecordingMetricsSink {
        snapshots: AsyncMutex<Vec<MetricsSnapshot>>,
    }

    #[async_trait]
    impl MetricsConsumer for RecordingMetricsSink {
        async fn consume(&self, snapshot: MetricsSnapshot) -> Result<(), Error> {
            self.snapshots.lock().await.push(snapshot);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTraceSink {
        batches: AtomicUsize,
    }

    #[async_trait]
    impl TraceConsumer for RecordingTraceSink {
        async fn consume(&self, _batch: TraceBatch) -> Result<(), Error> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeHost {
        sink: Arc<RecordingMetricsSink>,
    }

    impl Host for FakeHost {
        fn list_metrics_exporters(&self) -> HashMap<String, Exporter> {
            let mut map = HashMap::new();
            map.insert(
                "test_exporter".to_string(),
                Exporter::Metrics(self.sink.clone()),
            );
            map.insert("non_metrics".to_string(), Exporter::Other);
            map
        }
    }

    fn span(name: &str, kind: SpanKind, status: StatusCode, trace_id: &str, latency_ns: u64) -> Span {
        Span {
            name: name.to_string(),
            kind,
            status_code: status,
            start_time_unix_nano: 0,
            end_time_unix_nano: latency_ns,
            span_id: "span-1".to_string(),
            trace_id: trace_id.to_string(),
            attributes: Default::default(),
        }
    }

    fn resource_spans(service: &str, spans: Vec<Span>) -> ResourceSpans {
        let mut attributes = crate::span::Attributes::new();
        attributes.insert("service.name".to_string(), AV::from(service));
        ResourceSpans {
            resource: Resource { attributes },
            instrumentation_library_spans: vec![InstrumentationLibrarySpans {
                instrumentation_library: InstrumentationLibrary {
                    name: "test-lib".to_string(),
                    version: "1.0".to_string(),
                },
                spans,
            }],
        }
    }

    async fn new_started_processor(
        temporality: Temporality,
    ) -> (Arc<Processor>, Arc<RecordingMetricsSink>, Arc<RecordingTraceSink>) {
        let metrics_sink = Arc::new(RecordingMetricsSink::default());
        let trace_sink = Arc::new(RecordingTraceSink::default());
        let config = Config {
            aggregation_temporality: temporality,
            metrics_exporter: "test_exporter".to_string(),
            ..Config::default()
        };
        let processor = Arc::new(Processor::new(config, trace_sink.clone()).unwrap());
        let host = FakeHost {
            sink: metrics_sink.clone(),
        };
        processor.start(&host).unwrap();
        (processor, metrics_sink, trace_sink)
    }

    #[test_log::test(tokio::test)]
    async fn three_span_trace_produces_two_resources() {
        let (processor, metrics_sink, trace_sink) = new_started_processor(Temporality::Cumulative).await;

        let batch = TraceBatch {
            resource_spans: vec![
                resource_spans(
                    "service-a",
                    vec![
                        span("ping", SpanKind::Server, StatusCode::Ok, "trace-1", 11_000_000),
                        span("ping", SpanKind::Client, StatusCode::Ok, "trace-1", 11_000_000),
                    ],
                ),
                resource_spans(
                    "service-b",
                    vec![span("ping", SpanKind::Server, StatusCode::Error, "trace-2", 11_000_000)],
                ),
            ],
        };

        processor.consume(batch).await.unwrap();

        let snapshots = metrics_sink.snapshots.lock().await;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].resource_metrics.len(), 2);
        assert_eq!(trace_sink.batches.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn cumulative_accumulates_across_consume_calls() {
        let (processor, metrics_sink, _trace) = new_started_processor(Temporality::Cumulative).await;

        let make_batch = || TraceBatch {
            resource_spans: vec![resource_spans(
                "service-a",
                vec![span("ping", SpanKind::Server, StatusCode::Ok, "trace-1", 11_000_000)],
            )],
        };

        processor.consume(make_batch()).await.unwrap();
        processor.consume(make_batch()).await.unwrap();

        let snapshots = metrics_sink.snapshots.lock().await;
        let second = &snapshots[1];
        let crate::proto::MetricData::Sum(sum) = &second.resource_metrics[0].scope_metrics[0].metrics[0].data else {
            panic!("expected sum metric");
        };
        assert_eq!(sum.data_points[0].value, 2);
    }

    #[test_log::test(tokio::test)]
    async fn delta_does_not_accumulate_across_consume_calls() {
        let (processor, metrics_sink, _trace) = new_started_processor(Temporality::Delta).await;

        let make_batch = || TraceBatch {
            resource_spans: vec![resource_spans(
                "service-a",
                vec![span("ping", SpanKind::Server, StatusCode::Ok, "trace-1", 11_000_000)],
            )],
        };

        processor.consume(make_batch()).await.unwrap();
        processor.consume(make_batch()).await.unwrap();

        let snapshots = metrics_sink.snapshots.lock().await;
        for snapshot in snapshots.iter() {
            let crate::proto::MetricData::Sum(sum) = &snapshot.resource_metrics[0].scope_metrics[0].metrics[0].data else {
                panic!("expected sum metric");
            };
            assert_eq!(sum.data_points[0].value, 1);
        }
    }

    #[test_log::test(tokio::test)]
    async fn missing_service_name_still_forwards_trace_batch() {
        let (processor, metrics_sink, trace_sink) = new_started_processor(Temporality::Cumulative).await;

        let batch = TraceBatch {
            resource_spans: vec![ResourceSpans {
                resource: Resource::default(),
                instrumentation_library_spans: vec![InstrumentationLibrarySpans {
                    instrumentation_library: InstrumentationLibrary::default(),
                    spans: vec![span("ping", SpanKind::Server, StatusCode::Ok, "trace-1", 1_000_000)],
                }],
            }],
        };

        processor.consume(batch).await.unwrap();

        let snapshots = metrics_sink.snapshots.lock().await;
        assert!(snapshots[0].resource_metrics.is_empty());
        assert_eq!(trace_sink.batches.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn extreme_timestamps_do_not_panic() {
        let (processor, _metrics, _trace) = new_started_processor(Temporality::Cumulative).await;

        let batch = TraceBatch {
            resource_spans: vec![resource_spans(
                "service-a",
                vec![
                    Span {
                        start_time_unix_nano: 0,
                        end_time_unix_nano: u64::MAX,
                        ..span("slow", SpanKind::Server, StatusCode::Ok, "trace-1", 0)
                    },
                    Span {
                        start_time_unix_nano: u64::MAX,
                        end_time_unix_nano: 0,
                        ..span("backwards", SpanKind::Server, StatusCode::Ok, "trace-2", 0)
                    },
                ],
            )],
        };

        processor.consume(batch).await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn lru_eviction_is_deferred_within_one_batch() {
        let metrics_sink = Arc::new(RecordingMetricsSink::default());
        let trace_sink = Arc::new(RecordingTraceSink::default());
        let config = Config {
            aggregation_temporality: Temporality::Cumulative,
            metrics_exporter: "test_exporter".to_string(),
            dimensions_cache_size: 2,
            resource_attributes_cache_size: 2,
            ..Config::default()
        };
        let processor = Processor::new(config, trace_sink).unwrap();
        let host = FakeHost {
            sink: metrics_sink.clone(),
        };
        processor.start(&host).unwrap();

        let batch = TraceBatch {
            resource_spans: vec![resource_spans(
                "service-a",
                vec![
                    span("op-a", SpanKind::Server, StatusCode::Ok, "t1", 1_000_000),
                    span("op-b", SpanKind::Server, StatusCode::Ok, "t2", 1_000_000),
                    span("op-c", SpanKind::Server, StatusCode::Ok, "t3", 1_000_000),
                ],
            )],
        };

        processor.consume(batch).await.unwrap();

        let snapshots = metrics_sink.snapshots.lock().await;
        let scope_metrics = &snapshots[0].resource_metrics[0].scope_metrics[0];
        assert_eq!(scope_metrics.metrics[0].name, "calls_total");
        let crate::proto::MetricData::Sum(sum) = &scope_metrics.metrics[0].data else {
            panic!("expected sum metric");
        };
        assert_eq!(sum.data_points.len(), 3, "all 3 ops must be visible despite cache size 2");
    }

    #[test]
    fn duplicate_dimension_after_sanitization_fails_construction() {
        let trace_sink = Arc::new(RecordingTraceSink::default());
        let config = Config {
            dimensions: vec![Dimension::new("status_code")],
            ..Config::default()
        };
        let err = Processor::new(config, trace_sink).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
