use std::sync::Arc;

use criterion::Criterion;
use spanmetrics_connector::{
    AttributeValue, Config, Error, Exporter, Host, InstrumentationLibrary,
    InstrumentationLibrarySpans, MetricsConsumer, MetricsSnapshot, Processor, SpanKind,
    SpanResource, StatusCode, TraceBatch, TraceConsumer,
};
use std::collections::HashMap;

struct NoopMetrics;

#[async_trait::async_trait]
impl MetricsConsumer for NoopMetrics {
    async fn consume(&self, _snapshot: MetricsSnapshot) -> Result<(), Error> {
        Ok(())
    }
}

struct NoopTraces;

#[async_trait::async_trait]
impl TraceConsumer for NoopTraces {
    async fn consume(&self, _batch: TraceBatch) -> Result<(), Error> {
        Ok(())
    }
}

struct BenchHost {
    sink: Arc<NoopMetrics>,
}

impl Host for BenchHost {
    fn list_metrics_exporters(&self) -> HashMap<String, Exporter> {
        let mut map = HashMap::new();
        map.insert("bench".to_string(), Exporter::Metrics(self.sink.clone()));
        map
    }
}

fn demo_batch(i: u64) -> TraceBatch {
    let mut attributes = spanmetrics_connector::Attributes::new();
    attributes.insert("service.name".to_string(), AttributeValue::from("bench-service"));

    let span = spanmetrics_connector::Span {
        name: "demo".to_string(),
        kind: SpanKind::Server,
        status_code: StatusCode::Ok,
        start_time_unix_nano: 0,
        end_time_unix_nano: 1_000_000 + i,
        span_id: "span".to_string(),
        trace_id: "trace".to_string(),
        attributes: Default::default(),
    };

    TraceBatch {
        resource_spans: vec![spanmetrics_connector::ResourceSpans {
            resource: SpanResource { attributes },
            instrumentation_library_spans: vec![InstrumentationLibrarySpans {
                instrumentation_library: InstrumentationLibrary {
                    name: "bench-lib".to_string(),
                    version: "1.0".to_string(),
                },
                spans: vec![span],
            }],
        }],
    }
}

pub fn aggregate_benchmark(criterion: &mut Criterion) {
    env_logger::builder().is_test(false).try_init().ok();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("should be able to make tokio runtime");

    let metrics = Arc::new(NoopMetrics);
    let processor = Processor::new(Config {
        metrics_exporter: "bench".to_string(),
        ..Config::default()
    }, Arc::new(NoopTraces))
    .expect("valid config");
    processor.start(&BenchHost { sink: metrics }).expect("exporter resolves");
    let processor = Arc::new(processor);

    criterion.bench_function("consume_single_span_batch", |bencher| {
        let mut i = 0_u64;
        let processor = processor.clone();
        bencher.iter(|| {
            i += 1;
            runtime.block_on(processor.consume(demo_batch(i)))
        });
    });
}

criterion::criterion_group!(benches, aggregate_benchmark);
criterion::criterion_main! {
    benches,
}
