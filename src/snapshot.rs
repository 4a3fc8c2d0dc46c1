//! Builds a [`MetricsSnapshot`] from the current aggregation state, walking
//! [`BoundedKeyCache`]/[`AggregationStore`] to assemble per-resource,
//! per-scope metric groups.

use crate::aggregation::{AggregationStore, ExemplarStore};
use crate::cache::BoundedKeyCache;
use crate::config::Temporality;
use crate::error::Error;
use crate::histogram::HistogramBuckets;
use crate::proto::{
    AggregationTemporality, Exemplar, Histogram, HistogramDataPoint, InstrumentationScope,
    KeyValue, Metric, MetricData, MetricsSnapshot, NumberDataPoint, Resource, ResourceMetrics,
    ScopeMetrics, Sum,
};

const SERVICE_NAME_LABEL: &str = "service.name";

fn as_temporality(temporality: Temporality) -> AggregationTemporality {
    match temporality {
        Temporality::Cumulative => AggregationTemporality::Cumulative,
        Temporality::Delta => AggregationTemporality::Delta,
    }
}

/// Build the full snapshot for one `consume` call.
///
/// Walks every resource key the cache knows about (active or held), skips
/// ones whose bag lacks `service.name`, and for each `(resource, library)`
/// pair present in `store` emits the two metrics. Returns
/// [`Error::CacheInvariant`] if a key enumerated by the cache cannot be
/// retrieved, or a `(resource, library)` pair in the store has no
/// corresponding cached metric-key bag.
#[allow(clippy::too_many_arguments)]
pub fn build_snapshot(
    store: &AggregationStore,
    exemplars: &ExemplarStore,
    resource_cache: &BoundedKeyCache<Vec<KeyValue>>,
    metric_cache: &BoundedKeyCache<Vec<KeyValue>>,
    buckets: &HistogramBuckets,
    temporality: Temporality,
    start_time_unix_nano: u64,
    now_unix_nano: u64,
) -> Result<MetricsSnapshot, Error> {
    let mut resource_metrics = Vec::new();

    for resource_key in resource_cache.keys() {
        let Some(resource_attributes) = resource_cache.get(resource_key) else {
            return Err(Error::cache_invariant(format!(
                "resource key `{resource_key}` listed but not retrievable"
            )));
        };
        if !resource_attributes.iter().any(|kv| kv.key == SERVICE_NAME_LABEL) {
            continue;
        }
        let Some(libraries) = store.resource(resource_key) else {
            continue;
        };

        let mut scope_metrics_list = Vec::new();
        for (library_key, metrics) in libraries {
            let mut calls_points = Vec::new();
            let mut latency_points = Vec::new();

            for (metric_key, aggregate) in metrics {
                let Some(metric_attributes) = metric_cache.get(metric_key) else {
                    return Err(Error::cache_invariant(format!(
                        "metric key `{metric_key}` present in aggregation store but not retrievable"
                    )));
                };

                calls_points.push(NumberDataPoint {
                    attributes: metric_attributes.clone(),
                    start_time_unix_nano,
                    time_unix_nano: now_unix_nano,
                    value: aggregate.call_count,
                });

                let sample_exemplars = exemplars
                    .get(resource_key, library_key, metric_key)
                    .iter()
                    .map(|sample| Exemplar {
                        trace_id: sample.trace_id.clone(),
                        value: sample.value_ms,
                        time_unix_nano: now_unix_nano,
                    })
                    .collect();

                latency_points.push(HistogramDataPoint {
                    attributes: metric_attributes.clone(),
                    start_time_unix_nano,
                    time_unix_nano: now_unix_nano,
                    count: aggregate.latency_count,
                    sum: aggregate.latency_sum_ms,
                    explicit_bounds: buckets.bounds().to_vec(),
                    bucket_counts: aggregate.latency_buckets.clone(),
                    exemplars: sample_exemplars,
                });
            }

            if calls_points.is_empty() {
                continue;
            }

            scope_metrics_list.push(ScopeMetrics {
                scope: InstrumentationScope {
                    name: library_key.clone(),
                },
                metrics: vec![
                    Metric {
                        name: "calls_total".to_string(),
                        unit: "1".to_string(),
                        data: MetricData::Sum(Sum {
                            aggregation_temporality: as_temporality(temporality),
                            is_monotonic: true,
                            data_points: calls_points,
                        }),
                    },
                    Metric {
                        name: "latency".to_string(),
                        unit: "ms".to_string(),
                        data: MetricData::Histogram(Histogram {
                            aggregation_temporality: as_temporality(temporality),
                            data_points: latency_points,
                        }),
                    },
                ],
            });
        }

        if scope_metrics_list.is_empty() {
            continue;
        }

        resource_metrics.push(ResourceMetrics {
            resource: Resource {
                attributes: resource_attributes.clone(),
            },
            scope_metrics: scope_metrics_list,
        });
    }

    Ok(MetricsSnapshot { resource_metrics })
}
