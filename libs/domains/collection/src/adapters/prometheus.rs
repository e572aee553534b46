//! Prometheus-backed performance adapter
//!
//! Performance samples come from the customer's Prometheus, whose endpoint
//! lives in the credential metadata. One instance of this adapter exists
//! per provider so the registry stays keyed by (provider, data_type);
//! rows are tagged with the owning provider.
//!
//! Each canonical metric is one sub-query; a failed sub-query marks the
//! output partial and the rest still land.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use domain_credentials::DecryptedCredential;
use domain_telemetry::{CloudProvider, DataType, MetricBatch, PerformanceMetricRow};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

use super::{
    AdapterError, AdapterOutput, AdapterResult, CollectContext, ProviderAdapter,
};

const REQUEST_TIMEOUT_S: u64 = 60;
const RANGE_STEP_S: u64 = 60;

/// (canonical metric name, PromQL expression)
const QUERIES: &[(&str, &str)] = &[
    ("cpu_utilization", "100 - avg by (instance) (rate(node_cpu_seconds_total{mode=\"idle\"}[5m])) * 100"),
    ("request_latency_p95", "histogram_quantile(0.95, sum by (instance, le) (rate(http_request_duration_seconds_bucket[5m])))"),
    ("request_throughput", "sum by (instance) (rate(http_requests_total[5m]))"),
];

pub struct PrometheusPerformanceAdapter {
    provider: CloudProvider,
    http: Client,
}

impl PrometheusPerformanceAdapter {
    pub fn new(provider: CloudProvider) -> Self {
        Self {
            provider,
            http: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_S))
                .build()
                .expect("reqwest client"),
        }
    }

    fn endpoint<'a>(&self, credential: &'a DecryptedCredential) -> AdapterResult<&'a str> {
        credential
            .metadata
            .prometheus_endpoint
            .as_deref()
            .ok_or_else(|| {
                AdapterError::NotConfigured(
                    "credential metadata missing prometheus_endpoint".into(),
                )
            })
    }

    async fn query_range(
        &self,
        endpoint: &str,
        query: &str,
        ctx: &CollectContext,
    ) -> AdapterResult<Vec<(String, Vec<(DateTime<Utc>, f64)>)>> {
        let response = self
            .http
            .get(format!("{endpoint}/api/v1/query_range"))
            .query(&[
                ("query", query.to_string()),
                ("start", ctx.window.since.timestamp().to_string()),
                ("end", ctx.window.until.timestamp().to_string()),
                ("step", RANGE_STEP_S.to_string()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AdapterError::Auth("prometheus rejected request".into()));
        }
        if !response.status().is_success() {
            return Err(AdapterError::Api(format!(
                "prometheus returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await?;

        if body.get("status").and_then(|v| v.as_str()) != Some("success") {
            return Err(AdapterError::Api(format!(
                "prometheus query failed: {}",
                body.get("error").and_then(|v| v.as_str()).unwrap_or("unknown")
            )));
        }

        let mut series = Vec::new();
        for result in body
            .pointer("/data/result")
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
        {
            let instance = result
                .pointer("/metric/instance")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let mut points = Vec::new();
            for value in result.get("values").and_then(|v| v.as_array()).into_iter().flatten() {
                let Some(pair) = value.as_array() else { continue };
                let ts = pair.first().and_then(|v| v.as_f64());
                let sample = pair
                    .get(1)
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<f64>().ok());
                if let (Some(ts), Some(sample)) = (ts, sample) {
                    if let Some(timestamp) = Utc.timestamp_opt(ts as i64, 0).single() {
                        points.push((timestamp, sample));
                    }
                }
            }
            series.push((instance, points));
        }

        Ok(series)
    }

    fn demo_rows(&self, ctx: &CollectContext) -> Vec<PerformanceMetricRow> {
        let mut rows = Vec::new();
        for (metric, base) in [
            ("cpu_utilization", 42.0),
            ("request_latency_p95", 0.180),
            ("request_throughput", 350.0),
        ] {
            // one sample per 15 minutes across the window
            let mut at = ctx.window.since;
            let mut step = 0u32;
            while at < ctx.window.until {
                rows.push(PerformanceMetricRow {
                    timestamp: at,
                    customer_id: ctx.customer_id,
                    provider: self.provider,
                    metric_name: metric.to_string(),
                    metric_value: base * (1.0 + 0.05 * f64::from(step % 4)),
                    resource_id: "demo-node-1".to_string(),
                    tags: HashMap::new(),
                });
                at += chrono::Duration::minutes(15);
                step += 1;
            }
        }
        rows
    }
}

#[async_trait]
impl ProviderAdapter for PrometheusPerformanceAdapter {
    fn provider(&self) -> CloudProvider {
        self.provider
    }

    fn data_type(&self) -> DataType {
        DataType::Performance
    }

    fn name(&self) -> &'static str {
        "prometheus-performance"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        if ctx.credential.metadata.demo {
            return Ok(AdapterOutput::complete(MetricBatch::Performance(
                self.demo_rows(ctx),
            )));
        }

        let endpoint = self.endpoint(&ctx.credential)?.to_string();

        let mut rows = Vec::new();
        let mut errors = Vec::new();

        for (canonical_name, query) in QUERIES {
            match self.query_range(&endpoint, query, ctx).await {
                Ok(series) => {
                    for (instance, points) in series {
                        for (timestamp, value) in points {
                            rows.push(PerformanceMetricRow {
                                timestamp,
                                customer_id: ctx.customer_id,
                                provider: self.provider,
                                metric_name: ctx
                                    .credential
                                    .metadata
                                    .canonical_metric_name(canonical_name)
                                    .to_string(),
                                metric_value: value,
                                resource_id: instance.clone(),
                                tags: HashMap::new(),
                            });
                        }
                    }
                }
                Err(AdapterError::Auth(reason)) => {
                    // Bad auth fails the whole pull so the credential flips
                    return Err(AdapterError::Auth(reason));
                }
                Err(e) => {
                    warn!(metric = canonical_name, error = %e, "Prometheus sub-query failed");
                    errors.push(format!("{canonical_name}: {e}"));
                }
            }
        }

        info!(
            provider = %self.provider,
            rows = rows.len(),
            failed_queries = errors.len(),
            "Performance collection complete"
        );

        let partial = !errors.is_empty();
        let batch = MetricBatch::Performance(rows);
        Ok(if partial {
            AdapterOutput::partial(batch, errors)
        } else {
            AdapterOutput::complete(batch)
        })
    }

    async fn health_check(&self, credential: &DecryptedCredential) -> AdapterResult<bool> {
        if credential.metadata.demo {
            return Ok(true);
        }
        let endpoint = self.endpoint(credential)?;
        let response = self
            .http
            .get(format!("{endpoint}/-/healthy"))
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_telemetry::TimeWindow;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_missing_endpoint_is_credential_failure() {
        let adapter = PrometheusPerformanceAdapter::new(CloudProvider::Aws);
        let ctx = CollectContext {
            customer_id: Uuid::new_v4(),
            credential: Arc::new(DecryptedCredential {
                id: Uuid::new_v4(),
                customer_id: Uuid::new_v4(),
                provider: CloudProvider::Aws,
                credential_name: "primary".to_string(),
                secret: HashMap::new(),
                is_verified: true,
                metadata: Default::default(),
            }),
            window: TimeWindow::last_hours(1),
            cursor: None,
        };

        let err = adapter.collect(&ctx).await.unwrap_err();
        assert!(err.is_credential_failure());
    }

    #[tokio::test]
    async fn test_demo_rows_cover_all_canonical_metrics() {
        let adapter = PrometheusPerformanceAdapter::new(CloudProvider::Runpod);
        let ctx = CollectContext {
            customer_id: Uuid::new_v4(),
            credential: Arc::new(DecryptedCredential {
                id: Uuid::new_v4(),
                customer_id: Uuid::new_v4(),
                provider: CloudProvider::Runpod,
                credential_name: "demo".to_string(),
                secret: HashMap::new(),
                is_verified: true,
                metadata: domain_credentials::CredentialMetadata {
                    demo: true,
                    ..Default::default()
                },
            }),
            window: TimeWindow::last_hours(1),
            cursor: None,
        };

        let output = adapter.collect(&ctx).await.unwrap();
        let MetricBatch::Performance(rows) = output.batch else {
            panic!("expected performance batch");
        };
        for metric in ["cpu_utilization", "request_latency_p95", "request_throughput"] {
            assert!(rows.iter().any(|r| r.metric_name == metric));
        }
    }
}
