//! AWS adapters
//!
//! Spend comes from a Cost and Usage export endpoint (CUR delivered
//! through a query proxy such as Athena-behind-API-Gateway), inventory
//! from an instance export endpoint. Both endpoints live in the
//! credential metadata; the export API key in the secret payload.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain_credentials::DecryptedCredential;
use domain_telemetry::{
    CloudProvider, CostMetricRow, DataType, MetricBatch, ResourceMetricRow,
};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use super::{
    AdapterError, AdapterOutput, AdapterResult, CollectContext, ProviderAdapter,
};

const REQUEST_TIMEOUT_S: u64 = 60;

fn client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_S))
        .build()
        .expect("reqwest client")
}

fn export_endpoint<'a>(
    credential: &'a DecryptedCredential,
    key: &str,
) -> AdapterResult<&'a str> {
    credential
        .metadata
        .extra
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            AdapterError::NotConfigured(format!("aws credential metadata missing {key}"))
        })
}

async fn fetch_export(
    http: &Client,
    credential: &DecryptedCredential,
    endpoint: &str,
    window: (&DateTime<Utc>, &DateTime<Utc>),
) -> AdapterResult<serde_json::Value> {
    let api_key = credential
        .secret
        .get("export_api_key")
        .map(String::as_str)
        .ok_or_else(|| {
            AdapterError::NotConfigured("aws credential missing export_api_key".into())
        })?;

    let response = http
        .get(endpoint)
        .header("x-api-key", api_key)
        .query(&[
            ("start", window.0.to_rfc3339()),
            ("end", window.1.to_rfc3339()),
        ])
        .send()
        .await?;

    match response.status() {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            Err(AdapterError::Auth("aws export endpoint rejected key".into()))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => Err(AdapterError::RateLimited(60)),
        status if !status.is_success() => {
            Err(AdapterError::Api(format!("aws export returned {status}")))
        }
        _ => Ok(response.json().await?),
    }
}

fn demo_cost_rows(ctx: &CollectContext) -> Vec<CostMetricRow> {
    let samples = [
        ("i-0demo1", "AmazonEC2", "compute", 4.20),
        ("i-0demo2", "AmazonEC2", "compute", 1.73),
        ("", "AmazonS3", "storage", 0.31),
        ("", "AWSDataTransfer", "data_transfer", 0.12),
    ];

    samples
        .into_iter()
        .map(|(instance_id, service, cost_type, amount)| CostMetricRow {
            timestamp: ctx.window.until,
            customer_id: ctx.customer_id,
            provider: CloudProvider::Aws,
            instance_id: instance_id.to_string(),
            cost_type: cost_type.to_string(),
            amount,
            currency: "USD".to_string(),
            resource_type: service.to_string(),
        })
        .collect()
}

/// AWS cost adapter over the CUR export endpoint
pub struct AwsCostAdapter {
    http: Client,
}

impl AwsCostAdapter {
    pub fn new() -> Self {
        Self { http: client() }
    }
}

impl Default for AwsCostAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for AwsCostAdapter {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Aws
    }

    fn data_type(&self) -> DataType {
        DataType::Cost
    }

    fn name(&self) -> &'static str {
        "aws-cost"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        if ctx.credential.metadata.demo {
            return Ok(AdapterOutput::complete(MetricBatch::Cost(demo_cost_rows(
                ctx,
            ))));
        }

        let endpoint = export_endpoint(&ctx.credential, "cost_export_endpoint")?;
        let body = fetch_export(
            &self.http,
            &ctx.credential,
            endpoint,
            (&ctx.window.since, &ctx.window.until),
        )
        .await?;

        let mut rows = Vec::new();
        let mut errors = Vec::new();

        let entries = body
            .get("results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AdapterError::Parse("missing results in export response".into()))?;

        for entry in entries {
            let timestamp = entry
                .get("date")
                .and_then(|v| v.as_str())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let amount = entry.get("amount").and_then(|v| v.as_f64());

            let (Some(timestamp), Some(amount)) = (timestamp, amount) else {
                errors.push(format!("unparseable export line: {entry}"));
                continue;
            };

            rows.push(CostMetricRow {
                timestamp,
                customer_id: ctx.customer_id,
                provider: CloudProvider::Aws,
                instance_id: entry
                    .get("resource_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                cost_type: entry
                    .get("usage_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("usage")
                    .to_string(),
                amount,
                currency: entry
                    .get("currency")
                    .and_then(|v| v.as_str())
                    .unwrap_or("USD")
                    .to_string(),
                resource_type: entry
                    .get("service")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            });
        }

        info!(rows = rows.len(), errors = errors.len(), "AWS cost collection complete");

        let partial = !errors.is_empty();
        let batch = MetricBatch::Cost(rows);
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
        let endpoint = export_endpoint(credential, "cost_export_endpoint")?;
        let now = Utc::now();
        fetch_export(&self.http, credential, endpoint, (&now, &now))
            .await
            .map(|_| true)
    }
}

/// AWS resource adapter over the instance export endpoint
pub struct AwsResourceAdapter {
    http: Client,
}

impl AwsResourceAdapter {
    pub fn new() -> Self {
        Self { http: client() }
    }
}

impl Default for AwsResourceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for AwsResourceAdapter {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Aws
    }

    fn data_type(&self) -> DataType {
        DataType::Resource
    }

    fn name(&self) -> &'static str {
        "aws-resource"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        let now = Utc::now();

        let instances = if ctx.credential.metadata.demo {
            json!([
                {"instance_id": "i-0demo1", "instance_type": "m5.xlarge",
                 "vcpus": 4, "memory_gb": 16, "cpu_utilization": 38.5, "state": "running"},
                {"instance_id": "i-0demo2", "instance_type": "t3.large",
                 "vcpus": 2, "memory_gb": 8, "cpu_utilization": 71.2, "state": "running"},
            ])
        } else {
            let endpoint = export_endpoint(&ctx.credential, "resource_export_endpoint")?;
            let body = fetch_export(
                &self.http,
                &ctx.credential,
                endpoint,
                (&ctx.window.since, &ctx.window.until),
            )
            .await?;
            body.get("instances")
                .cloned()
                .ok_or_else(|| AdapterError::Parse("missing instances in export".into()))?
        };

        let mut rows = Vec::new();
        let mut errors = Vec::new();

        for instance in instances.as_array().into_iter().flatten() {
            let Some(id) = instance.get("instance_id").and_then(|v| v.as_str()) else {
                errors.push("instance without instance_id".to_string());
                continue;
            };
            let instance_type = instance
                .get("instance_type")
                .and_then(|v| v.as_str())
                .unwrap_or("");

            for (metric, value) in [
                ("vcpu_count", instance.get("vcpus").and_then(|v| v.as_f64())),
                (
                    "memory_gb",
                    instance.get("memory_gb").and_then(|v| v.as_f64()),
                ),
                (
                    "cpu_utilization",
                    instance.get("cpu_utilization").and_then(|v| v.as_f64()),
                ),
            ] {
                if let Some(value) = value {
                    rows.push(ResourceMetricRow {
                        timestamp: now,
                        customer_id: ctx.customer_id,
                        provider: CloudProvider::Aws,
                        resource_id: id.to_string(),
                        resource_type: format!("instance/{instance_type}"),
                        metric_name: ctx
                            .credential
                            .metadata
                            .canonical_metric_name(metric)
                            .to_string(),
                        metric_value: value,
                    });
                }
            }
        }

        let partial = !errors.is_empty();
        let batch = MetricBatch::Resource(rows);
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
        export_endpoint(credential, "resource_export_endpoint").map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_telemetry::TimeWindow;
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_non_demo_without_endpoint_is_not_configured() {
        let adapter = AwsCostAdapter::new();
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
}
