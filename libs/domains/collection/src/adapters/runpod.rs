//! RunPod adapters
//!
//! Pulls pod spend and inventory from the RunPod GraphQL API.
//! https://docs.runpod.io/reference/graphql-api

use async_trait::async_trait;
use chrono::Utc;
use domain_credentials::DecryptedCredential;
use domain_telemetry::{
    CloudProvider, CostMetricRow, DataType, MetricBatch, ResourceMetricRow,
};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    AdapterError, AdapterOutput, AdapterResult, CollectContext, ProviderAdapter,
};

const RUNPOD_GRAPHQL_URL: &str = "https://api.runpod.io/graphql";
const REQUEST_TIMEOUT_S: u64 = 60;

const PODS_QUERY: &str = r#"
query Pods {
    myself {
        pods {
            id
            name
            desiredStatus
            costPerHr
            gpuCount
            vcpuCount
            memoryInGb
            machine { gpuDisplayName }
        }
    }
}
"#;

fn client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_S))
        .build()
        .expect("reqwest client")
}

fn api_key(credential: &DecryptedCredential) -> AdapterResult<&str> {
    credential
        .secret
        .get("api_key")
        .map(String::as_str)
        .ok_or_else(|| AdapterError::NotConfigured("runpod credential missing api_key".into()))
}

async fn fetch_pods(
    http: &Client,
    credential: &DecryptedCredential,
) -> AdapterResult<Vec<serde_json::Value>> {
    let key = api_key(credential)?;

    let response = http
        .post(RUNPOD_GRAPHQL_URL)
        .query(&[("api_key", key)])
        .json(&json!({ "query": PODS_QUERY }))
        .send()
        .await?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
        return Err(AdapterError::Auth("runpod rejected api_key".into()));
    }
    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(AdapterError::RateLimited(60));
    }
    if !response.status().is_success() {
        return Err(AdapterError::Api(format!(
            "runpod returned {}",
            response.status()
        )));
    }

    let body: serde_json::Value = response.json().await?;

    if let Some(errors) = body.get("errors").and_then(|e| e.as_array()) {
        if !errors.is_empty() {
            return Err(AdapterError::Api(format!("runpod graphql errors: {errors:?}")));
        }
    }

    body.pointer("/data/myself/pods")
        .and_then(|p| p.as_array())
        .cloned()
        .ok_or_else(|| AdapterError::Parse("missing data.myself.pods".into()))
}

/// Deterministic sample pods for demo credentials
fn demo_pods() -> Vec<serde_json::Value> {
    vec![
        json!({
            "id": "demo-pod-a100", "name": "train-llm", "desiredStatus": "RUNNING",
            "costPerHr": 1.89, "gpuCount": 1, "vcpuCount": 16, "memoryInGb": 80,
            "machine": {"gpuDisplayName": "A100 80GB"}
        }),
        json!({
            "id": "demo-pod-4090", "name": "inference", "desiredStatus": "RUNNING",
            "costPerHr": 0.69, "gpuCount": 2, "vcpuCount": 8, "memoryInGb": 32,
            "machine": {"gpuDisplayName": "RTX 4090"}
        }),
    ]
}

/// RunPod cost adapter: pod runtime spend over the window
pub struct RunpodCostAdapter {
    http: Client,
}

impl RunpodCostAdapter {
    pub fn new() -> Self {
        Self { http: client() }
    }
}

impl Default for RunpodCostAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for RunpodCostAdapter {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Runpod
    }

    fn data_type(&self) -> DataType {
        DataType::Cost
    }

    fn name(&self) -> &'static str {
        "runpod-cost"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        let pods = if ctx.credential.metadata.demo {
            debug!("Using demo pod sample for runpod cost collection");
            demo_pods()
        } else {
            fetch_pods(&self.http, &ctx.credential).await?
        };

        let window_hours =
            (ctx.window.until - ctx.window.since).num_minutes().max(0) as f64 / 60.0;

        let mut rows = Vec::new();
        let mut errors = Vec::new();

        for pod in &pods {
            let Some(pod_id) = pod.get("id").and_then(|v| v.as_str()) else {
                errors.push("pod without id in API response".to_string());
                continue;
            };

            // Stopped pods accrue no runtime cost
            let running = pod
                .get("desiredStatus")
                .and_then(|v| v.as_str())
                .is_some_and(|s| s.eq_ignore_ascii_case("running"));
            if !running {
                continue;
            }

            let cost_per_hr = pod.get("costPerHr").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let gpu = pod
                .pointer("/machine/gpuDisplayName")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            rows.push(CostMetricRow {
                timestamp: ctx.window.until,
                customer_id: ctx.customer_id,
                provider: CloudProvider::Runpod,
                instance_id: pod_id.to_string(),
                cost_type: "gpu_compute".to_string(),
                amount: cost_per_hr * window_hours,
                currency: "USD".to_string(),
                resource_type: gpu.to_string(),
            });
        }

        info!(
            pods = pods.len(),
            rows = rows.len(),
            window_hours = window_hours,
            "RunPod cost collection complete"
        );

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
        fetch_pods(&self.http, credential).await.map(|_| true)
    }
}

/// RunPod resource adapter: pod inventory and shape
pub struct RunpodResourceAdapter {
    http: Client,
}

impl RunpodResourceAdapter {
    pub fn new() -> Self {
        Self { http: client() }
    }
}

impl Default for RunpodResourceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for RunpodResourceAdapter {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Runpod
    }

    fn data_type(&self) -> DataType {
        DataType::Resource
    }

    fn name(&self) -> &'static str {
        "runpod-resource"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        let pods = if ctx.credential.metadata.demo {
            demo_pods()
        } else {
            fetch_pods(&self.http, &ctx.credential).await?
        };

        let now = Utc::now();
        let mut rows = Vec::new();

        for pod in &pods {
            let Some(pod_id) = pod.get("id").and_then(|v| v.as_str()) else {
                continue;
            };
            let gpu = pod
                .pointer("/machine/gpuDisplayName")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            for (metric, value) in [
                ("gpu_count", pod.get("gpuCount").and_then(|v| v.as_f64())),
                ("vcpu_count", pod.get("vcpuCount").and_then(|v| v.as_f64())),
                ("memory_gb", pod.get("memoryInGb").and_then(|v| v.as_f64())),
            ] {
                if let Some(value) = value {
                    rows.push(ResourceMetricRow {
                        timestamp: now,
                        customer_id: ctx.customer_id,
                        provider: CloudProvider::Runpod,
                        resource_id: pod_id.to_string(),
                        resource_type: format!("pod/{gpu}"),
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

        Ok(AdapterOutput::complete(MetricBatch::Resource(rows)))
    }

    async fn health_check(&self, credential: &DecryptedCredential) -> AdapterResult<bool> {
        if credential.metadata.demo {
            return Ok(true);
        }
        fetch_pods(&self.http, credential).await.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_telemetry::TimeWindow;
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;

    fn demo_ctx() -> CollectContext {
        CollectContext {
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
        }
    }

    #[tokio::test]
    async fn test_demo_cost_collection_produces_rows() {
        let adapter = RunpodCostAdapter::new();
        let output = adapter.collect(&demo_ctx()).await.unwrap();

        assert!(!output.partial);
        let MetricBatch::Cost(rows) = output.batch else {
            panic!("expected cost batch");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.amount > 0.0));
        assert!(rows.iter().all(|r| r.cost_type == "gpu_compute"));
    }

    #[tokio::test]
    async fn test_demo_resource_collection_produces_rows() {
        let adapter = RunpodResourceAdapter::new();
        let output = adapter.collect(&demo_ctx()).await.unwrap();

        let MetricBatch::Resource(rows) = output.batch else {
            panic!("expected resource batch");
        };
        // 2 pods x 3 shape metrics
        assert_eq!(rows.len(), 6);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_configured() {
        let adapter = RunpodCostAdapter::new();
        let mut ctx = demo_ctx();
        let mut credential = (*ctx.credential).clone();
        credential.metadata.demo = false;
        ctx.credential = Arc::new(credential);

        let err = adapter.collect(&ctx).await.unwrap_err();
        assert!(err.is_credential_failure());
    }
}
