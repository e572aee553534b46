//! Vultr adapters
//!
//! Pulls billing history and instance inventory from the Vultr v2 REST API.
//! https://www.vultr.com/api/

use async_trait::async_trait;
use chrono::{DateTime, Utc};
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

const VULTR_API_BASE: &str = "https://api.vultr.com/v2";
const REQUEST_TIMEOUT_S: u64 = 60;

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
        .ok_or_else(|| AdapterError::NotConfigured("vultr credential missing api_key".into()))
}

async fn get_json(
    http: &Client,
    credential: &DecryptedCredential,
    path: &str,
    query: &[(&str, String)],
) -> AdapterResult<serde_json::Value> {
    let key = api_key(credential)?;

    let response = http
        .get(format!("{VULTR_API_BASE}{path}"))
        .bearer_auth(key)
        .query(query)
        .send()
        .await?;

    match response.status() {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            return Err(AdapterError::Auth("vultr rejected api key".into()));
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            return Err(AdapterError::RateLimited(30));
        }
        status if !status.is_success() => {
            return Err(AdapterError::Api(format!("vultr returned {status}")));
        }
        _ => {}
    }

    Ok(response.json().await?)
}

fn demo_billing() -> serde_json::Value {
    json!({
        "billing_history": [
            {"id": 1, "date": Utc::now().to_rfc3339(), "type": "charge",
             "description": "vc2-4c-8gb (demo-web-1)", "amount": -0.36},
            {"id": 2, "date": Utc::now().to_rfc3339(), "type": "charge",
             "description": "block storage 100GB", "amount": -0.02},
        ]
    })
}

fn demo_instances() -> serde_json::Value {
    json!({
        "instances": [
            {"id": "demo-web-1", "label": "web-1", "plan": "vc2-4c-8gb",
             "vcpu_count": 4, "ram": 8192, "disk": 160, "status": "active",
             "power_status": "running"},
            {"id": "demo-db-1", "label": "db-1", "plan": "vc2-8c-16gb",
             "vcpu_count": 8, "ram": 16384, "disk": 320, "status": "active",
             "power_status": "running"},
        ]
    })
}

/// Vultr cost adapter over /billing/history.
///
/// The API reports charges as negative amounts; rows land with the
/// absolute value. The `meta.links.next` cursor is handed back to the
/// scheduler for the next tick.
pub struct VultrCostAdapter {
    http: Client,
}

impl VultrCostAdapter {
    pub fn new() -> Self {
        Self { http: client() }
    }

    fn parse_billing(
        &self,
        body: &serde_json::Value,
        ctx: &CollectContext,
    ) -> (Vec<CostMetricRow>, Vec<String>) {
        let mut rows = Vec::new();
        let mut errors = Vec::new();

        let Some(entries) = body.get("billing_history").and_then(|v| v.as_array()) else {
            errors.push("missing billing_history in response".to_string());
            return (rows, errors);
        };

        for entry in entries {
            if entry.get("type").and_then(|v| v.as_str()) != Some("charge") {
                continue;
            }

            let timestamp = entry
                .get("date")
                .and_then(|v| v.as_str())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));

            let Some(timestamp) = timestamp else {
                errors.push(format!("unparseable billing date: {entry}"));
                continue;
            };

            // Only charges inside the window; the API pages newest-first
            if timestamp < ctx.window.since || timestamp >= ctx.window.until {
                continue;
            }

            let amount = entry.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let description = entry
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("");

            rows.push(CostMetricRow {
                timestamp,
                customer_id: ctx.customer_id,
                provider: CloudProvider::Vultr,
                instance_id: entry
                    .get("id")
                    .map(|v| v.to_string().trim_matches('"').to_string())
                    .unwrap_or_default(),
                cost_type: if description.contains("storage") {
                    "storage".to_string()
                } else {
                    "compute".to_string()
                },
                amount: amount.abs(),
                currency: "USD".to_string(),
                resource_type: description.to_string(),
            });
        }

        (rows, errors)
    }
}

impl Default for VultrCostAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for VultrCostAdapter {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Vultr
    }

    fn data_type(&self) -> DataType {
        DataType::Cost
    }

    fn name(&self) -> &'static str {
        "vultr-cost"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        let body = if ctx.credential.metadata.demo {
            debug!("Using demo billing sample for vultr cost collection");
            demo_billing()
        } else {
            let mut query = vec![("per_page", "500".to_string())];
            if let Some(cursor) = &ctx.cursor {
                query.push(("cursor", cursor.clone()));
            }
            get_json(&self.http, &ctx.credential, "/billing/history", &query).await?
        };

        let (rows, errors) = self.parse_billing(&body, ctx);

        let next_cursor = body
            .pointer("/meta/links/next")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from);

        info!(rows = rows.len(), "Vultr cost collection complete");

        let partial = !errors.is_empty();
        let batch = MetricBatch::Cost(rows);
        let output = if partial {
            AdapterOutput::partial(batch, errors)
        } else {
            AdapterOutput::complete(batch)
        };
        Ok(output.with_cursor(next_cursor))
    }

    async fn health_check(&self, credential: &DecryptedCredential) -> AdapterResult<bool> {
        if credential.metadata.demo {
            return Ok(true);
        }
        get_json(&self.http, credential, "/account", &[])
            .await
            .map(|_| true)
    }
}

/// Vultr resource adapter over /instances
pub struct VultrResourceAdapter {
    http: Client,
}

impl VultrResourceAdapter {
    pub fn new() -> Self {
        Self { http: client() }
    }
}

impl Default for VultrResourceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for VultrResourceAdapter {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Vultr
    }

    fn data_type(&self) -> DataType {
        DataType::Resource
    }

    fn name(&self) -> &'static str {
        "vultr-resource"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        let body = if ctx.credential.metadata.demo {
            demo_instances()
        } else {
            get_json(
                &self.http,
                &ctx.credential,
                "/instances",
                &[("per_page", "500".to_string())],
            )
            .await?
        };

        let now = Utc::now();
        let mut rows = Vec::new();
        let mut errors = Vec::new();

        let Some(instances) = body.get("instances").and_then(|v| v.as_array()) else {
            return Ok(AdapterOutput::partial(
                MetricBatch::Resource(rows),
                vec!["missing instances in response".to_string()],
            ));
        };

        for instance in instances {
            let Some(id) = instance.get("id").and_then(|v| v.as_str()) else {
                errors.push("instance without id in API response".to_string());
                continue;
            };
            let plan = instance.get("plan").and_then(|v| v.as_str()).unwrap_or("");
            let running = instance
                .get("power_status")
                .and_then(|v| v.as_str())
                .is_some_and(|s| s == "running");

            for (metric, value) in [
                (
                    "vcpu_count",
                    instance.get("vcpu_count").and_then(|v| v.as_f64()),
                ),
                (
                    "memory_gb",
                    instance.get("ram").and_then(|v| v.as_f64()).map(|mb| mb / 1024.0),
                ),
                ("disk_gb", instance.get("disk").and_then(|v| v.as_f64())),
                ("running", Some(if running { 1.0 } else { 0.0 })),
            ] {
                if let Some(value) = value {
                    rows.push(ResourceMetricRow {
                        timestamp: now,
                        customer_id: ctx.customer_id,
                        provider: CloudProvider::Vultr,
                        resource_id: id.to_string(),
                        resource_type: format!("instance/{plan}"),
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
        get_json(&self.http, credential, "/account", &[])
            .await
            .map(|_| true)
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
                provider: CloudProvider::Vultr,
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
    async fn test_demo_billing_rows_in_window() {
        let adapter = VultrCostAdapter::new();
        let output = adapter.collect(&demo_ctx()).await.unwrap();

        let MetricBatch::Cost(rows) = output.batch else {
            panic!("expected cost batch");
        };
        assert_eq!(rows.len(), 2);
        // charges land as positive spend
        assert!(rows.iter().all(|r| r.amount > 0.0));
    }

    #[tokio::test]
    async fn test_demo_instances_include_running_flag() {
        let adapter = VultrResourceAdapter::new();
        let output = adapter.collect(&demo_ctx()).await.unwrap();

        let MetricBatch::Resource(rows) = output.batch else {
            panic!("expected resource batch");
        };
        assert!(rows
            .iter()
            .any(|r| r.metric_name == "running" && r.metric_value == 1.0));
    }
}
