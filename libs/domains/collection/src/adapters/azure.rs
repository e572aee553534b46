//! Azure cost adapter
//!
//! Pulls spend through the Cost Management query API with a pre-issued
//! bearer token from the credential payload.
//! https://learn.microsoft.com/en-us/rest/api/cost-management/query/usage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain_credentials::DecryptedCredential;
use domain_telemetry::{CloudProvider, CostMetricRow, DataType, MetricBatch};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use super::{
    AdapterError, AdapterOutput, AdapterResult, CollectContext, ProviderAdapter,
};

const AZURE_MANAGEMENT_BASE: &str = "https://management.azure.com";
const COST_QUERY_API_VERSION: &str = "2023-11-01";
const REQUEST_TIMEOUT_S: u64 = 60;

pub struct AzureCostAdapter {
    http: Client,
}

impl AzureCostAdapter {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_S))
                .build()
                .expect("reqwest client"),
        }
    }

    fn demo_rows(&self, ctx: &CollectContext) -> Vec<CostMetricRow> {
        [
            ("demo-vm-d4s", "Virtual Machines", "compute", 3.12),
            ("", "Storage", "storage", 0.27),
            ("", "Azure Monitor", "observability", 0.08),
        ]
        .into_iter()
        .map(|(resource, service, cost_type, amount)| CostMetricRow {
            timestamp: ctx.window.until,
            customer_id: ctx.customer_id,
            provider: CloudProvider::Azure,
            instance_id: resource.to_string(),
            cost_type: cost_type.to_string(),
            amount,
            currency: "USD".to_string(),
            resource_type: service.to_string(),
        })
        .collect()
    }
}

impl Default for AzureCostAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for AzureCostAdapter {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Azure
    }

    fn data_type(&self) -> DataType {
        DataType::Cost
    }

    fn name(&self) -> &'static str {
        "azure-cost"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        if ctx.credential.metadata.demo {
            return Ok(AdapterOutput::complete(MetricBatch::Cost(
                self.demo_rows(ctx),
            )));
        }

        let subscription_id = ctx
            .credential
            .secret
            .get("subscription_id")
            .map(String::as_str)
            .ok_or_else(|| {
                AdapterError::NotConfigured("azure credential missing subscription_id".into())
            })?;
        let token = ctx
            .credential
            .secret
            .get("access_token")
            .map(String::as_str)
            .ok_or_else(|| {
                AdapterError::NotConfigured("azure credential missing access_token".into())
            })?;

        let url = format!(
            "{AZURE_MANAGEMENT_BASE}/subscriptions/{subscription_id}/providers/Microsoft.CostManagement/query"
        );

        let query = json!({
            "type": "ActualCost",
            "timeframe": "Custom",
            "timePeriod": {
                "from": ctx.window.since.to_rfc3339(),
                "to": ctx.window.until.to_rfc3339(),
            },
            "dataset": {
                "granularity": "Daily",
                "aggregation": { "totalCost": { "name": "Cost", "function": "Sum" } },
                "grouping": [
                    { "type": "Dimension", "name": "ServiceName" },
                    { "type": "Dimension", "name": "ResourceId" }
                ]
            }
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .query(&[("api-version", COST_QUERY_API_VERSION)])
            .json(&query)
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(AdapterError::Auth("azure rejected access token".into()));
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                return Err(AdapterError::RateLimited(60));
            }
            status if !status.is_success() => {
                return Err(AdapterError::Api(format!("azure returned {status}")));
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await?;

        // Response shape: properties.columns names the positional layout of
        // properties.rows.
        let columns: Vec<&str> = body
            .pointer("/properties/columns")
            .and_then(|v| v.as_array())
            .map(|cols| {
                cols.iter()
                    .filter_map(|c| c.get("name").and_then(|n| n.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let cost_idx = columns.iter().position(|c| *c == "Cost");
        let date_idx = columns.iter().position(|c| *c == "UsageDate");
        let service_idx = columns.iter().position(|c| *c == "ServiceName");
        let resource_idx = columns.iter().position(|c| *c == "ResourceId");

        let (Some(cost_idx), Some(date_idx)) = (cost_idx, date_idx) else {
            return Err(AdapterError::Parse("missing Cost/UsageDate columns".into()));
        };

        let mut rows = Vec::new();
        let mut errors = Vec::new();

        for entry in body
            .pointer("/properties/rows")
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
        {
            let Some(cells) = entry.as_array() else {
                errors.push(format!("non-array row: {entry}"));
                continue;
            };

            let amount = cells.get(cost_idx).and_then(|v| v.as_f64());
            // UsageDate arrives as yyyymmdd
            let timestamp = cells
                .get(date_idx)
                .and_then(|v| v.as_i64())
                .map(|d| d.to_string())
                .filter(|s| s.len() == 8)
                .and_then(|s| {
                    DateTime::parse_from_rfc3339(&format!(
                        "{}-{}-{}T00:00:00Z",
                        &s[0..4],
                        &s[4..6],
                        &s[6..8]
                    ))
                    .ok()
                })
                .map(|dt| dt.with_timezone(&Utc));

            let (Some(amount), Some(timestamp)) = (amount, timestamp) else {
                errors.push(format!("unparseable cost row: {entry}"));
                continue;
            };

            rows.push(CostMetricRow {
                timestamp,
                customer_id: ctx.customer_id,
                provider: CloudProvider::Azure,
                instance_id: resource_idx
                    .and_then(|i| cells.get(i))
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                cost_type: "usage".to_string(),
                amount,
                currency: "USD".to_string(),
                resource_type: service_idx
                    .and_then(|i| cells.get(i))
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            });
        }

        info!(rows = rows.len(), errors = errors.len(), "Azure cost collection complete");

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
        if credential.secret.contains_key("subscription_id")
            && credential.secret.contains_key("access_token")
        {
            Ok(true)
        } else {
            Err(AdapterError::NotConfigured(
                "azure credential missing subscription_id/access_token".into(),
            ))
        }
    }
}
