//! GCP cost adapter
//!
//! Pulls spend from a BigQuery billing-export query endpoint named in the
//! credential metadata (the standard detailed-usage export, fronted by a
//! thin query service).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain_credentials::DecryptedCredential;
use domain_telemetry::{CloudProvider, CostMetricRow, DataType, MetricBatch};
use reqwest::Client;
use std::time::Duration;
use tracing::info;

use super::{
    AdapterError, AdapterOutput, AdapterResult, CollectContext, ProviderAdapter,
};

const REQUEST_TIMEOUT_S: u64 = 60;

pub struct GcpCostAdapter {
    http: Client,
}

impl GcpCostAdapter {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_S))
                .build()
                .expect("reqwest client"),
        }
    }

    fn endpoint<'a>(&self, credential: &'a DecryptedCredential) -> AdapterResult<&'a str> {
        credential
            .metadata
            .extra
            .get("billing_export_endpoint")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AdapterError::NotConfigured(
                    "gcp credential metadata missing billing_export_endpoint".into(),
                )
            })
    }

    fn demo_rows(&self, ctx: &CollectContext) -> Vec<CostMetricRow> {
        [
            ("demo-vm-1", "Compute Engine", "compute", 2.84),
            ("", "Cloud Storage", "storage", 0.19),
            ("", "BigQuery", "analytics", 0.55),
        ]
        .into_iter()
        .map(|(resource, service, cost_type, amount)| CostMetricRow {
            timestamp: ctx.window.until,
            customer_id: ctx.customer_id,
            provider: CloudProvider::Gcp,
            instance_id: resource.to_string(),
            cost_type: cost_type.to_string(),
            amount,
            currency: "USD".to_string(),
            resource_type: service.to_string(),
        })
        .collect()
    }
}

impl Default for GcpCostAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for GcpCostAdapter {
    fn provider(&self) -> CloudProvider {
        CloudProvider::Gcp
    }

    fn data_type(&self) -> DataType {
        DataType::Cost
    }

    fn name(&self) -> &'static str {
        "gcp-cost"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        if ctx.credential.metadata.demo {
            return Ok(AdapterOutput::complete(MetricBatch::Cost(
                self.demo_rows(ctx),
            )));
        }

        let endpoint = self.endpoint(&ctx.credential)?;
        let token = ctx
            .credential
            .secret
            .get("service_account_token")
            .map(String::as_str)
            .ok_or_else(|| {
                AdapterError::NotConfigured("gcp credential missing service_account_token".into())
            })?;

        let response = self
            .http
            .get(endpoint)
            .bearer_auth(token)
            .query(&[
                ("start", ctx.window.since.to_rfc3339()),
                ("end", ctx.window.until.to_rfc3339()),
            ])
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(AdapterError::Auth("gcp billing export rejected token".into()));
            }
            status if !status.is_success() => {
                return Err(AdapterError::Api(format!("gcp export returned {status}")));
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await?;
        let entries = body
            .get("rows")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AdapterError::Parse("missing rows in export response".into()))?;

        let mut rows = Vec::new();
        let mut errors = Vec::new();

        for entry in entries {
            let timestamp = entry
                .get("usage_start_time")
                .and_then(|v| v.as_str())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let amount = entry.get("cost").and_then(|v| v.as_f64());

            let (Some(timestamp), Some(amount)) = (timestamp, amount) else {
                errors.push(format!("unparseable export row: {entry}"));
                continue;
            };

            rows.push(CostMetricRow {
                timestamp,
                customer_id: ctx.customer_id,
                provider: CloudProvider::Gcp,
                instance_id: entry
                    .get("resource_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                cost_type: entry
                    .get("sku_description")
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
                    .get("service_description")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            });
        }

        info!(rows = rows.len(), errors = errors.len(), "GCP cost collection complete");

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
        self.endpoint(credential).map(|_| true)
    }
}
