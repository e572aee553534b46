//! Application-quality adapter
//!
//! Pulls quality/hallucination/toxicity samples from the customer's
//! evaluation endpoint (credential metadata `application_endpoint`).
//! Expected shape: `{"samples": [{"timestamp", "application_id",
//! "metric_type", "score", "model_name", ...}]}`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain_credentials::DecryptedCredential;
use domain_telemetry::{ApplicationMetricRow, CloudProvider, DataType, MetricBatch};
use reqwest::Client;
use std::time::Duration;
use tracing::info;

use super::{
    AdapterError, AdapterOutput, AdapterResult, CollectContext, ProviderAdapter,
};

const REQUEST_TIMEOUT_S: u64 = 60;

pub struct ApplicationQualityAdapter {
    provider: CloudProvider,
    http: Client,
}

impl ApplicationQualityAdapter {
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
            .application_endpoint
            .as_deref()
            .ok_or_else(|| {
                AdapterError::NotConfigured(
                    "credential metadata missing application_endpoint".into(),
                )
            })
    }

    fn demo_rows(&self, ctx: &CollectContext) -> Vec<ApplicationMetricRow> {
        [
            ("quality", 0.91),
            ("hallucination", 0.04),
            ("toxicity", 0.01),
        ]
        .into_iter()
        .map(|(metric_type, score)| ApplicationMetricRow {
            timestamp: ctx.window.until,
            customer_id: ctx.customer_id,
            provider: self.provider,
            application_id: "demo-app".to_string(),
            metric_type: metric_type.to_string(),
            score,
            model_name: "demo-model".to_string(),
            prompt_text: String::new(),
            response_text: String::new(),
            metadata: serde_json::json!({}),
        })
        .collect()
    }
}

#[async_trait]
impl ProviderAdapter for ApplicationQualityAdapter {
    fn provider(&self) -> CloudProvider {
        self.provider
    }

    fn data_type(&self) -> DataType {
        DataType::Application
    }

    fn name(&self) -> &'static str {
        "application-quality"
    }

    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput> {
        if ctx.credential.metadata.demo {
            return Ok(AdapterOutput::complete(MetricBatch::Application(
                self.demo_rows(ctx),
            )));
        }

        let endpoint = self.endpoint(&ctx.credential)?;

        let mut request = self.http.get(endpoint).query(&[
            ("since", ctx.window.since.to_rfc3339()),
            ("until", ctx.window.until.to_rfc3339()),
        ]);
        if let Some(token) = ctx.credential.secret.get("application_token") {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(AdapterError::Auth("application endpoint rejected token".into()));
            }
            status if !status.is_success() => {
                return Err(AdapterError::Api(format!(
                    "application endpoint returned {status}"
                )));
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await?;
        let samples = body
            .get("samples")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AdapterError::Parse("missing samples in response".into()))?;

        let mut rows = Vec::new();
        let mut errors = Vec::new();

        for sample in samples {
            let timestamp = sample
                .get("timestamp")
                .and_then(|v| v.as_str())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let metric_type = sample.get("metric_type").and_then(|v| v.as_str());
            let score = sample.get("score").and_then(|v| v.as_f64());

            let (Some(timestamp), Some(metric_type), Some(score)) =
                (timestamp, metric_type, score)
            else {
                errors.push(format!("unparseable sample: {sample}"));
                continue;
            };

            rows.push(ApplicationMetricRow {
                timestamp,
                customer_id: ctx.customer_id,
                provider: self.provider,
                application_id: sample
                    .get("application_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                metric_type: metric_type.to_string(),
                score,
                model_name: sample
                    .get("model_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                prompt_text: sample
                    .get("prompt_text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                response_text: sample
                    .get("response_text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                metadata: sample.get("metadata").cloned().unwrap_or(serde_json::json!({})),
            });
        }

        info!(
            provider = %self.provider,
            rows = rows.len(),
            errors = errors.len(),
            "Application-quality collection complete"
        );

        let partial = !errors.is_empty();
        let batch = MetricBatch::Application(rows);
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
