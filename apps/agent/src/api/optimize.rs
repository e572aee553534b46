//! Optimization trigger and collection proxy endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_helpers::errors::error_response;
use domain_agents::CreateRecommendation;
use domain_telemetry::CloudProvider;
use domain_workflows::{ExecutionReport, RunRequest};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::state::AppState;
use crate::workflows;

#[derive(Debug, Deserialize, ToSchema)]
pub struct OptimizeRequest {
    pub customer_id: uuid::Uuid,
    pub provider: CloudProvider,
    pub recommendation_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub estimated_savings_pct: Option<f64>,
    #[serde(default)]
    pub payload: Value,
}

/// Propose and execute an optimization: create the recommendation, run
/// the workflow (approval gate + gradual rollout), and write the outcome
/// back to semantic memory.
pub async fn optimize(
    State(state): State<AppState>,
    Json(request): Json<OptimizeRequest>,
) -> axum::response::Response {
    let mut payload = request.payload.clone();
    if let Some(map) = payload.as_object_mut() {
        map.insert("provider".to_string(), serde_json::json!(request.provider));
    }

    let recommendation = match state
        .optimizations
        .create_recommendation(CreateRecommendation {
            customer_id: request.customer_id,
            agent_type: state.agent_type,
            recommendation_type: request.recommendation_type.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
            estimated_savings_pct: request.estimated_savings_pct,
            payload,
        })
        .await
    {
        Ok(recommendation) => recommendation,
        Err(e) => return e.into_response(),
    };

    info!(
        recommendation_id = %recommendation.id,
        optimization_id = %recommendation.optimization_id,
        "Recommendation proposed, starting workflow"
    );

    let definition = workflows::definition_for(
        &request.recommendation_type,
        request.customer_id,
        request.provider,
        state.resource_reader.clone(),
    );

    let run_request = RunRequest {
        customer_id: request.customer_id,
        provider: request.provider,
        agent_id: state.agent_id,
        recommendation_id: recommendation.id,
    };

    let report: ExecutionReport = match state.engine.run(&definition, &run_request).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Workflow execution failed");
            return e.into_response();
        }
    };

    workflows::write_back_memory(
        &state.memory,
        state.agent_type,
        &report,
        &recommendation,
        request.provider,
    )
    .await;

    Json(report).into_response()
}

/// Proxy a collection trigger for this agent's domain to the
/// orchestrator, which owns the scheduler.
pub async fn trigger_collection(
    State(state): State<AppState>,
    Json(mut body): Json<Value>,
) -> axum::response::Response {
    // The agent's domain fixes the data type
    if let Some(map) = body.as_object_mut() {
        map.entry("data_types")
            .or_insert_with(|| serde_json::json!([state.agent_type.to_string()]));
    }

    let client = crate::orchestrator_client::OrchestratorClient::new(
        state.http.clone(),
        state.config.orchestrator_url.clone(),
    );

    match client.trigger_collection(body).await {
        Ok((status, body)) => (status, Json(body)).into_response(),
        Err(e) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "orchestrator unreachable",
            Some(e.to_string()),
        ),
    }
}
