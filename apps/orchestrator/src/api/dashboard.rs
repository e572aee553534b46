//! The dashboard aggregation endpoint.
//!
//! Fans out to the four readers in parallel, merges, and degrades to a
//! partial response with per-component error hints when a reader fails.
//! Every numeric value is sanitized before leaving; the time-series store
//! can hand back NaN/Inf aggregates.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::Json;
use domain_telemetry::{
    sanitize_f64, ApplicationReader, CloudProvider, CostReader, PerformanceReader,
    ResourceReader, TimeWindow, TrendPoint,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::state::AppState;

const DEFAULT_WINDOW_HOURS: i64 = 24;
const RECOMMENDATIONS_LIMIT: u64 = 20;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DashboardQuery {
    pub customer_id: Uuid,
    pub provider: Option<CloudProvider>,
    pub hours: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_cost: f64,
    pub total_instances: u64,
    pub providers: Vec<CloudProvider>,
    pub avg_cpu_utilization: f64,
    pub max_cpu_utilization: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub agents: Vec<domain_agents::Agent>,
    pub cost_trend: Vec<TrendPoint>,
    pub performance_metrics: HashMap<String, Value>,
    pub recommendations: Vec<domain_agents::Recommendation>,
    pub summary: DashboardSummary,
    /// Per-component failure hints; present only on partial responses
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub errors: HashMap<String, String>,
}

/// `GET /api/v1/dashboard?customer_id&provider?&hours?`
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    params(DashboardQuery),
    responses((status = 200, body = DashboardResponse)),
    tag = "dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardResponse> {
    let window = TimeWindow::last_hours(query.hours.unwrap_or(DEFAULT_WINDOW_HOURS));
    let customer_id = query.customer_id;
    let mut errors = HashMap::new();

    // Which providers the dashboard covers: the requested one, or every
    // provider with spend in the window
    let providers = match query.provider {
        Some(provider) => vec![provider],
        None => match state
            .cost_reader
            .providers_with_spend(customer_id, window)
            .await
        {
            Ok(providers) => providers,
            Err(e) => {
                errors.insert("providers".to_string(), e.to_string());
                Vec::new()
            }
        },
    };

    // Fan out per provider; each provider's reads run concurrently
    let mut total_cost = 0.0;
    let mut trend_by_bucket: HashMap<i64, f64> = HashMap::new();
    let mut performance_metrics: HashMap<String, Value> = HashMap::new();
    let mut total_instances = 0u64;
    let mut cpu_avgs: Vec<f64> = Vec::new();
    let mut max_cpu = 0.0f64;

    for provider in &providers {
        let (cost_total, cost_trend, performance, resources) = tokio::join!(
            state.cost_reader.total_cost(customer_id, *provider, window),
            state
                .cost_reader
                .hourly_trend(customer_id, *provider, window),
            state
                .performance_reader
                .summary(customer_id, *provider, window),
            state.resource_reader.summary(customer_id, *provider, window),
        );

        match cost_total {
            Ok(total) => total_cost += total,
            Err(e) => {
                warn!(provider = %provider, error = %e, "Cost total read failed");
                errors.insert(format!("cost:{provider}"), e.to_string());
            }
        }

        match cost_trend {
            Ok(points) => {
                for point in points {
                    *trend_by_bucket.entry(point.bucket.timestamp()).or_default() += point.value;
                }
            }
            Err(e) => {
                errors.insert(format!("cost_trend:{provider}"), e.to_string());
            }
        }

        match performance {
            Ok(summary) => {
                for (metric, aggregate) in summary.metrics {
                    performance_metrics.insert(
                        format!("{provider}:{metric}"),
                        json!({
                            "avg": sanitize_f64(aggregate.avg),
                            "max": sanitize_f64(aggregate.max),
                            "sample_count": aggregate.sample_count,
                        }),
                    );
                }
            }
            Err(e) => {
                errors.insert(format!("performance:{provider}"), e.to_string());
            }
        }

        match resources {
            Ok(summary) => {
                total_instances += summary.total_instances;
                if summary.total_instances > 0 {
                    cpu_avgs.push(summary.avg_cpu_utilization);
                }
                max_cpu = max_cpu.max(summary.max_cpu_utilization);
            }
            Err(e) => {
                errors.insert(format!("resource:{provider}"), e.to_string());
            }
        }
    }

    // Agent roster and open recommendations run independently
    let (agents, recommendations) = tokio::join!(
        state.lifecycle.list(),
        state
            .optimizations
            .list_recommendations(customer_id, None, RECOMMENDATIONS_LIMIT),
    );

    let agents = agents.unwrap_or_else(|e| {
        errors.insert("agents".to_string(), e.to_string());
        Vec::new()
    });
    let recommendations = recommendations.unwrap_or_else(|e| {
        errors.insert("recommendations".to_string(), e.to_string());
        Vec::new()
    });

    let mut cost_trend: Vec<TrendPoint> = trend_by_bucket
        .into_iter()
        .filter_map(|(ts, value)| {
            chrono::DateTime::from_timestamp(ts, 0).map(|bucket| TrendPoint::new(bucket, value))
        })
        .collect();
    cost_trend.sort_by_key(|p| p.bucket);

    let avg_cpu_utilization = if cpu_avgs.is_empty() {
        0.0
    } else {
        cpu_avgs.iter().sum::<f64>() / cpu_avgs.len() as f64
    };

    Json(DashboardResponse {
        agents,
        cost_trend,
        performance_metrics,
        recommendations,
        summary: DashboardSummary {
            total_cost: sanitize_f64(total_cost),
            total_instances,
            providers,
            avg_cpu_utilization: sanitize_f64(avg_cpu_utilization),
            max_cpu_utilization: sanitize_f64(max_cpu),
        },
        errors,
    })
}
