//! The agent's side of the peer approval protocol.
//!
//! Each domain votes on a proposal through the lens of its own telemetry.
//! No external model is involved; the vote is a heuristic over recent
//! reader aggregates, which keeps approvals deterministic and fast.

use axum::extract::State;
use axum::Json;
use domain_agents::{AgentType, ApprovalVote, Recommendation};
use domain_telemetry::{
    ApplicationReader, CostReader, PerformanceReader, ResourceReader, TimeWindow,
};
use tracing::info;

use crate::state::AppState;

const VOTE_WINDOW_HOURS: i64 = 24;

/// `POST /{domain}/approve`: evaluate a peer's recommendation
pub async fn approve(
    State(state): State<AppState>,
    Json(recommendation): Json<Recommendation>,
) -> Json<ApprovalVote> {
    let vote = evaluate(&state, &recommendation).await;

    info!(
        recommendation_id = %recommendation.id,
        approved = vote.approved,
        confidence = vote.confidence,
        "Cast approval vote"
    );

    Json(vote)
}

async fn evaluate(state: &AppState, recommendation: &Recommendation) -> ApprovalVote {
    let window = TimeWindow::last_hours(VOTE_WINDOW_HOURS);
    let customer_id = recommendation.customer_id;

    // Without a provider on the recommendation payload, assume the
    // proposing agent scoped it; default to aws for the telemetry lens.
    let provider = recommendation
        .payload
        .get("provider")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(domain_telemetry::CloudProvider::Aws);

    let (approved, confidence, rationale) = match state.agent_type {
        AgentType::Cost => {
            // A proposal is attractive to the cost lens when estimated
            // savings are meaningful relative to current spend.
            match state.cost_reader.total_cost(customer_id, provider, window).await {
                Ok(total) if total > 0.0 => {
                    let savings = recommendation.estimated_savings_pct.unwrap_or(0.0);
                    if savings >= 5.0 {
                        (true, 0.9, format!("estimated {savings:.0}% savings on ${total:.2} spend"))
                    } else {
                        (true, 0.7, "marginal savings".to_string())
                    }
                }
                Ok(_) => (true, 0.6, "no recent spend to protect".to_string()),
                Err(e) => (false, 0.3, format!("cost telemetry unavailable: {e}")),
            }
        }
        AgentType::Performance => {
            match state
                .performance_reader
                .summary(customer_id, provider, window)
                .await
            {
                Ok(summary) => {
                    let p95 = summary
                        .metrics
                        .get("request_latency_p95")
                        .map(|m| m.avg)
                        .unwrap_or(0.0);
                    if p95 > 1.0 {
                        (
                            false,
                            0.4,
                            format!("p95 latency already degraded at {p95:.2}s"),
                        )
                    } else {
                        (true, 0.92, format!("latency headroom, p95 {p95:.3}s"))
                    }
                }
                Err(e) => (false, 0.3, format!("performance telemetry unavailable: {e}")),
            }
        }
        AgentType::Resource => {
            match state
                .resource_reader
                .summary(customer_id, provider, window)
                .await
            {
                Ok(summary) => {
                    if summary.max_cpu_utilization > 90.0 {
                        (
                            false,
                            0.5,
                            format!(
                                "fleet already saturated, max cpu {:.0}%",
                                summary.max_cpu_utilization
                            ),
                        )
                    } else {
                        (
                            true,
                            0.95,
                            format!(
                                "{} instances, avg cpu {:.0}%",
                                summary.total_instances, summary.avg_cpu_utilization
                            ),
                        )
                    }
                }
                Err(e) => (false, 0.3, format!("resource telemetry unavailable: {e}")),
            }
        }
        AgentType::Application => {
            match state
                .application_reader
                .average_score(customer_id, provider, "quality".to_string(), window)
                .await
            {
                Ok(Some(score)) if score < 0.5 => (
                    false,
                    0.4,
                    format!("application quality already low at {score:.2}"),
                ),
                Ok(Some(score)) => (true, 0.9, format!("quality stable at {score:.2}")),
                Ok(None) => (true, 0.75, "no quality samples to protect".to_string()),
                Err(e) => (false, 0.3, format!("application telemetry unavailable: {e}")),
            }
        }
    };

    ApprovalVote {
        approving_agent_type: state.agent_type,
        approved,
        confidence,
        rationale,
    }
}
