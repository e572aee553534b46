//! The workflow engine.
//!
//! A run expands its definition into a linear plan: every rollout phase
//! replays the ordered step list at that phase's percentage. The
//! checkpoint is an index into that plan, so a crashed engine restarted
//! with the same definition resumes exactly after the last completed
//! entry. Quality is probed between phases; a regression past the
//! configured threshold rolls the run back by invoking each completed
//! step's undo in reverse order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use core_config::rollout::RolloutConfig;
use domain_agents::{
    AgentRepository, AgentRunStatus, ApprovalDecision, ApprovalPolicy, ApprovalVote,
    OptimizationOutcome, OptimizationRepository, Recommendation, RecommendationStatus,
};
use domain_telemetry::CloudProvider;
use observability::AgentMetrics;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{RunRequest, StepStatus, WorkflowDefinition, WorkflowExecution, WorkflowStatus};
use crate::repository::WorkflowRepository;

const LOCK_RETRIES: u32 = 3;
const LOCK_RETRY_DELAY_MS: u64 = 500;

/// What one step execution hands back: its output and the undo data the
/// engine replays on rollback.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub output: Value,
    pub undo: Value,
}

/// Context handed to every step invocation
#[derive(Debug, Clone)]
pub struct StepContext {
    pub execution_id: Uuid,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    /// Percentage of the fleet this phase touches
    pub phase_pct: u8,
    pub recommendation: Recommendation,
}

/// One node of the workflow graph
#[async_trait]
pub trait WorkflowStep: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, ctx: &StepContext) -> WorkflowResult<StepOutcome>;

    /// Reverse a previously completed execution using its captured undo
    /// data
    async fn undo(&self, ctx: &StepContext, undo: &Value) -> WorkflowResult<()>;
}

/// Fan-out to peer agents for approval votes. The orchestrator owns the
/// HTTP plumbing; the engine only sees votes.
#[async_trait]
pub trait PeerApprover: Send + Sync {
    async fn gather_votes(&self, recommendation: &Recommendation) -> Vec<ApprovalVote>;
}

/// Application-quality probe consulted between rollout phases
#[async_trait]
pub trait QualityProbe: Send + Sync {
    /// Mean quality score over the recent window, None when no samples
    async fn quality_score(&self, customer_id: Uuid, provider: CloudProvider) -> Option<f64>;
}

/// Terminal report of a run
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecutionReport {
    pub execution_id: Uuid,
    pub status: WorkflowStatus,
    pub approval: Option<ApprovalDecision>,
    pub baseline_quality: Option<f64>,
    pub final_quality: Option<f64>,
    pub detail: String,
}

pub struct WorkflowEngine {
    repo: Arc<dyn WorkflowRepository>,
    agents: Arc<dyn AgentRepository>,
    optimizations: Arc<dyn OptimizationRepository>,
    approver: Arc<dyn PeerApprover>,
    quality: Arc<dyn QualityProbe>,
    policy: ApprovalPolicy,
    rollout: RolloutConfig,
}

impl WorkflowEngine {
    pub fn new(
        repo: Arc<dyn WorkflowRepository>,
        agents: Arc<dyn AgentRepository>,
        optimizations: Arc<dyn OptimizationRepository>,
        approver: Arc<dyn PeerApprover>,
        quality: Arc<dyn QualityProbe>,
        rollout: RolloutConfig,
    ) -> Self {
        let policy = ApprovalPolicy::new(rollout.approval_min_confidence);
        Self {
            repo,
            agents,
            optimizations,
            approver,
            quality,
            policy,
            rollout,
        }
    }

    /// Start a fresh run: approval gate, then phased execution.
    pub async fn run(
        &self,
        definition: &WorkflowDefinition,
        request: &RunRequest,
    ) -> WorkflowResult<ExecutionReport> {
        if definition.steps.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "workflow definition has no steps".to_string(),
            ));
        }

        let execution = self
            .repo
            .create_execution(
                &definition.workflow_type,
                request.customer_id,
                Some(request.agent_id),
                Some(request.recommendation_id),
                json!({ "phases": self.rollout.phases, "resource": definition.resource }),
            )
            .await?;

        self.agents
            .add_active_workflow(request.agent_id, execution.id)
            .await?;
        self.agents
            .set_run_status(request.agent_id, AgentRunStatus::Busy)
            .await?;

        self.drive(execution, definition, request).await
    }

    /// Resume a checkpointed run after a crash. The same definition must
    /// be supplied; completed plan entries are skipped.
    pub async fn resume(
        &self,
        execution_id: Uuid,
        definition: &WorkflowDefinition,
        request: &RunRequest,
    ) -> WorkflowResult<ExecutionReport> {
        let execution = self
            .repo
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(execution_id.to_string()))?;

        if execution.status.is_terminal() {
            return Ok(ExecutionReport {
                execution_id,
                status: execution.status,
                approval: None,
                baseline_quality: None,
                final_quality: None,
                detail: "already terminal".to_string(),
            });
        }

        info!(
            execution_id = %execution_id,
            last_completed_step = execution.last_completed_step,
            "Resuming workflow from checkpoint"
        );

        self.drive(execution, definition, request).await
    }

    async fn drive(
        &self,
        execution: WorkflowExecution,
        definition: &WorkflowDefinition,
        request: &RunRequest,
    ) -> WorkflowResult<ExecutionReport> {
        let recommendation = self
            .optimizations
            .get_recommendation(request.recommendation_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::InvalidInput(format!(
                    "recommendation {} not found",
                    request.recommendation_id
                ))
            })?;

        // Approval gate, unless a previous (crashed) attempt already passed
        // it.
        let already_approved = execution
            .context
            .get("approved")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let decision = if already_approved {
            None
        } else {
            let decision = self.approval_gate(&execution, &recommendation).await?;
            if !decision.proceed {
                self.agents
                    .set_run_status(request.agent_id, AgentRunStatus::Waiting)
                    .await?;
                self.repo
                    .set_status(
                        execution.id,
                        WorkflowStatus::Waiting,
                        Some(decision.detail.clone()),
                    )
                    .await?;

                info!(
                    execution_id = %execution.id,
                    detail = %decision.detail,
                    "Workflow paused awaiting approval"
                );

                return Ok(ExecutionReport {
                    execution_id: execution.id,
                    status: WorkflowStatus::Waiting,
                    approval: Some(decision),
                    baseline_quality: None,
                    final_quality: None,
                    detail: "awaiting approval".to_string(),
                });
            }
            Some(decision)
        };

        // Serialize on the resource before touching anything
        self.acquire_resource(request.agent_id, &definition.resource, execution.id)
            .await?;

        let outcome = self
            .execute_phases(&execution, definition, request, &recommendation)
            .await;

        // The lock is released on every exit path
        if let Err(e) = self
            .agents
            .release_lock(request.agent_id, &definition.resource)
            .await
        {
            warn!(error = %e, "Failed to release resource lock");
        }
        if let Err(e) = self
            .agents
            .remove_active_workflow(request.agent_id, execution.id)
            .await
        {
            warn!(error = %e, "Failed to clear active workflow");
        }

        match outcome {
            Ok(mut report) => {
                report.approval = decision;
                Ok(report)
            }
            Err(e) => {
                self.agents
                    .set_run_status(request.agent_id, AgentRunStatus::Error)
                    .await?;
                self.repo
                    .set_status(execution.id, WorkflowStatus::Failed, Some(e.to_string()))
                    .await?;
                AgentMetrics::record_workflow_finished(
                    &definition.workflow_type,
                    "failed",
                    0.0,
                );
                Err(e)
            }
        }
    }

    async fn approval_gate(
        &self,
        execution: &WorkflowExecution,
        recommendation: &Recommendation,
    ) -> WorkflowResult<ApprovalDecision> {
        self.repo
            .set_status(
                execution.id,
                WorkflowStatus::Running,
                Some("approval gate".to_string()),
            )
            .await?;

        let votes = self.approver.gather_votes(recommendation).await;

        for vote in &votes {
            AgentMetrics::record_approval_vote(
                &vote.approving_agent_type.to_string(),
                vote.approved,
            );
            self.optimizations
                .record_vote(recommendation.id, vote.clone())
                .await?;
        }

        let decision = self.policy.evaluate(&votes);

        if decision.proceed {
            self.optimizations
                .set_recommendation_status(recommendation.id, RecommendationStatus::Approved)
                .await?;
            self.repo
                .merge_context(execution.id, json!({ "approved": true }))
                .await?;
        }

        Ok(decision)
    }

    async fn acquire_resource(
        &self,
        agent_id: Uuid,
        resource: &str,
        execution_id: Uuid,
    ) -> WorkflowResult<()> {
        for attempt in 0..LOCK_RETRIES {
            if self.agents.try_acquire_lock(agent_id, resource).await? {
                return Ok(());
            }
            warn!(
                execution_id = %execution_id,
                resource = resource,
                attempt = attempt + 1,
                "Resource locked by a concurrent workflow, retrying"
            );
            tokio::time::sleep(Duration::from_millis(LOCK_RETRY_DELAY_MS)).await;
        }

        self.repo
            .set_status(
                execution_id,
                WorkflowStatus::Failed,
                Some(format!("resource '{resource}' held by a concurrent workflow")),
            )
            .await?;

        Err(WorkflowError::ResourceLocked(resource.to_string()))
    }

    async fn execute_phases(
        &self,
        execution: &WorkflowExecution,
        definition: &WorkflowDefinition,
        request: &RunRequest,
        recommendation: &Recommendation,
    ) -> WorkflowResult<ExecutionReport> {
        let start = std::time::Instant::now();
        let steps_per_phase = definition.steps.len() as i32;
        let plan_len = steps_per_phase * self.rollout.phases.len() as i32;

        self.agents
            .set_run_status(request.agent_id, AgentRunStatus::Processing)
            .await?;
        self.repo
            .set_status(
                execution.id,
                WorkflowStatus::Running,
                Some("rollout".to_string()),
            )
            .await?;

        let baseline_quality = self
            .quality
            .quality_score(request.customer_id, request.provider)
            .await;

        self.repo
            .save_artifact(
                execution.id,
                None,
                "before_snapshot",
                json!({
                    "quality_score": baseline_quality,
                    "recommendation": recommendation.payload,
                    "phases": self.rollout.phases,
                }),
            )
            .await?;

        let mut final_quality = baseline_quality;

        let mut index = execution.last_completed_step + 1;
        while index < plan_len {
            let phase_idx = (index / steps_per_phase) as usize;
            let step_idx = (index % steps_per_phase) as usize;
            let phase_pct = self.rollout.phases[phase_idx];
            let step = &definition.steps[step_idx];

            let ctx = StepContext {
                execution_id: execution.id,
                customer_id: request.customer_id,
                provider: request.provider,
                phase_pct,
                recommendation: recommendation.clone(),
            };

            let record = self
                .repo
                .start_step(
                    execution.id,
                    index,
                    step.name(),
                    json!({ "phase_pct": phase_pct }),
                )
                .await?;

            let step_start = std::time::Instant::now();
            match step.execute(&ctx).await {
                Ok(outcome) => {
                    self.repo
                        .finish_step(
                            record.id,
                            StepStatus::Completed,
                            outcome.output,
                            outcome.undo,
                            None,
                        )
                        .await?;
                    self.repo.checkpoint(execution.id, index).await?;
                    AgentMetrics::record_step(step.name(), step_start.elapsed().as_secs_f64());
                }
                Err(e) => {
                    self.repo
                        .finish_step(
                            record.id,
                            StepStatus::Failed,
                            json!({}),
                            json!({}),
                            Some(e.to_string()),
                        )
                        .await?;
                    // Checkpoint stays before this step; a resume retries it
                    return Err(WorkflowError::StepFailed {
                        step: step.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }

            // Phase boundary: probe quality before widening the rollout
            let phase_complete = (index + 1) % steps_per_phase == 0;
            if phase_complete {
                let current = self
                    .quality
                    .quality_score(request.customer_id, request.provider)
                    .await;
                final_quality = current;

                if let Some(regression_pct) = regression(baseline_quality, current) {
                    if regression_pct > self.rollout.quality_regression_pct {
                        warn!(
                            execution_id = %execution.id,
                            phase_pct = phase_pct,
                            regression_pct = regression_pct,
                            "Quality regression past threshold, rolling back"
                        );

                        return self
                            .rollback(
                                execution,
                                definition,
                                request,
                                recommendation,
                                baseline_quality,
                                current,
                                regression_pct,
                            )
                            .await;
                    }
                }

                info!(
                    execution_id = %execution.id,
                    phase_pct = phase_pct,
                    quality = ?current,
                    "Rollout phase complete"
                );
            }

            index += 1;
        }

        // Terminal success
        self.repo
            .save_artifact(
                execution.id,
                None,
                "after_snapshot",
                json!({ "quality_score": final_quality }),
            )
            .await?;

        let optimization = self
            .optimizations
            .record_optimization(
                recommendation.id,
                OptimizationOutcome::Success,
                json!({
                    "execution_id": execution.id,
                    "baseline_quality": baseline_quality,
                    "final_quality": final_quality,
                }),
            )
            .await?;

        self.repo
            .set_status(execution.id, WorkflowStatus::Completed, None)
            .await?;
        self.agents
            .set_run_status(request.agent_id, AgentRunStatus::Idle)
            .await?;

        AgentMetrics::record_workflow_finished(
            &definition.workflow_type,
            "completed",
            start.elapsed().as_secs_f64(),
        );

        info!(
            execution_id = %execution.id,
            optimization_id = %optimization.optimization_id,
            "Workflow completed"
        );

        Ok(ExecutionReport {
            execution_id: execution.id,
            status: WorkflowStatus::Completed,
            approval: None,
            baseline_quality,
            final_quality,
            detail: "completed".to_string(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn rollback(
        &self,
        execution: &WorkflowExecution,
        definition: &WorkflowDefinition,
        request: &RunRequest,
        recommendation: &Recommendation,
        baseline_quality: Option<f64>,
        current_quality: Option<f64>,
        regression_pct: f64,
    ) -> WorkflowResult<ExecutionReport> {
        let steps_per_phase = definition.steps.len() as i32;
        let completed = self.repo.steps_for(execution.id).await?;

        // Undo completed steps in reverse order using their captured undo
        // data
        for record in completed
            .iter()
            .filter(|r| r.status == StepStatus::Completed)
            .rev()
        {
            let step_idx = (record.step_index % steps_per_phase) as usize;
            let Some(step) = definition.steps.get(step_idx) else {
                continue;
            };

            let phase_idx = (record.step_index / steps_per_phase) as usize;
            let ctx = StepContext {
                execution_id: execution.id,
                customer_id: request.customer_id,
                provider: request.provider,
                phase_pct: self.rollout.phases.get(phase_idx).copied().unwrap_or(100),
                recommendation: recommendation.clone(),
            };

            if let Err(e) = step.undo(&ctx, &record.undo).await {
                error!(
                    execution_id = %execution.id,
                    step = step.name(),
                    error = %e,
                    "Undo failed during rollback"
                );
                return Err(WorkflowError::RollbackFailed {
                    step: step.name().to_string(),
                    reason: e.to_string(),
                });
            }

            self.repo
                .finish_step(
                    record.id,
                    StepStatus::RolledBack,
                    record.output.clone(),
                    record.undo.clone(),
                    None,
                )
                .await?;
        }

        self.repo
            .save_artifact(
                execution.id,
                None,
                "after_snapshot",
                json!({
                    "quality_score": current_quality,
                    "baseline_quality": baseline_quality,
                    "regression_pct": regression_pct,
                }),
            )
            .await?;

        self.optimizations
            .record_optimization(
                recommendation.id,
                OptimizationOutcome::RolledBack,
                json!({
                    "execution_id": execution.id,
                    "regression_pct": regression_pct,
                }),
            )
            .await?;

        self.repo
            .set_status(
                execution.id,
                WorkflowStatus::RolledBack,
                Some(format!("quality regression {regression_pct:.1}%")),
            )
            .await?;
        self.agents
            .set_run_status(request.agent_id, AgentRunStatus::Idle)
            .await?;

        AgentMetrics::record_rollback(&definition.workflow_type);

        Ok(ExecutionReport {
            execution_id: execution.id,
            status: WorkflowStatus::RolledBack,
            approval: None,
            baseline_quality,
            final_quality: current_quality,
            detail: format!("rolled back after {regression_pct:.1}% quality regression"),
        })
    }
}

/// Regression percentage of `current` against `baseline`; None when either
/// side is unknown or the baseline is not positive.
fn regression(baseline: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (baseline, current) {
        (Some(baseline), Some(current)) if baseline > 0.0 => {
            Some(((baseline - current) / baseline) * 100.0)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_agents::{AgentType, CreateRecommendation};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // In-memory fakes. The engine's durability semantics (checkpointing,
    // resume, step trail) are what these tests pin down, so the fakes keep
    // real state instead of canned answers.
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MemWorkflows {
        executions: Mutex<HashMap<Uuid, WorkflowExecution>>,
        steps: Mutex<Vec<crate::models::StepRecord>>,
        artifacts: Mutex<Vec<(String, Value)>>,
        transitions: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl WorkflowRepository for MemWorkflows {
        async fn create_execution(
            &self,
            workflow_type: &str,
            customer_id: Uuid,
            agent_id: Option<Uuid>,
            recommendation_id: Option<Uuid>,
            context: Value,
        ) -> WorkflowResult<WorkflowExecution> {
            let execution = WorkflowExecution {
                id: Uuid::new_v4(),
                workflow_type: workflow_type.to_string(),
                customer_id,
                agent_id,
                recommendation_id,
                status: WorkflowStatus::Pending,
                last_completed_step: -1,
                context,
                started_at: chrono::Utc::now(),
                completed_at: None,
            };
            self.executions
                .lock()
                .unwrap()
                .insert(execution.id, execution.clone());
            Ok(execution)
        }

        async fn get_execution(&self, id: Uuid) -> WorkflowResult<Option<WorkflowExecution>> {
            Ok(self.executions.lock().unwrap().get(&id).cloned())
        }

        async fn list_executions(
            &self,
            _customer_id: Uuid,
            _limit: u64,
        ) -> WorkflowResult<Vec<WorkflowExecution>> {
            Ok(self.executions.lock().unwrap().values().cloned().collect())
        }

        async fn set_status(
            &self,
            id: Uuid,
            status: WorkflowStatus,
            _detail: Option<String>,
        ) -> WorkflowResult<()> {
            let mut executions = self.executions.lock().unwrap();
            let execution = executions.get_mut(&id).unwrap();
            self.transitions
                .lock()
                .unwrap()
                .push((execution.status.to_string(), status.to_string()));
            execution.status = status;
            Ok(())
        }

        async fn checkpoint(&self, id: Uuid, last_completed_step: i32) -> WorkflowResult<()> {
            self.executions
                .lock()
                .unwrap()
                .get_mut(&id)
                .unwrap()
                .last_completed_step = last_completed_step;
            Ok(())
        }

        async fn merge_context(&self, id: Uuid, patch: Value) -> WorkflowResult<()> {
            let mut executions = self.executions.lock().unwrap();
            let execution = executions.get_mut(&id).unwrap();
            if let (Some(map), Some(patch_map)) =
                (execution.context.as_object_mut(), patch.as_object())
            {
                for (k, v) in patch_map {
                    map.insert(k.clone(), v.clone());
                }
            }
            Ok(())
        }

        async fn start_step(
            &self,
            execution_id: Uuid,
            step_index: i32,
            step_name: &str,
            input: Value,
        ) -> WorkflowResult<crate::models::StepRecord> {
            let record = crate::models::StepRecord {
                id: Uuid::new_v4(),
                execution_id,
                step_index,
                step_name: step_name.to_string(),
                status: StepStatus::Running,
                input,
                output: json!({}),
                undo: json!({}),
                error: None,
                started_at: chrono::Utc::now(),
                completed_at: None,
            };
            self.steps.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn finish_step(
            &self,
            step_id: Uuid,
            status: StepStatus,
            output: Value,
            undo: Value,
            error: Option<String>,
        ) -> WorkflowResult<()> {
            let mut steps = self.steps.lock().unwrap();
            let record = steps.iter_mut().find(|s| s.id == step_id).unwrap();
            record.status = status;
            record.output = output;
            record.undo = undo;
            record.error = error;
            record.completed_at = Some(chrono::Utc::now());
            Ok(())
        }

        async fn steps_for(
            &self,
            execution_id: Uuid,
        ) -> WorkflowResult<Vec<crate::models::StepRecord>> {
            Ok(self
                .steps
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.execution_id == execution_id)
                .cloned()
                .collect())
        }

        async fn save_artifact(
            &self,
            _execution_id: Uuid,
            _step_id: Option<Uuid>,
            artifact_kind: &str,
            content: Value,
        ) -> WorkflowResult<Uuid> {
            self.artifacts
                .lock()
                .unwrap()
                .push((artifact_kind.to_string(), content));
            Ok(Uuid::new_v4())
        }
    }

    #[derive(Default)]
    struct MemAgents {
        locks: Mutex<Vec<String>>,
        run_status: Mutex<Vec<AgentRunStatus>>,
    }

    #[async_trait]
    impl AgentRepository for MemAgents {
        async fn insert(
            &self,
            _input: domain_agents::RegisterAgent,
        ) -> domain_agents::AgentResult<domain_agents::Agent> {
            unimplemented!()
        }
        async fn get(
            &self,
            _id: Uuid,
        ) -> domain_agents::AgentResult<Option<domain_agents::Agent>> {
            Ok(None)
        }
        async fn list(&self) -> domain_agents::AgentResult<Vec<domain_agents::Agent>> {
            Ok(vec![])
        }
        async fn list_active_by_type(
            &self,
            _agent_type: AgentType,
        ) -> domain_agents::AgentResult<Vec<domain_agents::Agent>> {
            Ok(vec![])
        }
        async fn record_heartbeat(
            &self,
            _id: Uuid,
            _at: chrono::DateTime<chrono::Utc>,
        ) -> domain_agents::AgentResult<domain_agents::Agent> {
            unimplemented!()
        }
        async fn set_status(
            &self,
            _id: Uuid,
            _status: domain_agents::AgentStatus,
        ) -> domain_agents::AgentResult<()> {
            Ok(())
        }
        async fn stale_agents(
            &self,
            _grace_factor: i32,
        ) -> domain_agents::AgentResult<Vec<domain_agents::Agent>> {
            Ok(vec![])
        }
        async fn set_run_status(
            &self,
            _agent_id: Uuid,
            status: AgentRunStatus,
        ) -> domain_agents::AgentResult<()> {
            self.run_status.lock().unwrap().push(status);
            Ok(())
        }
        async fn try_acquire_lock(
            &self,
            _agent_id: Uuid,
            resource: &str,
        ) -> domain_agents::AgentResult<bool> {
            let mut locks = self.locks.lock().unwrap();
            if locks.iter().any(|l| l == resource) {
                return Ok(false);
            }
            locks.push(resource.to_string());
            Ok(true)
        }
        async fn release_lock(
            &self,
            _agent_id: Uuid,
            resource: &str,
        ) -> domain_agents::AgentResult<()> {
            self.locks.lock().unwrap().retain(|l| l != resource);
            Ok(())
        }
        async fn add_active_workflow(
            &self,
            _agent_id: Uuid,
            _workflow_id: Uuid,
        ) -> domain_agents::AgentResult<()> {
            Ok(())
        }
        async fn remove_active_workflow(
            &self,
            _agent_id: Uuid,
            _workflow_id: Uuid,
        ) -> domain_agents::AgentResult<()> {
            Ok(())
        }
        async fn set_config(
            &self,
            _agent_id: Uuid,
            _key: &str,
            _value: domain_agents::ConfigValue,
        ) -> domain_agents::AgentResult<()> {
            Ok(())
        }
        async fn get_config(
            &self,
            _agent_id: Uuid,
            _key: &str,
        ) -> domain_agents::AgentResult<Option<domain_agents::ConfigValue>> {
            Ok(None)
        }
        async fn record_metric(
            &self,
            _agent_id: Uuid,
            _metric_name: &str,
            _kind: domain_agents::MetricKind,
            _value: f64,
            _tags: Value,
        ) -> domain_agents::AgentResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemOptimizations {
        recommendations: Mutex<HashMap<Uuid, Recommendation>>,
        votes: Mutex<Vec<ApprovalVote>>,
        optimizations: Mutex<Vec<domain_agents::Optimization>>,
    }

    impl MemOptimizations {
        fn seed(&self, recommendation: Recommendation) {
            self.recommendations
                .lock()
                .unwrap()
                .insert(recommendation.id, recommendation);
        }
    }

    #[async_trait]
    impl OptimizationRepository for MemOptimizations {
        async fn create_recommendation(
            &self,
            input: CreateRecommendation,
        ) -> domain_agents::AgentResult<Recommendation> {
            let recommendation = Recommendation {
                id: Uuid::new_v4(),
                optimization_id: Uuid::new_v4(),
                customer_id: input.customer_id,
                agent_type: input.agent_type,
                recommendation_type: input.recommendation_type,
                title: input.title,
                description: input.description,
                estimated_savings_pct: input.estimated_savings_pct,
                status: RecommendationStatus::Pending,
                payload: input.payload,
                created_at: chrono::Utc::now(),
            };
            self.seed(recommendation.clone());
            Ok(recommendation)
        }
        async fn get_recommendation(
            &self,
            id: Uuid,
        ) -> domain_agents::AgentResult<Option<Recommendation>> {
            Ok(self.recommendations.lock().unwrap().get(&id).cloned())
        }
        async fn list_recommendations(
            &self,
            _customer_id: Uuid,
            _status: Option<RecommendationStatus>,
            _limit: u64,
        ) -> domain_agents::AgentResult<Vec<Recommendation>> {
            Ok(vec![])
        }
        async fn set_recommendation_status(
            &self,
            id: Uuid,
            status: RecommendationStatus,
        ) -> domain_agents::AgentResult<()> {
            if let Some(r) = self.recommendations.lock().unwrap().get_mut(&id) {
                r.status = status;
            }
            Ok(())
        }
        async fn record_vote(
            &self,
            _recommendation_id: Uuid,
            vote: ApprovalVote,
        ) -> domain_agents::AgentResult<()> {
            self.votes.lock().unwrap().push(vote);
            Ok(())
        }
        async fn list_votes(
            &self,
            _recommendation_id: Uuid,
        ) -> domain_agents::AgentResult<Vec<ApprovalVote>> {
            Ok(self.votes.lock().unwrap().clone())
        }
        async fn record_optimization(
            &self,
            recommendation_id: Uuid,
            outcome: OptimizationOutcome,
            detail: Value,
        ) -> domain_agents::AgentResult<domain_agents::Optimization> {
            let recommendation = self
                .recommendations
                .lock()
                .unwrap()
                .get(&recommendation_id)
                .cloned()
                .unwrap();
            let optimization = domain_agents::Optimization {
                id: Uuid::new_v4(),
                optimization_id: recommendation.optimization_id,
                recommendation_id,
                customer_id: recommendation.customer_id,
                optimization_type: recommendation.recommendation_type,
                outcome,
                detail,
                executed_at: chrono::Utc::now(),
                completed_at: Some(chrono::Utc::now()),
            };
            self.optimizations.lock().unwrap().push(optimization.clone());
            Ok(optimization)
        }
        async fn get_optimization(
            &self,
            _optimization_id: Uuid,
        ) -> domain_agents::AgentResult<Option<domain_agents::Optimization>> {
            Ok(None)
        }
    }

    struct FixedApprover(Vec<ApprovalVote>);

    #[async_trait]
    impl PeerApprover for FixedApprover {
        async fn gather_votes(&self, _recommendation: &Recommendation) -> Vec<ApprovalVote> {
            self.0.clone()
        }
    }

    /// Quality probe returning a scripted sequence of scores
    struct ScriptedQuality {
        scores: Mutex<Vec<Option<f64>>>,
    }

    impl ScriptedQuality {
        fn new(scores: Vec<Option<f64>>) -> Self {
            Self {
                scores: Mutex::new(scores),
            }
        }
    }

    #[async_trait]
    impl QualityProbe for ScriptedQuality {
        async fn quality_score(
            &self,
            _customer_id: Uuid,
            _provider: CloudProvider,
        ) -> Option<f64> {
            let mut scores = self.scores.lock().unwrap();
            if scores.len() > 1 {
                scores.remove(0)
            } else {
                scores.first().copied().flatten()
            }
        }
    }

    /// A step that counts executions and undos, optionally failing at a
    /// given execution number
    struct CountingStep {
        name: String,
        executions: Arc<AtomicUsize>,
        undos: Arc<AtomicUsize>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl WorkflowStep for CountingStep {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(&self, _ctx: &StepContext) -> WorkflowResult<StepOutcome> {
            let n = self.executions.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(n) {
                return Err(WorkflowError::Internal("injected failure".to_string()));
            }
            Ok(StepOutcome {
                output: json!({ "execution": n }),
                undo: json!({ "execution": n }),
            })
        }

        async fn undo(&self, _ctx: &StepContext, _undo: &Value) -> WorkflowResult<()> {
            self.undos.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn vote(agent_type: AgentType, approved: bool, confidence: f64) -> ApprovalVote {
        ApprovalVote {
            approving_agent_type: agent_type,
            approved,
            confidence,
            rationale: String::new(),
        }
    }

    fn recommendation() -> Recommendation {
        Recommendation {
            id: Uuid::new_v4(),
            optimization_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            agent_type: AgentType::Cost,
            recommendation_type: "spot_migration".to_string(),
            title: "Migrate batch workers to spot".to_string(),
            description: String::new(),
            estimated_savings_pct: Some(40.0),
            status: RecommendationStatus::Pending,
            payload: json!({}),
            created_at: chrono::Utc::now(),
        }
    }

    struct Harness {
        engine: WorkflowEngine,
        repo: Arc<MemWorkflows>,
        optimizations: Arc<MemOptimizations>,
        executions: Arc<AtomicUsize>,
        undos: Arc<AtomicUsize>,
        definition: WorkflowDefinition,
        request: RunRequest,
    }

    fn harness(
        votes: Vec<ApprovalVote>,
        quality_scores: Vec<Option<f64>>,
        fail_on: Option<usize>,
    ) -> Harness {
        let repo = Arc::new(MemWorkflows::default());
        let agents = Arc::new(MemAgents::default());
        let optimizations = Arc::new(MemOptimizations::default());
        let rec = recommendation();
        optimizations.seed(rec.clone());

        let executions = Arc::new(AtomicUsize::new(0));
        let undos = Arc::new(AtomicUsize::new(0));

        let definition = WorkflowDefinition::new(
            "spot_migration",
            format!("instances/{}", rec.customer_id),
            vec![Arc::new(CountingStep {
                name: "apply_migration".to_string(),
                executions: executions.clone(),
                undos: undos.clone(),
                fail_on,
            }) as Arc<dyn WorkflowStep>],
        );

        let request = RunRequest {
            customer_id: rec.customer_id,
            provider: CloudProvider::Aws,
            agent_id: Uuid::new_v4(),
            recommendation_id: rec.id,
        };

        let engine = WorkflowEngine::new(
            repo.clone(),
            agents,
            optimizations.clone(),
            Arc::new(FixedApprover(votes)),
            Arc::new(ScriptedQuality::new(quality_scores)),
            RolloutConfig::default(),
        );

        Harness {
            engine,
            repo,
            optimizations,
            executions,
            undos,
            definition,
            request,
        }
    }

    #[tokio::test]
    async fn test_approved_run_completes_and_records_optimization() {
        let h = harness(
            vec![
                vote(AgentType::Performance, true, 0.92),
                vote(AgentType::Resource, true, 0.95),
                vote(AgentType::Application, true, 0.90),
            ],
            vec![Some(0.9)],
            None,
        );

        let report = h.engine.run(&h.definition, &h.request).await.unwrap();
        assert_eq!(report.status, WorkflowStatus::Completed);

        // one step per phase
        assert_eq!(h.executions.load(Ordering::SeqCst), 3);
        assert_eq!(h.optimizations.optimizations.lock().unwrap().len(), 1);
        assert_eq!(
            h.optimizations.optimizations.lock().unwrap()[0].outcome,
            OptimizationOutcome::Success
        );
    }

    #[tokio::test]
    async fn test_rejection_pauses_in_waiting_without_optimization() {
        let h = harness(
            vec![
                vote(AgentType::Performance, true, 0.92),
                vote(AgentType::Resource, true, 0.95),
                vote(AgentType::Application, false, 0.4),
            ],
            vec![Some(0.9)],
            None,
        );

        let report = h.engine.run(&h.definition, &h.request).await.unwrap();
        assert_eq!(report.status, WorkflowStatus::Waiting);
        assert_eq!(h.executions.load(Ordering::SeqCst), 0);
        assert!(h.optimizations.optimizations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quality_regression_rolls_back_phase_one() {
        // baseline 0.9, then 0.81 after phase 1 = 10% regression > 5%
        let h = harness(
            vec![
                vote(AgentType::Performance, true, 0.9),
                vote(AgentType::Resource, true, 0.9),
                vote(AgentType::Application, true, 0.9),
            ],
            vec![Some(0.9), Some(0.81)],
            None,
        );

        let report = h.engine.run(&h.definition, &h.request).await.unwrap();
        assert_eq!(report.status, WorkflowStatus::RolledBack);

        // Phase 1 executed once, then undone once; phase 2 never started
        assert_eq!(h.executions.load(Ordering::SeqCst), 1);
        assert_eq!(h.undos.load(Ordering::SeqCst), 1);

        // Artifacts carry before/after snapshots
        let artifacts = h.repo.artifacts.lock().unwrap();
        assert!(artifacts.iter().any(|(kind, _)| kind == "before_snapshot"));
        let after = artifacts
            .iter()
            .find(|(kind, _)| kind == "after_snapshot")
            .unwrap();
        assert!(after.1.get("regression_pct").is_some());

        assert_eq!(
            h.optimizations.optimizations.lock().unwrap()[0].outcome,
            OptimizationOutcome::RolledBack
        );
    }

    #[tokio::test]
    async fn test_step_failure_checkpoints_and_resume_finishes() {
        // Fail the second plan entry (phase 2); resume should retry it and
        // finish the remaining phases.
        let h = harness(
            vec![
                vote(AgentType::Performance, true, 0.9),
                vote(AgentType::Resource, true, 0.9),
                vote(AgentType::Application, true, 0.9),
            ],
            vec![Some(0.9)],
            Some(2),
        );

        let err = h.engine.run(&h.definition, &h.request).await.unwrap_err();
        assert!(matches!(err, WorkflowError::StepFailed { .. }));

        let execution_id = *h.repo.executions.lock().unwrap().keys().next().unwrap();
        {
            let executions = h.repo.executions.lock().unwrap();
            let execution = executions.get(&execution_id).unwrap();
            assert_eq!(execution.status, WorkflowStatus::Failed);
            // Plan entry 0 completed before the failure
            assert_eq!(execution.last_completed_step, 0);
        }

        let report = h
            .engine
            .resume(execution_id, &h.definition, &h.request)
            .await
            .unwrap();
        assert_eq!(report.status, WorkflowStatus::Completed);

        // 1 success + 1 failure + 2 retried/remaining = 4 invocations total
        assert_eq!(h.executions.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_resume_of_terminal_run_is_a_noop() {
        let h = harness(
            vec![vote(AgentType::Performance, true, 0.9)],
            vec![Some(0.9)],
            None,
        );

        let report = h.engine.run(&h.definition, &h.request).await.unwrap();
        let executions_after_run = h.executions.load(Ordering::SeqCst);

        let resumed = h
            .engine
            .resume(report.execution_id, &h.definition, &h.request)
            .await
            .unwrap();
        assert_eq!(resumed.status, WorkflowStatus::Completed);
        assert_eq!(h.executions.load(Ordering::SeqCst), executions_after_run);
    }
}
