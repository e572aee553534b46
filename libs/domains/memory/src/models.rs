use chrono::{DateTime, Utc};
use domain_telemetry::CloudProvider;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Outcome of a past decision
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DecisionOutcome {
    Success,
    Failed,
    Partial,
}

/// Payload of the cost_optimization_knowledge collection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CostDecision {
    pub optimization_id: Uuid,
    pub customer_id: Uuid,
    /// Kind of optimization (spot_migration, right_sizing, ...)
    #[serde(rename = "type")]
    pub decision_type: String,
    /// Free-text description of the workload and situation
    pub context: String,
    pub outcome: DecisionOutcome,
    pub savings_percent: Option<f64>,
    pub cost_impact: Option<f64>,
    pub cloud_provider: CloudProvider,
    pub instance_type: Option<String>,
    pub workload_characteristics: Option<String>,
    pub lessons_learned: Option<String>,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl CostDecision {
    /// The text that gets embedded for similarity recall
    pub fn summary(&self) -> String {
        let mut parts = vec![
            self.decision_type.clone(),
            self.context.clone(),
            format!("provider {}", self.cloud_provider),
            format!("outcome {}", self.outcome),
        ];
        if let Some(instance_type) = &self.instance_type {
            parts.push(format!("instance {instance_type}"));
        }
        if let Some(workload) = &self.workload_characteristics {
            parts.push(workload.clone());
        }
        if let Some(lessons) = &self.lessons_learned {
            parts.push(lessons.clone());
        }
        parts.join(". ")
    }
}

/// Payload of the performance_patterns collection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PerformancePattern {
    pub optimization_id: Uuid,
    pub customer_id: Uuid,
    pub service_type: String,
    pub model_name: Option<String>,
    pub problem_description: String,
    pub solution_description: String,
    pub before_latency_ms: Option<f64>,
    pub after_latency_ms: Option<f64>,
    pub improvement_factor: Option<f64>,
    pub config_changes: serde_json::Value,
    /// Whether the fix transfers to similar services
    pub replicable: bool,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl PerformancePattern {
    pub fn summary(&self) -> String {
        format!(
            "{}. problem: {}. solution: {}",
            self.service_type, self.problem_description, self.solution_description
        )
    }
}

/// Payload of the customer_context collection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerContextEntry {
    pub customer_id: Uuid,
    pub context_type: String,
    pub topic: String,
    pub content: String,
    /// In [0, 1]
    pub confidence: f64,
    pub source: String,
    pub priority: i32,
    #[serde(default)]
    pub applies_to_agents: Vec<String>,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl CustomerContextEntry {
    pub fn summary(&self) -> String {
        format!("{}: {}. {}", self.context_type, self.topic, self.content)
    }
}

/// A similarity search hit: payload plus its cosine score
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoredHit<T> {
    pub point_id: Uuid,
    pub score: f32,
    pub payload: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_decision_summary_carries_context() {
        let decision = CostDecision {
            optimization_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            decision_type: "spot_migration".to_string(),
            context: "batch ETL pipeline with checkpointing".to_string(),
            outcome: DecisionOutcome::Success,
            savings_percent: Some(42.0),
            cost_impact: None,
            cloud_provider: CloudProvider::Aws,
            instance_type: Some("m5.xlarge".to_string()),
            workload_characteristics: None,
            lessons_learned: None,
            recorded_at: Utc::now(),
        };

        let summary = decision.summary();
        assert!(summary.contains("batch ETL"));
        assert!(summary.contains("spot_migration"));
        assert!(summary.contains("outcome success"));
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&DecisionOutcome::Success).unwrap(),
            "\"success\""
        );
    }
}
