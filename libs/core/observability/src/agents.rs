//! Agent-lifecycle and workflow metrics.

use metrics::{counter, gauge, histogram};

/// Agent and workflow metrics recorder
pub struct AgentMetrics;

impl AgentMetrics {
    /// Set the registered agent count for a (type, status) pair
    pub fn set_registered(agent_type: &str, status: &str, count: usize) {
        gauge!(
            "agents_registered",
            "agent_type" => agent_type.to_string(),
            "status" => status.to_string()
        )
        .set(count as f64);
    }

    /// Record a heartbeat received from an agent
    pub fn record_heartbeat(agent_type: &str) {
        counter!("agent_heartbeats_total", "agent_type" => agent_type.to_string()).increment(1);
    }

    /// Record an agent reaped to unhealthy after missed heartbeats
    pub fn record_reaped(agent_type: &str) {
        counter!("agent_reaped_total", "agent_type" => agent_type.to_string()).increment(1);
    }

    /// Record a workflow reaching a terminal status
    pub fn record_workflow_finished(workflow_type: &str, status: &str, duration_secs: f64) {
        counter!(
            "workflow_runs_total",
            "workflow_type" => workflow_type.to_string(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            "workflow_step_duration_seconds",
            "step" => "total".to_string()
        )
        .record(duration_secs);
    }

    /// Record a single workflow step duration
    pub fn record_step(step_name: &str, duration_secs: f64) {
        histogram!(
            "workflow_step_duration_seconds",
            "step" => step_name.to_string()
        )
        .record(duration_secs);
    }

    /// Record a rollback triggered by a quality regression
    pub fn record_rollback(workflow_type: &str) {
        counter!(
            "workflow_rollbacks_total",
            "workflow_type" => workflow_type.to_string()
        )
        .increment(1);
    }

    /// Record a peer approval vote
    pub fn record_approval_vote(agent_type: &str, approved: bool) {
        counter!(
            "approval_votes_total",
            "agent_type" => agent_type.to_string(),
            "decision" => if approved { "approved" } else { "rejected" }
        )
        .increment(1);
    }
}
