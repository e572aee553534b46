//! Shared state for the agent binary.

use std::sync::Arc;

use domain_agents::{AgentType, OptimizationRepository};
use domain_memory::SemanticMemory;
use domain_telemetry::{
    PgApplicationReader, PgCostReader, PgPerformanceReader, PgResourceReader,
};
use domain_workflows::WorkflowEngine;
use uuid::Uuid;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub agent_type: AgentType,
    /// Assigned by the orchestrator at registration
    pub agent_id: Uuid,
    pub cost_reader: Arc<PgCostReader>,
    pub performance_reader: Arc<PgPerformanceReader>,
    pub resource_reader: Arc<PgResourceReader>,
    pub application_reader: Arc<PgApplicationReader>,
    pub optimizations: Arc<dyn OptimizationRepository>,
    pub engine: Arc<WorkflowEngine>,
    pub memory: Arc<SemanticMemory>,
    pub http: reqwest::Client,
}
