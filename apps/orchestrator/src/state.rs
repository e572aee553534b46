//! Shared application state for the orchestrator.
//!
//! Cloned per handler; everything inside is an Arc.

use std::sync::Arc;

use domain_agents::{AgentLifecycleService, EventLog, OptimizationRepository};
use domain_collection::CollectionScheduler;
use domain_credentials::{CredentialService, PgCredentialRepository};
use domain_telemetry::{
    PgApplicationReader, PgCostReader, PgPerformanceReader, PgResourceReader,
};
use sea_orm::DatabaseConnection;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: DatabaseConnection,
    pub credentials: Arc<CredentialService<PgCredentialRepository>>,
    pub scheduler: Arc<CollectionScheduler<PgCredentialRepository>>,
    pub lifecycle: Arc<AgentLifecycleService>,
    pub events: Arc<dyn EventLog>,
    pub optimizations: Arc<dyn OptimizationRepository>,
    pub cost_reader: Arc<PgCostReader>,
    pub performance_reader: Arc<PgPerformanceReader>,
    pub resource_reader: Arc<PgResourceReader>,
    pub application_reader: Arc<PgApplicationReader>,
    pub http: reqwest::Client,
}
