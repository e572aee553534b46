use std::str::FromStr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use axum_helpers::shutdown_signal;
use clap::Parser;
use core_config::embedding::EmbeddingBackend;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_agents::{AgentType, CapabilitySpec, PgAgentRepository, PgOptimizationRepository};
use domain_memory::{
    DeterministicEmbedding, EmbeddingProvider, OpenAiEmbedding, SemanticMemory,
};
use domain_telemetry::{
    PgApplicationReader, PgCostReader, PgPerformanceReader, PgResourceReader,
};
use domain_workflows::{PgWorkflowRepository, WorkflowEngine};
use eyre::WrapErr;
use tokio::sync::watch;
use tracing::info;

mod api;
mod approve;
mod config;
mod orchestrator_client;
mod state;
mod workflows;

use config::Config;
use orchestrator_client::{OrchestratorApprover, OrchestratorClient};
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "agent", about = "OptiInfra domain agent")]
struct Args {
    /// Which domain this agent serves: cost, performance, resource,
    /// application
    #[arg(long, env = "AGENT_TYPE")]
    agent_type: String,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let args = Args::parse();
    let agent_type = AgentType::from_str(&args.agent_type)
        .map_err(|_| eyre::eyre!("unknown agent type '{}'", args.agent_type))?;

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    observability::init_metrics();

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    let http = reqwest::Client::new();

    // Semantic memory with the configured embedding backend
    let embedder: Arc<dyn EmbeddingProvider> = match config.memory.backend {
        EmbeddingBackend::OpenAi => Arc::new(OpenAiEmbedding::new(
            std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            config.memory.model.clone(),
            config.memory.timeout_s,
        )),
        EmbeddingBackend::Deterministic => Arc::new(DeterministicEmbedding::new()),
    };
    let memory = Arc::new(
        SemanticMemory::connect(&config.memory.qdrant_url, embedder)
            .map_err(|e| eyre::eyre!("Qdrant connection failed: {}", e))?,
    );
    memory
        .ensure_collections()
        .await
        .map_err(|e| eyre::eyre!("Memory collections init failed: {}", e))?;

    // Register before serving so the advertised endpoint is routable the
    // moment the listener is up
    let client = OrchestratorClient::new(http.clone(), config.orchestrator_url.clone());
    let registered = client
        .register(
            agent_type,
            &config.advertised_endpoint,
            capabilities_for(agent_type),
            config.heartbeat_interval_s,
        )
        .await
        .wrap_err("registration with orchestrator failed")?;

    // Workflow engine wiring
    let agent_repo = Arc::new(PgAgentRepository::new(db.clone()));
    let optimizations = Arc::new(PgOptimizationRepository::new(db.clone()));
    let application_reader = Arc::new(PgApplicationReader::new(db.clone()));
    let resource_reader = Arc::new(PgResourceReader::new(db.clone()));

    let engine = Arc::new(WorkflowEngine::new(
        Arc::new(PgWorkflowRepository::new(db.clone())),
        agent_repo,
        optimizations.clone(),
        Arc::new(OrchestratorApprover::new(
            http.clone(),
            config.orchestrator_url.clone(),
            config.rollout.approval_timeout_s,
        )),
        Arc::new(workflows::ApplicationQualityProbe::new(
            application_reader.clone(),
        )),
        config.rollout.clone(),
    ));

    let state = AppState {
        config: config.clone(),
        agent_type,
        agent_id: registered.id,
        cost_reader: Arc::new(PgCostReader::new(db.clone())),
        performance_reader: Arc::new(PgPerformanceReader::new(db.clone())),
        resource_reader,
        application_reader,
        optimizations,
        engine,
        memory,
        http: http.clone(),
    };

    // Heartbeat loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let heartbeat_client =
        OrchestratorClient::new(http.clone(), config.orchestrator_url.clone());
    let heartbeat_task = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        let interval = config.heartbeat_interval_s;
        let agent_id = registered.id;
        async move {
            heartbeat_client
                .heartbeat_loop(agent_id, interval, shutdown_rx)
                .await;
        }
    });

    let router = api::routes(&state)
        .layer(middleware::from_fn(
            observability::middleware::metrics_middleware,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let app: Router = router.route("/metrics", get(observability::metrics_handler));

    let address = config.server.address();
    info!(
        address = %address,
        agent_type = %agent_type,
        agent_id = %registered.id,
        "Agent listening"
    );

    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Orderly exit: stop heartbeating, then unregister
    let _ = shutdown_tx.send(true);
    let _ = heartbeat_task.await;
    client.unregister(registered.id).await;

    info!("Agent stopped");
    Ok(())
}

fn capabilities_for(agent_type: AgentType) -> Vec<CapabilitySpec> {
    let names: &[&str] = match agent_type {
        AgentType::Cost => &["collect_cost", "cost_analysis", "spot_migration"],
        AgentType::Performance => &["collect_performance", "latency_tuning"],
        AgentType::Resource => &["collect_resource", "right_sizing"],
        AgentType::Application => &["collect_application", "quality_monitoring"],
    };

    names
        .iter()
        .map(|name| CapabilitySpec {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
        .collect()
}
