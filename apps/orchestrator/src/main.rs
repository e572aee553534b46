use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use axum_helpers::shutdown_signal;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_agents::{AgentLifecycleService, PgAgentRepository, PgEventLog, PgOptimizationRepository};
use domain_collection::{
    AdapterRegistry, CollectionScheduler, PgCollectionHistoryRepository, PgCursorRepository,
};
use domain_credentials::{CredentialService, PgCredentialRepository, SecretCipher};
use domain_telemetry::{
    PgApplicationReader, PgCostReader, PgMetricsWriter, PgPerformanceReader, PgResourceReader,
};
use tokio::sync::watch;
use tracing::{error, info};

mod api;
mod config;
mod state;

use config::Config;
use state::AppState;

/// How often the heartbeat reaper scans for silent agents.
const REAPER_INTERVAL_S: u64 = 5;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    observability::init_metrics();
    info!("Prometheus metrics initialized");

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    database::postgres::run_migrations::<migration::Migrator>(&db, "orchestrator")
        .await
        .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;

    // Credential store with process-level cipher and TTL cache
    let cipher = SecretCipher::from_key_material(&config.encryption.key_material);
    let credentials = Arc::new(CredentialService::new(
        PgCredentialRepository::new(db.clone()),
        cipher,
        Duration::from_secs(config.encryption.cache_ttl_s),
    ));

    // Collection pipeline
    let registry = Arc::new(AdapterRegistry::with_builtin());
    let scheduler = Arc::new(CollectionScheduler::new(
        credentials.clone(),
        registry.clone(),
        Arc::new(PgMetricsWriter::new(db.clone())),
        Arc::new(PgCollectionHistoryRepository::new(db.clone())),
        Arc::new(PgCursorRepository::new(db.clone())),
        config.scheduler.clone(),
    ));

    // Agent runtime
    let agent_repo = Arc::new(PgAgentRepository::new(db.clone()));
    let events: Arc<PgEventLog> = Arc::new(PgEventLog::new(db.clone()));
    let lifecycle = Arc::new(AgentLifecycleService::new(agent_repo, events.clone()));
    let optimizations = Arc::new(PgOptimizationRepository::new(db.clone()));

    let state = AppState {
        config: config.clone(),
        db: db.clone(),
        credentials,
        scheduler: scheduler.clone(),
        lifecycle: lifecycle.clone(),
        events,
        optimizations,
        cost_reader: Arc::new(PgCostReader::new(db.clone())),
        performance_reader: Arc::new(PgPerformanceReader::new(db.clone())),
        resource_reader: Arc::new(PgResourceReader::new(db.clone())),
        application_reader: Arc::new(PgApplicationReader::new(db.clone())),
        http: reqwest::Client::new(),
    };

    // Background tasks share one shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Periodic collection tick
    let scheduler_task = tokio::spawn(scheduler.clone().run_scheduled(shutdown_rx.clone()));

    // Heartbeat reaper
    let reaper_lifecycle = lifecycle.clone();
    let mut reaper_shutdown = shutdown_rx.clone();
    let reaper_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(REAPER_INTERVAL_S));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match reaper_lifecycle.reap_stale().await {
                        Ok(0) => {}
                        Ok(reaped) => info!(reaped = reaped, "Reaper cycle marked agents unhealthy"),
                        Err(e) => error!(error = %e, "Reaper cycle failed"),
                    }
                }
                _ = reaper_shutdown.changed() => break,
            }
        }
    });

    let router = api::routes(&state)
        .layer(middleware::from_fn(
            observability::middleware::metrics_middleware,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    // Metrics endpoint sits outside the metrics middleware to avoid
    // self-counting
    let app: Router = router.route("/metrics", get(observability::metrics_handler));

    let address = config.server.address();
    info!(address = %address, "Orchestrator listening");

    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain background tasks
    let _ = shutdown_tx.send(true);
    let _ = reaper_task.await;
    if let Err(e) = scheduler_task.await {
        error!(error = %e, "Scheduler task join failed");
    }

    info!("Orchestrator stopped");
    Ok(())
}
