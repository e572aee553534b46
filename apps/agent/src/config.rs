use core_config::embedding::MemoryConfig;
use core_config::rollout::RolloutConfig;
use core_config::server::ServerConfig;
use core_config::{env_or_default, env_parse_or, ConfigError, Environment, FromEnv};
use database::postgres::PostgresConfig;

/// Agent binary configuration, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: PostgresConfig,
    pub rollout: RolloutConfig,
    pub memory: MemoryConfig,
    /// Base URL of the orchestrator this agent registers with
    pub orchestrator_url: String,
    /// Externally reachable endpoint advertised at registration
    pub advertised_endpoint: String,
    pub heartbeat_interval_s: i32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server = ServerConfig::from_env()?;
        let advertised_endpoint = env_or_default(
            "AGENT_ENDPOINT",
            &format!("http://localhost:{}", server.port),
        );

        Ok(Self {
            environment: Environment::from_env(),
            server,
            database: PostgresConfig::from_env()?,
            rollout: RolloutConfig::from_env()?,
            memory: MemoryConfig::from_env()?,
            orchestrator_url: env_or_default("ORCHESTRATOR_URL", "http://localhost:8080"),
            advertised_endpoint,
            heartbeat_interval_s: env_parse_or("HEARTBEAT_INTERVAL_S", 30)?,
        })
    }
}
