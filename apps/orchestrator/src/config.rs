use core_config::rollout::RolloutConfig;
use core_config::scheduler::SchedulerConfig;
use core_config::security::EncryptionConfig;
use core_config::server::ServerConfig;
use core_config::{ConfigError, Environment, FromEnv};
use database::postgres::PostgresConfig;

/// Orchestrator configuration, loaded entirely from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: PostgresConfig,
    pub scheduler: SchedulerConfig,
    pub encryption: EncryptionConfig,
    pub rollout: RolloutConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            database: PostgresConfig::from_env()?,
            scheduler: SchedulerConfig::from_env()?,
            encryption: EncryptionConfig::from_env()?,
            rollout: RolloutConfig::from_env()?,
        })
    }
}
