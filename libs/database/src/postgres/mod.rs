pub mod config;
pub mod connector;
pub mod health;

pub use config::PostgresConfig;
pub use connector::{
    connect, connect_from_config, connect_from_config_with_retry, connect_with_options,
    run_migrations,
};
pub use health::{check_health, check_health_detailed, HealthStatus};

// Re-export the connection type so downstream crates can name it without a
// direct sea-orm dependency in signatures.
pub use sea_orm::DatabaseConnection;
