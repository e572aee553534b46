use thiserror::Error;

/// Errors surfaced by the database layer
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
