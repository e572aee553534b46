//! Shared HTTP plumbing for the platform services.
//!
//! Provides the pieces every axum binary needs:
//! - health/readiness handlers with concurrent dependency checks
//! - graceful shutdown signal handling
//! - `ValidatedJson` extractor (validator-backed request validation)
//! - the canonical `{error, detail}` failure body

pub mod errors;
pub mod extractors;
pub mod health;
pub mod shutdown;

pub use errors::ErrorBody;
pub use extractors::ValidatedJson;
pub use health::{health_handler, run_health_checks, HealthCheckFuture};
pub use shutdown::shutdown_signal;
