use crate::{env_or_default, env_parse_or, ConfigError, FromEnv};

/// Collection scheduler configuration.
///
/// Environment variables:
/// - `COLLECTION_CRON`: cron expression for the periodic tick
///   (default: every 15 minutes)
/// - `COLLECTION_WORKERS`: global worker pool size (default: 8)
/// - `COLLECTION_PROVIDER_CONCURRENCY`: max concurrent collections per
///   provider (default: 2)
/// - `COLLECTION_MAX_LOOKBACK_HOURS`: cap on the collection window when no
///   previous successful run exists (default: 24)
/// - `COLLECTION_ADAPTER_TIMEOUT_S`: deadline for a single adapter call
///   (default: 60)
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub cron: String,
    pub worker_pool_size: usize,
    pub per_provider_concurrency: usize,
    pub max_lookback_hours: i64,
    pub adapter_timeout_s: u64,
}

impl FromEnv for SchedulerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cron: env_or_default("COLLECTION_CRON", "0 */15 * * * *"),
            worker_pool_size: env_parse_or("COLLECTION_WORKERS", 8)?,
            per_provider_concurrency: env_parse_or("COLLECTION_PROVIDER_CONCURRENCY", 2)?,
            max_lookback_hours: env_parse_or("COLLECTION_MAX_LOOKBACK_HOURS", 24)?,
            adapter_timeout_s: env_parse_or("COLLECTION_ADAPTER_TIMEOUT_S", 60)?,
        })
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cron: "0 */15 * * * *".to_string(),
            worker_pool_size: 8,
            per_provider_concurrency: 2,
            max_lookback_hours: 24,
            adapter_timeout_s: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_defaults() {
        temp_env::with_vars(
            [
                ("COLLECTION_CRON", None::<&str>),
                ("COLLECTION_WORKERS", None),
                ("COLLECTION_PROVIDER_CONCURRENCY", None),
            ],
            || {
                let config = SchedulerConfig::from_env().unwrap();
                assert_eq!(config.cron, "0 */15 * * * *");
                assert_eq!(config.worker_pool_size, 8);
                assert_eq!(config.per_provider_concurrency, 2);
            },
        );
    }

    #[test]
    fn test_scheduler_config_overrides() {
        temp_env::with_vars(
            [
                ("COLLECTION_WORKERS", Some("16")),
                ("COLLECTION_MAX_LOOKBACK_HOURS", Some("48")),
            ],
            || {
                let config = SchedulerConfig::from_env().unwrap();
                assert_eq!(config.worker_pool_size, 16);
                assert_eq!(config.max_lookback_hours, 48);
            },
        );
    }
}
