use crate::{env_required, ConfigError, FromEnv};

/// Database configuration
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
}

impl DatabaseConfig {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl FromEnv for DatabaseConfig {
    /// Requires DATABASE_URL to be set (no default)
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("DATABASE_URL")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_from_env_success() {
        temp_env::with_var("DATABASE_URL", Some("postgres://localhost/testdb"), || {
            let config = DatabaseConfig::from_env();
            assert!(config.is_ok());
            assert_eq!(config.unwrap().url, "postgres://localhost/testdb");
        });
    }

    #[test]
    fn test_database_config_from_env_missing() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let config = DatabaseConfig::from_env();
            assert!(config.is_err());
            assert!(config.unwrap_err().to_string().contains("DATABASE_URL"));
        });
    }
}
