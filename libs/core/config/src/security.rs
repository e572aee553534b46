use crate::{env_parse_or, env_required, ConfigError, FromEnv};

/// Credential encryption configuration.
///
/// `CREDENTIAL_ENCRYPTION_KEY` is any operator-chosen secret string; the
/// credential store derives the actual AES-256 key from it with SHA-256.
#[derive(Clone)]
pub struct EncryptionConfig {
    pub key_material: String,
    /// TTL for the in-process decrypted-credential cache, in seconds.
    pub cache_ttl_s: u64,
}

impl FromEnv for EncryptionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            key_material: env_required("CREDENTIAL_ENCRYPTION_KEY")?,
            cache_ttl_s: env_parse_or("CREDENTIAL_CACHE_TTL_S", 60)?,
        })
    }
}

// Deliberately opaque Debug so the key material never lands in logs.
impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key_material", &"<redacted>")
            .field("cache_ttl_s", &self.cache_ttl_s)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_config_requires_key() {
        temp_env::with_var_unset("CREDENTIAL_ENCRYPTION_KEY", || {
            assert!(EncryptionConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_encryption_config_debug_redacts_key() {
        temp_env::with_var("CREDENTIAL_ENCRYPTION_KEY", Some("super-secret"), || {
            let config = EncryptionConfig::from_env().unwrap();
            let debug = format!("{:?}", config);
            assert!(!debug.contains("super-secret"));
            assert!(debug.contains("<redacted>"));
        });
    }
}
