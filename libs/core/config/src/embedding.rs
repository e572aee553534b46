use crate::{env_or_default, env_parse_or, ConfigError, FromEnv};

/// Which embedding backend the semantic memory uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// OpenAI embeddings API (production).
    OpenAi,
    /// Deterministic hash embedder; suitable for tests and offline runs.
    Deterministic,
}

/// Semantic memory configuration.
///
/// Environment variables:
/// - `QDRANT_URL` (default `http://localhost:6334`)
/// - `EMBEDDING_BACKEND`: `openai` or `deterministic` (default `openai`)
/// - `EMBEDDING_MODEL` (default `text-embedding-3-small`)
/// - `EMBEDDING_TIMEOUT_S` (default 5)
/// - `OPENAI_API_KEY`: required only for the OpenAI backend at call time
#[derive(Clone, Debug)]
pub struct MemoryConfig {
    pub qdrant_url: String,
    pub backend: EmbeddingBackend,
    pub model: String,
    pub timeout_s: u64,
}

impl FromEnv for MemoryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = match env_or_default("EMBEDDING_BACKEND", "openai").to_lowercase().as_str() {
            "deterministic" => EmbeddingBackend::Deterministic,
            _ => EmbeddingBackend::OpenAi,
        };

        Ok(Self {
            qdrant_url: env_or_default("QDRANT_URL", "http://localhost:6334"),
            backend,
            model: env_or_default("EMBEDDING_MODEL", "text-embedding-3-small"),
            timeout_s: env_parse_or("EMBEDDING_TIMEOUT_S", 5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config_defaults() {
        temp_env::with_vars(
            [
                ("QDRANT_URL", None::<&str>),
                ("EMBEDDING_BACKEND", None),
            ],
            || {
                let config = MemoryConfig::from_env().unwrap();
                assert_eq!(config.qdrant_url, "http://localhost:6334");
                assert_eq!(config.backend, EmbeddingBackend::OpenAi);
            },
        );
    }

    #[test]
    fn test_memory_config_deterministic_backend() {
        temp_env::with_var("EMBEDDING_BACKEND", Some("deterministic"), || {
            let config = MemoryConfig::from_env().unwrap();
            assert_eq!(config.backend, EmbeddingBackend::Deterministic);
        });
    }
}
