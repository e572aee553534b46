//! Provider adapters
//!
//! One adapter per (provider, data_type). Adapters are stateless across
//! invocations: pagination state is returned as an opaque cursor the
//! scheduler persists. Adapters never write to a store; they only produce
//! rows, and sub-query failures surface as a `partial` flag plus error
//! strings rather than a fatal error.

pub mod application;
pub mod aws;
pub mod azure;
pub mod gcp;
pub mod prometheus;
pub mod runpod;
pub mod vultr;

use async_trait::async_trait;
use domain_credentials::DecryptedCredential;
use domain_telemetry::{CloudProvider, DataType, MetricBatch, TimeWindow};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Error type for adapter operations.
///
/// Classification drives the scheduler's reaction: `Auth` flips the
/// credential's verification flag, everything else waits for the next tick.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),

    #[error("Adapter not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    Api(String),
}

impl AdapterError {
    /// Whether this failure means the credential itself is bad
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, AdapterError::Auth(_) | AdapterError::NotConfigured(_))
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Everything an adapter needs for one pull
#[derive(Clone)]
pub struct CollectContext {
    pub customer_id: uuid::Uuid,
    pub credential: Arc<DecryptedCredential>,
    pub window: TimeWindow,
    /// Cursor returned by the previous invocation, if any
    pub cursor: Option<String>,
}

/// Output of one adapter pull
#[derive(Debug)]
pub struct AdapterOutput {
    pub batch: MetricBatch,
    /// True when some sub-queries failed and the batch is incomplete
    pub partial: bool,
    /// One entry per failed sub-query
    pub errors: Vec<String>,
    /// Pagination state to persist for the next invocation
    pub cursor: Option<String>,
}

impl AdapterOutput {
    pub fn complete(batch: MetricBatch) -> Self {
        Self {
            batch,
            partial: false,
            errors: Vec::new(),
            cursor: None,
        }
    }

    pub fn partial(batch: MetricBatch, errors: Vec<String>) -> Self {
        Self {
            batch,
            partial: true,
            errors,
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Trait for provider adapters
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The cloud provider this adapter pulls from
    fn provider(&self) -> CloudProvider;

    /// The data type this adapter produces
    fn data_type(&self) -> DataType;

    /// Short human-readable name for logs
    fn name(&self) -> &'static str;

    /// Pull metrics for the window. Sub-query failures surface in the
    /// output's `partial`/`errors`; an `Err` means the whole pull failed.
    async fn collect(&self, ctx: &CollectContext) -> AdapterResult<AdapterOutput>;

    /// Verify API connectivity with the credential
    async fn health_check(&self, credential: &DecryptedCredential) -> AdapterResult<bool>;
}

/// Registry of adapters keyed by (provider, data_type), seeded at build
/// time.
pub struct AdapterRegistry {
    adapters: HashMap<(CloudProvider, DataType), Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with every built-in adapter registered
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(aws::AwsCostAdapter::new()));
        registry.register(Arc::new(aws::AwsResourceAdapter::new()));
        registry.register(Arc::new(gcp::GcpCostAdapter::new()));
        registry.register(Arc::new(azure::AzureCostAdapter::new()));
        registry.register(Arc::new(vultr::VultrCostAdapter::new()));
        registry.register(Arc::new(vultr::VultrResourceAdapter::new()));
        registry.register(Arc::new(runpod::RunpodCostAdapter::new()));
        registry.register(Arc::new(runpod::RunpodResourceAdapter::new()));

        // Performance and application-quality collection go through generic
        // endpoint adapters configured per credential, one instance per
        // provider.
        for provider in [
            CloudProvider::Aws,
            CloudProvider::Gcp,
            CloudProvider::Azure,
            CloudProvider::Vultr,
            CloudProvider::Runpod,
        ] {
            registry.register(Arc::new(prometheus::PrometheusPerformanceAdapter::new(
                provider,
            )));
            registry.register(Arc::new(application::ApplicationQualityAdapter::new(
                provider,
            )));
        }

        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters
            .insert((adapter.provider(), adapter.data_type()), adapter);
    }

    pub fn get(
        &self,
        provider: CloudProvider,
        data_type: DataType,
    ) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&(provider, data_type)).cloned()
    }

    /// Data types a provider advertises
    pub fn data_types_for(&self, provider: CloudProvider) -> Vec<DataType> {
        let mut types: Vec<DataType> = DataType::ALL
            .into_iter()
            .filter(|dt| self.adapters.contains_key(&(provider, *dt)))
            .collect();
        types.sort_by_key(|dt| *dt as u8);
        types
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_covers_all_providers() {
        let registry = AdapterRegistry::with_builtin();

        // every provider advertises cost collection
        for provider in [
            CloudProvider::Aws,
            CloudProvider::Gcp,
            CloudProvider::Azure,
            CloudProvider::Vultr,
            CloudProvider::Runpod,
        ] {
            assert!(
                registry.get(provider, DataType::Cost).is_some(),
                "missing cost adapter for {provider}"
            );
            assert!(
                registry.get(provider, DataType::Performance).is_some(),
                "missing performance adapter for {provider}"
            );
            assert!(
                registry.get(provider, DataType::Application).is_some(),
                "missing application adapter for {provider}"
            );
        }
    }

    #[test]
    fn test_data_types_for_runpod() {
        let registry = AdapterRegistry::with_builtin();
        let types = registry.data_types_for(CloudProvider::Runpod);
        assert!(types.contains(&DataType::Cost));
        assert!(types.contains(&DataType::Resource));
    }

    #[test]
    fn test_adapter_error_classification() {
        assert!(AdapterError::Auth("denied".into()).is_credential_failure());
        assert!(!AdapterError::RateLimited(30).is_credential_failure());
        assert!(AdapterError::NotConfigured("no endpoint".into()).is_credential_failure());
    }
}
