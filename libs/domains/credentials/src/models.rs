use chrono::{DateTime, Utc};
use domain_telemetry::{CloudProvider, DataType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A credential record as stored (secret still encrypted)
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    pub credential_name: String,
    pub secret_ciphertext: Vec<u8>,
    pub version: i32,
    pub is_verified: bool,
    pub metadata: CredentialMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A credential with its secret decrypted. Only the scheduler and the
/// verification probe ever see this form; it is deliberately not
/// serializable.
#[derive(Debug, Clone)]
pub struct DecryptedCredential {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    pub credential_name: String,
    /// Provider-specific secret payload (API keys, account ids, ...)
    pub secret: HashMap<String, String>,
    pub is_verified: bool,
    pub metadata: CredentialMetadata,
}

/// The redacted view returned by list/get endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialSummary {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    pub credential_name: String,
    pub version: i32,
    pub is_verified: bool,
    pub metadata: CredentialMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Credential> for CredentialSummary {
    fn from(credential: Credential) -> Self {
        Self {
            id: credential.id,
            customer_id: credential.customer_id,
            provider: credential.provider,
            credential_name: credential.credential_name,
            version: credential.version,
            is_verified: credential.is_verified,
            metadata: credential.metadata,
            created_at: credential.created_at,
            updated_at: credential.updated_at,
        }
    }
}

/// Adapter-facing configuration carried on the credential record.
///
/// `extra` keeps unknown keys intact so operators can stash
/// provider-specific settings without schema changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CredentialMetadata {
    /// Prometheus endpoint for performance collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus_endpoint: Option<String>,
    /// Endpoint exposing application-quality samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_endpoint: Option<String>,
    /// Provider metric name → canonical metric name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metric_name_mapping: HashMap<String, String>,
    /// Data types enabled for collection; empty means all advertised by the
    /// registered adapters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_data_types: Vec<DataType>,
    /// Demo credentials verify without a live provider probe
    #[serde(default)]
    pub demo: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl CredentialMetadata {
    /// Map a provider-reported metric name to the canonical one
    pub fn canonical_metric_name<'a>(&'a self, provider_name: &'a str) -> &'a str {
        self.metric_name_mapping
            .get(provider_name)
            .map(String::as_str)
            .unwrap_or(provider_name)
    }

    /// Whether a data type is enabled for this credential
    pub fn data_type_enabled(&self, data_type: DataType) -> bool {
        self.enabled_data_types.is_empty() || self.enabled_data_types.contains(&data_type)
    }
}

/// DTO for creating a credential
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCredential {
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    #[validate(length(min = 1, max = 255))]
    pub credential_name: String,
    /// Plaintext secret payload; encrypted before it reaches the store
    pub secret: HashMap<String, String>,
    #[serde(default)]
    pub metadata: CredentialMetadata,
}

/// DTO for a versioned credential update
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCredential {
    /// Replacement secret payload; bumps `version` when present
    pub secret: Option<HashMap<String, String>>,
    pub metadata: Option<CredentialMetadata>,
}

/// An enabled (customer, provider, data_type) collection tuple derived from
/// the credential store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionTuple {
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    pub data_type: DataType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_metric_name_mapping() {
        let mut metadata = CredentialMetadata::default();
        metadata
            .metric_name_mapping
            .insert("CPUUtilization".to_string(), "cpu_utilization".to_string());

        assert_eq!(
            metadata.canonical_metric_name("CPUUtilization"),
            "cpu_utilization"
        );
        assert_eq!(metadata.canonical_metric_name("unmapped"), "unmapped");
    }

    #[test]
    fn test_metadata_data_type_filter() {
        let metadata = CredentialMetadata {
            enabled_data_types: vec![DataType::Cost],
            ..Default::default()
        };
        assert!(metadata.data_type_enabled(DataType::Cost));
        assert!(!metadata.data_type_enabled(DataType::Performance));

        let open = CredentialMetadata::default();
        assert!(open.data_type_enabled(DataType::Application));
    }

    #[test]
    fn test_metadata_roundtrip_keeps_unknown_keys() {
        let json = serde_json::json!({
            "prometheus_endpoint": "http://prom:9090",
            "demo": true,
            "custom_region": "eu-west-1"
        });
        let metadata: CredentialMetadata = serde_json::from_value(json).unwrap();
        assert!(metadata.demo);
        assert_eq!(
            metadata.extra.get("custom_region").and_then(|v| v.as_str()),
            Some("eu-west-1")
        );
    }
}
