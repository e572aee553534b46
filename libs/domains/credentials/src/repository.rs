use async_trait::async_trait;
use domain_telemetry::CloudProvider;
use uuid::Uuid;

use crate::error::CredentialResult;
use crate::models::{Credential, CredentialMetadata};

/// Repository trait for credential persistence.
///
/// Works on encrypted records; encryption and decryption live in the
/// service layer so repository implementations never see plaintext.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Insert a new credential (secret already encrypted)
    async fn create(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        credential_name: String,
        secret_ciphertext: Vec<u8>,
        metadata: CredentialMetadata,
    ) -> CredentialResult<Credential>;

    /// Get a live credential by id
    async fn get_by_id(&self, id: Uuid) -> CredentialResult<Option<Credential>>;

    /// Get a live credential by its unique tuple
    async fn get_by_tuple(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        credential_name: Option<String>,
    ) -> CredentialResult<Option<Credential>>;

    /// List live credentials for a customer
    async fn list_by_customer(&self, customer_id: Uuid) -> CredentialResult<Vec<Credential>>;

    /// List all live credentials (scheduler enumeration)
    async fn list_all(&self) -> CredentialResult<Vec<Credential>>;

    /// Replace the secret (bumps version) and/or metadata
    async fn update(
        &self,
        id: Uuid,
        secret_ciphertext: Option<Vec<u8>>,
        metadata: Option<CredentialMetadata>,
    ) -> CredentialResult<Credential>;

    /// Flip the verification flag
    async fn set_verified(&self, id: Uuid, is_verified: bool) -> CredentialResult<()>;

    /// Soft-delete a credential
    async fn soft_delete(&self, id: Uuid) -> CredentialResult<bool>;
}
