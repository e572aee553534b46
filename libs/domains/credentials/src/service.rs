use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain_telemetry::{CloudProvider, DataType};
use moka::future::Cache;
use tracing::{debug, info};
use uuid::Uuid;

use crate::crypto::SecretCipher;
use crate::error::{CredentialError, CredentialResult};
use crate::models::{
    CollectionTuple, CreateCredential, CredentialSummary, DecryptedCredential, UpdateCredential,
};
use crate::repository::CredentialRepository;

/// Service for managing encrypted provider credentials.
///
/// Decrypted credentials are cached in-process with a short TTL; every
/// write invalidates the entry, and a cache miss reads through to the
/// store.
pub struct CredentialService<R: CredentialRepository> {
    repository: Arc<R>,
    cipher: SecretCipher,
    cache: Cache<Uuid, Arc<DecryptedCredential>>,
}

impl<R: CredentialRepository> CredentialService<R> {
    pub fn new(repository: R, cipher: SecretCipher, cache_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(cache_ttl)
            .build();

        Self {
            repository: Arc::new(repository),
            cipher,
            cache,
        }
    }

    /// Create a credential; the secret is encrypted before it leaves this
    /// function
    pub async fn create(&self, input: CreateCredential) -> CredentialResult<CredentialSummary> {
        let plaintext = serde_json::to_vec(&input.secret)
            .map_err(|e| CredentialError::InvalidInput(format!("secret not serializable: {e}")))?;
        let ciphertext = self.cipher.encrypt(&plaintext)?;

        let credential = self
            .repository
            .create(
                input.customer_id,
                input.provider,
                input.credential_name,
                ciphertext,
                input.metadata,
            )
            .await?;

        info!(
            customer_id = %credential.customer_id,
            provider = %credential.provider,
            credential_name = %credential.credential_name,
            "Created credential"
        );

        Ok(credential.into())
    }

    /// Versioned update; replacing the secret bumps the version and clears
    /// the verification flag
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCredential,
    ) -> CredentialResult<CredentialSummary> {
        let ciphertext = match input.secret {
            Some(secret) => {
                let plaintext = serde_json::to_vec(&secret).map_err(|e| {
                    CredentialError::InvalidInput(format!("secret not serializable: {e}"))
                })?;
                Some(self.cipher.encrypt(&plaintext)?)
            }
            None => None,
        };

        let credential = self.repository.update(id, ciphertext, input.metadata).await?;
        self.cache.invalidate(&id).await;

        Ok(credential.into())
    }

    /// Soft-delete; the record stays for audit but stops being enumerated
    pub async fn delete(&self, id: Uuid) -> CredentialResult<bool> {
        let deleted = self.repository.soft_delete(id).await?;
        self.cache.invalidate(&id).await;
        Ok(deleted)
    }

    /// Redacted listing for a customer
    pub async fn list_by_customer(
        &self,
        customer_id: Uuid,
    ) -> CredentialResult<Vec<CredentialSummary>> {
        let credentials = self.repository.list_by_customer(customer_id).await?;
        Ok(credentials.into_iter().map(Into::into).collect())
    }

    /// Redacted view of the newest credential for (customer, provider)
    pub async fn get_summary(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
    ) -> CredentialResult<Option<CredentialSummary>> {
        let credential = self
            .repository
            .get_by_tuple(customer_id, provider, None)
            .await?;
        Ok(credential.map(Into::into))
    }

    /// Fetch with decrypted secret, through the TTL cache
    pub async fn fetch_decrypted(&self, id: Uuid) -> CredentialResult<Arc<DecryptedCredential>> {
        if let Some(cached) = self.cache.get(&id).await {
            debug!(credential_id = %id, "Credential cache hit");
            return Ok(cached);
        }

        let credential = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| CredentialError::NotFound(id.to_string()))?;

        let plaintext = self.cipher.decrypt(&credential.secret_ciphertext)?;
        let secret: HashMap<String, String> = serde_json::from_slice(&plaintext)
            .map_err(|e| CredentialError::Crypto(format!("secret payload malformed: {e}")))?;

        let decrypted = Arc::new(DecryptedCredential {
            id: credential.id,
            customer_id: credential.customer_id,
            provider: credential.provider,
            credential_name: credential.credential_name,
            secret,
            is_verified: credential.is_verified,
            metadata: credential.metadata,
        });

        self.cache.insert(id, decrypted.clone()).await;
        Ok(decrypted)
    }

    /// Fetch the newest decrypted credential for (customer, provider)
    pub async fn fetch_decrypted_for(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
    ) -> CredentialResult<Arc<DecryptedCredential>> {
        let credential = self
            .repository
            .get_by_tuple(customer_id, provider, None)
            .await?
            .ok_or_else(|| {
                CredentialError::NotFound(format!("{customer_id}/{provider}"))
            })?;

        self.fetch_decrypted(credential.id).await
    }

    /// Record the outcome of a verification probe
    pub async fn mark_verified(&self, id: Uuid, is_verified: bool) -> CredentialResult<()> {
        self.repository.set_verified(id, is_verified).await?;
        self.cache.invalidate(&id).await;
        Ok(())
    }

    /// Enumerate the enabled (customer, provider, data_type) tuples the
    /// scheduler fans out over. Only verified credentials participate;
    /// demo credentials count as verified by construction.
    pub async fn enabled_tuples(&self) -> CredentialResult<Vec<CollectionTuple>> {
        let credentials = self.repository.list_all().await?;

        let mut tuples = Vec::new();
        for credential in credentials {
            if !credential.is_verified && !credential.metadata.demo {
                continue;
            }
            for data_type in DataType::ALL {
                if credential.metadata.data_type_enabled(data_type) {
                    tuples.push(CollectionTuple {
                        customer_id: credential.customer_id,
                        provider: credential.provider,
                        data_type,
                    });
                }
            }
        }

        tuples.sort_by_key(|t| (t.customer_id, t.provider as u8, t.data_type as u8));
        tuples.dedup();
        Ok(tuples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Credential, CredentialMetadata};
    use crate::repository::MockCredentialRepository;
    use chrono::Utc;

    fn credential(verified: bool, demo: bool) -> Credential {
        Credential {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            provider: CloudProvider::Runpod,
            credential_name: "primary".to_string(),
            secret_ciphertext: Vec::new(),
            version: 1,
            is_verified: verified,
            metadata: CredentialMetadata {
                demo,
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(repo: MockCredentialRepository) -> CredentialService<MockCredentialRepository> {
        CredentialService::new(
            repo,
            SecretCipher::from_key_material("test"),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_enabled_tuples_skips_unverified() {
        let mut repo = MockCredentialRepository::new();
        repo.expect_list_all()
            .returning(|| Ok(vec![credential(false, false)]));

        let tuples = service(repo).enabled_tuples().await.unwrap();
        assert!(tuples.is_empty());
    }

    #[tokio::test]
    async fn test_enabled_tuples_demo_counts_as_verified() {
        let mut repo = MockCredentialRepository::new();
        repo.expect_list_all()
            .returning(|| Ok(vec![credential(false, true)]));

        let tuples = service(repo).enabled_tuples().await.unwrap();
        // all four data types enabled by default
        assert_eq!(tuples.len(), 4);
        assert!(tuples.iter().all(|t| t.provider == CloudProvider::Runpod));
    }

    #[tokio::test]
    async fn test_enabled_tuples_respects_data_type_filter() {
        let mut repo = MockCredentialRepository::new();
        repo.expect_list_all().returning(|| {
            let mut c = credential(true, false);
            c.metadata.enabled_data_types = vec![DataType::Cost, DataType::Resource];
            Ok(vec![c])
        });

        let tuples = service(repo).enabled_tuples().await.unwrap();
        assert_eq!(tuples.len(), 2);
        assert!(tuples.iter().any(|t| t.data_type == DataType::Cost));
        assert!(tuples.iter().any(|t| t.data_type == DataType::Resource));
    }

    #[tokio::test]
    async fn test_fetch_decrypted_roundtrip() {
        let cipher = SecretCipher::from_key_material("test");
        let mut secret = HashMap::new();
        secret.insert("api_key".to_string(), "rp-123".to_string());
        let ciphertext = cipher
            .encrypt(&serde_json::to_vec(&secret).unwrap())
            .unwrap();

        let mut stored = credential(true, false);
        stored.secret_ciphertext = ciphertext;
        let id = stored.id;

        let mut repo = MockCredentialRepository::new();
        let stored_clone = stored.clone();
        repo.expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(Some(stored_clone.clone())));

        let service = service(repo);
        let decrypted = service.fetch_decrypted(id).await.unwrap();
        assert_eq!(decrypted.secret.get("api_key").unwrap(), "rp-123");

        // Second fetch is served by the cache (repo expects exactly one call)
        let cached = service.fetch_decrypted(id).await.unwrap();
        assert_eq!(cached.secret.get("api_key").unwrap(), "rp-123");
    }
}
