//! Integration tests for the encrypted credential store.

use std::collections::HashMap;
use std::time::Duration;

use domain_credentials::{
    CreateCredential, CredentialMetadata, CredentialService, PgCredentialRepository,
    SecretCipher, UpdateCredential,
};
use domain_telemetry::CloudProvider;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use test_utils::{TestDatabase, TestDataBuilder};
use uuid::Uuid;

async fn seed_customer(db: &TestDatabase, customer_id: Uuid) {
    db.connection
        .execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO customers (id, name) VALUES ($1, 'test-tenant')",
            [customer_id.into()],
        ))
        .await
        .expect("seed customer");
}

fn service(db: &TestDatabase) -> CredentialService<PgCredentialRepository> {
    CredentialService::new(
        PgCredentialRepository::new(db.connection()),
        SecretCipher::from_key_material("integration-test-key"),
        Duration::from_secs(60),
    )
}

fn secret(key: &str, value: &str) -> HashMap<String, String> {
    HashMap::from([(key.to_string(), value.to_string())])
}

#[tokio::test]
async fn test_create_stores_ciphertext_and_fetch_decrypts() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("credential_roundtrip");
    let customer_id = builder.customer_id();
    seed_customer(&db, customer_id).await;

    let service = service(&db);
    let created = service
        .create(CreateCredential {
            customer_id,
            provider: CloudProvider::Runpod,
            credential_name: "primary".to_string(),
            secret: secret("api_key", "rp-secret-123"),
            metadata: CredentialMetadata::default(),
        })
        .await
        .unwrap();

    assert_eq!(created.version, 1);
    assert!(!created.is_verified);

    // The raw row never contains the plaintext
    let raw = db
        .connection
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT encode(secret_ciphertext, 'escape') AS blob FROM cloud_credentials WHERE id = $1",
            [created.id.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let blob: String = raw.try_get("", "blob").unwrap();
    assert!(!blob.contains("rp-secret-123"));

    let decrypted = service.fetch_decrypted(created.id).await.unwrap();
    assert_eq!(decrypted.secret.get("api_key").unwrap(), "rp-secret-123");
}

#[tokio::test]
async fn test_duplicate_tuple_is_rejected() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("credential_duplicate");
    let customer_id = builder.customer_id();
    seed_customer(&db, customer_id).await;

    let service = service(&db);
    let input = CreateCredential {
        customer_id,
        provider: CloudProvider::Vultr,
        credential_name: "primary".to_string(),
        secret: secret("api_key", "v-1"),
        metadata: CredentialMetadata::default(),
    };

    service.create(input.clone()).await.unwrap();
    assert!(service.create(input).await.is_err());
}

#[tokio::test]
async fn test_secret_update_bumps_version_and_clears_verification() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("credential_versioning");
    let customer_id = builder.customer_id();
    seed_customer(&db, customer_id).await;

    let service = service(&db);
    let created = service
        .create(CreateCredential {
            customer_id,
            provider: CloudProvider::Aws,
            credential_name: "primary".to_string(),
            secret: secret("export_api_key", "old"),
            metadata: CredentialMetadata::default(),
        })
        .await
        .unwrap();

    service.mark_verified(created.id, true).await.unwrap();

    let updated = service
        .update(
            created.id,
            UpdateCredential {
                secret: Some(secret("export_api_key", "new")),
                metadata: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.version, 2);
    // a replaced secret needs a fresh probe
    assert!(!updated.is_verified);

    let decrypted = service.fetch_decrypted(created.id).await.unwrap();
    assert_eq!(decrypted.secret.get("export_api_key").unwrap(), "new");
}

#[tokio::test]
async fn test_soft_delete_hides_from_listing() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("credential_soft_delete");
    let customer_id = builder.customer_id();
    seed_customer(&db, customer_id).await;

    let service = service(&db);
    let created = service
        .create(CreateCredential {
            customer_id,
            provider: CloudProvider::Gcp,
            credential_name: "primary".to_string(),
            secret: secret("service_account_token", "t"),
            metadata: CredentialMetadata::default(),
        })
        .await
        .unwrap();

    assert!(service.delete(created.id).await.unwrap());
    assert!(service.list_by_customer(customer_id).await.unwrap().is_empty());

    // The row survives for audit
    let raw = db
        .connection
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT deleted_at FROM cloud_credentials WHERE id = $1",
            [created.id.into()],
        ))
        .await
        .unwrap();
    assert!(raw.is_some());

    // Deleting again reports false
    assert!(!service.delete(created.id).await.unwrap());
}
