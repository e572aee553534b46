use async_trait::async_trait;
use domain_telemetry::CloudProvider;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::{self, Column, Entity};
use crate::error::{CredentialError, CredentialResult};
use crate::models::{Credential, CredentialMetadata};
use crate::repository::CredentialRepository;

/// PostgreSQL implementation of CredentialRepository
#[derive(Clone)]
pub struct PgCredentialRepository {
    db: DatabaseConnection,
}

impl PgCredentialRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_live(&self, id: Uuid) -> CredentialResult<entity::Model> {
        Entity::find_by_id(id)
            .filter(Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| CredentialError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl CredentialRepository for PgCredentialRepository {
    async fn create(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        credential_name: String,
        secret_ciphertext: Vec<u8>,
        metadata: CredentialMetadata,
    ) -> CredentialResult<Credential> {
        let existing = self
            .get_by_tuple(customer_id, provider, Some(credential_name.clone()))
            .await?;
        if existing.is_some() {
            return Err(CredentialError::Duplicate(format!(
                "{customer_id}/{provider}/{credential_name}"
            )));
        }

        let model = entity::new_active_model(
            customer_id,
            provider,
            credential_name,
            secret_ciphertext,
            &metadata,
        );
        let result = model.insert(&self.db).await?.into();
        Ok(result)
    }

    async fn get_by_id(&self, id: Uuid) -> CredentialResult<Option<Credential>> {
        let result = Entity::find_by_id(id)
            .filter(Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .map(Into::into);
        Ok(result)
    }

    async fn get_by_tuple(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        credential_name: Option<String>,
    ) -> CredentialResult<Option<Credential>> {
        let mut query = Entity::find()
            .filter(Column::CustomerId.eq(customer_id))
            .filter(Column::Provider.eq(provider))
            .filter(Column::DeletedAt.is_null());

        if let Some(name) = credential_name {
            query = query.filter(Column::CredentialName.eq(name));
        }

        let result = query
            .order_by_desc(Column::UpdatedAt)
            .one(&self.db)
            .await?
            .map(Into::into);
        Ok(result)
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> CredentialResult<Vec<Credential>> {
        let results = Entity::find()
            .filter(Column::CustomerId.eq(customer_id))
            .filter(Column::DeletedAt.is_null())
            .order_by_desc(Column::UpdatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn list_all(&self) -> CredentialResult<Vec<Credential>> {
        let results = Entity::find()
            .filter(Column::DeletedAt.is_null())
            .order_by_desc(Column::UpdatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn update(
        &self,
        id: Uuid,
        secret_ciphertext: Option<Vec<u8>>,
        metadata: Option<CredentialMetadata>,
    ) -> CredentialResult<Credential> {
        let existing = self.find_live(id).await?;
        let current_version = existing.version;

        let mut model: entity::ActiveModel = existing.into();

        if let Some(ciphertext) = secret_ciphertext {
            model.secret_ciphertext = Set(ciphertext);
            model.version = Set(current_version + 1);
            // A replaced secret needs a fresh probe
            model.is_verified = Set(false);
        }

        if let Some(metadata) = metadata {
            model.metadata = Set(serde_json::to_value(&metadata).unwrap_or_default());
        }

        model.updated_at = Set(chrono::Utc::now().into());

        let result = model.update(&self.db).await?.into();
        Ok(result)
    }

    async fn set_verified(&self, id: Uuid, is_verified: bool) -> CredentialResult<()> {
        let existing = self.find_live(id).await?;
        let mut model: entity::ActiveModel = existing.into();
        model.is_verified = Set(is_verified);
        model.updated_at = Set(chrono::Utc::now().into());
        model.update(&self.db).await?;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> CredentialResult<bool> {
        match self.find_live(id).await {
            Ok(existing) => {
                let mut model: entity::ActiveModel = existing.into();
                model.deleted_at = Set(Some(chrono::Utc::now().into()));
                model.update(&self.db).await?;
                Ok(true)
            }
            Err(CredentialError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
