use domain_telemetry::CloudProvider;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use crate::models::{Credential, CredentialMetadata};

/// Sea-ORM Entity for the cloud_credentials table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cloud_credentials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider: CloudProvider,
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub credential_name: String,
    #[sea_orm(column_type = "VarBinary(StringLen::None)")]
    pub secret_ciphertext: Vec<u8>,
    pub version: i32,
    pub is_verified: bool,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: serde_json::Value,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Credential {
    fn from(model: Model) -> Self {
        let metadata: CredentialMetadata =
            serde_json::from_value(model.metadata).unwrap_or_default();

        Self {
            id: model.id,
            customer_id: model.customer_id,
            provider: model.provider,
            credential_name: model.credential_name,
            secret_ciphertext: model.secret_ciphertext,
            version: model.version,
            is_verified: model.is_verified,
            metadata,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

/// Build a fresh ActiveModel for an insert
pub fn new_active_model(
    customer_id: Uuid,
    provider: CloudProvider,
    credential_name: String,
    secret_ciphertext: Vec<u8>,
    metadata: &CredentialMetadata,
) -> ActiveModel {
    let now = chrono::Utc::now();
    ActiveModel {
        id: Set(Uuid::now_v7()),
        customer_id: Set(customer_id),
        provider: Set(provider),
        credential_name: Set(credential_name),
        secret_ciphertext: Set(secret_ciphertext),
        version: Set(1),
        is_verified: Set(false),
        metadata: Set(serde_json::to_value(metadata).unwrap_or_default()),
        deleted_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}
