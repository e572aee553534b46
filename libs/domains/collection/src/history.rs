//! Collection history and cursor persistence.
//!
//! Every scheduled or on-demand attempt gets a history row at start and a
//! terminal update at completion; cursors keep per-tuple pagination state
//! between ticks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain_telemetry::{CloudProvider, DataType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::{CollectionError, CollectionResult};
use crate::models::{CollectionStatus, CursorState, HistoryRecord};

mod history_entity {
    use domain_telemetry::CloudProvider;
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    use crate::models::CollectionStatus;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "collection_history")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub customer_id: Uuid,
        pub provider: CloudProvider,
        #[sea_orm(column_type = "JsonBinary")]
        pub data_types: serde_json::Value,
        pub status: CollectionStatus,
        pub started_at: DateTimeWithTimeZone,
        pub completed_at: Option<DateTimeWithTimeZone>,
        pub metrics_collected: i32,
        #[sea_orm(column_type = "Text", nullable)]
        pub error: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

mod cursor_entity {
    use domain_telemetry::{CloudProvider, DataType};
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "collection_cursors")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub customer_id: Uuid,
        pub provider: CloudProvider,
        pub data_type: DataType,
        #[sea_orm(column_type = "Text", nullable)]
        pub cursor: Option<String>,
        pub window_end: Option<DateTimeWithTimeZone>,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<history_entity::Model> for HistoryRecord {
    fn from(model: history_entity::Model) -> Self {
        let data_types: Vec<DataType> =
            serde_json::from_value(model.data_types).unwrap_or_default();
        Self {
            id: model.id,
            customer_id: model.customer_id,
            provider: model.provider,
            data_types,
            status: model.status,
            started_at: model.started_at.into(),
            completed_at: model.completed_at.map(Into::into),
            metrics_collected: model.metrics_collected,
            error: model.error,
        }
    }
}

/// Repository trait for collection_history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionHistoryRepository: Send + Sync {
    /// Insert a running history row at attempt start
    async fn start(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        data_types: Vec<DataType>,
    ) -> CollectionResult<HistoryRecord>;

    /// Record the terminal status of an attempt
    async fn complete(
        &self,
        id: Uuid,
        status: CollectionStatus,
        metrics_collected: usize,
        error: Option<String>,
    ) -> CollectionResult<HistoryRecord>;

    async fn get(&self, id: Uuid) -> CollectionResult<Option<HistoryRecord>>;

    /// Recent attempts for a customer, newest first
    async fn list_recent(
        &self,
        customer_id: Uuid,
        limit: u64,
    ) -> CollectionResult<Vec<HistoryRecord>>;

    /// The most recent attempt for one (customer, provider)
    async fn latest_for(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
    ) -> CollectionResult<Option<HistoryRecord>>;
}

/// Repository trait for collection_cursors
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CursorRepository: Send + Sync {
    async fn get(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        data_type: DataType,
    ) -> CollectionResult<Option<CursorState>>;

    async fn upsert(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        data_type: DataType,
        cursor: Option<String>,
        window_end: Option<DateTime<Utc>>,
    ) -> CollectionResult<()>;
}

/// PostgreSQL implementation of CollectionHistoryRepository
#[derive(Clone)]
pub struct PgCollectionHistoryRepository {
    db: DatabaseConnection,
}

impl PgCollectionHistoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CollectionHistoryRepository for PgCollectionHistoryRepository {
    async fn start(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        data_types: Vec<DataType>,
    ) -> CollectionResult<HistoryRecord> {
        let model = history_entity::ActiveModel {
            id: Set(Uuid::now_v7()),
            customer_id: Set(customer_id),
            provider: Set(provider),
            data_types: Set(serde_json::to_value(&data_types).unwrap_or_default()),
            status: Set(CollectionStatus::Running),
            started_at: Set(Utc::now().into()),
            completed_at: Set(None),
            metrics_collected: Set(0),
            error: Set(None),
        };

        let result = model.insert(&self.db).await?.into();
        Ok(result)
    }

    async fn complete(
        &self,
        id: Uuid,
        status: CollectionStatus,
        metrics_collected: usize,
        error: Option<String>,
    ) -> CollectionResult<HistoryRecord> {
        let existing = history_entity::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CollectionError::HistoryNotFound(id.to_string()))?;

        let mut model: history_entity::ActiveModel = existing.into();
        model.status = Set(status);
        model.completed_at = Set(Some(Utc::now().into()));
        model.metrics_collected = Set(metrics_collected as i32);
        model.error = Set(error);

        let result = model.update(&self.db).await?.into();
        Ok(result)
    }

    async fn get(&self, id: Uuid) -> CollectionResult<Option<HistoryRecord>> {
        let result = history_entity::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into);
        Ok(result)
    }

    async fn list_recent(
        &self,
        customer_id: Uuid,
        limit: u64,
    ) -> CollectionResult<Vec<HistoryRecord>> {
        let results = history_entity::Entity::find()
            .filter(history_entity::Column::CustomerId.eq(customer_id))
            .order_by_desc(history_entity::Column::StartedAt)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(results)
    }

    async fn latest_for(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
    ) -> CollectionResult<Option<HistoryRecord>> {
        let result = history_entity::Entity::find()
            .filter(history_entity::Column::CustomerId.eq(customer_id))
            .filter(history_entity::Column::Provider.eq(provider))
            .order_by_desc(history_entity::Column::StartedAt)
            .one(&self.db)
            .await?
            .map(Into::into);
        Ok(result)
    }
}

/// PostgreSQL implementation of CursorRepository
#[derive(Clone)]
pub struct PgCursorRepository {
    db: DatabaseConnection,
}

impl PgCursorRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CursorRepository for PgCursorRepository {
    async fn get(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        data_type: DataType,
    ) -> CollectionResult<Option<CursorState>> {
        let result = cursor_entity::Entity::find()
            .filter(cursor_entity::Column::CustomerId.eq(customer_id))
            .filter(cursor_entity::Column::Provider.eq(provider))
            .filter(cursor_entity::Column::DataType.eq(data_type))
            .one(&self.db)
            .await?
            .map(|model| CursorState {
                cursor: model.cursor,
                window_end: model.window_end.map(Into::into),
            });
        Ok(result)
    }

    async fn upsert(
        &self,
        customer_id: Uuid,
        provider: CloudProvider,
        data_type: DataType,
        cursor: Option<String>,
        window_end: Option<DateTime<Utc>>,
    ) -> CollectionResult<()> {
        let existing = cursor_entity::Entity::find()
            .filter(cursor_entity::Column::CustomerId.eq(customer_id))
            .filter(cursor_entity::Column::Provider.eq(provider))
            .filter(cursor_entity::Column::DataType.eq(data_type))
            .one(&self.db)
            .await?;

        match existing {
            Some(model) => {
                let mut model: cursor_entity::ActiveModel = model.into();
                model.cursor = Set(cursor);
                model.window_end = Set(window_end.map(Into::into));
                model.updated_at = Set(Utc::now().into());
                model.update(&self.db).await?;
            }
            None => {
                let model = cursor_entity::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    customer_id: Set(customer_id),
                    provider: Set(provider),
                    data_type: Set(data_type),
                    cursor: Set(cursor),
                    window_end: Set(window_end.map(Into::into)),
                    updated_at: Set(Utc::now().into()),
                };
                model.insert(&self.db).await?;
            }
        }

        Ok(())
    }
}
