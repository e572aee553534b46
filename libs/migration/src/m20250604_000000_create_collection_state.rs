use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create data_type enum
        manager
            .create_type(
                Type::create()
                    .as_enum(DataTypeEnum::Enum)
                    .values([
                        DataTypeEnum::Cost,
                        DataTypeEnum::Performance,
                        DataTypeEnum::Resource,
                        DataTypeEnum::Application,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create collection_status enum. 'running' exists because async
        // triggers hand back the history id before the run completes.
        manager
            .create_type(
                Type::create()
                    .as_enum(CollectionStatusEnum::Enum)
                    .values([
                        CollectionStatusEnum::Running,
                        CollectionStatusEnum::Success,
                        CollectionStatusEnum::Partial,
                        CollectionStatusEnum::Failed,
                    ])
                    .to_owned(),
            )
            .await?;

        // collection_history: the durable audit log of every attempt
        manager
            .create_table(
                Table::create()
                    .table(CollectionHistory::Table)
                    .if_not_exists()
                    .col(pk_uuid(CollectionHistory::Id))
                    .col(uuid(CollectionHistory::CustomerId).not_null())
                    .col(
                        ColumnDef::new(CollectionHistory::Provider)
                            .custom(CloudProviderEnum::Enum)
                            .not_null(),
                    )
                    .col(json_binary(CollectionHistory::DataTypes).not_null().default("[]"))
                    .col(
                        ColumnDef::new(CollectionHistory::Status)
                            .custom(CollectionStatusEnum::Enum)
                            .not_null()
                            .default("running"),
                    )
                    .col(
                        timestamp_with_time_zone(CollectionHistory::StartedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(CollectionHistory::CompletedAt))
                    .col(integer(CollectionHistory::MetricsCollected).not_null().default(0))
                    .col(text_null(CollectionHistory::Error))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_collection_history_customer_provider_started")
                    .table(CollectionHistory::Table)
                    .col(CollectionHistory::CustomerId)
                    .col(CollectionHistory::Provider)
                    .col(CollectionHistory::StartedAt)
                    .to_owned(),
            )
            .await?;

        // collection_cursors: persisted adapter cursor / last window end per
        // (customer, provider, data_type) tuple
        manager
            .create_table(
                Table::create()
                    .table(CollectionCursors::Table)
                    .if_not_exists()
                    .col(pk_uuid(CollectionCursors::Id))
                    .col(uuid(CollectionCursors::CustomerId).not_null())
                    .col(
                        ColumnDef::new(CollectionCursors::Provider)
                            .custom(CloudProviderEnum::Enum)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CollectionCursors::DataType)
                            .custom(DataTypeEnum::Enum)
                            .not_null(),
                    )
                    .col(text_null(CollectionCursors::Cursor))
                    .col(timestamp_with_time_zone_null(CollectionCursors::WindowEnd))
                    .col(
                        timestamp_with_time_zone(CollectionCursors::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_collection_cursors_tuple")
                    .table(CollectionCursors::Table)
                    .col(CollectionCursors::CustomerId)
                    .col(CollectionCursors::Provider)
                    .col(CollectionCursors::DataType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CollectionCursors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CollectionHistory::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(CollectionStatusEnum::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(DataTypeEnum::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum CollectionHistory {
    Table,
    Id,
    CustomerId,
    Provider,
    DataTypes,
    Status,
    StartedAt,
    CompletedAt,
    MetricsCollected,
    Error,
}

#[derive(DeriveIden)]
enum CollectionCursors {
    Table,
    Id,
    CustomerId,
    Provider,
    DataType,
    Cursor,
    WindowEnd,
    UpdatedAt,
}

// Reference to the cloud_provider enum created in the credentials migration
#[derive(DeriveIden)]
enum CloudProviderEnum {
    #[sea_orm(iden = "cloud_provider")]
    Enum,
}

#[derive(DeriveIden)]
pub enum DataTypeEnum {
    #[sea_orm(iden = "data_type")]
    Enum,
    #[sea_orm(iden = "cost")]
    Cost,
    #[sea_orm(iden = "performance")]
    Performance,
    #[sea_orm(iden = "resource")]
    Resource,
    #[sea_orm(iden = "application")]
    Application,
}

#[derive(DeriveIden)]
enum CollectionStatusEnum {
    #[sea_orm(iden = "collection_status")]
    Enum,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "success")]
    Success,
    #[sea_orm(iden = "partial")]
    Partial,
    #[sea_orm(iden = "failed")]
    Failed,
}
