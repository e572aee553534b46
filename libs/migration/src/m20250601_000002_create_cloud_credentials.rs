use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create cloud_provider enum
        manager
            .create_type(
                Type::create()
                    .as_enum(CloudProviderEnum::Enum)
                    .values([
                        CloudProviderEnum::Aws,
                        CloudProviderEnum::Gcp,
                        CloudProviderEnum::Azure,
                        CloudProviderEnum::Vultr,
                        CloudProviderEnum::Runpod,
                    ])
                    .to_owned(),
            )
            .await?;

        // Credential secrets are stored AES-256-GCM encrypted; the nonce is
        // prepended to the ciphertext. metadata carries provider endpoints
        // and metric-name overrides consumed by the adapters.
        manager
            .create_table(
                Table::create()
                    .table(CloudCredentials::Table)
                    .if_not_exists()
                    .col(pk_uuid(CloudCredentials::Id))
                    .col(uuid(CloudCredentials::CustomerId).not_null())
                    .col(
                        ColumnDef::new(CloudCredentials::Provider)
                            .custom(CloudProviderEnum::Enum)
                            .not_null(),
                    )
                    .col(string_len(CloudCredentials::CredentialName, 255).not_null())
                    .col(binary(CloudCredentials::SecretCiphertext).not_null())
                    .col(integer(CloudCredentials::Version).not_null().default(1))
                    .col(boolean(CloudCredentials::IsVerified).not_null().default(false))
                    .col(json_binary(CloudCredentials::Metadata).not_null().default("{}"))
                    .col(timestamp_with_time_zone_null(CloudCredentials::DeletedAt))
                    .col(
                        timestamp_with_time_zone(CloudCredentials::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(CloudCredentials::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cloud_credentials_customer_id")
                            .from(CloudCredentials::Table, CloudCredentials::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cloud_credentials_customer_provider_name")
                    .table(CloudCredentials::Table)
                    .col(CloudCredentials::CustomerId)
                    .col(CloudCredentials::Provider)
                    .col(CloudCredentials::CredentialName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cloud_credentials_customer_id")
                    .table(CloudCredentials::Table)
                    .col(CloudCredentials::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER cloud_credentials_touch_updated_at
                    BEFORE UPDATE ON cloud_credentials
                    FOR EACH ROW
                    EXECUTE FUNCTION util.touch_updated_at()
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CloudCredentials::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(CloudProviderEnum::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum CloudCredentials {
    Table,
    Id,
    CustomerId,
    Provider,
    CredentialName,
    SecretCiphertext,
    Version,
    IsVerified,
    Metadata,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
}

#[derive(DeriveIden)]
pub enum CloudProviderEnum {
    #[sea_orm(iden = "cloud_provider")]
    Enum,
    #[sea_orm(iden = "aws")]
    Aws,
    #[sea_orm(iden = "gcp")]
    Gcp,
    #[sea_orm(iden = "azure")]
    Azure,
    #[sea_orm(iden = "vultr")]
    Vultr,
    #[sea_orm(iden = "runpod")]
    Runpod,
}
