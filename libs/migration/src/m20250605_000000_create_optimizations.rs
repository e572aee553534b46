use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create recommendation_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(RecommendationStatusEnum::Enum)
                    .values([
                        RecommendationStatusEnum::Pending,
                        RecommendationStatusEnum::Approved,
                        RecommendationStatusEnum::Rejected,
                        RecommendationStatusEnum::Executed,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create optimization_outcome enum
        manager
            .create_type(
                Type::create()
                    .as_enum(OptimizationOutcomeEnum::Enum)
                    .values([
                        OptimizationOutcomeEnum::Success,
                        OptimizationOutcomeEnum::Failed,
                        OptimizationOutcomeEnum::Partial,
                        OptimizationOutcomeEnum::RolledBack,
                    ])
                    .to_owned(),
            )
            .await?;

        // recommendations: agent-produced proposals awaiting approval. The
        // optimization_id is minted at proposal time and links the eventual
        // optimizations row and semantic-memory entries back here.
        manager
            .create_table(
                Table::create()
                    .table(Recommendations::Table)
                    .if_not_exists()
                    .col(pk_uuid(Recommendations::Id))
                    .col(uuid(Recommendations::OptimizationId).not_null())
                    .col(uuid(Recommendations::CustomerId).not_null())
                    .col(
                        ColumnDef::new(Recommendations::AgentType)
                            .custom(AgentTypeEnum::Enum)
                            .not_null(),
                    )
                    .col(string_len(Recommendations::RecommendationType, 255).not_null())
                    .col(string_len(Recommendations::Title, 512).not_null())
                    .col(text(Recommendations::Description).default(""))
                    .col(double_null(Recommendations::EstimatedSavingsPct))
                    .col(
                        ColumnDef::new(Recommendations::Status)
                            .custom(RecommendationStatusEnum::Enum)
                            .not_null()
                            .default("pending"),
                    )
                    .col(json_binary(Recommendations::Payload).not_null().default("{}"))
                    .col(
                        timestamp_with_time_zone(Recommendations::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Recommendations::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_recommendations_optimization_id")
                    .table(Recommendations::Table)
                    .col(Recommendations::OptimizationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_recommendations_customer_status")
                    .table(Recommendations::Table)
                    .col(Recommendations::CustomerId)
                    .col(Recommendations::Status)
                    .to_owned(),
            )
            .await?;

        // approvals: one peer vote per (recommendation, agent type)
        manager
            .create_table(
                Table::create()
                    .table(Approvals::Table)
                    .if_not_exists()
                    .col(pk_uuid(Approvals::Id))
                    .col(uuid(Approvals::RecommendationId).not_null())
                    .col(
                        ColumnDef::new(Approvals::ApprovingAgentType)
                            .custom(AgentTypeEnum::Enum)
                            .not_null(),
                    )
                    .col(boolean(Approvals::Approved).not_null())
                    .col(
                        double(Approvals::Confidence)
                            .not_null()
                            .check(
                                Expr::col(Approvals::Confidence)
                                    .gte(0.0)
                                    .and(Expr::col(Approvals::Confidence).lte(1.0)),
                            ),
                    )
                    .col(text(Approvals::Rationale).default(""))
                    .col(
                        timestamp_with_time_zone(Approvals::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approvals_recommendation_id")
                            .from(Approvals::Table, Approvals::RecommendationId)
                            .to(Recommendations::Table, Recommendations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_approvals_recommendation_agent")
                    .table(Approvals::Table)
                    .col(Approvals::RecommendationId)
                    .col(Approvals::ApprovingAgentType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // optimizations: executed actions and their final outcome
        manager
            .create_table(
                Table::create()
                    .table(Optimizations::Table)
                    .if_not_exists()
                    .col(pk_uuid(Optimizations::Id))
                    .col(uuid(Optimizations::OptimizationId).not_null())
                    .col(uuid(Optimizations::RecommendationId).not_null())
                    .col(uuid(Optimizations::CustomerId).not_null())
                    .col(string_len(Optimizations::OptimizationType, 255).not_null())
                    .col(
                        ColumnDef::new(Optimizations::Outcome)
                            .custom(OptimizationOutcomeEnum::Enum)
                            .not_null(),
                    )
                    .col(json_binary(Optimizations::Detail).not_null().default("{}"))
                    .col(
                        timestamp_with_time_zone(Optimizations::ExecutedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Optimizations::CompletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_optimizations_recommendation_id")
                            .from(Optimizations::Table, Optimizations::RecommendationId)
                            .to(Recommendations::Table, Recommendations::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_optimizations_optimization_id")
                    .table(Optimizations::Table)
                    .col(Optimizations::OptimizationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER recommendations_touch_updated_at
                    BEFORE UPDATE ON recommendations
                    FOR EACH ROW
                    EXECUTE FUNCTION util.touch_updated_at()
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Optimizations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Approvals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Recommendations::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(OptimizationOutcomeEnum::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(RecommendationStatusEnum::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Recommendations {
    Table,
    Id,
    OptimizationId,
    CustomerId,
    AgentType,
    RecommendationType,
    Title,
    Description,
    EstimatedSavingsPct,
    Status,
    Payload,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Approvals {
    Table,
    Id,
    RecommendationId,
    ApprovingAgentType,
    Approved,
    Confidence,
    Rationale,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Optimizations {
    Table,
    Id,
    OptimizationId,
    RecommendationId,
    CustomerId,
    OptimizationType,
    Outcome,
    Detail,
    ExecutedAt,
    CompletedAt,
}

// Reference to the agent_type enum created in the agents migration
#[derive(DeriveIden)]
enum AgentTypeEnum {
    #[sea_orm(iden = "agent_type")]
    Enum,
}

#[derive(DeriveIden)]
enum RecommendationStatusEnum {
    #[sea_orm(iden = "recommendation_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "approved")]
    Approved,
    #[sea_orm(iden = "rejected")]
    Rejected,
    #[sea_orm(iden = "executed")]
    Executed,
}

#[derive(DeriveIden)]
enum OptimizationOutcomeEnum {
    #[sea_orm(iden = "optimization_outcome")]
    Enum,
    #[sea_orm(iden = "success")]
    Success,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "partial")]
    Partial,
    #[sea_orm(iden = "rolled_back")]
    RolledBack,
}
