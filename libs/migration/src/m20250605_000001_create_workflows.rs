use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create workflow_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(WorkflowStatusEnum::Enum)
                    .values([
                        WorkflowStatusEnum::Pending,
                        WorkflowStatusEnum::Running,
                        WorkflowStatusEnum::Waiting,
                        WorkflowStatusEnum::Completed,
                        WorkflowStatusEnum::Failed,
                        WorkflowStatusEnum::RolledBack,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create workflow_step_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(StepStatusEnum::Enum)
                    .values([
                        StepStatusEnum::Pending,
                        StepStatusEnum::Running,
                        StepStatusEnum::Completed,
                        StepStatusEnum::Failed,
                        StepStatusEnum::RolledBack,
                    ])
                    .to_owned(),
            )
            .await?;

        // workflow_executions: one row per run. last_completed_step is the
        // checkpoint a crashed engine resumes from (-1 = nothing done yet).
        manager
            .create_table(
                Table::create()
                    .table(WorkflowExecutions::Table)
                    .if_not_exists()
                    .col(pk_uuid(WorkflowExecutions::Id))
                    .col(string_len(WorkflowExecutions::WorkflowType, 255).not_null())
                    .col(uuid(WorkflowExecutions::CustomerId).not_null())
                    .col(uuid_null(WorkflowExecutions::AgentId))
                    .col(uuid_null(WorkflowExecutions::RecommendationId))
                    .col(
                        ColumnDef::new(WorkflowExecutions::Status)
                            .custom(WorkflowStatusEnum::Enum)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        integer(WorkflowExecutions::LastCompletedStep)
                            .not_null()
                            .default(-1),
                    )
                    .col(json_binary(WorkflowExecutions::Context).not_null().default("{}"))
                    .col(
                        timestamp_with_time_zone(WorkflowExecutions::StartedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(WorkflowExecutions::CompletedAt))
                    .col(
                        timestamp_with_time_zone(WorkflowExecutions::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workflow_executions_customer_status")
                    .table(WorkflowExecutions::Table)
                    .col(WorkflowExecutions::CustomerId)
                    .col(WorkflowExecutions::Status)
                    .to_owned(),
            )
            .await?;

        // workflow_steps: one row per node execution attempt
        manager
            .create_table(
                Table::create()
                    .table(WorkflowSteps::Table)
                    .if_not_exists()
                    .col(pk_uuid(WorkflowSteps::Id))
                    .col(uuid(WorkflowSteps::ExecutionId).not_null())
                    .col(integer(WorkflowSteps::StepIndex).not_null())
                    .col(string_len(WorkflowSteps::StepName, 255).not_null())
                    .col(
                        ColumnDef::new(WorkflowSteps::Status)
                            .custom(StepStatusEnum::Enum)
                            .not_null()
                            .default("pending"),
                    )
                    .col(json_binary(WorkflowSteps::Input).not_null().default("{}"))
                    .col(json_binary(WorkflowSteps::Output).not_null().default("{}"))
                    .col(json_binary(WorkflowSteps::Undo).not_null().default("{}"))
                    .col(text_null(WorkflowSteps::Error))
                    .col(
                        timestamp_with_time_zone(WorkflowSteps::StartedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(WorkflowSteps::CompletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workflow_steps_execution_id")
                            .from(WorkflowSteps::Table, WorkflowSteps::ExecutionId)
                            .to(WorkflowExecutions::Table, WorkflowExecutions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workflow_steps_execution_index")
                    .table(WorkflowSteps::Table)
                    .col(WorkflowSteps::ExecutionId)
                    .col(WorkflowSteps::StepIndex)
                    .to_owned(),
            )
            .await?;

        // workflow_state_transitions: append-only status change log
        manager
            .create_table(
                Table::create()
                    .table(WorkflowStateTransitions::Table)
                    .if_not_exists()
                    .col(pk_uuid(WorkflowStateTransitions::Id))
                    .col(uuid(WorkflowStateTransitions::ExecutionId).not_null())
                    .col(string_len(WorkflowStateTransitions::FromStatus, 64).not_null())
                    .col(string_len(WorkflowStateTransitions::ToStatus, 64).not_null())
                    .col(text_null(WorkflowStateTransitions::Detail))
                    .col(
                        timestamp_with_time_zone(WorkflowStateTransitions::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workflow_state_transitions_execution_id")
                            .from(
                                WorkflowStateTransitions::Table,
                                WorkflowStateTransitions::ExecutionId,
                            )
                            .to(WorkflowExecutions::Table, WorkflowExecutions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workflow_state_transitions_execution")
                    .table(WorkflowStateTransitions::Table)
                    .col(WorkflowStateTransitions::ExecutionId)
                    .col(WorkflowStateTransitions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // workflow_artifacts: durable before/after snapshots and diffs
        manager
            .create_table(
                Table::create()
                    .table(WorkflowArtifacts::Table)
                    .if_not_exists()
                    .col(pk_uuid(WorkflowArtifacts::Id))
                    .col(uuid(WorkflowArtifacts::ExecutionId).not_null())
                    .col(uuid_null(WorkflowArtifacts::StepId))
                    .col(string_len(WorkflowArtifacts::ArtifactKind, 64).not_null())
                    .col(json_binary(WorkflowArtifacts::Content).not_null().default("{}"))
                    .col(
                        timestamp_with_time_zone(WorkflowArtifacts::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workflow_artifacts_execution_id")
                            .from(WorkflowArtifacts::Table, WorkflowArtifacts::ExecutionId)
                            .to(WorkflowExecutions::Table, WorkflowExecutions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workflow_artifacts_execution")
                    .table(WorkflowArtifacts::Table)
                    .col(WorkflowArtifacts::ExecutionId)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER workflow_executions_touch_updated_at
                    BEFORE UPDATE ON workflow_executions
                    FOR EACH ROW
                    EXECUTE FUNCTION util.touch_updated_at()
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkflowArtifacts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkflowStateTransitions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkflowSteps::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkflowExecutions::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(StepStatusEnum::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(WorkflowStatusEnum::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum WorkflowExecutions {
    Table,
    Id,
    WorkflowType,
    CustomerId,
    AgentId,
    RecommendationId,
    Status,
    LastCompletedStep,
    Context,
    StartedAt,
    CompletedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WorkflowSteps {
    Table,
    Id,
    ExecutionId,
    StepIndex,
    StepName,
    Status,
    Input,
    Output,
    Undo,
    Error,
    StartedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum WorkflowStateTransitions {
    Table,
    Id,
    ExecutionId,
    FromStatus,
    ToStatus,
    Detail,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WorkflowArtifacts {
    Table,
    Id,
    ExecutionId,
    StepId,
    ArtifactKind,
    Content,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WorkflowStatusEnum {
    #[sea_orm(iden = "workflow_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "waiting")]
    Waiting,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "rolled_back")]
    RolledBack,
}

#[derive(DeriveIden)]
enum StepStatusEnum {
    #[sea_orm(iden = "workflow_step_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "rolled_back")]
    RolledBack,
}
