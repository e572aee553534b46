use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create agent_type enum
        manager
            .create_type(
                Type::create()
                    .as_enum(AgentTypeEnum::Enum)
                    .values([
                        AgentTypeEnum::Cost,
                        AgentTypeEnum::Performance,
                        AgentTypeEnum::Resource,
                        AgentTypeEnum::Application,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create agent_status enum (lifecycle state machine)
        manager
            .create_type(
                Type::create()
                    .as_enum(AgentStatusEnum::Enum)
                    .values([
                        AgentStatusEnum::Registered,
                        AgentStatusEnum::Active,
                        AgentStatusEnum::Unhealthy,
                        AgentStatusEnum::Terminated,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create agent_run_status enum (work state machine)
        manager
            .create_type(
                Type::create()
                    .as_enum(AgentRunStatusEnum::Enum)
                    .values([
                        AgentRunStatusEnum::Idle,
                        AgentRunStatusEnum::Busy,
                        AgentRunStatusEnum::Processing,
                        AgentRunStatusEnum::Waiting,
                        AgentRunStatusEnum::Error,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create config_value_type enum
        manager
            .create_type(
                Type::create()
                    .as_enum(ConfigValueTypeEnum::Enum)
                    .values([
                        ConfigValueTypeEnum::String,
                        ConfigValueTypeEnum::Int,
                        ConfigValueTypeEnum::Float,
                        ConfigValueTypeEnum::Bool,
                        ConfigValueTypeEnum::Json,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create metric_kind enum
        manager
            .create_type(
                Type::create()
                    .as_enum(MetricKindEnum::Enum)
                    .values([
                        MetricKindEnum::Counter,
                        MetricKindEnum::Gauge,
                        MetricKindEnum::Histogram,
                    ])
                    .to_owned(),
            )
            .await?;

        // agents: one row per logical agent instance
        manager
            .create_table(
                Table::create()
                    .table(Agents::Table)
                    .if_not_exists()
                    .col(pk_uuid(Agents::Id))
                    .col(
                        ColumnDef::new(Agents::AgentType)
                            .custom(AgentTypeEnum::Enum)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Agents::Status)
                            .custom(AgentStatusEnum::Enum)
                            .not_null()
                            .default("registered"),
                    )
                    .col(string_len(Agents::Endpoint, 512).not_null())
                    .col(json_binary(Agents::Capabilities).not_null().default("[]"))
                    .col(integer(Agents::HeartbeatIntervalS).not_null().default(30))
                    .col(timestamp_with_time_zone_null(Agents::LastHeartbeatAt))
                    .col(
                        timestamp_with_time_zone(Agents::RegisteredAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Agents::TerminatedAt))
                    .col(
                        timestamp_with_time_zone(Agents::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Agents::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_agents_type_status")
                    .table(Agents::Table)
                    .col(Agents::AgentType)
                    .col(Agents::Status)
                    .to_owned(),
            )
            .await?;

        // agent_configs: typed key/value per agent
        manager
            .create_table(
                Table::create()
                    .table(AgentConfigs::Table)
                    .if_not_exists()
                    .col(pk_uuid(AgentConfigs::Id))
                    .col(uuid(AgentConfigs::AgentId).not_null())
                    .col(string_len(AgentConfigs::ConfigKey, 255).not_null())
                    .col(
                        ColumnDef::new(AgentConfigs::ValueType)
                            .custom(ConfigValueTypeEnum::Enum)
                            .not_null(),
                    )
                    .col(json_binary(AgentConfigs::Value).not_null())
                    .col(
                        timestamp_with_time_zone(AgentConfigs::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(AgentConfigs::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_agent_configs_agent_id")
                            .from(AgentConfigs::Table, AgentConfigs::AgentId)
                            .to(Agents::Table, Agents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_agent_configs_agent_key")
                    .table(AgentConfigs::Table)
                    .col(AgentConfigs::AgentId)
                    .col(AgentConfigs::ConfigKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // agent_states: one-to-one with agents
        manager
            .create_table(
                Table::create()
                    .table(AgentStates::Table)
                    .if_not_exists()
                    .col(pk_uuid(AgentStates::AgentId))
                    .col(
                        ColumnDef::new(AgentStates::CurrentStatus)
                            .custom(AgentRunStatusEnum::Enum)
                            .not_null()
                            .default("idle"),
                    )
                    .col(json_binary(AgentStates::ActiveWorkflowIds).not_null().default("[]"))
                    .col(json_binary(AgentStates::HeldResourceLocks).not_null().default("[]"))
                    .col(json_binary(AgentStates::State).not_null().default("{}"))
                    .col(
                        timestamp_with_time_zone(AgentStates::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_agent_states_agent_id")
                            .from(AgentStates::Table, AgentStates::AgentId)
                            .to(Agents::Table, Agents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // agent_capabilities: versioned capability rows, multiple versions coexist
        manager
            .create_table(
                Table::create()
                    .table(AgentCapabilities::Table)
                    .if_not_exists()
                    .col(pk_uuid(AgentCapabilities::Id))
                    .col(uuid(AgentCapabilities::AgentId).not_null())
                    .col(string_len(AgentCapabilities::CapabilityName, 255).not_null())
                    .col(string_len(AgentCapabilities::Version, 64).not_null())
                    .col(boolean(AgentCapabilities::Enabled).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(AgentCapabilities::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_agent_capabilities_agent_id")
                            .from(AgentCapabilities::Table, AgentCapabilities::AgentId)
                            .to(Agents::Table, Agents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_agent_capabilities_agent_name_version")
                    .table(AgentCapabilities::Table)
                    .col(AgentCapabilities::AgentId)
                    .col(AgentCapabilities::CapabilityName)
                    .col(AgentCapabilities::Version)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // agent_metrics: operational counters/gauges/histogram samples
        manager
            .create_table(
                Table::create()
                    .table(AgentMetrics::Table)
                    .if_not_exists()
                    .col(pk_uuid(AgentMetrics::Id))
                    .col(uuid(AgentMetrics::AgentId).not_null())
                    .col(string_len(AgentMetrics::MetricName, 255).not_null())
                    .col(
                        ColumnDef::new(AgentMetrics::MetricKind)
                            .custom(MetricKindEnum::Enum)
                            .not_null(),
                    )
                    .col(double(AgentMetrics::Value).not_null())
                    .col(json_binary(AgentMetrics::Tags).not_null().default("{}"))
                    .col(
                        timestamp_with_time_zone(AgentMetrics::RecordedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_agent_metrics_agent_id")
                            .from(AgentMetrics::Table, AgentMetrics::AgentId)
                            .to(Agents::Table, Agents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_agent_metrics_agent_name_recorded")
                    .table(AgentMetrics::Table)
                    .col(AgentMetrics::AgentId)
                    .col(AgentMetrics::MetricName)
                    .col(AgentMetrics::RecordedAt)
                    .to_owned(),
            )
            .await?;

        for table in ["agents", "agent_configs"] {
            manager
                .get_connection()
                .execute_unprepared(&format!(
                    r#"
                    CREATE TRIGGER {table}_touch_updated_at
                        BEFORE UPDATE ON {table}
                        FOR EACH ROW
                        EXECUTE FUNCTION util.touch_updated_at()
                    "#
                ))
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AgentMetrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AgentCapabilities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AgentStates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AgentConfigs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Agents::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(MetricKindEnum::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(ConfigValueTypeEnum::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(AgentRunStatusEnum::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(AgentStatusEnum::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(AgentTypeEnum::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Agents {
    Table,
    Id,
    AgentType,
    Status,
    Endpoint,
    Capabilities,
    HeartbeatIntervalS,
    LastHeartbeatAt,
    RegisteredAt,
    TerminatedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AgentConfigs {
    Table,
    Id,
    AgentId,
    ConfigKey,
    ValueType,
    Value,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AgentStates {
    Table,
    AgentId,
    CurrentStatus,
    ActiveWorkflowIds,
    HeldResourceLocks,
    State,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AgentCapabilities {
    Table,
    Id,
    AgentId,
    CapabilityName,
    Version,
    Enabled,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AgentMetrics {
    Table,
    Id,
    AgentId,
    MetricName,
    MetricKind,
    Value,
    Tags,
    RecordedAt,
}

#[derive(DeriveIden)]
pub enum AgentTypeEnum {
    #[sea_orm(iden = "agent_type")]
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
enum AgentStatusEnum {
    #[sea_orm(iden = "agent_status")]
    Enum,
    #[sea_orm(iden = "registered")]
    Registered,
    #[sea_orm(iden = "active")]
    Active,
    #[sea_orm(iden = "unhealthy")]
    Unhealthy,
    #[sea_orm(iden = "terminated")]
    Terminated,
}

#[derive(DeriveIden)]
enum AgentRunStatusEnum {
    #[sea_orm(iden = "agent_run_status")]
    Enum,
    #[sea_orm(iden = "idle")]
    Idle,
    #[sea_orm(iden = "busy")]
    Busy,
    #[sea_orm(iden = "processing")]
    Processing,
    #[sea_orm(iden = "waiting")]
    Waiting,
    #[sea_orm(iden = "error")]
    Error,
}

#[derive(DeriveIden)]
enum ConfigValueTypeEnum {
    #[sea_orm(iden = "config_value_type")]
    Enum,
    #[sea_orm(iden = "string")]
    String,
    #[sea_orm(iden = "int")]
    Int,
    #[sea_orm(iden = "float")]
    Float,
    #[sea_orm(iden = "bool")]
    Bool,
    #[sea_orm(iden = "json")]
    Json,
}

#[derive(DeriveIden)]
enum MetricKindEnum {
    #[sea_orm(iden = "metric_kind")]
    Enum,
    #[sea_orm(iden = "counter")]
    Counter,
    #[sea_orm(iden = "gauge")]
    Gauge,
    #[sea_orm(iden = "histogram")]
    Histogram,
}
