use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// The time-series tables are range-partitioned by event time, which the
// schema builder cannot express; raw SQL it is. Partitioned primary keys
// must include the partition column, and the writer's idempotence keys are
// unique indexes that do the same. Nullable-by-nature identifier columns
// default to '' so the unique indexes treat "absent" as one value.

const CREATE_COST_METRICS: &str = r#"
CREATE TABLE IF NOT EXISTS cost_metrics (
    id uuid NOT NULL DEFAULT gen_random_uuid(),
    "timestamp" timestamptz NOT NULL,
    customer_id uuid NOT NULL,
    provider cloud_provider NOT NULL,
    instance_id text NOT NULL DEFAULT '',
    cost_type text NOT NULL,
    amount double precision NOT NULL,
    currency varchar(3) NOT NULL DEFAULT 'USD',
    resource_type text NOT NULL DEFAULT '',
    collected_at timestamptz NOT NULL DEFAULT NOW(),
    PRIMARY KEY (id, "timestamp")
) PARTITION BY RANGE ("timestamp")
"#;

const CREATE_PERFORMANCE_METRICS: &str = r#"
CREATE TABLE IF NOT EXISTS performance_metrics (
    id uuid NOT NULL DEFAULT gen_random_uuid(),
    "timestamp" timestamptz NOT NULL,
    customer_id uuid NOT NULL,
    provider cloud_provider NOT NULL,
    metric_name text NOT NULL,
    metric_value double precision NOT NULL,
    resource_id text NOT NULL DEFAULT '',
    tags jsonb NOT NULL DEFAULT '{}',
    collected_at timestamptz NOT NULL DEFAULT NOW(),
    PRIMARY KEY (id, "timestamp")
) PARTITION BY RANGE ("timestamp")
"#;

const CREATE_RESOURCE_METRICS: &str = r#"
CREATE TABLE IF NOT EXISTS resource_metrics (
    id uuid NOT NULL DEFAULT gen_random_uuid(),
    "timestamp" timestamptz NOT NULL,
    customer_id uuid NOT NULL,
    provider cloud_provider NOT NULL,
    resource_id text NOT NULL DEFAULT '',
    resource_type text NOT NULL DEFAULT '',
    metric_name text NOT NULL,
    metric_value double precision NOT NULL,
    collected_at timestamptz NOT NULL DEFAULT NOW(),
    PRIMARY KEY (id, "timestamp")
) PARTITION BY RANGE ("timestamp")
"#;

const CREATE_APPLICATION_METRICS: &str = r#"
CREATE TABLE IF NOT EXISTS application_metrics (
    id uuid NOT NULL DEFAULT gen_random_uuid(),
    "timestamp" timestamptz NOT NULL,
    customer_id uuid NOT NULL,
    provider cloud_provider NOT NULL,
    application_id text NOT NULL DEFAULT '',
    metric_type text NOT NULL,
    score double precision NOT NULL,
    model_name text NOT NULL DEFAULT '',
    prompt_text text NOT NULL DEFAULT '',
    response_text text NOT NULL DEFAULT '',
    metadata jsonb NOT NULL DEFAULT '{}',
    collected_at timestamptz NOT NULL DEFAULT NOW(),
    PRIMARY KEY (id, "timestamp")
) PARTITION BY RANGE ("timestamp")
"#;

/// (table, idempotence-key columns)
const TABLES: &[(&str, &str)] = &[
    (
        "cost_metrics",
        r#"customer_id, provider, "timestamp", cost_type, instance_id"#,
    ),
    (
        "performance_metrics",
        r#"customer_id, provider, "timestamp", metric_name, resource_id"#,
    ),
    (
        "resource_metrics",
        r#"customer_id, provider, "timestamp", metric_name, resource_id"#,
    ),
    (
        "application_metrics",
        r#"customer_id, provider, "timestamp", metric_type, application_id"#,
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared(CREATE_COST_METRICS).await?;
        conn.execute_unprepared(CREATE_PERFORMANCE_METRICS).await?;
        conn.execute_unprepared(CREATE_RESOURCE_METRICS).await?;
        conn.execute_unprepared(CREATE_APPLICATION_METRICS).await?;

        for (table, key_columns) in TABLES {
            // Default partition catches rows for months without a dedicated
            // partition; ensure_month_partition creates the current one.
            conn.execute_unprepared(&format!(
                "CREATE TABLE IF NOT EXISTS {table}_default PARTITION OF {table} DEFAULT"
            ))
            .await?;

            conn.execute_unprepared(&format!(
                "SELECT util.ensure_month_partition('{table}', NOW())"
            ))
            .await?;

            // Writer idempotence key
            conn.execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_{table}_series ON {table} ({key_columns})"
            ))
            .await?;

            // Store ordering key for range scans
            conn.execute_unprepared(&format!(
                r#"CREATE INDEX IF NOT EXISTS idx_{table}_customer_provider_ts
                   ON {table} (customer_id, provider, "timestamp")"#
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        for (table, _) in TABLES.iter().rev() {
            conn.execute_unprepared(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
                .await?;
        }

        Ok(())
    }
}
