use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// Hourly materialized rollups for each time-series table. Readers hit the
// raw tables for fresh data; the rollups serve trend queries over long
// windows. util.refresh_hourly_rollups() is invoked by operators or a cron
// job; CONCURRENTLY keeps readers unblocked (each view carries the unique
// index that requires).

const VIEWS: &[(&str, &str)] = &[
    (
        "cost_metrics_hourly",
        r#"
        CREATE MATERIALIZED VIEW IF NOT EXISTS cost_metrics_hourly AS
        SELECT
            customer_id,
            provider,
            cost_type,
            date_trunc('hour', "timestamp") AS bucket,
            SUM(amount) AS total_amount,
            COUNT(*) AS sample_count
        FROM cost_metrics
        GROUP BY customer_id, provider, cost_type, bucket
        "#,
    ),
    (
        "performance_metrics_hourly",
        r#"
        CREATE MATERIALIZED VIEW IF NOT EXISTS performance_metrics_hourly AS
        SELECT
            customer_id,
            provider,
            metric_name,
            date_trunc('hour', "timestamp") AS bucket,
            AVG(metric_value) AS avg_value,
            MAX(metric_value) AS max_value,
            COUNT(*) AS sample_count
        FROM performance_metrics
        GROUP BY customer_id, provider, metric_name, bucket
        "#,
    ),
    (
        "resource_metrics_hourly",
        r#"
        CREATE MATERIALIZED VIEW IF NOT EXISTS resource_metrics_hourly AS
        SELECT
            customer_id,
            provider,
            resource_type,
            metric_name,
            date_trunc('hour', "timestamp") AS bucket,
            AVG(metric_value) AS avg_value,
            MAX(metric_value) AS max_value,
            COUNT(*) AS sample_count
        FROM resource_metrics
        GROUP BY customer_id, provider, resource_type, metric_name, bucket
        "#,
    ),
    (
        "application_metrics_hourly",
        r#"
        CREATE MATERIALIZED VIEW IF NOT EXISTS application_metrics_hourly AS
        SELECT
            customer_id,
            provider,
            metric_type,
            date_trunc('hour', "timestamp") AS bucket,
            AVG(score) AS avg_score,
            MIN(score) AS min_score,
            COUNT(*) AS sample_count
        FROM application_metrics
        GROUP BY customer_id, provider, metric_type, bucket
        "#,
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        for (name, create_sql) in VIEWS {
            conn.execute_unprepared(create_sql).await?;
            conn.execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_{name}_series ON {name} (customer_id, provider, {key}, bucket)",
                key = match *name {
                    "cost_metrics_hourly" => "cost_type",
                    "performance_metrics_hourly" => "metric_name",
                    "resource_metrics_hourly" => "resource_type, metric_name",
                    _ => "metric_type",
                },
            ))
            .await?;
        }

        conn.execute_unprepared(
            r#"
            CREATE OR REPLACE FUNCTION util.refresh_hourly_rollups()
            RETURNS void AS $$
            BEGIN
                REFRESH MATERIALIZED VIEW CONCURRENTLY cost_metrics_hourly;
                REFRESH MATERIALIZED VIEW CONCURRENTLY performance_metrics_hourly;
                REFRESH MATERIALIZED VIEW CONCURRENTLY resource_metrics_hourly;
                REFRESH MATERIALIZED VIEW CONCURRENTLY application_metrics_hourly;
            END;
            $$ LANGUAGE plpgsql
            "#,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared("DROP FUNCTION IF EXISTS util.refresh_hourly_rollups()")
            .await?;

        for (name, _) in VIEWS.iter().rev() {
            conn.execute_unprepared(&format!("DROP MATERIALIZED VIEW IF EXISTS {name}"))
                .await?;
        }

        Ok(())
    }
}
