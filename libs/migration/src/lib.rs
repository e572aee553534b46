pub use sea_orm_migration::prelude::*;

mod m20250601_000000_bootstrap;
mod m20250601_000001_create_customers;
mod m20250601_000002_create_cloud_credentials;
mod m20250602_000000_create_agents;
mod m20250602_000001_create_events;
mod m20250603_000000_create_metrics_tables;
mod m20250603_000001_create_hourly_aggregates;
mod m20250604_000000_create_collection_state;
mod m20250605_000000_create_optimizations;
mod m20250605_000001_create_workflows;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000000_bootstrap::Migration),
            Box::new(m20250601_000001_create_customers::Migration),
            Box::new(m20250601_000002_create_cloud_credentials::Migration),
            Box::new(m20250602_000000_create_agents::Migration),
            Box::new(m20250602_000001_create_events::Migration),
            Box::new(m20250603_000000_create_metrics_tables::Migration),
            Box::new(m20250603_000001_create_hourly_aggregates::Migration),
            Box::new(m20250604_000000_create_collection_state::Migration),
            Box::new(m20250605_000000_create_optimizations::Migration),
            Box::new(m20250605_000001_create_workflows::Migration),
        ]
    }
}
