pub use sea_orm_migration::prelude::*;

mod m20260110_000001_baseline_migration;
mod m20260208_000002_add_reading_history_and_subscriptions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_000001_baseline_migration::Migration),
            Box::new(m20260208_000002_add_reading_history_and_subscriptions::Migration),
        ]
    }
}
