pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260301_000001_attribution_tables;
mod m20260301_000002_event_tables;
mod m20260302_000001_stats_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_attribution_tables::Migration),
            Box::new(m20260301_000002_event_tables::Migration),
            Box::new(m20260302_000001_stats_indexes::Migration),
        ]
    }
}
