//! Database migrations for the seller sync engine.

pub use sea_orm_migration::prelude::*;

mod m2026_10_01_000100_create_sync_jobs;
mod m2026_10_01_000200_create_owner_credentials;
mod m2026_10_01_000300_create_report_records;
mod m2026_10_01_000400_create_card_records;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_10_01_000100_create_sync_jobs::Migration),
            Box::new(m2026_10_01_000200_create_owner_credentials::Migration),
            Box::new(m2026_10_01_000300_create_report_records::Migration),
            Box::new(m2026_10_01_000400_create_card_records::Migration),
        ]
    }
}
