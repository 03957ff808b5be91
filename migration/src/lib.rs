//! Database migrations for the Vendor Console.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_090000_create_vendors;
mod m2025_01_06_090100_create_tenant_procedures;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_090000_create_vendors::Migration),
            Box::new(m2025_01_06_090100_create_tenant_procedures::Migration),
        ]
    }
}
