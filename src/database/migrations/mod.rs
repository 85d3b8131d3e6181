use sea_orm_migration::prelude::*;

mod m001_create_nav_nodes;
mod m002_create_audit_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_create_nav_nodes::Migration),
            Box::new(m002_create_audit_logs::Migration),
        ]
    }
}
