use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use sea_orm_migration::MigrationTrait;
use tracing::debug;

mod m00001_create_users;
mod m00002_create_login_attempts;
mod m00003_create_blocked_ips;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m00001_create_users::Migration),
            Box::new(m00002_create_login_attempts::Migration),
            Box::new(m00003_create_blocked_ips::Migration),
        ]
    }
}

pub async fn migrate_database(connection: &DatabaseConnection) -> Result<(), DbErr> {
    debug!("Applying pending migrations");
    Migrator::up(connection, None).await
}
