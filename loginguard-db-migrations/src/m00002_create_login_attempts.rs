use sea_orm::Schema;
use sea_orm_migration::prelude::*;

pub mod login_attempt {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "login_attempts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub username: String,
        pub ip_address: String,
        #[sea_orm(column_type = "String(StringLen::N(16))")]
        pub status: String,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m00002_create_login_attempts"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let builder = manager.get_database_backend();
        let schema = Schema::new(builder);

        manager
            .create_table(schema.create_table_from_entity(login_attempt::Entity))
            .await?;

        // "failed attempts from IP in time window"
        manager
            .create_index(
                Index::create()
                    .table(login_attempt::Entity)
                    .name("idx_login_attempts_ip_status_timestamp")
                    .col(Alias::new("ip_address"))
                    .col(Alias::new("status"))
                    .col(Alias::new("timestamp"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(login_attempt::Entity)
                    .name("idx_login_attempts_timestamp")
                    .col(Alias::new("timestamp"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .table(login_attempt::Entity)
                    .name("idx_login_attempts_timestamp")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .table(login_attempt::Entity)
                    .name("idx_login_attempts_ip_status_timestamp")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(login_attempt::Entity).to_owned())
            .await
    }
}
