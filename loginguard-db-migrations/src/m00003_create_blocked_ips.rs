use sea_orm::Schema;
use sea_orm_migration::prelude::*;

pub mod blocked_ip {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "blocked_ips")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(unique)]
        pub ip_address: String,
        #[sea_orm(column_type = "Text")]
        pub reason: String,
        pub blocked_at: DateTime<Utc>,
        pub expiry_at: Option<DateTime<Utc>>,
        pub is_permanent: bool,
        pub block_count: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m00003_create_blocked_ips"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let builder = manager.get_database_backend();
        let schema = Schema::new(builder);

        manager
            .create_table(schema.create_table_from_entity(blocked_ip::Entity))
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(blocked_ip::Entity)
                    .name("idx_blocked_ips_blocked_at")
                    .col(Alias::new("blocked_at"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .table(blocked_ip::Entity)
                    .name("idx_blocked_ips_blocked_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(blocked_ip::Entity).to_owned())
            .await
    }
}
