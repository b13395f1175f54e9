use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "blocked_ips")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// IP address that is blocked (unique constraint)
    #[sea_orm(unique)]
    pub ip_address: String,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    /// When the current block started
    pub blocked_at: DateTime<Utc>,

    /// Ignored while `is_permanent` is set
    pub expiry_at: Option<DateTime<Utc>>,

    pub is_permanent: bool,

    /// Number of times this IP has been blocked
    pub block_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
