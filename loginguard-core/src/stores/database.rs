use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use loginguard_common::{Attempt, AttemptStatus, BlockRecord, LoginGuardError};
use loginguard_db_entities::{BlockedIp, LoginAttempt};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{AttemptStore, BlockStore};
use crate::clock::Clock;

pub struct DatabaseAttemptStore {
    db: Arc<Mutex<DatabaseConnection>>,
    clock: Arc<dyn Clock>,
}

impl DatabaseAttemptStore {
    pub fn new(db: Arc<Mutex<DatabaseConnection>>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl AttemptStore for DatabaseAttemptStore {
    async fn record(
        &self,
        username: &str,
        ip_address: &str,
        status: AttemptStatus,
    ) -> Result<(), LoginGuardError> {
        let db = self.db.lock().await;
        let record = LoginAttempt::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_owned()),
            ip_address: Set(ip_address.to_owned()),
            status: Set(status),
            timestamp: Set(self.clock.now()),
        };
        LoginAttempt::Entity::insert(record)
            .exec_without_returning(&*db)
            .await?;
        Ok(())
    }

    async fn count_failed(
        &self,
        ip_address: &str,
        window_minutes: u32,
    ) -> Result<u32, LoginGuardError> {
        let db = self.db.lock().await;
        let cutoff = self.clock.now() - Duration::minutes(window_minutes.into());
        let count = LoginAttempt::Entity::find()
            .filter(LoginAttempt::Column::IpAddress.eq(ip_address))
            .filter(LoginAttempt::Column::Status.eq(AttemptStatus::Failed))
            .filter(LoginAttempt::Column::Timestamp.gt(cutoff))
            .count(&*db)
            .await?;
        debug!(ip = %ip_address, count, window_minutes, "Counted failed attempts");
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn count_since(
        &self,
        status: AttemptStatus,
        since: DateTime<Utc>,
    ) -> Result<u64, LoginGuardError> {
        let db = self.db.lock().await;
        Ok(LoginAttempt::Entity::find()
            .filter(LoginAttempt::Column::Status.eq(status))
            .filter(LoginAttempt::Column::Timestamp.gt(since))
            .count(&*db)
            .await?)
    }

    async fn recent(&self, limit: u64) -> Result<Vec<Attempt>, LoginGuardError> {
        let db = self.db.lock().await;
        Ok(LoginAttempt::Entity::find()
            .order_by_desc(LoginAttempt::Column::Timestamp)
            .limit(limit)
            .all(&*db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<Attempt>, LoginGuardError> {
        let db = self.db.lock().await;
        Ok(LoginAttempt::Entity::find()
            .filter(LoginAttempt::Column::Timestamp.gt(since))
            .order_by_desc(LoginAttempt::Column::Timestamp)
            .all(&*db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}

pub struct DatabaseBlockStore {
    db: Arc<Mutex<DatabaseConnection>>,
}

impl DatabaseBlockStore {
    pub fn new(db: Arc<Mutex<DatabaseConnection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BlockStore for DatabaseBlockStore {
    async fn find(&self, ip_address: &str) -> Result<Option<BlockRecord>, LoginGuardError> {
        let db = self.db.lock().await;
        Ok(BlockedIp::Entity::find()
            .filter(BlockedIp::Column::IpAddress.eq(ip_address))
            .one(&*db)
            .await?
            .map(Into::into))
    }

    async fn upsert(&self, record: &BlockRecord) -> Result<(), LoginGuardError> {
        let db = self.db.lock().await;
        let model = BlockedIp::ActiveModel {
            id: Set(Uuid::new_v4()),
            ip_address: Set(record.ip_address.clone()),
            reason: Set(record.reason.clone()),
            blocked_at: Set(record.blocked_at),
            expiry_at: Set(record.expiry_at),
            is_permanent: Set(record.is_permanent),
            block_count: Set(i32::try_from(record.block_count).unwrap_or(i32::MAX)),
        };
        // single statement; the unique ip_address column keeps one row per IP
        BlockedIp::Entity::insert(model)
            .on_conflict(
                OnConflict::column(BlockedIp::Column::IpAddress)
                    .update_columns([
                        BlockedIp::Column::Reason,
                        BlockedIp::Column::BlockedAt,
                        BlockedIp::Column::ExpiryAt,
                        BlockedIp::Column::IsPermanent,
                        BlockedIp::Column::BlockCount,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*db)
            .await?;
        Ok(())
    }

    async fn delete(&self, ip_address: &str) -> Result<bool, LoginGuardError> {
        let db = self.db.lock().await;
        let result = BlockedIp::Entity::delete_many()
            .filter(BlockedIp::Column::IpAddress.eq(ip_address))
            .exec(&*db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn list(&self) -> Result<Vec<BlockRecord>, LoginGuardError> {
        let db = self.db.lock().await;
        Ok(BlockedIp::Entity::find()
            .order_by_desc(BlockedIp::Column::BlockedAt)
            .all(&*db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
