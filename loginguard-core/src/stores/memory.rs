use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use loginguard_common::{Attempt, AttemptStatus, BlockRecord, LoginGuardError};
use tokio::sync::RwLock;

use super::{AttemptStore, BlockStore};
use crate::clock::Clock;

/// In-process attempt log, used for tests and embedding without a database.
pub struct MemoryAttemptStore {
    clock: Arc<dyn Clock>,
    attempts: RwLock<Vec<Attempt>>,
}

impl MemoryAttemptStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            attempts: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn record(
        &self,
        username: &str,
        ip_address: &str,
        status: AttemptStatus,
    ) -> Result<(), LoginGuardError> {
        let attempt = Attempt {
            username: username.to_owned(),
            ip_address: ip_address.to_owned(),
            status,
            timestamp: self.clock.now(),
        };
        self.attempts.write().await.push(attempt);
        Ok(())
    }

    async fn count_failed(
        &self,
        ip_address: &str,
        window_minutes: u32,
    ) -> Result<u32, LoginGuardError> {
        let cutoff = self.clock.now() - Duration::minutes(window_minutes.into());
        let attempts = self.attempts.read().await;
        let count = attempts
            .iter()
            .filter(|a| {
                a.ip_address == ip_address
                    && a.status == AttemptStatus::Failed
                    && a.timestamp > cutoff
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn count_since(
        &self,
        status: AttemptStatus,
        since: DateTime<Utc>,
    ) -> Result<u64, LoginGuardError> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .iter()
            .filter(|a| a.status == status && a.timestamp > since)
            .count() as u64)
    }

    async fn recent(&self, limit: u64) -> Result<Vec<Attempt>, LoginGuardError> {
        let attempts = self.attempts.read().await;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(attempts.iter().rev().take(limit).cloned().collect())
    }

    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<Attempt>, LoginGuardError> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .iter()
            .rev()
            .filter(|a| a.timestamp > since)
            .cloned()
            .collect())
    }
}

/// In-process block table keyed by IP address.
#[derive(Default)]
pub struct MemoryBlockStore {
    records: RwLock<HashMap<String, BlockRecord>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn find(&self, ip_address: &str) -> Result<Option<BlockRecord>, LoginGuardError> {
        Ok(self.records.read().await.get(ip_address).cloned())
    }

    async fn upsert(&self, record: &BlockRecord) -> Result<(), LoginGuardError> {
        self.records
            .write()
            .await
            .insert(record.ip_address.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, ip_address: &str) -> Result<bool, LoginGuardError> {
        Ok(self.records.write().await.remove(ip_address).is_some())
    }

    async fn list(&self) -> Result<Vec<BlockRecord>, LoginGuardError> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.blocked_at.cmp(&a.blocked_at));
        Ok(records)
    }
}
