//! Storage collaborators consumed by the detection core.
//!
//! Stores own their records; the blocker and the engine only hold handles.
//! Implementations surface failures as errors and never retry internally.

mod database;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use database::{DatabaseAttemptStore, DatabaseBlockStore};
use loginguard_common::{Attempt, AttemptStatus, BlockRecord, LoginGuardError};
pub use memory::{MemoryAttemptStore, MemoryBlockStore};

/// Append-only log of login attempts.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Appends an attempt stamped with the store's current time.
    async fn record(
        &self,
        username: &str,
        ip_address: &str,
        status: AttemptStatus,
    ) -> Result<(), LoginGuardError>;

    /// Number of `FAILED` attempts from `ip_address` newer than
    /// `now - window_minutes`. `BLOCKED` and `SUCCESS` entries never count.
    async fn count_failed(
        &self,
        ip_address: &str,
        window_minutes: u32,
    ) -> Result<u32, LoginGuardError>;

    async fn count_since(
        &self,
        status: AttemptStatus,
        since: DateTime<Utc>,
    ) -> Result<u64, LoginGuardError>;

    /// Latest attempts, newest first.
    async fn recent(&self, limit: u64) -> Result<Vec<Attempt>, LoginGuardError>;

    /// Attempts newer than `since`, newest first.
    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<Attempt>, LoginGuardError>;
}

/// Table of block records keyed by IP address.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn find(&self, ip_address: &str) -> Result<Option<BlockRecord>, LoginGuardError>;

    /// Inserts the record or replaces the existing one for the same IP.
    async fn upsert(&self, record: &BlockRecord) -> Result<(), LoginGuardError>;

    /// Returns whether a record existed.
    async fn delete(&self, ip_address: &str) -> Result<bool, LoginGuardError>;

    /// Every record including expired ones, most recently blocked first.
    async fn list(&self) -> Result<Vec<BlockRecord>, LoginGuardError>;
}
