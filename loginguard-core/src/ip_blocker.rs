use std::sync::Arc;

use loginguard_common::{BlockRecord, LoginGuardError};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::locks::IpLocks;
use crate::stores::BlockStore;

#[allow(clippy::unwrap_used)]
static IPV4_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    )
    .unwrap()
});

/// Dotted-quad IPv4 syntax check for operator supplied addresses.
pub fn validate_ip_format(ip_address: &str) -> bool {
    IPV4_PATTERN.is_match(ip_address)
}

/// Validating layer over the block table
pub struct IpBlocker {
    store: Arc<dyn BlockStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<IpLocks>,
}

impl IpBlocker {
    pub fn new(store: Arc<dyn BlockStore>, clock: Arc<dyn Clock>, locks: Arc<IpLocks>) -> Self {
        Self {
            store,
            clock,
            locks,
        }
    }

    pub(crate) async fn lock_ip(&self, ip_address: &str) -> OwnedMutexGuard<()> {
        self.locks.acquire(ip_address).await
    }

    /// Blocks the IP for `duration_minutes`, or refreshes an existing block.
    ///
    /// Returns `false` for an empty address.
    pub async fn block(
        &self,
        ip_address: &str,
        reason: &str,
        duration_minutes: u32,
    ) -> Result<bool, LoginGuardError> {
        let ip_address = ip_address.trim();
        if ip_address.is_empty() {
            warn!("Refusing to block an empty IP address");
            return Ok(false);
        }
        let _guard = self.lock_ip(ip_address).await;
        self.block_locked(ip_address, reason, duration_minutes)
            .await
            .map(|_| true)
    }

    /// Upsert step of [`IpBlocker::block`]. The caller holds the IP lock.
    pub(crate) async fn block_locked(
        &self,
        ip_address: &str,
        reason: &str,
        duration_minutes: u32,
    ) -> Result<BlockRecord, LoginGuardError> {
        let now = self.clock.now();
        let record = match self.store.find(ip_address).await? {
            Some(existing) => existing.reblocked(reason, now, duration_minutes),
            None => BlockRecord::new(ip_address, reason, now, duration_minutes)?,
        };
        self.store.upsert(&record).await?;
        info!(
            ip = %record.ip_address,
            block_count = record.block_count,
            expires_at = ?record.expiry_at,
            reason = %record.reason,
            "IP blocked"
        );
        Ok(record)
    }

    /// Operator block. Unlike [`IpBlocker::block`] the address must be a
    /// well-formed IPv4 address.
    pub async fn block_manual(
        &self,
        ip_address: &str,
        reason: &str,
        duration_minutes: u32,
    ) -> Result<BlockRecord, LoginGuardError> {
        let ip_address = ip_address.trim();
        if !validate_ip_format(ip_address) {
            return Err(LoginGuardError::Validation(format!(
                "invalid IPv4 address: {ip_address:?}"
            )));
        }
        if duration_minutes == 0 {
            return Err(LoginGuardError::Validation(
                "block duration must be at least 1 minute".into(),
            ));
        }
        let _guard = self.lock_ip(ip_address).await;
        self.block_locked(ip_address, reason, duration_minutes).await
    }

    /// Removes the block record. `false` when there was nothing to remove.
    pub async fn unblock(&self, ip_address: &str) -> Result<bool, LoginGuardError> {
        let ip_address = ip_address.trim();
        let _guard = self.lock_ip(ip_address).await;
        let removed = self.store.delete(ip_address).await?;
        if removed {
            info!(ip = %ip_address, "IP unblocked");
        } else {
            debug!(ip = %ip_address, "Nothing to unblock");
        }
        Ok(removed)
    }

    /// Expired temporary blocks read as not blocked but stay in the table.
    pub async fn is_blocked(&self, ip_address: &str) -> Result<bool, LoginGuardError> {
        let now = self.clock.now();
        Ok(self
            .store
            .find(ip_address.trim())
            .await?
            .is_some_and(|record| record.is_active(now)))
    }

    pub async fn find(&self, ip_address: &str) -> Result<Option<BlockRecord>, LoginGuardError> {
        self.store.find(ip_address.trim()).await
    }

    /// Returns `false` if the IP has no block record.
    pub async fn set_permanent(
        &self,
        ip_address: &str,
        permanent: bool,
    ) -> Result<bool, LoginGuardError> {
        let ip_address = ip_address.trim();
        let _guard = self.lock_ip(ip_address).await;
        let Some(existing) = self.store.find(ip_address).await? else {
            debug!(ip = %ip_address, "No block record to update");
            return Ok(false);
        };
        self.store.upsert(&existing.with_permanent(permanent)).await?;
        info!(ip = %ip_address, permanent, "Block permanence updated");
        Ok(true)
    }

    /// All block records including expired ones, newest first.
    pub async fn list(&self) -> Result<Vec<BlockRecord>, LoginGuardError> {
        self.store.list().await
    }

    pub async fn count_active(&self) -> Result<u64, LoginGuardError> {
        let now = self.clock.now();
        Ok(self
            .store
            .list()
            .await?
            .iter()
            .filter(|record| record.is_active(now))
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::stores::MemoryBlockStore;

    fn setup() -> (IpBlocker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let blocker = IpBlocker::new(
            Arc::new(MemoryBlockStore::new()),
            clock.clone(),
            Arc::new(IpLocks::new()),
        );
        (blocker, clock)
    }

    #[test]
    fn test_validate_ip_format() {
        assert!(validate_ip_format("192.168.1.1"));
        assert!(validate_ip_format("0.0.0.0"));
        assert!(validate_ip_format("255.255.255.255"));
        assert!(!validate_ip_format("999.1.1.1"));
        assert!(!validate_ip_format("256.1.1.1"));
        assert!(!validate_ip_format("1.2.3"));
        assert!(!validate_ip_format("1.2.3.4.5"));
        assert!(!validate_ip_format("x1.2.3.4"));
        assert!(!validate_ip_format("1.2.3.4 "));
        assert!(!validate_ip_format(""));
    }

    #[tokio::test]
    async fn test_unknown_ip_is_not_blocked() {
        let (blocker, _) = setup();
        assert!(!blocker.is_blocked("10.0.0.1").await.unwrap());
        assert_eq!(blocker.find("10.0.0.1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_block_expires_lazily() {
        let (blocker, clock) = setup();
        assert!(blocker.block("10.0.0.1", "test", 30).await.unwrap());
        assert!(blocker.is_blocked("10.0.0.1").await.unwrap());

        clock.advance(Duration::minutes(29));
        assert!(blocker.is_blocked("10.0.0.1").await.unwrap());

        clock.advance(Duration::minutes(1));
        assert!(!blocker.is_blocked("10.0.0.1").await.unwrap());
        // record survives expiry
        assert!(blocker.find("10.0.0.1").await.unwrap().is_some());
        assert_eq!(blocker.count_active().await.unwrap(), 0);
        assert_eq!(blocker.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reblock_increments_count() {
        let (blocker, clock) = setup();
        blocker.block("10.0.0.1", "first", 30).await.unwrap();
        clock.advance(Duration::minutes(5));
        blocker.block("10.0.0.1", "second", 30).await.unwrap();
        clock.advance(Duration::minutes(5));
        blocker.block("10.0.0.1", "third", 30).await.unwrap();

        let records = blocker.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].block_count, 3);
        assert_eq!(records[0].reason, "third");
        assert_eq!(records[0].blocked_at, clock.now());
        assert_eq!(
            records[0].expiry_at,
            Some(clock.now() + Duration::minutes(30))
        );
    }

    #[tokio::test]
    async fn test_empty_ip_is_refused() {
        let (blocker, _) = setup();
        assert!(!blocker.block("", "test", 30).await.unwrap());
        assert!(!blocker.block("   ", "test", 30).await.unwrap());
        assert!(blocker.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unblock() {
        let (blocker, _) = setup();
        assert!(!blocker.unblock("10.0.0.1").await.unwrap());
        blocker.block("10.0.0.1", "test", 30).await.unwrap();
        assert!(blocker.unblock("10.0.0.1").await.unwrap());
        assert!(!blocker.is_blocked("10.0.0.1").await.unwrap());
        assert!(!blocker.unblock("10.0.0.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_permanent_block_outlives_expiry() {
        let (blocker, clock) = setup();
        blocker.block("10.0.0.5", "test", 30).await.unwrap();
        assert!(blocker.set_permanent("10.0.0.5", true).await.unwrap());

        clock.advance(Duration::days(365));
        assert!(blocker.is_blocked("10.0.0.5").await.unwrap());

        // repeat offense keeps permanence
        blocker.block("10.0.0.5", "again", 30).await.unwrap();
        let record = blocker.find("10.0.0.5").await.unwrap().unwrap();
        assert!(record.is_permanent);
        assert_eq!(record.expiry_at, None);
        assert_eq!(record.block_count, 2);
    }

    #[tokio::test]
    async fn test_revoking_permanence_ends_block() {
        let (blocker, _) = setup();
        blocker.block("10.0.0.5", "test", 30).await.unwrap();
        blocker.set_permanent("10.0.0.5", true).await.unwrap();
        assert!(blocker.set_permanent("10.0.0.5", false).await.unwrap());
        assert!(!blocker.is_blocked("10.0.0.5").await.unwrap());
    }

    #[tokio::test]
    async fn test_clearing_permanence_on_temporary_block_keeps_it() {
        let (blocker, clock) = setup();
        blocker.block("10.0.0.5", "test", 30).await.unwrap();
        let expiry = blocker.find("10.0.0.5").await.unwrap().unwrap().expiry_at;

        clock.advance(Duration::minutes(1));
        assert!(blocker.set_permanent("10.0.0.5", false).await.unwrap());

        let record = blocker.find("10.0.0.5").await.unwrap().unwrap();
        assert!(!record.is_permanent);
        assert_eq!(record.expiry_at, expiry);
        assert!(blocker.is_blocked("10.0.0.5").await.unwrap());

        clock.advance(Duration::minutes(29));
        assert!(!blocker.is_blocked("10.0.0.5").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_permanent_without_record() {
        let (blocker, _) = setup();
        assert!(!blocker.set_permanent("10.0.0.5", true).await.unwrap());
        assert!(blocker.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_block_manual_validates_format() {
        let (blocker, _) = setup();
        assert!(matches!(
            blocker.block_manual("999.1.1.1", "manual", 30).await,
            Err(LoginGuardError::Validation(_))
        ));
        assert!(matches!(
            blocker.block_manual("10.0.0.1", "manual", 0).await,
            Err(LoginGuardError::Validation(_))
        ));
        let record = blocker
            .block_manual(" 192.168.1.1 ", "manual", 60)
            .await
            .unwrap();
        assert_eq!(record.ip_address, "192.168.1.1");
        assert!(blocker.is_blocked("192.168.1.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_blocks_are_counted_once_each() {
        let (blocker, _) = setup();
        let blocker = Arc::new(blocker);
        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let blocker = blocker.clone();
                tokio::spawn(async move { blocker.block("10.0.0.1", "test", 30).await })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            assert!(task.unwrap().unwrap());
        }
        let record = blocker.find("10.0.0.1").await.unwrap().unwrap();
        assert_eq!(record.block_count, 10);
    }
}
