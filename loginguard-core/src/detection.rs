use std::future::Future;
use std::sync::Arc;

use loginguard_common::{AttemptStatus, DetectionConfig, DetectionResult, LoginGuardError};
use tracing::{debug, info, warn};

use crate::ip_blocker::IpBlocker;
use crate::stores::AttemptStore;

/// Threshold policy over the attempt log and the block table.
///
/// Holds no state of its own; any number of engines may share the same
/// stores as long as they share the [`IpBlocker`] and its locks.
pub struct DetectionEngine {
    config: DetectionConfig,
    attempts: Arc<dyn AttemptStore>,
    blocker: Arc<IpBlocker>,
}

impl DetectionEngine {
    pub fn new(
        config: DetectionConfig,
        attempts: Arc<dyn AttemptStore>,
        blocker: Arc<IpBlocker>,
    ) -> Self {
        Self {
            config,
            attempts,
            blocker,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn blocker(&self) -> &Arc<IpBlocker> {
        &self.blocker
    }

    /// Records one login attempt and decides whether the IP gets blocked.
    ///
    /// The whole sequence runs under the IP's lock. Any store failure aborts
    /// the evaluation with an error; a failed block lookup is never read as
    /// "not blocked".
    pub async fn evaluate(
        &self,
        ip_address: &str,
        username: &str,
        success: bool,
    ) -> Result<DetectionResult, LoginGuardError> {
        let (result, _) = self
            .evaluate_with(ip_address, username, || async move {
                Ok(success.then_some(()))
            })
            .await?;
        Ok(result)
    }

    /// Like [`DetectionEngine::evaluate`], with the outcome supplied by
    /// `authenticate`.
    ///
    /// `authenticate` runs under the IP's lock and only when the IP is not
    /// blocked. `Some` counts as a success and is handed back to the caller.
    /// If it fails, nothing is recorded.
    pub async fn evaluate_with<T, F, Fut>(
        &self,
        ip_address: &str,
        username: &str,
        authenticate: F,
    ) -> Result<(DetectionResult, Option<T>), LoginGuardError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, LoginGuardError>>,
    {
        let ip_address = checked_ip(ip_address)?;
        let _guard = self.blocker.lock_ip(ip_address).await;

        if let Some(result) = self.reject_blocked_locked(ip_address, username).await? {
            return Ok((result, None));
        }

        let accepted = authenticate().await?;
        let status = if accepted.is_some() {
            AttemptStatus::Success
        } else {
            AttemptStatus::Failed
        };
        self.attempts.record(username, ip_address, status).await?;

        if accepted.is_some() {
            debug!(ip = %ip_address, username = %username, "Successful login");
            return Ok((DetectionResult::success(), accepted));
        }

        let failed = self
            .attempts
            .count_failed(ip_address, self.config.time_window_minutes)
            .await?;

        if failed >= self.config.max_failed_attempts {
            self.blocker
                .block_locked(
                    ip_address,
                    &self.config.block_reason(),
                    self.config.lockout_duration_minutes,
                )
                .await?;
            info!(
                ip = %ip_address,
                username = %username,
                failed_attempts = failed,
                "Failed attempt threshold reached"
            );
            return Ok((DetectionResult::threshold_exceeded(failed), None));
        }

        debug!(
            ip = %ip_address,
            username = %username,
            failed_attempts = failed,
            max_failed_attempts = self.config.max_failed_attempts,
            "Failed login"
        );
        Ok((
            DetectionResult::failed(failed, self.config.max_failed_attempts),
            None,
        ))
    }

    /// Records a BLOCKED attempt if the IP is blocked. Nothing is recorded
    /// for an IP that is free to try.
    pub async fn reject_if_blocked(
        &self,
        ip_address: &str,
        username: &str,
    ) -> Result<Option<DetectionResult>, LoginGuardError> {
        let ip_address = checked_ip(ip_address)?;
        let _guard = self.blocker.lock_ip(ip_address).await;
        self.reject_blocked_locked(ip_address, username).await
    }

    async fn reject_blocked_locked(
        &self,
        ip_address: &str,
        username: &str,
    ) -> Result<Option<DetectionResult>, LoginGuardError> {
        if !self.blocker.is_blocked(ip_address).await? {
            return Ok(None);
        }
        self.attempts
            .record(username, ip_address, AttemptStatus::Blocked)
            .await?;
        warn!(ip = %ip_address, username = %username, "Rejected attempt from blocked IP");
        Ok(Some(DetectionResult::ip_blocked()))
    }

    /// Pre-flight gate, checked before asking for credentials.
    pub async fn can_attempt(&self, ip_address: &str) -> Result<bool, LoginGuardError> {
        Ok(!self.blocker.is_blocked(ip_address).await?)
    }

    pub async fn remaining_attempts(&self, ip_address: &str) -> Result<u32, LoginGuardError> {
        let failed = self
            .attempts
            .count_failed(ip_address.trim(), self.config.time_window_minutes)
            .await?;
        Ok(self.config.max_failed_attempts.saturating_sub(failed))
    }
}

fn checked_ip(ip_address: &str) -> Result<&str, LoginGuardError> {
    let ip_address = ip_address.trim();
    if ip_address.is_empty() {
        return Err(LoginGuardError::Validation(
            "IP address must not be empty".into(),
        ));
    }
    Ok(ip_address)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use loginguard_common::{Attempt, BlockRecord, ThreatLevel, BLOCKED_MESSAGE};

    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::locks::IpLocks;
    use crate::stores::{BlockStore, MemoryAttemptStore, MemoryBlockStore};

    struct Harness {
        clock: Arc<ManualClock>,
        attempts: Arc<MemoryAttemptStore>,
        engine: DetectionEngine,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(
                DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            ));
            let attempts = Arc::new(MemoryAttemptStore::new(clock.clone()));
            let blocker = Arc::new(IpBlocker::new(
                Arc::new(MemoryBlockStore::new()),
                clock.clone(),
                Arc::new(IpLocks::new()),
            ));
            let engine = DetectionEngine::new(
                DetectionConfig::default(),
                attempts.clone(),
                blocker,
            );
            Self {
                clock,
                attempts,
                engine,
            }
        }

        async fn fail(&self, ip: &str) -> DetectionResult {
            self.engine.evaluate(ip, "root", false).await.unwrap()
        }

        async fn blocked_rows(&self) -> usize {
            self.attempts
                .recent(1000)
                .await
                .unwrap()
                .iter()
                .filter(|a| a.status == AttemptStatus::Blocked)
                .count()
        }
    }

    #[tokio::test]
    async fn test_threshold_blocks_on_third_failure() {
        let h = Harness::new();

        let first = h.fail("10.0.0.5").await;
        assert!(!first.blocked);
        assert_eq!(first.failed_attempts, 1);
        assert_eq!(first.threat_level, ThreatLevel::Low);
        assert_eq!(first.message, "Failed attempt 1 of 3");

        h.clock.advance(Duration::minutes(1));
        let second = h.fail("10.0.0.5").await;
        assert!(!second.blocked);
        assert_eq!(second.failed_attempts, 2);
        assert_eq!(second.threat_level, ThreatLevel::Medium);

        h.clock.advance(Duration::minutes(1));
        let third = h.fail("10.0.0.5").await;
        assert!(third.blocked);
        assert_eq!(third.threat_level, ThreatLevel::High);
        assert_eq!(third.failed_attempts, 3);
        assert_eq!(third.message, "IP blocked due to multiple failed attempts");

        let record = h.engine.blocker().find("10.0.0.5").await.unwrap().unwrap();
        assert_eq!(record.reason, "Exceeded 3 failed attempts in 5 minutes");
        assert_eq!(record.block_count, 1);
        assert_eq!(record.expiry_at, Some(h.clock.now() + Duration::minutes(30)));
    }

    #[tokio::test]
    async fn test_block_precedes_success() {
        let h = Harness::new();
        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }

        let result = h.engine.evaluate("10.0.0.5", "root", true).await.unwrap();
        assert!(result.blocked);
        assert_eq!(result.threat_level, ThreatLevel::Blocked);
        assert_eq!(result.message, BLOCKED_MESSAGE);
        assert_eq!(result.failed_attempts, 0);
        assert_eq!(h.blocked_rows().await, 1);
    }

    #[tokio::test]
    async fn test_blocked_attempts_do_not_count_as_failures() {
        let h = Harness::new();
        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }
        for _ in 0..5 {
            assert!(h.fail("10.0.0.5").await.blocked);
        }
        assert_eq!(h.blocked_rows().await, 5);
        assert_eq!(
            h.attempts.count_failed("10.0.0.5", 5).await.unwrap(),
            3
        );
        let record = h.engine.blocker().find("10.0.0.5").await.unwrap().unwrap();
        assert_eq!(record.block_count, 1);
    }

    #[tokio::test]
    async fn test_unblock_resets_block_but_not_history() {
        let h = Harness::new();
        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }
        assert!(h.engine.blocker().unblock("10.0.0.5").await.unwrap());

        // earlier failures slid out of the window meanwhile
        h.clock.advance(Duration::minutes(6));
        let result = h.fail("10.0.0.5").await;
        assert!(!result.blocked);
        assert_eq!(result.failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_unblock_within_window_reblocks_on_next_failure() {
        let h = Harness::new();
        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }
        h.engine.blocker().unblock("10.0.0.5").await.unwrap();

        let result = h.fail("10.0.0.5").await;
        assert!(result.blocked);
        assert_eq!(result.failed_attempts, 4);
        let record = h.engine.blocker().find("10.0.0.5").await.unwrap().unwrap();
        assert_eq!(record.block_count, 1);
    }

    #[tokio::test]
    async fn test_block_expiry_readmits_ip() {
        let h = Harness::new();
        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }
        assert!(!h.engine.can_attempt("10.0.0.5").await.unwrap());

        h.clock.advance(Duration::minutes(30));
        assert!(h.engine.can_attempt("10.0.0.5").await.unwrap());
        let result = h.engine.evaluate("10.0.0.5", "root", true).await.unwrap();
        assert!(!result.blocked);
        assert_eq!(result.threat_level, ThreatLevel::None);
        assert_eq!(result.message, "Login successful");
    }

    #[tokio::test]
    async fn test_repeat_offender_accumulates_block_count() {
        let h = Harness::new();
        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }
        h.clock.advance(Duration::minutes(30));
        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }
        let record = h.engine.blocker().find("10.0.0.5").await.unwrap().unwrap();
        assert_eq!(record.block_count, 2);
        assert_eq!(h.engine.blocker().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_permanent_block_survives_expiry() {
        let h = Harness::new();
        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }
        h.engine
            .blocker()
            .set_permanent("10.0.0.5", true)
            .await
            .unwrap();

        h.clock.advance(Duration::days(30));
        assert!(h.engine.blocker().is_blocked("10.0.0.5").await.unwrap());
        let result = h.engine.evaluate("10.0.0.5", "root", true).await.unwrap();
        assert_eq!(result.threat_level, ThreatLevel::Blocked);
    }

    #[tokio::test]
    async fn test_counts_are_per_ip() {
        let h = Harness::new();
        h.fail("10.0.0.5").await;
        h.fail("10.0.0.5").await;
        let other = h.fail("10.0.0.6").await;
        assert_eq!(other.failed_attempts, 1);
        assert!(h.engine.can_attempt("10.0.0.6").await.unwrap());
    }

    #[tokio::test]
    async fn test_remaining_attempts_never_negative() {
        let h = Harness::new();
        let mut seen = vec![h.engine.remaining_attempts("10.0.0.5").await.unwrap()];
        for _ in 0..4 {
            h.fail("10.0.0.5").await;
            seen.push(h.engine.remaining_attempts("10.0.0.5").await.unwrap());
        }
        assert_eq!(seen, [3, 2, 1, 0, 0]);
    }

    #[tokio::test]
    async fn test_failures_outside_window_are_forgotten() {
        let h = Harness::new();
        h.fail("10.0.0.5").await;
        h.fail("10.0.0.5").await;
        h.clock.advance(Duration::minutes(5));
        let result = h.fail("10.0.0.5").await;
        assert!(!result.blocked);
        assert_eq!(result.failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_empty_ip_rejected() {
        let h = Harness::new();
        assert!(matches!(
            h.engine.evaluate("  ", "root", false).await,
            Err(LoginGuardError::Validation(_))
        ));
        assert!(h.attempts.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_skipped_for_blocked_ip() {
        let h = Harness::new();
        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }

        let mut called = false;
        let (result, user) = h
            .engine
            .evaluate_with("10.0.0.5", "root", || {
                called = true;
                async { Ok(Some("root")) }
            })
            .await
            .unwrap();
        assert!(!called);
        assert!(user.is_none());
        assert_eq!(result.threat_level, ThreatLevel::Blocked);
        assert_eq!(h.blocked_rows().await, 1);
        assert_eq!(h.attempts.count_failed("10.0.0.5", 5).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_authenticate_error_records_nothing() {
        let h = Harness::new();
        let err = h
            .engine
            .evaluate_with::<(), _, _>("10.0.0.5", "root", || async {
                Err(LoginGuardError::Store("user table gone".into()))
            })
            .await
            .unwrap_err();
        assert!(err.is_store_error());
        assert!(h.attempts.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reject_if_blocked() {
        let h = Harness::new();
        assert_eq!(
            h.engine.reject_if_blocked("10.0.0.5", "root").await.unwrap(),
            None
        );
        assert!(h.attempts.recent(10).await.unwrap().is_empty());

        for _ in 0..3 {
            h.fail("10.0.0.5").await;
        }
        let result = h
            .engine
            .reject_if_blocked("10.0.0.5", "root")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.threat_level, ThreatLevel::Blocked);
        assert_eq!(h.blocked_rows().await, 1);

        // expired block: nothing is recorded
        h.clock.advance(Duration::minutes(30));
        assert_eq!(
            h.engine.reject_if_blocked("10.0.0.5", "root").await.unwrap(),
            None
        );
        assert_eq!(h.blocked_rows().await, 1);
        assert_eq!(h.attempts.recent(10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_failures_block_exactly_once() {
        let h = Arc::new(Harness::new());
        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let h = h.clone();
                tokio::spawn(async move { h.engine.evaluate("10.0.0.5", "root", false).await })
            })
            .collect();

        let mut high = 0;
        let mut blocked = 0;
        for result in futures::future::join_all(tasks).await {
            match result.unwrap().unwrap().threat_level {
                ThreatLevel::High => high += 1,
                ThreatLevel::Blocked => blocked += 1,
                _ => {}
            }
        }
        assert_eq!(high, 1);
        assert_eq!(blocked, 7);

        let record = h.engine.blocker().find("10.0.0.5").await.unwrap().unwrap();
        assert_eq!(record.block_count, 1);
        assert_eq!(h.attempts.count_failed("10.0.0.5", 5).await.unwrap(), 3);
    }

    struct BrokenBlockStore;

    #[async_trait]
    impl BlockStore for BrokenBlockStore {
        async fn find(&self, _: &str) -> Result<Option<BlockRecord>, LoginGuardError> {
            Err(LoginGuardError::Store("connection lost".into()))
        }
        async fn upsert(&self, _: &BlockRecord) -> Result<(), LoginGuardError> {
            Err(LoginGuardError::Store("connection lost".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool, LoginGuardError> {
            Err(LoginGuardError::Store("connection lost".into()))
        }
        async fn list(&self) -> Result<Vec<BlockRecord>, LoginGuardError> {
            Err(LoginGuardError::Store("connection lost".into()))
        }
    }

    struct BrokenAttemptStore;

    #[async_trait]
    impl AttemptStore for BrokenAttemptStore {
        async fn record(&self, _: &str, _: &str, _: AttemptStatus) -> Result<(), LoginGuardError> {
            Err(LoginGuardError::Store("disk full".into()))
        }
        async fn count_failed(&self, _: &str, _: u32) -> Result<u32, LoginGuardError> {
            // would trip the threshold if evaluation carried on
            Ok(100)
        }
        async fn count_since(
            &self,
            _: AttemptStatus,
            _: DateTime<Utc>,
        ) -> Result<u64, LoginGuardError> {
            Ok(0)
        }
        async fn recent(&self, _: u64) -> Result<Vec<Attempt>, LoginGuardError> {
            Ok(vec![])
        }
        async fn since(&self, _: DateTime<Utc>) -> Result<Vec<Attempt>, LoginGuardError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_block_lookup_failure_fails_closed() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let attempts = Arc::new(MemoryAttemptStore::new(clock.clone()));
        let blocker = Arc::new(IpBlocker::new(
            Arc::new(BrokenBlockStore),
            clock,
            Arc::new(IpLocks::new()),
        ));
        let engine = DetectionEngine::new(DetectionConfig::default(), attempts.clone(), blocker);

        let err = engine.evaluate("10.0.0.5", "root", true).await.unwrap_err();
        assert!(err.is_store_error());
        assert!(engine.can_attempt("10.0.0.5").await.is_err());
        assert!(attempts.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_failure_stops_evaluation() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let blocks = Arc::new(MemoryBlockStore::new());
        let blocker = Arc::new(IpBlocker::new(
            blocks.clone(),
            clock,
            Arc::new(IpLocks::new()),
        ));
        let engine = DetectionEngine::new(
            DetectionConfig::default(),
            Arc::new(BrokenAttemptStore),
            blocker,
        );

        let err = engine.evaluate("10.0.0.5", "root", false).await.unwrap_err();
        assert!(err.is_store_error());
        assert_eq!(blocks.find("10.0.0.5").await.unwrap(), None);
    }
}
