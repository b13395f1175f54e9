use std::fmt;

use chrono::{DateTime, Duration, Utc};
pub use loginguard_db_entities::LoginAttempt::AttemptStatus;
pub use loginguard_db_entities::User::UserStatus;
use loginguard_db_entities::{BlockedIp, LoginAttempt, User};
use serde::Serialize;
use uuid::Uuid;

use crate::LoginGuardError;

pub const BLOCKED_MESSAGE: &str = "IP address is currently blocked";
pub const SUCCESS_MESSAGE: &str = "Login successful";
pub const THRESHOLD_MESSAGE: &str = "IP blocked due to multiple failed attempts";

/// One recorded login try.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub username: String,
    pub ip_address: String,
    pub status: AttemptStatus,
    pub timestamp: DateTime<Utc>,
}

impl From<LoginAttempt::Model> for Attempt {
    fn from(model: LoginAttempt::Model) -> Self {
        Self {
            username: model.username,
            ip_address: model.ip_address,
            status: model.status,
            timestamp: model.timestamp,
        }
    }
}

/// Persisted block state of a single IP.
///
/// Records are values: every change produces a new record which the caller
/// hands to the block store as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRecord {
    pub ip_address: String,
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
    pub expiry_at: Option<DateTime<Utc>>,
    pub is_permanent: bool,
    pub block_count: u32,
}

impl BlockRecord {
    /// First block of an IP.
    pub fn new(
        ip_address: &str,
        reason: &str,
        now: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Result<Self, LoginGuardError> {
        let ip_address = ip_address.trim();
        if ip_address.is_empty() {
            return Err(LoginGuardError::Validation(
                "IP address must not be empty".into(),
            ));
        }
        Ok(Self {
            ip_address: ip_address.to_owned(),
            reason: reason.to_owned(),
            blocked_at: now,
            expiry_at: Some(now + Duration::minutes(duration_minutes.into())),
            is_permanent: false,
            block_count: 1,
        })
    }

    /// Repeat offense: bumps the counter and refreshes the block window.
    pub fn reblocked(&self, reason: &str, now: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            ip_address: self.ip_address.clone(),
            reason: reason.to_owned(),
            blocked_at: now,
            expiry_at: if self.is_permanent {
                None
            } else {
                Some(now + Duration::minutes(duration_minutes.into()))
            },
            is_permanent: self.is_permanent,
            block_count: self.block_count.saturating_add(1),
        }
    }

    /// Making a record permanent clears its expiry. Revoking permanence
    /// keeps whatever expiry the record has; a record that was permanent has
    /// none left and is inactive from then on.
    pub fn with_permanent(&self, permanent: bool) -> Self {
        Self {
            is_permanent: permanent,
            expiry_at: if permanent { None } else { self.expiry_at },
            ..self.clone()
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.is_permanent || self.expiry_at.is_some_and(|expiry| expiry > now)
    }
}

impl From<BlockedIp::Model> for BlockRecord {
    fn from(model: BlockedIp::Model) -> Self {
        Self {
            ip_address: model.ip_address,
            reason: model.reason,
            blocked_at: model.blocked_at,
            expiry_at: model.expiry_at,
            is_permanent: model.is_permanent,
            block_count: u32::try_from(model.block_count).unwrap_or(1).max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
    Blocked,
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
            Self::Blocked => "BLOCKED",
        })
    }
}

/// Verdict for a single evaluated attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    pub blocked: bool,
    pub message: String,
    pub threat_level: ThreatLevel,
    pub failed_attempts: u32,
}

impl DetectionResult {
    /// Same answer for every blocked caller, whatever the block reason.
    pub fn ip_blocked() -> Self {
        Self {
            blocked: true,
            message: BLOCKED_MESSAGE.to_owned(),
            threat_level: ThreatLevel::Blocked,
            failed_attempts: 0,
        }
    }

    pub fn success() -> Self {
        Self {
            blocked: false,
            message: SUCCESS_MESSAGE.to_owned(),
            threat_level: ThreatLevel::None,
            failed_attempts: 0,
        }
    }

    pub fn threshold_exceeded(failed_attempts: u32) -> Self {
        Self {
            blocked: true,
            message: THRESHOLD_MESSAGE.to_owned(),
            threat_level: ThreatLevel::High,
            failed_attempts,
        }
    }

    pub fn failed(failed_attempts: u32, max_failed_attempts: u32) -> Self {
        Self {
            blocked: false,
            message: format!("Failed attempt {failed_attempts} of {max_failed_attempts}"),
            threat_level: if failed_attempts >= 2 {
                ThreatLevel::Medium
            } else {
                ThreatLevel::Low
            },
            failed_attempts,
        }
    }
}

/// Authenticated user as reported by the credential collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
}

/// Account as listed to operators. The password hash stays behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User::Model> for UserRecord {
    fn from(model: User::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            status: model.status,
            created_at: model.created_at,
            last_login: model.last_login,
        }
    }
}
