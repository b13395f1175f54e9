use chrono::Duration;
use loginguard_common::{AttemptStatus, LoginGuardError};
use serde::Serialize;

use crate::auth::Authenticator;
use crate::clock::Clock;
use crate::ip_blocker::IpBlocker;
use crate::stores::AttemptStore;

/// Security status for the admin overview
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SecurityStatus {
    pub total_users: u64,
    pub active_blocks: u64,
    pub failed_attempts_last_24h: u64,
    pub successful_logins_last_24h: u64,
}

pub async fn security_status(
    clock: &dyn Clock,
    authenticator: &dyn Authenticator,
    attempts: &dyn AttemptStore,
    blocker: &IpBlocker,
) -> Result<SecurityStatus, LoginGuardError> {
    let since = clock.now() - Duration::hours(24);
    Ok(SecurityStatus {
        total_users: authenticator.count_users().await?,
        active_blocks: blocker.count_active().await?,
        failed_attempts_last_24h: attempts.count_since(AttemptStatus::Failed, since).await?,
        successful_logins_last_24h: attempts.count_since(AttemptStatus::Success, since).await?,
    })
}
