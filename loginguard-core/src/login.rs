use std::sync::Arc;

use loginguard_common::{DetectionResult, LoginGuardError, Secret, UserIdentity};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::Authenticator;
use crate::detection::DetectionEngine;

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub result: DetectionResult,
    /// Present only for accepted logins.
    pub user: Option<UserIdentity>,
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Fronts the authenticator with the detection engine.
///
/// The block check, the credential check and the recorded attempt form one
/// step under the IP's lock. A blocked IP never reaches the authenticator,
/// but its attempt is still recorded.
pub struct LoginGate {
    engine: Arc<DetectionEngine>,
    authenticator: Arc<dyn Authenticator>,
}

impl LoginGate {
    pub fn new(engine: Arc<DetectionEngine>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            engine,
            authenticator,
        }
    }

    pub async fn login(
        &self,
        ip_address: &str,
        username: &str,
        password: &Secret<String>,
    ) -> Result<LoginOutcome, LoginGuardError> {
        let (result, user) = self
            .engine
            .evaluate_with(ip_address, username, || {
                self.authenticator.validate(username, password)
            })
            .await?;

        match user {
            Some(ref user) => {
                info!(ip = %ip_address, username = %user.username, "User authenticated")
            }
            None if result.blocked => {
                warn!(ip = %ip_address, username = %username, "Login refused")
            }
            None => {}
        }
        Ok(LoginOutcome { result, user })
    }
}
