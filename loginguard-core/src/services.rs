use std::sync::Arc;

use anyhow::Result;
use loginguard_common::{LoginGuardConfig, LoginGuardError};
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use tracing::debug;

use crate::auth::{Authenticator, DatabaseAuthenticator};
use crate::clock::{Clock, SystemClock};
use crate::db::connect_to_db;
use crate::detection::DetectionEngine;
use crate::ip_blocker::IpBlocker;
use crate::locks::IpLocks;
use crate::login::LoginGate;
use crate::status::{security_status, SecurityStatus};
use crate::stores::{AttemptStore, DatabaseAttemptStore, DatabaseBlockStore};

/// Everything a command needs, wired against one database.
#[derive(Clone)]
pub struct Services {
    pub db: Arc<Mutex<DatabaseConnection>>,
    pub config: Arc<LoginGuardConfig>,
    pub clock: Arc<dyn Clock>,
    pub attempts: Arc<dyn AttemptStore>,
    pub blocker: Arc<IpBlocker>,
    pub engine: Arc<DetectionEngine>,
    pub authenticator: Arc<DatabaseAuthenticator>,
    pub login_gate: Arc<LoginGate>,
}

impl Services {
    pub async fn new(config: LoginGuardConfig) -> Result<Self> {
        config.validate()?;
        let db = connect_to_db(&config).await?;
        let db = Arc::new(Mutex::new(db));
        Ok(Self::with_connection(config, db, Arc::new(SystemClock)))
    }

    pub fn with_connection(
        config: LoginGuardConfig,
        db: Arc<Mutex<DatabaseConnection>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let attempts: Arc<dyn AttemptStore> =
            Arc::new(DatabaseAttemptStore::new(db.clone(), clock.clone()));
        let blocker = Arc::new(IpBlocker::new(
            Arc::new(DatabaseBlockStore::new(db.clone())),
            clock.clone(),
            Arc::new(IpLocks::new()),
        ));
        let engine = Arc::new(DetectionEngine::new(
            config.store.detection.clone(),
            attempts.clone(),
            blocker.clone(),
        ));
        let authenticator = Arc::new(DatabaseAuthenticator::new(db.clone(), clock.clone()));
        let login_gate = Arc::new(LoginGate::new(engine.clone(), authenticator.clone()));

        Self {
            db,
            config: Arc::new(config),
            clock,
            attempts,
            blocker,
            engine,
            authenticator,
            login_gate,
        }
    }

    pub async fn security_status(&self) -> Result<SecurityStatus, LoginGuardError> {
        let authenticator: &dyn Authenticator = &*self.authenticator;
        security_status(&*self.clock, authenticator, &*self.attempts, &self.blocker).await
    }

    /// Closes the pool. Other clones of these services must not be used
    /// afterwards.
    pub async fn close(self) -> Result<()> {
        let db = self.db.lock().await.clone();
        db.close().await?;
        debug!("Database connection closed");
        Ok(())
    }
}
