use std::sync::Arc;

use async_trait::async_trait;
use loginguard_common::helpers::hash::{hash_password, verify_password_hash};
use loginguard_common::{LoginGuardError, Secret, UserIdentity, UserRecord, UserStatus};
use loginguard_db_entities::User;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::clock::Clock;

/// Credential check consulted by the login flow.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `None` for unknown users, disabled users and wrong passwords alike.
    async fn validate(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<Option<UserIdentity>, LoginGuardError>;

    async fn count_users(&self) -> Result<u64, LoginGuardError>;
}

pub struct DatabaseAuthenticator {
    db: Arc<Mutex<DatabaseConnection>>,
    clock: Arc<dyn Clock>,
}

impl DatabaseAuthenticator {
    pub fn new(db: Arc<Mutex<DatabaseConnection>>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<UserIdentity, LoginGuardError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LoginGuardError::Validation(
                "username must not be empty".into(),
            ));
        }

        let db = self.db.lock().await;
        let existing = User::Entity::find()
            .filter(User::Column::Username.eq(username))
            .one(&*db)
            .await?;
        if existing.is_some() {
            return Err(LoginGuardError::Validation(format!(
                "user {username} already exists"
            )));
        }

        let values = User::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_owned()),
            password_hash: Set(hash_password(password.expose_secret())?),
            status: Set(UserStatus::Active),
            created_at: Set(self.clock.now()),
            last_login: Set(None),
        };
        let user = values.insert(&*db).await?;
        info!(username = %user.username, "Created user");

        Ok(UserIdentity {
            id: user.id,
            username: user.username,
        })
    }

    pub async fn set_user_status(
        &self,
        username: &str,
        status: UserStatus,
    ) -> Result<(), LoginGuardError> {
        let db = self.db.lock().await;
        let user = User::Entity::find()
            .filter(User::Column::Username.eq(username))
            .one(&*db)
            .await?
            .ok_or_else(|| LoginGuardError::UserNotFound(username.to_owned()))?;

        let mut model: User::ActiveModel = user.into();
        model.status = Set(status);
        model.update(&*db).await?;
        info!(username = %username, status = ?status, "Updated user status");
        Ok(())
    }

    /// Every account, newest first.
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, LoginGuardError> {
        let db = self.db.lock().await;
        Ok(User::Entity::find()
            .order_by_desc(User::Column::CreatedAt)
            .all(&*db)
            .await?
            .into_iter()
            .map(UserRecord::from)
            .collect())
    }
}

#[async_trait]
impl Authenticator for DatabaseAuthenticator {
    async fn validate(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<Option<UserIdentity>, LoginGuardError> {
        let db = self.db.lock().await;
        let Some(user) = User::Entity::find()
            .filter(User::Column::Username.eq(username))
            .filter(User::Column::Status.eq(UserStatus::Active))
            .one(&*db)
            .await?
        else {
            debug!(username = %username, "No active user");
            return Ok(None);
        };

        let valid = verify_password_hash(password.expose_secret(), &user.password_hash)
            .unwrap_or_else(|e| {
                error!(username = %username, "Error verifying password hash: {}", e);
                false
            });
        if !valid {
            return Ok(None);
        }

        let identity = UserIdentity {
            id: user.id,
            username: user.username.clone(),
        };
        let mut model: User::ActiveModel = user.into();
        model.last_login = Set(Some(self.clock.now()));
        model.update(&*db).await?;

        Ok(Some(identity))
    }

    async fn count_users(&self) -> Result<u64, LoginGuardError> {
        let db = self.db.lock().await;
        Ok(User::Entity::find().count(&*db).await?)
    }
}
