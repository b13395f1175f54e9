use std::error::Error;

#[derive(thiserror::Error, Debug)]
pub enum LoginGuardError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),
    #[error("store error: {0}")]
    Store(String),
    #[error("no record found for {0}")]
    NotFound(String),
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(password_hash::Error),
    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl LoginGuardError {
    pub fn other<E: Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Other(Box::new(err))
    }

    /// Collaborator I/O failures, as opposed to caller mistakes.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::Store(_))
    }
}

impl From<password_hash::Error> for LoginGuardError {
    fn from(err: password_hash::Error) -> Self {
        Self::PasswordHash(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_classification() {
        assert!(LoginGuardError::Store("connection reset".into()).is_store_error());
        assert!(LoginGuardError::DatabaseError(sea_orm::DbErr::Custom("boom".into()))
            .is_store_error());
        assert!(!LoginGuardError::Validation("bad ip".into()).is_store_error());
        assert!(!LoginGuardError::NotFound("10.0.0.1".into()).is_store_error());
    }
}
