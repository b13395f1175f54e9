use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::LoginGuardError;

pub fn hash_password(password: &str) -> Result<String, LoginGuardError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn parse_hash(hash: &str) -> Result<PasswordHash<'_>, Error> {
    PasswordHash::new(hash)
}

pub fn verify_password_hash(password: &str, hash: &str) -> Result<bool, LoginGuardError> {
    let parsed_hash = parse_hash(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
