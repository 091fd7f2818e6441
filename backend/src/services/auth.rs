use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Store, StoreError};

/// Subject carried by every admin session token
pub const ADMIN_SUBJECT: &str = "admin";
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Password hashing error")]
    HashingError,
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingError)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// True for PHC strings this module can verify; older bcrypt hashes are not.
pub fn is_argon2_hash(password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|hash| hash.algorithm.as_str().starts_with("argon2"))
        .unwrap_or(false)
}

/// Check the admin password against the stored hash
pub fn login(store: &Store, password: &str) -> Result<(), AuthError> {
    // Verification is slow on purpose; keep it outside the store lock.
    let password_hash = store.read(|doc| doc.admin.password_hash.clone())?;
    verify_password(password, &password_hash)
}

pub fn change_password(store: &Store, new_password: &str) -> Result<(), AuthError> {
    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::PasswordTooShort);
    }

    let password_hash = hash_password(new_password)?;
    store.write(|doc| {
        doc.admin.password_hash = password_hash;
        Ok::<_, AuthError>(())
    })?;

    log::info!("Admin password changed");
    Ok(())
}

pub fn create_jwt(secret: &str, expiration_hours: i64) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: ADMIN_SUBJECT.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<(), AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    if token_data.claims.sub != ADMIN_SUBJECT {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(())
}
