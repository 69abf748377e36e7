//! Password hashing and reset tokens

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::core::auth::AuthError;

/// Lifetime of a password reset token
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingFailed)
}

/// A malformed stored hash never verifies
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// SHA-256 hex digest of a reset token, the form kept in the store
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// A freshly issued reset token
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Sent to the user
    pub token: String,
    /// Stored on the user record
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 20];
        OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        Self {
            digest: digest_token(&token),
            token,
            expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("123456").unwrap();
        assert_ne!(hash, "123456");
        assert!(verify_password("123456", &hash));
        assert!(!verify_password("654321", &hash));
        assert!(!verify_password("123456", "not-a-hash"));
    }

    #[test]
    fn test_reset_token_shape() {
        let reset = ResetToken::generate();
        assert_eq!(reset.token.len(), 40);
        assert_eq!(reset.digest, digest_token(&reset.token));
        assert_eq!(reset.digest.len(), 64);
        assert!(reset.expires_at > Utc::now());
    }
}
