use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::auth::Role;
use crate::core::entity::Entity;
use crate::core::error::ApiError;
use crate::core::timestamp;

pub const PASSWORD_MIN_LENGTH: usize = 6;

/// A registered account
///
/// `password` holds the argon2 hash and is never part of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    #[serde(default)]
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_expire: Option<DateTime<Utc>>,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("Please add a name".into()));
    }
    Ok(())
}

/// Plaintext password rules, checked before hashing
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(ApiError::invalid(
            "password",
            format!("Password must be at least {} characters", PASSWORD_MIN_LENGTH),
        ));
    }
    Ok(())
}

impl User {
    pub fn new(name: String, email: String, role: Role, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            role,
            password: password_hash,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: timestamp::now(),
        }
    }

    /// Whether a reset token digest matches and has not expired
    pub fn reset_token_valid(&self, digest: &str, now: DateTime<Utc>) -> bool {
        self.reset_password_token.as_deref() == Some(digest)
            && self.reset_password_expire.is_some_and(|expire| expire > now)
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expire = None;
    }
}

impl Entity for User {
    fn resource_name() -> &'static str {
        "users"
    }

    fn resource_name_singular() -> &'static str {
        "User"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn writable_fields() -> &'static [&'static str] {
        &["name", "email", "role"]
    }

    fn hidden_fields() -> &'static [&'static str] {
        &["password", "resetPasswordToken", "resetPasswordExpire"]
    }

    fn unique_indexes() -> &'static [&'static [&'static str]] {
        &[&["email"]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validation_messages() {
        let user = User::new(String::new(), "not-an-email".into(), Role::User, "hash".into());
        let errors = user.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_reset_token_expiry() {
        let mut user = User::new("A".into(), "a@x.io".into(), Role::User, "h".into());
        let now = Utc::now();
        user.reset_password_token = Some("digest".into());
        user.reset_password_expire = Some(now + Duration::minutes(10));

        assert!(user.reset_token_valid("digest", now));
        assert!(!user.reset_token_valid("other", now));
        assert!(!user.reset_token_valid("digest", now + Duration::minutes(11)));

        user.clear_reset_token();
        assert!(!user.reset_token_valid("digest", now));
    }

    #[test]
    fn test_hidden_fields_are_camel_case() {
        let mut user = User::new("A".into(), "a@x.io".into(), Role::User, "h".into());
        user.reset_password_token = Some("t".into());
        user.reset_password_expire = Some(Utc::now());
        let json = serde_json::to_value(&user).unwrap();
        for field in User::hidden_fields() {
            assert!(json.get(*field).is_some(), "{field} should be stored");
        }
    }
}
