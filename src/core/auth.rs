//! Authorization primitives
//!
//! Requests are authenticated into an [`AuthContext`] by an [`AuthProvider`].
//! Handlers then check an [`AuthPolicy`] for role-gated routes and
//! [`AuthContext::can_modify`] for owner-gated records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::core::error::ApiError;

/// Role of a registered user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}

/// Authentication failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Not authorized to access this route")]
    MissingToken,

    #[error("Not authorized to access this route")]
    MalformedToken,

    #[error("Not authorized to access this route")]
    TokenExpired,

    #[error("Not authorized to access this route")]
    UnknownUser,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Failed to issue token")]
    TokenGenerationFailed,

    #[error("Failed to hash password")]
    HashingFailed,

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("Failed to load user: {0}")]
    Lookup(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenGenerationFailed | AuthError::HashingFailed | AuthError::Lookup(_) => {
                ApiError::Internal(err.to_string())
            }
            AuthError::UnknownRole(_) => ApiError::bad_request(err.to_string()),
            _ => ApiError::unauthorized(err.to_string()),
        }
    }
}

/// Authorization context extracted from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// Authenticated user, reloaded from the store for this request
    User { user_id: String, role: Role },

    /// No authentication (public access)
    Anonymous,
}

impl AuthContext {
    pub fn user(user_id: impl Into<String>, role: Role) -> Self {
        AuthContext::User {
            user_id: user_id.into(),
            role,
        }
    }

    /// Get user_id if available
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthContext::User { user_id, .. } => Some(user_id),
            AuthContext::Anonymous => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            AuthContext::User { role, .. } => Some(*role),
            AuthContext::Anonymous => None,
        }
    }

    /// Check if context represents an admin
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Admins may modify anything, everyone else only what they own
    pub fn can_modify(&self, owner_id: Option<&str>) -> bool {
        match self {
            AuthContext::User { user_id, role } => {
                *role == Role::Admin || owner_id == Some(user_id.as_str())
            }
            AuthContext::Anonymous => false,
        }
    }

    /// Fail with 403 unless the caller owns the record or is an admin
    pub fn require_owner(&self, owner_id: Option<&str>, action: &str) -> Result<(), ApiError> {
        if self.can_modify(owner_id) {
            return Ok(());
        }
        Err(ApiError::forbidden(format!(
            "User {} is not authorized to {}",
            self.user_id().unwrap_or("anonymous"),
            action
        )))
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any authenticated user
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<Role>),
}

impl AuthPolicy {
    pub fn roles(roles: &[Role]) -> Self {
        AuthPolicy::HasRole(roles.to_vec())
    }

    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,
            AuthPolicy::Authenticated => !matches!(context, AuthContext::Anonymous),
            AuthPolicy::HasRole(required) => context.role().is_some_and(|r| required.contains(&r)),
        }
    }

    /// Like `check`, producing the response the client sees on failure
    pub fn require(&self, context: &AuthContext) -> Result<(), ApiError> {
        if self.check(context) {
            return Ok(());
        }
        match context {
            AuthContext::Anonymous => Err(AuthError::MissingToken.into()),
            AuthContext::User { role, .. } => Err(ApiError::forbidden(format!(
                "User role {} is not authorized to access this route",
                role
            ))),
        }
    }
}

/// Turns a bearer token into an auth context
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError>;
}
