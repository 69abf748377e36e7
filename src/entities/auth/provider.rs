use async_trait::async_trait;
use std::sync::Arc;

use crate::core::auth::{AuthContext, AuthError, AuthProvider};
use crate::core::error::ApiError;
use crate::core::service::EntityService;
use crate::core::store::DocumentStore;
use crate::core::token::JwtManager;
use crate::entities::users::User;

/// Validates a JWT and reloads its user from the store
///
/// A token for a user that has since been deleted is rejected.
pub struct JwtAuthProvider {
    tokens: JwtManager,
    users: EntityService<User>,
}

impl JwtAuthProvider {
    pub fn new(tokens: JwtManager, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            tokens,
            users: EntityService::new(store),
        }
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = self.tokens.validate(token)?;

        let user = match self.users.get(&claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) | Err(ApiError::NotFound { .. }) => return Err(AuthError::UnknownUser),
            Err(e) => return Err(AuthError::Lookup(e.to_string())),
        };

        Ok(AuthContext::user(user.id, user.role))
    }
}
