//! Axum extractors for request bodies and authentication
//!
//! - [`JsonBody`] parses a JSON object body, rejecting with an [`ApiError`]
//! - [`Authenticated`] requires a valid token (bearer header or `token` cookie)

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use serde_json::Value;

use crate::core::auth::{AuthContext, AuthError};
use crate::core::error::ApiError;
use crate::core::store::Document;
use crate::server::AppState;

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

/// A JSON object request body
#[derive(Debug, Clone, Default)]
pub struct JsonBody(pub Document);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload): Json<Value> = Json::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;

        match payload {
            Value::Object(map) => Ok(JsonBody(map)),
            _ => Err(ApiError::bad_request("Request body must be a JSON object")),
        }
    }
}

/// Token sent with the request, header first, then cookie
pub fn request_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty() && *value != "none")
        .map(|(_, value)| value.to_string())
}

/// An authenticated caller
///
/// Rejects with 401 when the token is missing, invalid or belongs to a user
/// that no longer exists.
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthContext);

impl Authenticated {
    pub fn context(&self) -> &AuthContext {
        &self.0
    }

    pub fn user_id(&self) -> &str {
        self.0.user_id().unwrap_or_default()
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = request_token(parts).ok_or(AuthError::MissingToken)?;
        let context = state.auth.authenticate(&token).await?;
        Ok(Authenticated(context))
    }
}
