//! Registration, login and password management

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::{HOST, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use chrono::Utc;
use serde_json::{Value, json};

use crate::core::auth::{AuthError, Role};
use crate::core::error::ApiError;
use crate::core::extractors::{Authenticated, JsonBody};
use crate::core::mailer::Email;
use crate::core::password::{ResetToken, digest_token, hash_password, verify_password};
use crate::core::query::FilterExpression;
use crate::core::service::{EntityService, writable_subset};
use crate::core::store::Document;
use crate::entities::string_field;
use crate::entities::users::User;
use crate::entities::users::model::validate_password;
use crate::server::response::cleared_cookie;
use crate::server::{API_PREFIX, AppState, DataResponse, TokenResponse};

fn token_response(state: &AppState, user: &User) -> Result<TokenResponse, ApiError> {
    let token = state.tokens.issue(&user.id)?;
    Ok(TokenResponse::new(
        token,
        state.config.auth.cookie_expire_days,
        state.config.auth.secure_cookies,
    ))
}

async fn find_by_email(state: &AppState, email: &str) -> Result<Option<User>, ApiError> {
    state
        .service::<User>()
        .find_one_where(FilterExpression::new().with_eq("email", email))
        .await
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<TokenResponse, ApiError> {
    let role = match string_field(&body, "role") {
        None => Role::User,
        Some(role) => match role.parse::<Role>() {
            Ok(Role::Admin) | Err(_) => {
                return Err(ApiError::invalid("role", "Role must be user or publisher"));
            }
            Ok(role) => role,
        },
    };

    let password = string_field(&body, "password").unwrap_or_default();
    validate_password(&password)?;

    let user = User::new(
        string_field(&body, "name").unwrap_or_default(),
        string_field(&body, "email").unwrap_or_default(),
        role,
        hash_password(&password)?,
    );
    let user = state.service::<User>().create(user).await?;

    token_response(&state, &user)
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<TokenResponse, ApiError> {
    let (Some(email), Some(password)) =
        (string_field(&body, "email"), string_field(&body, "password"))
    else {
        return Err(ApiError::bad_request("Please provide an email and password"));
    };

    let user = find_by_email(&state, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(&password, &user.password) {
        return Err(AuthError::InvalidCredentials.into());
    }

    token_response(&state, &user)
}

/// GET /auth/logout
pub async fn logout() -> impl IntoResponse {
    (
        [(SET_COOKIE, cleared_cookie())],
        DataResponse::ok(json!({})),
    )
}

/// GET /auth/me
pub async fn get_me(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let user = state.service::<User>().require(auth.user_id()).await?;
    Ok(DataResponse::ok(EntityService::present(&user)?))
}

/// PUT /auth/updatedetails
pub async fn update_details(
    State(state): State<AppState>,
    auth: Authenticated,
    JsonBody(body): JsonBody,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let fields = writable_subset(&body, &["name", "email"]);
    let user = state
        .service::<User>()
        .patch(auth.user_id(), &fields)
        .await?;
    Ok(DataResponse::ok(EntityService::present(&user)?))
}

/// PUT /auth/updatepassword
pub async fn update_password(
    State(state): State<AppState>,
    auth: Authenticated,
    JsonBody(body): JsonBody,
) -> Result<TokenResponse, ApiError> {
    let users = state.service::<User>();
    let mut user = users.require(auth.user_id()).await?;

    let current = string_field(&body, "currentPassword").unwrap_or_default();
    if !verify_password(&current, &user.password) {
        return Err(ApiError::unauthorized("Password is incorrect"));
    }

    let new_password = string_field(&body, "newPassword").unwrap_or_default();
    validate_password(&new_password)?;
    user.password = hash_password(&new_password)?;
    let user = users.update(user).await?;

    token_response(&state, &user)
}

/// POST /auth/forgotpassword
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody,
) -> Result<Json<DataResponse<Value>>, ApiError> {
    let email = string_field(&body, "email").unwrap_or_default();
    let Some(mut user) = find_by_email(&state, &email).await? else {
        return Err(ApiError::missing("There is no user with that email"));
    };

    let reset = ResetToken::generate();
    user.reset_password_token = Some(reset.digest);
    user.reset_password_expire = Some(reset.expires_at);
    let users = state.service::<User>();
    let mut user = users.update(user).await?;

    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let reset_url = format!(
        "http://{}{}/auth/resetpassword/{}",
        host, API_PREFIX, reset.token
    );
    let email = Email {
        to: user.email.clone(),
        subject: "Password reset token".to_string(),
        body: format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password. Please make a PUT request to: \n\n {}",
            reset_url
        ),
    };

    if let Err(e) = state.mailer.send(email).await {
        tracing::error!(user = %user.id, error = %e, "failed to send reset email");
        user.clear_reset_token();
        users.update(user).await?;
        return Err(ApiError::Internal("Email could not be sent".to_string()));
    }

    Ok(DataResponse::ok(json!("Email sent")))
}

/// PUT /auth/resetpassword/{token}
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<TokenResponse, ApiError> {
    let users = state.service::<User>();
    let digest = digest_token(&token);

    let user = users
        .find_one_where(FilterExpression::new().with_eq("resetPasswordToken", &digest))
        .await?
        .filter(|user| user.reset_token_valid(&digest, Utc::now()));
    let Some(mut user) = user else {
        return Err(ApiError::bad_request("Invalid token"));
    };

    let password = string_field(&body, "password").unwrap_or_default();
    validate_password(&password)?;
    user.password = hash_password(&password)?;
    user.clear_reset_token();
    let user = users.update(user).await?;

    token_response(&state, &user)
}
