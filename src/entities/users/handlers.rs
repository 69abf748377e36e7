//! Admin-only user management

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::model::{User, validate_password};
use crate::core::auth::{AuthPolicy, Role};
use crate::core::entity::Entity;
use crate::core::error::ApiError;
use crate::core::extractors::{Authenticated, JsonBody};
use crate::core::password::hash_password;
use crate::core::query::{RawQuery, ResultEnvelope};
use crate::core::service::{EntityService, from_document, to_document, writable_subset};
use crate::core::store::Document;
use crate::entities::string_field;
use crate::server::{AppState, DataResponse};

fn require_admin(auth: &Authenticated) -> Result<(), ApiError> {
    AuthPolicy::roles(&[Role::Admin]).require(auth.context())
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(raw): Query<RawQuery>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    require_admin(&auth)?;
    let query = state
        .engine
        .parse(&raw)
        .hiding(User::hidden_fields().iter().copied());
    let result = state.engine.execute(query, "users", &[]).await?;
    Ok(Json(result))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    require_admin(&auth)?;
    let user = state.service::<User>().require(&id).await?;
    Ok(DataResponse::ok(EntityService::present(&user)?))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    auth: Authenticated,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<DataResponse<Document>>), ApiError> {
    require_admin(&auth)?;

    let password = string_field(&body, "password").unwrap_or_default();
    validate_password(&password)?;

    let template = User::new(String::new(), String::new(), Role::User, hash_password(&password)?);
    let mut document = to_document(&template)?;
    document.extend(writable_subset(&body, &["name", "email", "role"]));
    let user: User = from_document(document)?;

    let user = state.service::<User>().create(user).await?;
    Ok(DataResponse::created(EntityService::present(&user)?))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    require_admin(&auth)?;
    let users = state.service::<User>();

    let password = match string_field(&body, "password") {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_password(&password)?)
        }
        None => None,
    };

    let mut document = to_document(&users.require(&id).await?)?;
    document.extend(writable_subset(&body, User::writable_fields()));
    let mut user: User = from_document(document)?;
    if let Some(hash) = password {
        user.password = hash;
    }
    let user = users.update(user).await?;

    Ok(DataResponse::ok(EntityService::present(&user)?))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Value>>, ApiError> {
    require_admin(&auth)?;
    let users = state.service::<User>();
    users.require(&id).await?;
    users.delete(&id).await?;
    Ok(DataResponse::ok(json!({})))
}
