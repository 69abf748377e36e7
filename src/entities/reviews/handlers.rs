use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::model::{AVERAGE_RATING, Review};
use crate::core::auth::{AuthPolicy, Role};
use crate::core::engine::PopulateSpec;
use crate::core::entity::Entity;
use crate::core::error::ApiError;
use crate::core::extractors::{Authenticated, JsonBody};
use crate::core::query::{Projection, RawQuery, ResultEnvelope};
use crate::core::service::{EntityService, from_document, to_document, writable_subset};
use crate::core::store::Document;
use crate::entities::bootcamps::Bootcamp;
use crate::server::{AppState, DataResponse};

fn bootcamp_populate() -> PopulateSpec {
    PopulateSpec::reference(
        "bootcamp",
        Bootcamp::resource_name(),
        Projection::parse("name,description"),
    )
}

async fn refresh_average_rating(state: &AppState, bootcamp_id: &str) -> Result<(), ApiError> {
    state
        .aggregates
        .recompute(&AVERAGE_RATING, bootcamp_id)
        .await?;
    Ok(())
}

/// GET /reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let result = state
        .engine
        .build_and_execute(&raw, Review::resource_name(), &[bootcamp_populate()])
        .await?;
    Ok(Json(result))
}

/// GET /bootcamps/{id}/reviews
pub async fn list_bootcamp_reviews(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let query = state.engine.parse(&raw).scoped("bootcamp", &bootcamp_id);
    let result = state
        .engine
        .execute(query, Review::resource_name(), &[])
        .await?;
    Ok(Json(result))
}

/// GET /reviews/{id}
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let review = state.service::<Review>().require(&id).await?;
    let mut populated = state
        .engine
        .populate(vec![EntityService::present(&review)?], &[bootcamp_populate()])
        .await?;
    let document = populated
        .pop()
        .ok_or_else(|| ApiError::Internal("populate dropped the review".to_string()))?;
    Ok(DataResponse::ok(document))
}

/// POST /bootcamps/{id}/reviews
pub async fn create_review(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(bootcamp_id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<DataResponse<Document>>), ApiError> {
    AuthPolicy::roles(&[Role::User, Role::Admin]).require(auth.context())?;
    let bootcamp = state.service::<Bootcamp>().require(&bootcamp_id).await?;

    let mut document = to_document(&Review::draft(&bootcamp.id, auth.user_id()))?;
    document.extend(writable_subset(&body, Review::writable_fields()));
    let review: Review = from_document(document)?;

    let review = state.service::<Review>().create(review).await?;
    refresh_average_rating(&state, &review.bootcamp).await?;

    Ok(DataResponse::created(EntityService::present(&review)?))
}

/// PUT /reviews/{id}
pub async fn update_review(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let reviews = state.service::<Review>();
    let review = reviews.require(&id).await?;
    auth.context()
        .require_owner(review.owner_id(), &format!("update review {}", review.id))?;

    let review = reviews.patch(&id, &body).await?;
    refresh_average_rating(&state, &review.bootcamp).await?;

    Ok(DataResponse::ok(EntityService::present(&review)?))
}

/// DELETE /reviews/{id}
pub async fn delete_review(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Value>>, ApiError> {
    let reviews = state.service::<Review>();
    let review = reviews.require(&id).await?;
    auth.context()
        .require_owner(review.owner_id(), &format!("delete review {}", review.id))?;

    reviews.delete(&id).await?;
    refresh_average_rating(&state, &review.bootcamp).await?;

    Ok(DataResponse::ok(json!({})))
}
