use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::model::{AVERAGE_COST, Course};
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

async fn present_populated(state: &AppState, course: &Course) -> Result<Document, ApiError> {
    let document = EntityService::present(course)?;
    let mut populated = state
        .engine
        .populate(vec![document], &[bootcamp_populate()])
        .await?;
    populated
        .pop()
        .ok_or_else(|| ApiError::Internal("populate dropped the course".to_string()))
}

async fn refresh_average_cost(state: &AppState, bootcamp_id: &str) -> Result<(), ApiError> {
    state.aggregates.recompute(&AVERAGE_COST, bootcamp_id).await?;
    Ok(())
}

/// GET /courses
pub async fn list_courses(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let result = state
        .engine
        .build_and_execute(&raw, Course::resource_name(), &[bootcamp_populate()])
        .await?;
    Ok(Json(result))
}

/// GET /bootcamps/{id}/courses
pub async fn list_bootcamp_courses(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let query = state.engine.parse(&raw).scoped("bootcamp", &bootcamp_id);
    let result = state
        .engine
        .execute(query, Course::resource_name(), &[])
        .await?;
    Ok(Json(result))
}

/// GET /courses/{id}
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let course = state.service::<Course>().require(&id).await?;
    Ok(DataResponse::ok(present_populated(&state, &course).await?))
}

/// POST /bootcamps/{id}/courses
///
/// Only the bootcamp's owner (or an admin) may add courses to it.
pub async fn create_course(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(bootcamp_id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<DataResponse<Document>>), ApiError> {
    AuthPolicy::roles(&[Role::Publisher, Role::Admin]).require(auth.context())?;

    let bootcamp = state.service::<Bootcamp>().require(&bootcamp_id).await?;
    auth.context().require_owner(
        bootcamp.owner_id(),
        &format!("add a course to bootcamp {}", bootcamp.id),
    )?;

    let mut document = to_document(&Course::draft(&bootcamp.id, auth.user_id()))?;
    document.extend(writable_subset(&body, Course::writable_fields()));
    let course: Course = from_document(document)?;

    let course = state.service::<Course>().create(course).await?;
    refresh_average_cost(&state, &course.bootcamp).await?;

    Ok(DataResponse::created(EntityService::present(&course)?))
}

/// PUT /courses/{id}
pub async fn update_course(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let courses = state.service::<Course>();
    let course = courses.require(&id).await?;
    auth.context()
        .require_owner(course.owner_id(), &format!("update course {}", course.id))?;

    let course = courses.patch(&id, &body).await?;
    refresh_average_cost(&state, &course.bootcamp).await?;

    Ok(DataResponse::ok(EntityService::present(&course)?))
}

/// DELETE /courses/{id}
pub async fn delete_course(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Value>>, ApiError> {
    let courses = state.service::<Course>();
    let course = courses.require(&id).await?;
    auth.context()
        .require_owner(course.owner_id(), &format!("delete course {}", course.id))?;

    courses.delete(&id).await?;
    refresh_average_cost(&state, &course.bootcamp).await?;

    Ok(DataResponse::ok(json!({})))
}
