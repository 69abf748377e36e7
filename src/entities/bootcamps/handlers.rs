//! Bootcamp listing, ownership-gated writes, radius search and photo upload

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use std::path::Path as FsPath;

use super::model::Bootcamp;
use crate::core::auth::{AuthPolicy, Role};
use crate::core::engine::PopulateSpec;
use crate::core::entity::Entity;
use crate::core::error::ApiError;
use crate::core::extractors::{Authenticated, JsonBody};
use crate::core::geo::{Location, within_radius};
use crate::core::query::{FilterExpression, Projection, RawQuery, ResultEnvelope, SortSpec};
use crate::core::service::{EntityService, from_document, to_document, writable_subset};
use crate::core::store::{Document, FindOptions};
use crate::entities::courses::Course;
use crate::entities::reviews::Review;
use crate::server::{AppState, CountedResponse, DataResponse};

fn courses_populate() -> PopulateSpec {
    PopulateSpec::children("courses", Course::resource_name(), "bootcamp", Projection::all())
}

/// Resolve `address` into `location`
///
/// The raw address is dropped once resolved. An address the geocoder does
/// not know is kept as entered and the listing has no location.
pub(crate) async fn geocode(state: &AppState, bootcamp: &mut Bootcamp) {
    let Some(address) = bootcamp.address.as_deref() else {
        return;
    };
    match state.geocoder.geocode(address).await {
        Some(location) => {
            bootcamp.location = Some(location);
            bootcamp.address = None;
        }
        None => {
            tracing::debug!(bootcamp = %bootcamp.id, "address could not be geocoded");
            bootcamp.location = None;
        }
    }
}

/// GET /bootcamps
pub async fn list_bootcamps(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let result = state
        .engine
        .build_and_execute(&raw, Bootcamp::resource_name(), &[courses_populate()])
        .await?;
    Ok(Json(result))
}

/// GET /bootcamps/{id}
pub async fn get_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let bootcamp = state.service::<Bootcamp>().require(&id).await?;
    Ok(DataResponse::ok(EntityService::present(&bootcamp)?))
}

/// POST /bootcamps
pub async fn create_bootcamp(
    State(state): State<AppState>,
    auth: Authenticated,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<DataResponse<Document>>), ApiError> {
    AuthPolicy::roles(&[Role::Publisher, Role::Admin]).require(auth.context())?;
    let bootcamps = state.service::<Bootcamp>();

    if !auth.context().is_admin() {
        let published = bootcamps
            .find_one_where(FilterExpression::new().with_eq("user", auth.user_id()))
            .await?;
        if published.is_some() {
            return Err(ApiError::bad_request(format!(
                "The user with ID {} has already published a bootcamp",
                auth.user_id()
            )));
        }
    }

    let mut document = to_document(&Bootcamp::draft(auth.user_id()))?;
    document.extend(writable_subset(&body, Bootcamp::writable_fields()));
    let mut bootcamp: Bootcamp = from_document(document)?;

    if bootcamp.address.as_deref().is_none_or(|a| a.trim().is_empty()) {
        return Err(ApiError::invalid("address", "Please add an address"));
    }
    bootcamp.refresh_slug();
    geocode(&state, &mut bootcamp).await;

    let bootcamp = bootcamps.create(bootcamp).await?;
    Ok(DataResponse::created(EntityService::present(&bootcamp)?))
}

/// PUT /bootcamps/{id}
pub async fn update_bootcamp(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Json<DataResponse<Document>>, ApiError> {
    let bootcamps = state.service::<Bootcamp>();
    let existing = bootcamps.require(&id).await?;
    auth.context()
        .require_owner(existing.owner_id(), "update this bootcamp")?;

    let mut document = to_document(&existing)?;
    document.extend(writable_subset(&body, Bootcamp::writable_fields()));
    let mut bootcamp: Bootcamp = from_document(document)?;

    bootcamp.refresh_slug();
    if body.contains_key("address") {
        geocode(&state, &mut bootcamp).await;
    }

    let bootcamp = bootcamps
        .save_fields(&bootcamp, &Bootcamp::edited_fields())
        .await?;
    Ok(DataResponse::ok(EntityService::present(&bootcamp)?))
}

/// DELETE /bootcamps/{id}
///
/// Courses and reviews of the bootcamp are deleted with it.
pub async fn delete_bootcamp(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Value>>, ApiError> {
    let bootcamps = state.service::<Bootcamp>();
    let bootcamp = bootcamps.require(&id).await?;
    auth.context()
        .require_owner(bootcamp.owner_id(), "delete this bootcamp")?;

    let children = FilterExpression::new().with_eq("bootcamp", &id);
    let courses = state.service::<Course>().delete_where(&children).await?;
    let reviews = state.service::<Review>().delete_where(&children).await?;
    bootcamps.delete(&id).await?;

    tracing::info!(bootcamp = %id, courses, reviews, "deleted bootcamp");
    Ok(DataResponse::ok(json!({})))
}

/// GET /bootcamps/radius/{zipcode}/{distance}
///
/// `distance` is in miles.
pub async fn bootcamps_in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<Json<CountedResponse<Document>>, ApiError> {
    let miles = distance
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid distance {}", distance)))?;

    let center = state
        .geocoder
        .geocode_zipcode(&zipcode)
        .await
        .ok_or_else(|| ApiError::not_found("Location", &zipcode))?;

    let options = FindOptions::new(FilterExpression::new()).with_sort(SortSpec::default_order());
    let bootcamps: Vec<Document> = state
        .store
        .find(Bootcamp::resource_name(), &options)
        .await?
        .into_iter()
        .filter(|document| {
            document
                .get("location")
                .and_then(|l| serde_json::from_value::<Location>(l.clone()).ok())
                .is_some_and(|location| within_radius(&center, &location, miles))
        })
        .collect();

    Ok(CountedResponse::ok(bootcamps))
}

fn upload_error(err: MultipartError, max: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::bad_request(format!("Please upload an image less than {}", max));
    }
    ApiError::bad_request(format!("Problem with file upload: {}", err.body_text()))
}

fn photo_extension(file_name: Option<&str>, content_type: &str) -> String {
    file_name
        .and_then(|name| FsPath::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .or_else(|| content_type.strip_prefix("image/").map(str::to_string))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// PUT /bootcamps/{id}/photo
///
/// Expects a multipart field named `file` holding an image.
pub async fn upload_photo(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DataResponse<Value>>, ApiError> {
    let bootcamps = state.service::<Bootcamp>();
    let mut bootcamp = bootcamps.require(&id).await?;
    auth.context()
        .require_owner(bootcamp.owner_id(), "update this bootcamp")?;

    let mut multipart = multipart.map_err(|_| ApiError::bad_request("Please upload a file"))?;
    let max = state.config.upload.max_file_upload;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, max))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = photo_extension(field.file_name(), &content_type);
        let data = field.bytes().await.map_err(|e| upload_error(e, max))?;
        upload = Some((content_type, extension, data));
        break;
    }

    let Some((content_type, extension, data)) = upload else {
        return Err(ApiError::bad_request("Please upload a file"));
    };
    if !content_type.starts_with("image/") {
        return Err(ApiError::bad_request("Please upload an image file"));
    }
    if data.len() > max {
        return Err(ApiError::bad_request(format!(
            "Please upload an image less than {}",
            max
        )));
    }

    let file_name = format!("photo_{}{}", bootcamp.id, extension);
    let directory = FsPath::new(&state.config.upload.file_upload_path);
    let written = async {
        tokio::fs::create_dir_all(directory).await?;
        tokio::fs::write(directory.join(&file_name), &data).await
    }
    .await;
    if let Err(e) = written {
        tracing::error!(bootcamp = %id, error = %e, "failed to store photo");
        return Err(ApiError::Internal("Problem with file upload".to_string()));
    }

    bootcamp.photo = file_name.clone();
    bootcamps.save_fields(&bootcamp, &["photo"]).await?;
    tracing::info!(bootcamp = %id, file = %file_name, bytes = data.len(), "uploaded photo");

    Ok(DataResponse::ok(json!(file_name)))
}
