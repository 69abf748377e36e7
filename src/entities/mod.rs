//! The DevCamper resources
//!
//! Each resource module follows the same layout: `model` (the stored
//! entity), `handlers` (axum handlers) and `descriptor` (its routes).

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod users;

pub use bootcamps::Bootcamp;
pub use courses::Course;
pub use reviews::Review;
pub use users::User;

use crate::core::error::ApiError;
use crate::core::store::Document;
use crate::server::{AppState, ServerBuilder};

/// Register the routes of every resource
pub fn register_resources(builder: ServerBuilder) -> ServerBuilder {
    builder
        .register(auth::AuthDescriptor)
        .register(bootcamps::BootcampDescriptor)
        .register(courses::CourseDescriptor)
        .register(reviews::ReviewDescriptor)
        .register(users::UserDescriptor)
}

/// Declare the unique indexes of every collection
pub async fn ensure_indexes(state: &AppState) -> Result<(), ApiError> {
    state.service::<Bootcamp>().ensure_indexes().await?;
    state.service::<Course>().ensure_indexes().await?;
    state.service::<Review>().ensure_indexes().await?;
    state.service::<User>().ensure_indexes().await?;
    Ok(())
}

/// A string field of a request body
pub fn string_field(body: &Document, key: &str) -> Option<String> {
    body.get(key).and_then(|v| v.as_str()).map(str::to_string)
}
