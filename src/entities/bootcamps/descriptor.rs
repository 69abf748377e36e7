use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};

use super::handlers::{
    bootcamps_in_radius, create_bootcamp, delete_bootcamp, get_bootcamp, list_bootcamps,
    update_bootcamp, upload_photo,
};
use crate::server::{AppState, EntityDescriptor};

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 16 * 1024;

pub struct BootcampDescriptor;

impl EntityDescriptor for BootcampDescriptor {
    fn entity_type(&self) -> &str {
        "bootcamp"
    }

    fn build_routes(&self, state: AppState) -> Router {
        let photo_limit = state
            .config
            .upload
            .max_file_upload
            .saturating_add(MULTIPART_OVERHEAD);

        Router::new()
            .route("/bootcamps", get(list_bootcamps).post(create_bootcamp))
            .route(
                "/bootcamps/{id}",
                get(get_bootcamp)
                    .put(update_bootcamp)
                    .delete(delete_bootcamp),
            )
            .route(
                "/bootcamps/radius/{zipcode}/{distance}",
                get(bootcamps_in_radius),
            )
            .route(
                "/bootcamps/{id}/photo",
                put(upload_photo).layer(DefaultBodyLimit::max(photo_limit)),
            )
            .with_state(state)
    }
}
