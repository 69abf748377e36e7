use axum::Router;
use axum::routing::get;

use super::handlers::{
    create_review, delete_review, get_review, list_bootcamp_reviews, list_reviews, update_review,
};
use crate::server::{AppState, EntityDescriptor};

pub struct ReviewDescriptor;

impl EntityDescriptor for ReviewDescriptor {
    fn entity_type(&self) -> &str {
        "review"
    }

    fn build_routes(&self, state: AppState) -> Router {
        Router::new()
            .route("/reviews", get(list_reviews))
            .route(
                "/reviews/{id}",
                get(get_review).put(update_review).delete(delete_review),
            )
            .route(
                "/bootcamps/{id}/reviews",
                get(list_bootcamp_reviews).post(create_review),
            )
            .with_state(state)
    }
}
