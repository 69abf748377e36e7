use axum::Router;
use axum::routing::get;

use super::handlers::{
    create_course, delete_course, get_course, list_bootcamp_courses, list_courses, update_course,
};
use crate::server::{AppState, EntityDescriptor};

pub struct CourseDescriptor;

impl EntityDescriptor for CourseDescriptor {
    fn entity_type(&self) -> &str {
        "course"
    }

    fn build_routes(&self, state: AppState) -> Router {
        Router::new()
            .route("/courses", get(list_courses))
            .route(
                "/courses/{id}",
                get(get_course).put(update_course).delete(delete_course),
            )
            .route(
                "/bootcamps/{id}/courses",
                get(list_bootcamp_courses).post(create_course),
            )
            .with_state(state)
    }
}
