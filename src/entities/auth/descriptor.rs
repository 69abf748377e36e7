use axum::Router;
use axum::routing::{get, post, put};

use super::handlers::{
    forgot_password, get_me, login, logout, register, reset_password, update_details,
    update_password,
};
use crate::server::{AppState, EntityDescriptor};

/// Session and account routes under `/auth`
pub struct AuthDescriptor;

impl EntityDescriptor for AuthDescriptor {
    fn entity_type(&self) -> &str {
        "auth"
    }

    fn build_routes(&self, state: AppState) -> Router {
        Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/logout", get(logout))
            .route("/auth/me", get(get_me))
            .route("/auth/updatedetails", put(update_details))
            .route("/auth/updatepassword", put(update_password))
            .route("/auth/forgotpassword", post(forgot_password))
            .route("/auth/resetpassword/{token}", put(reset_password))
            .with_state(state)
    }
}
