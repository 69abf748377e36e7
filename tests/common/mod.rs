//! Shared fixtures for the HTTP integration tests
//!
//! Every test builds its own application over a fresh in-memory store, so
//! tests never observe each other's records.

#![allow(dead_code)]

pub use axum::http::StatusCode;
use axum_test::TestServer;
use devcamper::core::geo::ZipcodeEntry;
use devcamper::core::mailer::RecordingMailer;
use devcamper::core::password::hash_password;
use devcamper::prelude::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;

pub const API: &str = "/api/v1";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub mailer: RecordingMailer,
}

pub fn zipcodes() -> HashMap<String, ZipcodeEntry> {
    let entry = |latitude, longitude, city: &str, state: &str| ZipcodeEntry {
        latitude,
        longitude,
        city: Some(city.to_string()),
        state: Some(state.to_string()),
        country: Some("US".to_string()),
    };
    HashMap::from([
        ("02118".to_string(), entry(42.3389, -71.0720, "Boston", "MA")),
        ("01803".to_string(), entry(42.5047, -71.1956, "Burlington", "MA")),
        ("90210".to_string(), entry(34.0901, -118.4065, "Beverly Hills", "CA")),
    ])
}

pub fn test_config(upload_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.request_logging = false;
    config.auth.jwt_secret = "integration-secret".to_string();
    config.upload.file_upload_path = upload_dir.to_path_buf();
    config.upload.max_file_upload = 1024;
    config.geocoder.zipcodes = zipcodes();
    config
}

pub fn build_state(config: AppConfig) -> (AppState, RecordingMailer) {
    let mailer = RecordingMailer::new();
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
    let state = AppState::new(store, config).with_mailer(mailer.clone());
    (state, mailer)
}

pub async fn spawn_with(state: AppState, mailer: RecordingMailer) -> TestApp {
    ensure_indexes(&state).await.unwrap();
    let router = register_resources(ServerBuilder::new(state.clone())).build();
    TestApp {
        server: TestServer::new(router),
        state,
        mailer,
    }
}

pub async fn spawn() -> TestApp {
    let (state, mailer) = build_state(test_config(&std::env::temp_dir()));
    spawn_with(state, mailer).await
}

pub fn url(path: &str) -> String {
    format!("{}{}", API, path)
}

impl TestApp {
    /// Register through the API and return the session token
    pub async fn register(&self, name: &str, email: &str, role: &str) -> String {
        let response = self
            .server
            .post(&url("/auth/register"))
            .json(&json!({ "name": name, "email": email, "password": "123456", "role": role }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Admins cannot register, so they are written to the store directly
    pub async fn admin_token(&self) -> String {
        let admin = self
            .state
            .service::<User>()
            .create(User::new(
                "Admin".into(),
                "admin@devcamper.io".into(),
                Role::Admin,
                hash_password("123456").unwrap(),
            ))
            .await
            .unwrap();
        self.state.tokens.issue(&admin.id).unwrap()
    }

    pub async fn create_bootcamp(&self, token: &str, name: &str, address: &str) -> Value {
        let response = self
            .server
            .post(&url("/bootcamps"))
            .authorization_bearer(token)
            .json(&json!({
                "name": name,
                "description": format!("{} teaches full stack development", name),
                "website": "https://devcamper.io",
                "address": address,
                "careers": ["Web Development", "UI/UX"],
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    pub async fn create_course(&self, token: &str, bootcamp_id: &str, title: &str, tuition: f64) -> Value {
        let response = self
            .server
            .post(&url(&format!("/bootcamps/{}/courses", bootcamp_id)))
            .authorization_bearer(token)
            .json(&json!({
                "title": title,
                "description": "Hands-on projects",
                "weeks": "8",
                "tuition": tuition,
                "minimumSkill": "beginner",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    pub async fn create_review(&self, token: &str, bootcamp_id: &str, rating: i64) -> Value {
        let response = self
            .server
            .post(&url(&format!("/bootcamps/{}/reviews", bootcamp_id)))
            .authorization_bearer(token)
            .json(&json!({ "title": "Worth it", "text": "Learned a lot", "rating": rating }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    pub async fn get_json(&self, path: &str) -> Value {
        let response = self.server.get(&url(path)).await;
        response.assert_status_ok();
        response.json()
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}
