//! Registration, sessions, password management and admin user routes

mod common;

use axum::http::HeaderValue;
use axum::http::header::{COOKIE, SET_COOKIE};
use common::*;
use devcamper::core::mailer::{Email, Mailer, RecordingMailer};
use devcamper::prelude::*;
use serde_json::{Value, json};

async fn login(app: &TestApp, email: &str, password: &str) -> axum_test::TestResponse {
    app.server
        .post(&url("/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .await
}

fn set_cookie(response: &axum_test::TestResponse) -> String {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_register_sets_session_cookie() {
    let app = spawn().await;
    let response = app
        .server
        .post(&url("/auth/register"))
        .json(&json!({
            "name": "John Doe",
            "email": "john@gmail.com",
            "password": "123456",
            "role": "publisher",
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    let token = body["token"].as_str().unwrap();
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with(&format!("token={}", token)));
    assert!(cookie.contains("HttpOnly"));

    let me = app
        .server
        .get(&url("/auth/me"))
        .authorization_bearer(token)
        .await;
    me.assert_status_ok();
    let user = &me.json::<Value>()["data"];
    assert_eq!(user["email"], "john@gmail.com");
    assert_eq!(user["role"], "publisher");
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn test_register_rejections() {
    let app = spawn().await;

    let admin = app
        .server
        .post(&url("/auth/register"))
        .json(&json!({ "name": "Root", "email": "root@x.io", "password": "123456", "role": "admin" }))
        .await;
    admin.assert_status(StatusCode::BAD_REQUEST);

    let short = app
        .server
        .post(&url("/auth/register"))
        .json(&json!({ "name": "Short", "email": "short@x.io", "password": "123" }))
        .await;
    short.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        short.json::<Value>()["error"],
        "Password must be at least 6 characters"
    );

    let invalid_email = app
        .server
        .post(&url("/auth/register"))
        .json(&json!({ "name": "Bad", "email": "not-an-email", "password": "123456" }))
        .await;
    invalid_email.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(invalid_email.json::<Value>()["error"], "Please add a valid email");

    app.register("First", "same@x.io", "user").await;
    let duplicate = app
        .server
        .post(&url("/auth/register"))
        .json(&json!({ "name": "Second", "email": "same@x.io", "password": "123456" }))
        .await;
    duplicate.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json::<Value>()["error"], "Duplicate field value entered");
}

#[tokio::test]
async fn test_login() {
    let app = spawn().await;
    app.register("Jane", "jane@x.io", "user").await;

    let ok = login(&app, "jane@x.io", "123456").await;
    ok.assert_status_ok();
    assert!(ok.json::<Value>()["token"].as_str().is_some());

    let wrong = login(&app, "jane@x.io", "654321").await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>()["error"], "Invalid credentials");

    let unknown = login(&app, "nobody@x.io", "123456").await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.json::<Value>()["error"], "Invalid credentials");

    let missing = app
        .server
        .post(&url("/auth/login"))
        .json(&json!({ "email": "jane@x.io" }))
        .await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        missing.json::<Value>()["error"],
        "Please provide an email and password"
    );
}

#[tokio::test]
async fn test_cookie_session_and_logout() {
    let app = spawn().await;
    let token = app.register("Jane", "jane@x.io", "user").await;
    let cookie = HeaderValue::from_str(&format!("token={}", token)).unwrap();

    app.server
        .get(&url("/auth/me"))
        .add_header(COOKIE, cookie)
        .await
        .assert_status_ok();

    let logout = app.server.get(&url("/auth/logout")).await;
    logout.assert_status_ok();
    assert_eq!(logout.json::<Value>(), json!({ "success": true, "data": {} }));
    assert!(set_cookie(&logout).starts_with("token=none"));

    app.server
        .get(&url("/auth/me"))
        .add_header(COOKIE, HeaderValue::from_static("token=none"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_valid_token() {
    let app = spawn().await;

    let missing = app.server.get(&url("/auth/me")).await;
    missing.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        missing.json::<Value>()["error"],
        "Not authorized to access this route"
    );

    app.server
        .get(&url("/auth/me"))
        .authorization_bearer("not.a.jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_details_only_touches_name_and_email() {
    let app = spawn().await;
    let token = app.register("Jane", "jane@x.io", "user").await;

    let response = app
        .server
        .put(&url("/auth/updatedetails"))
        .authorization_bearer(&token)
        .json(&json!({ "name": "Jane Roe", "email": "roe@x.io", "role": "admin" }))
        .await;
    response.assert_status_ok();

    let user = &response.json::<Value>()["data"];
    assert_eq!(user["name"], "Jane Roe");
    assert_eq!(user["email"], "roe@x.io");
    assert_eq!(user["role"], "user");
}

#[tokio::test]
async fn test_update_password() {
    let app = spawn().await;
    let token = app.register("Jane", "jane@x.io", "user").await;

    let wrong = app
        .server
        .put(&url("/auth/updatepassword"))
        .authorization_bearer(&token)
        .json(&json!({ "currentPassword": "nope", "newPassword": "abcdef" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>()["error"], "Password is incorrect");

    app.server
        .put(&url("/auth/updatepassword"))
        .authorization_bearer(&token)
        .json(&json!({ "currentPassword": "123456", "newPassword": "abcdef" }))
        .await
        .assert_status_ok();

    login(&app, "jane@x.io", "123456")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    login(&app, "jane@x.io", "abcdef").await.assert_status_ok();
}

fn reset_token(email: &Email) -> String {
    email
        .body
        .rsplit("/auth/resetpassword/")
        .next()
        .unwrap()
        .trim()
        .to_string()
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let app = spawn().await;
    app.register("Jane", "jane@x.io", "user").await;

    let unknown = app
        .server
        .post(&url("/auth/forgotpassword"))
        .json(&json!({ "email": "nobody@x.io" }))
        .await;
    unknown.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(unknown.json::<Value>()["error"], "There is no user with that email");

    let forgot = app
        .server
        .post(&url("/auth/forgotpassword"))
        .json(&json!({ "email": "jane@x.io" }))
        .await;
    forgot.assert_status_ok();
    assert_eq!(forgot.json::<Value>()["data"], "Email sent");

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@x.io");
    assert!(sent[0].body.contains("/api/v1/auth/resetpassword/"));
    let token = reset_token(&sent[0]);

    app.server
        .put(&url("/auth/resetpassword/not-the-token"))
        .json(&json!({ "password": "newpass" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let reset = app
        .server
        .put(&url(&format!("/auth/resetpassword/{}", token)))
        .json(&json!({ "password": "newpass" }))
        .await;
    reset.assert_status_ok();
    assert!(reset.json::<Value>()["token"].as_str().is_some());
    login(&app, "jane@x.io", "newpass").await.assert_status_ok();

    let reused = app
        .server
        .put(&url(&format!("/auth/resetpassword/{}", token)))
        .json(&json!({ "password": "another" }))
        .await;
    reused.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(reused.json::<Value>()["error"], "Invalid token");
}

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: Email) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("smtp unavailable"))
    }
}

#[tokio::test]
async fn test_failed_email_clears_reset_token() {
    let (state, _) = build_state(test_config(&std::env::temp_dir()));
    let app = spawn_with(state.with_mailer(FailingMailer), RecordingMailer::new()).await;
    app.register("Jane", "jane@x.io", "user").await;

    let response = app
        .server
        .post(&url("/auth/forgotpassword"))
        .json(&json!({ "email": "jane@x.io" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["error"], "Email could not be sent");

    let users = app
        .state
        .service::<User>()
        .find_where(FilterExpression::new().with_eq("email", "jane@x.io"))
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].reset_password_token.is_none());
    assert!(users[0].reset_password_expire.is_none());
}

#[tokio::test]
async fn test_user_management_is_admin_only() {
    let app = spawn().await;
    let user = app.register("Jane", "jane@x.io", "user").await;
    let admin = app.admin_token().await;

    let forbidden = app
        .server
        .get(&url("/users"))
        .authorization_bearer(&user)
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(
        forbidden.json::<Value>()["error"],
        "User role user is not authorized to access this route"
    );

    let listing = app
        .server
        .get(&url("/users"))
        .authorization_bearer(&admin)
        .await;
    listing.assert_status_ok();
    let body: Value = listing.json();
    assert_eq!(body["count"], 2);
    for user in body["data"].as_array().unwrap() {
        assert!(user.get("password").is_none());
    }

    let created = app
        .server
        .post(&url("/users"))
        .authorization_bearer(&admin)
        .json(&json!({ "name": "Made", "email": "made@x.io", "password": "123456", "role": "publisher" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let created_id = id_of(&created.json::<Value>()["data"]);
    login(&app, "made@x.io", "123456").await.assert_status_ok();

    let updated = app
        .server
        .put(&url(&format!("/users/{}", created_id)))
        .authorization_bearer(&admin)
        .json(&json!({ "name": "Renamed" }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["data"]["name"], "Renamed");

    app.server
        .get(&url(&format!("/users/{}", created_id)))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_deleted_user_token_is_rejected() {
    let app = spawn().await;
    let token = app.register("Jane", "jane@x.io", "user").await;
    let admin = app.admin_token().await;

    let me = app
        .server
        .get(&url("/auth/me"))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    let id = id_of(&me["data"]);

    app.server
        .delete(&url(&format!("/users/{}", id)))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();

    app.server
        .get(&url("/auth/me"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
