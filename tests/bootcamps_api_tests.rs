//! Bootcamp routes: ownership, validation, cascade delete, radius search and
//! photo upload

mod common;

use axum_test::multipart::{MultipartForm, Part};
use common::*;
use serde_json::{Value, json};
use uuid::Uuid;

#[tokio::test]
async fn test_create_requires_publisher_role() {
    let app = spawn().await;

    let anonymous = app
        .server
        .post(&url("/bootcamps"))
        .json(&json!({ "name": "Nope" }))
        .await;
    anonymous.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        anonymous.json::<Value>()["error"],
        "Not authorized to access this route"
    );

    let user = app.register("Student", "student@devcamper.io", "user").await;
    let forbidden = app
        .server
        .post(&url("/bootcamps"))
        .authorization_bearer(&user)
        .json(&json!({ "name": "Nope" }))
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(
        forbidden.json::<Value>()["error"],
        "User role user is not authorized to access this route"
    );

    let body = app.get_json("/bootcamps").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_create_geocodes_and_slugs() {
    let app = spawn().await;
    let token = app.register("Publisher", "pub@devcamper.io", "publisher").await;

    let bootcamp = app
        .create_bootcamp(&token, "Devworks Bootcamp", "233 Bay State Rd, Boston MA 02118")
        .await;

    assert_eq!(bootcamp["slug"], "devworks-bootcamp");
    assert_eq!(bootcamp["photo"], "no-photo.jpg");
    assert_eq!(bootcamp["housing"], false);
    assert!(bootcamp.get("address").is_none());
    assert_eq!(bootcamp["location"]["type"], "Point");
    assert_eq!(bootcamp["location"]["zipcode"], "02118");
    assert_eq!(bootcamp["location"]["street"], "233 Bay State Rd");
    assert_eq!(bootcamp["location"]["coordinates"], json!([-71.0720, 42.3389]));
}

#[tokio::test]
async fn test_publisher_may_publish_one_bootcamp() {
    let app = spawn().await;
    let token = app.register("Publisher", "pub@devcamper.io", "publisher").await;
    app.create_bootcamp(&token, "First Camp", "Boston 02118").await;

    let response = app
        .server
        .post(&url("/bootcamps"))
        .authorization_bearer(&token)
        .json(&json!({
            "name": "Second Camp",
            "description": "More",
            "address": "Boston 02118",
            "careers": ["Business"],
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error = response.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(error.ends_with("has already published a bootcamp"));

    let admin = app.admin_token().await;
    app.create_bootcamp(&admin, "Admin Camp One", "Boston 02118").await;
    app.create_bootcamp(&admin, "Admin Camp Two", "Boston 02118").await;
}

#[tokio::test]
async fn test_validation_errors() {
    let app = spawn().await;
    let token = app.register("Publisher", "pub@devcamper.io", "publisher").await;

    let response = app
        .server
        .post(&url("/bootcamps"))
        .authorization_bearer(&token)
        .json(&json!({ "address": "Boston 02118", "website": "devworks" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    let messages: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap())
        .collect();
    assert!(messages.contains(&"Please add a name"));
    assert!(messages.contains(&"Please add a description"));
    assert!(messages.contains(&"Please use a valid URL with HTTP or HTTPS"));

    let missing_address = app
        .server
        .post(&url("/bootcamps"))
        .authorization_bearer(&token)
        .json(&json!({ "name": "Camp", "description": "d", "careers": ["Other"] }))
        .await;
    missing_address.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(missing_address.json::<Value>()["error"], "Please add an address");
}

#[tokio::test]
async fn test_duplicate_name() {
    let app = spawn().await;
    let admin = app.admin_token().await;
    app.create_bootcamp(&admin, "Same Name", "Boston 02118").await;

    let response = app
        .server
        .post(&url("/bootcamps"))
        .authorization_bearer(&admin)
        .json(&json!({
            "name": "Same Name",
            "description": "again",
            "address": "Boston 02118",
            "careers": ["Other"],
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Duplicate field value entered");
}

#[tokio::test]
async fn test_get_unknown_and_malformed_ids() {
    let app = spawn().await;
    let id = Uuid::new_v4().to_string();

    let unknown = app.server.get(&url(&format!("/bootcamps/{}", id))).await;
    unknown.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        unknown.json::<Value>()["error"],
        format!("Bootcamp not found with id of {}", id)
    );

    let malformed = app.server.get(&url("/bootcamps/123")).await;
    malformed.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        malformed.json::<Value>()["error"],
        "Resource not found with id of 123"
    );
}

#[tokio::test]
async fn test_only_owner_may_update() {
    let app = spawn().await;
    let owner = app.register("Owner", "owner@devcamper.io", "publisher").await;
    let other = app.register("Other", "other@devcamper.io", "publisher").await;
    let bootcamp = app.create_bootcamp(&owner, "Owned Camp", "Boston 02118").await;
    let path = url(&format!("/bootcamps/{}", id_of(&bootcamp)));

    let forbidden = app
        .server
        .put(&path)
        .authorization_bearer(&other)
        .json(&json!({ "name": "Hijacked" }))
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);
    let current = app.server.get(&path).await.json::<Value>();
    assert_eq!(current["data"]["name"], "Owned Camp");

    let updated = app
        .server
        .put(&path)
        .authorization_bearer(&owner)
        .json(&json!({ "name": "Renamed Camp", "housing": true, "user": "someone-else" }))
        .await;
    updated.assert_status_ok();
    let data = &updated.json::<Value>()["data"];
    assert_eq!(data["slug"], "renamed-camp");
    assert_eq!(data["housing"], true);
    assert_eq!(data["user"], bootcamp["user"]);
}

#[tokio::test]
async fn test_delete_cascades() {
    let app = spawn().await;
    let owner = app.register("Owner", "owner@devcamper.io", "publisher").await;
    let student = app.register("Student", "student@devcamper.io", "user").await;
    let bootcamp_id = id_of(&app.create_bootcamp(&owner, "Doomed Camp", "Boston 02118").await);
    let course = app.create_course(&owner, &bootcamp_id, "Doomed Course", 1000.0).await;
    let review = app.create_review(&student, &bootcamp_id, 8).await;

    let path = url(&format!("/bootcamps/{}", bootcamp_id));
    app.server
        .delete(&path)
        .authorization_bearer(&student)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let deleted = app.server.delete(&path).authorization_bearer(&owner).await;
    deleted.assert_status_ok();
    assert_eq!(deleted.json::<Value>(), json!({ "success": true, "data": {} }));

    app.server
        .get(&path)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get(&url(&format!("/courses/{}", id_of(&course))))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get(&url(&format!("/reviews/{}", id_of(&review))))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_radius_search() {
    let app = spawn().await;
    let boston = app.register("Boston", "boston@devcamper.io", "publisher").await;
    let burlington = app.register("Burl", "burl@devcamper.io", "publisher").await;
    let la = app.register("LA", "la@devcamper.io", "publisher").await;
    app.create_bootcamp(&boston, "Boston Camp", "Boston MA 02118").await;
    app.create_bootcamp(&burlington, "Burlington Camp", "Burlington MA 01803").await;
    app.create_bootcamp(&la, "LA Camp", "Beverly Hills CA 90210").await;

    let near = app.get_json("/bootcamps/radius/02118/5").await;
    assert_eq!(near["count"], 1);
    assert_eq!(near["data"][0]["name"], "Boston Camp");

    let region = app.get_json("/bootcamps/radius/02118/50").await;
    assert_eq!(region["count"], 2);

    let everywhere = app.get_json("/bootcamps/radius/02118/5000").await;
    assert_eq!(everywhere["count"], 3);

    app.server
        .get(&url("/bootcamps/radius/99999/10"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get(&url("/bootcamps/radius/02118/far"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

mod photo_upload {
    use super::*;

    async fn app_with_uploads() -> (TestApp, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (state, mailer) = build_state(test_config(dir.path()));
        (spawn_with(state, mailer).await, dir)
    }

    fn image(bytes: usize, mime: &str) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(vec![7u8; bytes])
                .file_name("campus.png")
                .mime_type(mime),
        )
    }

    #[tokio::test]
    async fn test_upload_stores_file() {
        let (app, dir) = app_with_uploads().await;
        let token = app.register("Owner", "owner@devcamper.io", "publisher").await;
        let bootcamp_id = id_of(&app.create_bootcamp(&token, "Photo Camp", "Boston 02118").await);

        let response = app
            .server
            .put(&url(&format!("/bootcamps/{}/photo", bootcamp_id)))
            .authorization_bearer(&token)
            .multipart(image(512, "image/png"))
            .await;
        response.assert_status_ok();

        let expected = format!("photo_{}.png", bootcamp_id);
        assert_eq!(response.json::<Value>()["data"], expected.as_str());
        assert_eq!(std::fs::read(dir.path().join(&expected)).unwrap().len(), 512);

        let bootcamp = app.get_json(&format!("/bootcamps/{}", bootcamp_id)).await;
        assert_eq!(bootcamp["data"]["photo"], expected.as_str());
    }

    #[tokio::test]
    async fn test_rejects_non_images_and_large_files() {
        let (app, _dir) = app_with_uploads().await;
        let token = app.register("Owner", "owner@devcamper.io", "publisher").await;
        let bootcamp_id = id_of(&app.create_bootcamp(&token, "Photo Camp", "Boston 02118").await);
        let path = url(&format!("/bootcamps/{}/photo", bootcamp_id));

        let text = app
            .server
            .put(&path)
            .authorization_bearer(&token)
            .multipart(image(10, "text/plain"))
            .await;
        text.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(text.json::<Value>()["error"], "Please upload an image file");

        let large = app
            .server
            .put(&path)
            .authorization_bearer(&token)
            .multipart(image(4096, "image/png"))
            .await;
        large.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(large.json::<Value>()["error"], "Please upload an image less than 1024");

        let missing = app
            .server
            .put(&path)
            .authorization_bearer(&token)
            .json(&json!({}))
            .await;
        missing.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(missing.json::<Value>()["error"], "Please upload a file");
    }

    #[tokio::test]
    async fn test_only_owner_may_upload() {
        let (app, _dir) = app_with_uploads().await;
        let owner = app.register("Owner", "owner@devcamper.io", "publisher").await;
        let other = app.register("Other", "other@devcamper.io", "publisher").await;
        let bootcamp_id = id_of(&app.create_bootcamp(&owner, "Photo Camp", "Boston 02118").await);

        app.server
            .put(&url(&format!("/bootcamps/{}/photo", bootcamp_id)))
            .authorization_bearer(&other)
            .multipart(image(16, "image/png"))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}

mod geocoding {
    use super::*;
    use devcamper::prelude::*;

    struct NowhereGeocoder;

    #[async_trait]
    impl Geocoder for NowhereGeocoder {
        async fn geocode(&self, _address: &str) -> Option<Location> {
            None
        }

        async fn geocode_zipcode(&self, _zipcode: &str) -> Option<Location> {
            None
        }
    }

    #[tokio::test]
    async fn test_unresolved_address_is_kept() {
        let (state, mailer) = build_state(test_config(&std::env::temp_dir()));
        let app = spawn_with(state.with_geocoder(NowhereGeocoder), mailer).await;
        let token = app.register("Owner", "owner@devcamper.io", "publisher").await;

        let bootcamp = app.create_bootcamp(&token, "Lost Camp", "Atlantis").await;
        assert_eq!(bootcamp["address"], "Atlantis");
        assert!(bootcamp.get("location").is_none_or(Value::is_null));

        let radius = app.server.get(&url("/bootcamps/radius/02118/10")).await;
        radius.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            radius.json::<Value>()["error"],
            "Location not found with id of 02118"
        );
    }
}
