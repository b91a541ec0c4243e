//! Accounts, tokens and address books through the HTTP API.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{address, TestApp, PASSWORD};

#[tokio::test]
async fn test_register_and_duplicate_email() {
    let app = TestApp::new().await;

    let payload = json!({
        "first_name": "Sofia",
        "last_name": "Russo",
        "email": "sofia@example.com",
        "password": PASSWORD,
        "phone_number": "+39 333 1234567",
    });

    let (status, body) = app.post("/v1/users", None, payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], "sofia@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["delivery_address"].is_null());

    let (status, body) = app.post("/v1/users", None, payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"]["message"],
        "User with email 'sofia@example.com' already exists."
    );
}

#[tokio::test]
async fn test_invalid_payload_lists_fields() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/v1/users",
            None,
            json!({
                "first_name": "",
                "last_name": "Russo",
                "email": "not-an-email",
                "password": "short",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let fields: Vec<&str> = body["detail"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["first_name", "email", "password"]);

    let (status, body) = app.post("/v1/users", None, json!({ "email": 3 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["errors"][0]["field"], "body");
}

#[tokio::test]
async fn test_bad_tokens_rejected_uniformly() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/v1/me", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"]["message"], "Not authenticated.");

    for token in ["garbage", "a.b.c", "eyJhbGciOiJIUzI1NiJ9.e30.x"] {
        let (status, body) = app.get("/v1/me", Some(token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"]["message"], "Token is not valid.");
    }

    // A well-signed token for a user that no longer exists.
    let ghost = app.state.tokens.access_token(4242).unwrap();
    let (status, body) = app.get("/v1/me", Some(&ghost)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"]["message"], "Token is not valid.");
}

#[tokio::test]
async fn test_bearer_scheme_any_case() {
    let app = TestApp::new().await;
    let token = app.register("casual@example.com").await;

    for scheme in ["bearer", "BEARER", "Bearer"] {
        let header = format!("{} {}", scheme, token);
        let (status, body) = app.send(Method::GET, "/v1/me", Some(&header), None).await;
        assert_eq!(status, StatusCode::OK, "{scheme}");
        assert_eq!(body["user"]["email"], "casual@example.com");
    }

    let header = format!("Basic {}", token);
    let (status, body) = app.send(Method::GET, "/v1/me", Some(&header), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"]["message"], "Not authenticated.");
}

#[tokio::test]
async fn test_login_errors() {
    let app = TestApp::new().await;
    app.register("marta@example.com").await;

    let (status, body) = app
        .post(
            "/v1/auth/token",
            None,
            json!({ "email": "nobody@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["detail"]["message"],
        "User with email 'nobody@example.com' was not found."
    );

    let (status, body) = app
        .post(
            "/v1/auth/token",
            None,
            json!({ "email": "marta@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"]["message"], "Incorrect email or password.");
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let app = TestApp::new().await;
    app.register("refresh@example.com").await;

    let (_, tokens) = app
        .post(
            "/v1/auth/token",
            None,
            json!({ "email": "refresh@example.com", "password": PASSWORD }),
        )
        .await;

    let (status, body) = app
        .post("/v1/auth/refresh", None, json!({ "refresh": tokens["refresh"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access"].as_str().unwrap();

    let (status, me) = app.get("/v1/me", Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], "refresh@example.com");

    let (status, body) = app
        .post("/v1/auth/refresh", None, json!({ "refresh": "nope" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"]["message"], "Refresh token is invalid");

    let orphan = app.state.tokens.refresh_token(9999).unwrap();
    let (status, body) = app
        .post("/v1/auth/refresh", None, json!({ "refresh": orphan }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"]["message"], "User with id from payload was not found.");
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new().await;
    app.register("forgetful@example.com").await;

    let (status, body) = app
        .post("/v1/users/password", None, json!({ "email": "unknown@example.com" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["detail"]["message"],
        "User with email 'unknown@example.com' does not exist."
    );

    let (status, _) = app
        .post("/v1/users/password", None, json!({ "email": "forgetful@example.com" }))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let mail = app.wait_for_mail(1).await;
    assert_eq!(mail[0].to, "forgetful@example.com");
    let token = mail[0]
        .body
        .lines()
        .map(str::trim)
        .find(|line| line.split('.').count() == 3 && !line.contains(' '))
        .unwrap()
        .to_string();

    let (status, body) = app
        .patch(
            "/v1/users/password",
            None,
            json!({ "token": "garbage", "password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"]["message"], "The provided token is not valid.");

    let (status, _) = app
        .patch(
            "/v1/users/password",
            None,
            json!({ "token": token, "password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .post(
            "/v1/auth/token",
            None,
            json!({ "email": "forgetful@example.com", "password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_me_rejects_taken_email() {
    let app = TestApp::new().await;
    app.register("first@example.com").await;
    let second = app.register("second@example.com").await;

    let (status, body) = app
        .patch("/v1/me", Some(&second), json!({ "email": "first@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"]["message"],
        "User with email 'first@example.com' already exists."
    );

    let (status, body) = app
        .patch("/v1/me", Some(&second), json!({ "last_name": "Esposito" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["last_name"], "Esposito");
    assert_eq!(body["user"]["email"], "second@example.com");
}

#[tokio::test]
async fn test_address_book() {
    let app = TestApp::new().await;
    let user = app.register("addresses@example.com").await;

    let (status, first) = app.post("/v1/me/addresses", Some(&user), address(3)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, again) = app.post("/v1/me/addresses", Some(&user), address(3)).await;
    assert_eq!(first["delivery_address"]["id"], again["delivery_address"]["id"]);

    let (_, second) = app.post("/v1/me/addresses", Some(&user), address(4)).await;
    let (_, me) = app.get("/v1/me", Some(&user)).await;
    assert_eq!(me["delivery_address"]["id"], second["delivery_address"]["id"]);

    let id = first["delivery_address"]["id"].as_i64().unwrap();
    let (status, body) = app
        .patch(
            &format!("/v1/me/addresses/{}", id),
            Some(&user),
            json!({ "city": "Torino" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivery_address"]["city"], "Torino");
    assert_eq!(body["delivery_address"]["street_number"], 3);

    let (status, body) = app
        .patch("/v1/me/addresses/777", Some(&user), json!({ "city": "Roma" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"]["message"], "Address with id '777' does not exist.");

    let (status, _) = app.delete(&format!("/v1/me/addresses/{}", id), Some(&user)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.delete(&format!("/v1/me/addresses/{}", id), Some(&user)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app.get("/v1/me/addresses", Some(&user)).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}
