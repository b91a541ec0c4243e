//! Shared harness for HTTP tests: an in-memory database, a suppressed
//! mailer whose outbox can be read, and a scratch static folder.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tavola_api::password::hash_password;
use tavola_api::services::email::{LogMailer, OutgoingEmail};
use tavola_api::{build_router, ApiConfig, AppState, SharedState};
use tavola_core::NewUser;
use tavola_db::{Database, DbConfig};

pub const PASSWORD: &str = "pa55word-long";

pub struct TestApp {
    pub router: Router,
    pub state: SharedState,
    pub outbox: Arc<LogMailer>,
    pub static_dir: PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        let static_dir =
            std::env::temp_dir().join(format!("tavola-http-{}", uuid::Uuid::new_v4().simple()));
        let config = ApiConfig::for_tests(&static_dir);
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let outbox = Arc::new(LogMailer::new());
        let state = Arc::new(AppState::new(db, config, outbox.clone()));

        TestApp {
            router: build_router(state.clone()),
            state,
            outbox,
            static_dir,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let authorization = token.map(|token| format!("Bearer {}", token));
        self.send(method, uri, authorization.as_deref(), body).await
    }

    /// Sends `authorization` as the raw header value.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(authorization) = authorization {
            builder = builder.header("authorization", authorization);
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Registers through the API and returns an access token.
    pub async fn register(&self, email: &str) -> String {
        let (status, _) = self
            .post(
                "/v1/users",
                None,
                json!({
                    "first_name": "Test",
                    "last_name": "User",
                    "email": email,
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(email).await
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post("/v1/auth/token", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access"].as_str().unwrap().to_string()
    }

    /// Administrators cannot self-register; seed one directly.
    pub async fn admin(&self) -> String {
        let email = "admin@tavola.test";
        let mut session = self.state.db.begin().await.unwrap();
        session
            .users()
            .create(
                &NewUser {
                    first_name: "Admin".to_string(),
                    last_name: "Tavola".to_string(),
                    email: email.to_string(),
                    password: PASSWORD.to_string(),
                    phone_number: None,
                    birth_date: None,
                },
                &hash_password(PASSWORD).unwrap(),
                true,
                false,
            )
            .await
            .unwrap();
        session.commit().await.unwrap();
        self.login(email).await
    }

    /// Creates a category and one product per `(name, price_cents)`.
    pub async fn menu(&self, admin: &str, items: &[(&str, i64)]) -> Vec<i64> {
        let (status, category) = self
            .post("/v1/admin/categories", Some(admin), json!({ "name": "Menu" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{category}");

        let mut ids = Vec::new();
        for (name, price_cents) in items {
            let (status, product) = self
                .post(
                    "/v1/admin/products",
                    Some(admin),
                    json!({
                        "name": name,
                        "summary": "",
                        "price_cents": price_cents,
                        "category_id": category["id"],
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{product}");
            ids.push(product["id"].as_i64().unwrap());
        }
        ids
    }

    /// Waits for background mail to land in the outbox.
    pub async fn wait_for_mail(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..50 {
            let outbox = self.outbox.outbox().await;
            if outbox.len() >= count {
                return outbox;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {count} emails");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.static_dir);
    }
}

pub fn address(street_number: i64) -> Value {
    json!({
        "city": "Milano",
        "street": "Corso Buenos Aires",
        "street_number": street_number,
        "postal_code": "20124",
    })
}
