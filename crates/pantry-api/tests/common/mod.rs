//! Shared harness: the real router over an in-memory database, driven with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use pantry_api::auth::issue_token;
use pantry_api::routes;
use pantry_api::state::{AppState, AppStateInner};
use pantry_db::Database;

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// A user that exists in the store plus a valid token for it.
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        let state = AppStateInner::new(db, SECRET, Duration::hours(1));
        let router = routes::router(state.clone());
        Self { state, router }
    }

    pub fn user(&self, email: &str) -> TestUser {
        let id = Uuid::new_v4();
        self.state
            .db
            .create_user(&id.to_string(), email, "not-a-real-hash")
            .expect("create user");
        let token = issue_token(SECRET, id, email, Duration::hours(1)).expect("issue token");
        TestUser { id, token }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(&user.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&user.token), None).await
    }
}

pub fn recipe_url(id: i64) -> String {
    format!("/recipes/{}", id)
}

pub fn tag_url(id: i64) -> String {
    format!("/tags/{}", id)
}
