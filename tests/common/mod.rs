//! Common test helpers for integration tests.
//!
//! Builds an in-memory application with a fixed anti-forgery key and drives
//! it through `tower::ServiceExt::oneshot`.
//!
//! # Note
//!
//! The `#![allow(dead_code)]` attribute is necessary because Rust compiles each
//! integration test file as a separate crate, and not every file uses every
//! helper.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use task_tracker::api::{AppConfig, AppState, CSRF_HEADER, router};
use task_tracker::domain::{NewTask, OwnerId, Priority, TaskItem, TaskStatus, Timestamp};
use task_tracker::infrastructure::{InMemoryTaskRepository, TaskRepository};

pub const PRINCIPAL_HEADER: &str = "x-authenticated-user";
pub const CSRF_SECRET: &str = "integration-test-secret";

// =============================================================================
// Application Setup
// =============================================================================

/// An application under test together with direct access to its store.
pub struct TestApp {
    pub state: AppState,
    pub repository: InMemoryTaskRepository,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_recent_limit(5)
    }

    pub fn with_recent_limit(recent_tasks_limit: usize) -> Self {
        let repository = InMemoryTaskRepository::new();
        let config = AppConfig {
            csrf_secret: Some(CSRF_SECRET.to_string()),
            recent_tasks_limit,
            ..AppConfig::default()
        };
        let state = AppState::new(Arc::new(repository.clone()), config).unwrap();
        Self { state, repository }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// The token the application expects from `owner`.
    pub fn csrf_token(&self, owner: &str) -> String {
        self.state.csrf.issue(&OwnerId::new(owner).unwrap())
    }

    pub async fn response(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    /// Sends a request and returns the status with the decoded JSON body
    /// (`Value::Null` for an empty body).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.response(request).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, owner: Option<&str>) -> (StatusCode, Value) {
        self.send(get_request(uri, owner)).await
    }

    /// Posts `body` as `owner` with a valid anti-forgery token.
    pub async fn post(&self, uri: &str, owner: &str, body: &Value) -> (StatusCode, Value) {
        let token = self.csrf_token(owner);
        self.send(post_request(uri, Some(owner), Some(&token), body))
            .await
    }

    /// Seeds a task directly into the store.
    pub async fn seed(&self, owner: &str, title: &str, due_date: NaiveDate) -> TaskItem {
        self.repository
            .insert(NewTask {
                title: title.to_string(),
                description: "Seeded for a test".to_string(),
                due_date,
                priority: Priority::Medium,
                status: TaskStatus::Pending,
                created_at: Timestamp::now(),
                owner_id: OwnerId::new(owner).unwrap(),
            })
            .await
            .unwrap()
    }

    pub async fn tasks_of(&self, owner: &str) -> Vec<TaskItem> {
        self.repository
            .list_owned(&OwnerId::new(owner).unwrap())
            .await
            .unwrap()
    }
}

// =============================================================================
// Request Builders
// =============================================================================

pub fn get_request(uri: &str, owner: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header(PRINCIPAL_HEADER, owner);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_request(
    uri: &str,
    owner: Option<&str>,
    token: Option<&str>,
    body: &Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(owner) = owner {
        builder = builder.header(PRINCIPAL_HEADER, owner);
    }
    if let Some(token) = token {
        builder = builder.header(CSRF_HEADER, token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
