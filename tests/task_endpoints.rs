//! Integration tests for the task endpoints.
//!
//! Requests go through the full router, so principal resolution, the
//! anti-forgery check and body extraction are exercised together with the
//! handlers.

mod common;

use axum::http::{StatusCode, header};
use rstest::rstest;
use serde_json::{Value, json};

use common::{TestApp, date, get_request, post_request};
use task_tracker::domain::{Priority, TaskStatus};

fn valid_body() -> Value {
    json!({
        "title": "Buy milk",
        "description": "2% milk, 1 gallon",
        "due_date": "2024-01-01",
        "priority": "High"
    })
}

// =============================================================================
// Authentication and Forgery Protection
// =============================================================================

#[rstest]
#[case("/tasks")]
#[case("/tasks/create")]
#[case("/tasks/details/1")]
#[case("/tasks/edit/1")]
#[case("/tasks/delete/1")]
#[tokio::test]
async fn test_anonymous_get_is_challenged(#[case] uri: &str) {
    let app = TestApp::new();

    let response = app.response(get_request(uri, None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[rstest]
#[case("/tasks/create")]
#[case("/tasks/edit/1")]
#[case("/tasks/delete/1")]
#[case("/tasks/toggle-status/1")]
#[tokio::test]
async fn test_anonymous_post_is_challenged(#[case] uri: &str) {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_request(uri, None, None, &valid_body()))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTHENTICATION_REQUIRED");
}

#[rstest]
#[case(None)]
#[case(Some("deadbeef"))]
#[tokio::test]
async fn test_post_without_valid_token_is_forbidden(#[case] token: Option<&str>) {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_request(
            "/tasks/create",
            Some("alice"),
            token,
            &valid_body(),
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "CSRF_TOKEN_INVALID");
    assert!(app.tasks_of("alice").await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_token_of_another_principal_is_forbidden() {
    let app = TestApp::new();
    let token = app.csrf_token("bob");

    let (status, _) = app
        .send(post_request(
            "/tasks/create",
            Some("alice"),
            Some(&token),
            &valid_body(),
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[rstest]
#[tokio::test]
async fn test_views_carry_token_for_principal() {
    let app = TestApp::new();

    let (status, body) = app.get("/tasks/create", Some("alice")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["csrf_token"], app.csrf_token("alice"));
    assert_eq!(body["priorities"], json!(["Low", "Medium", "High"]));
}

// =============================================================================
// POST /tasks/create
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_create_normalizes_and_applies_defaults() {
    let app = TestApp::new();
    let token = app.csrf_token("alice");
    let body = json!({
        "title": " Buy milk ",
        "description": "2% milk, 1 gallon",
        "due_date": "2024-01-01",
        "priority": ""
    });

    let response = app
        .response(post_request(
            "/tasks/create",
            Some("alice"),
            Some(&token),
            &body,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/tasks");

    let tasks = app.tasks_of("alice").await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy milk");
    assert_eq!(tasks[0].priority, Priority::Medium);
    assert_eq!(tasks[0].status, TaskStatus::Pending);
    assert_eq!(tasks[0].due_date, date(2024, 1, 1));
}

#[rstest]
#[tokio::test]
async fn test_create_ignores_server_managed_fields_in_body() {
    let app = TestApp::new();
    let mut body = valid_body();
    body["ownerId"] = json!("mallory");
    body["owner_id"] = json!("mallory");
    body["status"] = json!("Completed");

    let (status, _) = app.post("/tasks/create", "alice", &body).await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    let tasks = app.tasks_of("alice").await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].owner_id.as_str(), "alice");
    assert_eq!(tasks[0].status, TaskStatus::Pending);
    assert!(app.tasks_of("mallory").await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_create_with_short_title_is_rejected() {
    let app = TestApp::new();
    let mut body = valid_body();
    body["title"] = json!("Hi");

    let (status, response) = app.post("/tasks/create", "alice", &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["code"], "VALIDATION_ERROR");
    assert_eq!(response["details"][0]["field"], "title");
    assert_eq!(
        response["details"][0]["message"],
        "Title must be between 3 and 100 characters."
    );
    assert_eq!(response["input"]["title"], "Hi");
    assert!(app.tasks_of("alice").await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_create_reports_every_violation() {
    let app = TestApp::new();
    let body = json!({"title": "", "description": "tiny", "priority": "Urgent"});

    let (status, response) = app.post("/tasks/create", "alice", &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = response["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|detail| detail["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["title", "description", "due_date", "priority"]);
}

#[rstest]
#[tokio::test]
async fn test_create_with_unparseable_due_date_reports_every_violation() {
    let app = TestApp::new();
    let body = json!({"title": "Hi", "due_date": "2024-13-45", "priority": "Urgent"});

    let (status, response) = app.post("/tasks/create", "alice", &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = response["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|detail| detail["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["title", "description", "due_date", "priority"]);
    assert_eq!(
        response["details"][2]["message"],
        "Due date must be a valid date (YYYY-MM-DD)."
    );
    assert_eq!(response["input"]["due_date"], "2024-13-45");
    assert!(app.tasks_of("alice").await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_create_with_mistyped_fields_is_a_validation_error() {
    let app = TestApp::new();
    let body = json!({
        "title": 42,
        "description": ["not", "text"],
        "due_date": 20_240_101,
        "priority": "Low"
    });

    let (status, response) = app.post("/tasks/create", "alice", &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["code"], "VALIDATION_ERROR");
    assert_eq!(response["input"]["title"], "42");
}

#[rstest]
#[tokio::test]
async fn test_create_with_unreadable_body_is_rejected() {
    let app = TestApp::new();
    let token = app.csrf_token("alice");
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/tasks/create")
        .header(header::CONTENT_TYPE, "application/json")
        .header(common::PRINCIPAL_HEADER, "alice")
        .header(task_tracker::api::CSRF_HEADER, token)
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_BODY");
}

// =============================================================================
// Ownership
// =============================================================================

#[rstest]
#[case("/tasks/details/{id}")]
#[case("/tasks/edit/{id}")]
#[case("/tasks/delete/{id}")]
#[tokio::test]
async fn test_foreign_task_views_are_not_found(#[case] template: &str) {
    let app = TestApp::new();
    let task = app.seed("alice", "Alice's task", date(2024, 5, 1)).await;
    let uri = template.replace("{id}", &task.id.to_string());

    let (own_status, _) = app.get(&uri, Some("alice")).await;
    let (foreign_status, body) = app.get(&uri, Some("bob")).await;

    assert_eq!(own_status, StatusCode::OK);
    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[rstest]
#[tokio::test]
async fn test_foreign_task_cannot_be_mutated() {
    let app = TestApp::new();
    let task = app.seed("alice", "Alice's task", date(2024, 5, 1)).await;
    let id = task.id.to_string();
    let mut edit = valid_body();
    edit["id"] = json!(task.id.value());

    let (toggle, _) = app
        .post(&format!("/tasks/toggle-status/{id}"), "bob", &json!({}))
        .await;
    let (edited, _) = app.post(&format!("/tasks/edit/{id}"), "bob", &edit).await;
    let (deleted, _) = app
        .post(&format!("/tasks/delete/{id}"), "bob", &json!({}))
        .await;

    assert_eq!(toggle, StatusCode::NOT_FOUND);
    assert_eq!(edited, StatusCode::NOT_FOUND);
    assert_eq!(deleted, StatusCode::NOT_FOUND);
    assert_eq!(app.tasks_of("alice").await, vec![task]);
}

#[rstest]
#[tokio::test]
async fn test_list_contains_only_own_tasks_in_due_order() {
    let app = TestApp::new();
    app.seed("alice", "Later", date(2024, 9, 1)).await;
    app.seed("alice", "Sooner", date(2024, 3, 1)).await;
    app.seed("bob", "Bob's", date(2024, 1, 1)).await;

    let (status, body) = app.get("/tasks", Some("alice")).await;

    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Sooner", "Later"]);
}

#[rstest]
#[case("abc")]
#[case("999")]
#[tokio::test]
async fn test_unknown_or_non_integer_id_is_not_found(#[case] segment: &str) {
    let app = TestApp::new();

    let (status, _) = app
        .get(&format!("/tasks/details/{segment}"), Some("alice"))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// POST /tasks/edit/{id}
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_edit_updates_client_fields_only() {
    let app = TestApp::new();
    let task = app.seed("alice", "Buy milk", date(2024, 1, 1)).await;
    let body = json!({
        "id": task.id.value(),
        "title": "Buy oat milk",
        "description": "1 litre, unsweetened",
        "due_date": "2024-01-05",
        "priority": "Low",
        "status": "Completed"
    });

    let (status, _) = app
        .post(&format!("/tasks/edit/{}", task.id), "alice", &body)
        .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    let stored = &app.tasks_of("alice").await[0];
    assert_eq!(stored.title, "Buy oat milk");
    assert_eq!(stored.priority, Priority::Low);
    assert_eq!(stored.due_date, date(2024, 1, 5));
    assert_eq!(stored.status, TaskStatus::Pending);
    assert_eq!(stored.created_at, task.created_at);
    assert_eq!(stored.owner_id, task.owner_id);
}

#[rstest]
#[case(Some(json!(12345)))]
#[case(None)]
#[tokio::test]
async fn test_edit_with_mismatched_body_id_is_malformed(#[case] body_id: Option<Value>) {
    let app = TestApp::new();
    let task = app.seed("alice", "Buy milk", date(2024, 1, 1)).await;
    let mut body = valid_body();
    if let Some(id) = body_id {
        body["id"] = id;
    }

    let (status, response) = app
        .post(&format!("/tasks/edit/{}", task.id), "alice", &body)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["code"], "MALFORMED_REQUEST");
    assert_eq!(app.tasks_of("alice").await[0].title, "Buy milk");
}

#[rstest]
#[tokio::test]
async fn test_edit_with_invalid_fields_is_rejected() {
    let app = TestApp::new();
    let task = app.seed("alice", "Buy milk", date(2024, 1, 1)).await;
    let body = json!({
        "id": task.id.value(),
        "title": "Buy oat milk",
        "description": "",
        "due_date": "2024-01-05"
    });

    let (status, response) = app
        .post(&format!("/tasks/edit/{}", task.id), "alice", &body)
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["details"][0]["field"], "description");
    assert_eq!(app.tasks_of("alice").await[0].title, "Buy milk");
}

#[rstest]
#[tokio::test]
async fn test_edit_of_foreign_task_is_not_found_even_when_invalid() {
    let app = TestApp::new();
    let task = app.seed("alice", "Buy milk", date(2024, 1, 1)).await;
    let body = json!({"id": task.id.value(), "title": "", "due_date": "never"});

    let (status, response) = app
        .post(&format!("/tasks/edit/{}", task.id), "bob", &body)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["code"], "NOT_FOUND");
}

// =============================================================================
// POST /tasks/delete/{id}
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_delete_removes_task_once() {
    let app = TestApp::new();
    let task = app.seed("alice", "Buy milk", date(2024, 1, 1)).await;
    let uri = format!("/tasks/delete/{}", task.id);

    let (first, _) = app.post(&uri, "alice", &json!({})).await;
    let (second, body) = app.post(&uri, "alice", &json!({})).await;

    assert_eq!(first, StatusCode::SEE_OTHER);
    assert_eq!(second, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(app.tasks_of("alice").await.is_empty());
}

// =============================================================================
// POST /tasks/toggle-status/{id}
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_toggle_twice_restores_pending() {
    let app = TestApp::new();
    let task = app.seed("alice", "Buy milk", date(2024, 1, 1)).await;
    let uri = format!("/tasks/toggle-status/{}", task.id);

    let (first, _) = app.post(&uri, "alice", &json!({})).await;
    let after_first = app.tasks_of("alice").await[0].status;
    let (second, _) = app.post(&uri, "alice", &json!({})).await;
    let after_second = app.tasks_of("alice").await[0].status;

    assert_eq!(first, StatusCode::SEE_OTHER);
    assert_eq!(second, StatusCode::SEE_OTHER);
    assert_eq!(after_first, TaskStatus::Completed);
    assert_eq!(after_second, TaskStatus::Pending);
}

#[rstest]
#[tokio::test]
async fn test_details_report_overdue_flag() {
    let app = TestApp::new();
    let task = app.seed("alice", "Long overdue", date(2000, 1, 1)).await;

    let (status, body) = app
        .get(&format!("/tasks/details/{}", task.id), Some("alice"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["is_overdue"], true);
    assert_eq!(body["task"]["status"], "Pending");
}

// =============================================================================
// GET /health
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_health_needs_no_principal() {
    let app = TestApp::new();

    let (status, body) = app.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
