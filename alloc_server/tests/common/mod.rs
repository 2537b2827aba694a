//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use allocation_server::config::AppConfig;
use allocation_server::{app_router, AppState, MemoryRepository};

/// Router over a fresh in-memory store.
pub fn app() -> Router {
    app_router(
        AppState::new(MemoryRepository::shared()),
        &AppConfig::default(),
    )
}

/// Send one request and decode the JSON body (`Null` when the body is not JSON).
pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Send a raw body, bypassing JSON encoding. `content_type` of `None` omits the header.
pub async fn call_raw(
    app: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Method::DELETE, uri, None).await
}

pub fn detail(body: &Value) -> &str {
    body["detail"].as_str().unwrap_or_default()
}

pub async fn create_employee(app: &Router, name: &str, skill: &str, hrs: i32) -> i64 {
    let (status, body) = post(
        app,
        "/create_employee",
        json!({ "employee_name": name, "skilled_language": skill, "available_hrs": hrs }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["employee_id"].as_i64().unwrap()
}

pub async fn create_project(app: &Router, name: &str, duration: i32, skill: &str) -> i64 {
    let (status, body) = post(
        app,
        "/create_project",
        json!({ "project_name": name, "project_duration": duration, "project_skill_required": skill }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["project_id"].as_i64().unwrap()
}

pub async fn allocate(
    app: &Router,
    employee_id: i64,
    project_id: i64,
    hours: i32,
) -> (StatusCode, Value) {
    post(
        app,
        "/create_allocation",
        json!({ "employee_id": employee_id, "project_id": project_id, "allocation_hours": hours }),
    )
    .await
}
