//! HTTP routes for employees, projects and allocations.

pub mod api;
pub mod extract;

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::allocation::{Allocation, AllocationDetail, NewAllocation};
use crate::models::employee::{Employee, NewEmployee};
use crate::models::project::{NewProject, Project};
use crate::repository::SharedRepository;

use self::api::MessageResponse;
use self::extract::{AppJson, AppPath};

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: SharedRepository,
}

impl AppState {
    pub fn new(repo: SharedRepository) -> Self {
        Self { repo }
    }
}

/// Routes only, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        // Employees
        .route("/create_employee", post(create_employee))
        .route("/read_employees", get(read_employees))
        .route("/update_employee/{employee_id}", put(update_employee))
        .route("/delete_employee/{employee_id}", delete(delete_employee))
        // Projects
        .route("/create_project", post(create_project))
        .route("/read_projects", get(read_projects))
        .route("/update_project/{project_id}", put(update_project))
        .route("/delete_project/{project_id}", delete(delete_project))
        // Allocations
        .route("/create_allocation", post(create_allocation))
        .route("/read_allocations", get(read_allocations))
        .route("/read_allocations_detailed", get(read_allocations_detailed))
        .route("/update_allocation/{allocation_id}", put(update_allocation))
        .route("/delete_allocation/{allocation_id}", delete(delete_allocation))
        .with_state(state)
}

/// Full application: routes plus tracing, timeout and CORS layers.
pub fn app_router(state: AppState, config: &AppConfig) -> Router {
    router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::map_response(timeout_detail))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout,
            ))
            .layer(cors_layer(&config.cors_origin)),
    )
}

/// The timeout layer answers with an empty body; give it the usual detail.
async fn timeout_detail(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return AppError::Timeout.into_response();
    }
    response
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!("Invalid CORS origin '{origin}' -- allowing any origin");
                AllowOrigin::any()
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<&'static str> {
    Json(api::WELCOME)
}

// ── Employees ──

async fn create_employee(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewEmployee>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    req.validate()?;
    let employee = state.repo.create_employee(req).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn read_employees(State(state): State<AppState>) -> Result<Json<Vec<Employee>>, AppError> {
    state.repo.list_employees().await.map(Json)
}

async fn update_employee(
    State(state): State<AppState>,
    AppPath(employee_id): AppPath<i64>,
    AppJson(req): AppJson<NewEmployee>,
) -> Result<Json<Employee>, AppError> {
    req.validate()?;
    state.repo.update_employee(employee_id, req).await.map(Json)
}

async fn delete_employee(
    State(state): State<AppState>,
    AppPath(employee_id): AppPath<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let employee = state.repo.delete_employee(employee_id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Employee '{}' deleted successfully",
        employee.employee_name
    ))))
}

// ── Projects ──

async fn create_project(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewProject>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    req.validate()?;
    let project = state.repo.create_project(req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn read_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, AppError> {
    state.repo.list_projects().await.map(Json)
}

async fn update_project(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<i64>,
    AppJson(req): AppJson<NewProject>,
) -> Result<Json<Project>, AppError> {
    req.validate()?;
    state.repo.update_project(project_id, req).await.map(Json)
}

async fn delete_project(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let project = state.repo.delete_project(project_id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Project '{}' deleted successfully",
        project.project_name
    ))))
}

// ── Allocations ──

async fn create_allocation(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewAllocation>,
) -> Result<(StatusCode, Json<Allocation>), AppError> {
    req.validate()?;
    let allocation = state.repo.create_allocation(req).await?;
    Ok((StatusCode::CREATED, Json(allocation)))
}

async fn read_allocations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Allocation>>, AppError> {
    state.repo.list_allocations().await.map(Json)
}

async fn read_allocations_detailed(
    State(state): State<AppState>,
) -> Result<Json<Vec<AllocationDetail>>, AppError> {
    state.repo.list_allocation_details().await.map(Json)
}

async fn update_allocation(
    State(state): State<AppState>,
    AppPath(allocation_id): AppPath<i64>,
    AppJson(req): AppJson<NewAllocation>,
) -> Result<Json<Allocation>, AppError> {
    req.validate()?;
    state
        .repo
        .update_allocation(allocation_id, req)
        .await
        .map(Json)
}

async fn delete_allocation(
    State(state): State<AppState>,
    AppPath(allocation_id): AppPath<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.repo.delete_allocation(allocation_id).await?;
    Ok(Json(MessageResponse::new("Allocation deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_response_gets_detail_body() {
        let empty = StatusCode::REQUEST_TIMEOUT.into_response();
        let response = timeout_detail(empty).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "Request timed out");
    }

    #[tokio::test]
    async fn other_responses_pass_through() {
        let response = timeout_detail(StatusCode::CREATED.into_response()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
