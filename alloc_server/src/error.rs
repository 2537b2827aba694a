//! Error taxonomy for the allocation service and its HTTP mapping.

use std::fmt;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::services::validator::Violation;

/// Result alias used across repository and service code.
pub type Result<T> = std::result::Result<T, AppError>;

/// The record kinds a lookup can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Employee,
    Project,
    Allocation,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Employee => "Employee",
            Entity::Project => "Project",
            Entity::Allocation => "Allocation",
        };
        f.write_str(name)
    }
}

/// A write that clashes with existing rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("Employee with name '{0}' already exists")]
    EmployeeNameTaken(String),

    #[error("Project with name '{0}' already exists")]
    ProjectNameTaken(String),

    #[error("Employee is already allocated to this project with {existing_hours} hours")]
    DuplicatePair { existing_hours: i32 },

    /// Emitted when the store's pair constraint fires after the pre-check passed.
    #[error("Employee is already allocated to this project")]
    DuplicatePairRace,

    #[error("Cannot delete employee. They have {allocations} allocation(s). Delete allocations first.")]
    EmployeeInUse { allocations: i64 },

    #[error("Cannot delete project. It has {allocations} allocation(s). Delete allocations first.")]
    ProjectInUse { allocations: i64 },

    /// The store's foreign key refused a delete the pre-check allowed.
    #[error("{0} is still referenced by allocations. Delete allocations first.")]
    StillReferenced(Entity),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error(transparent)]
    Conflict(#[from] Conflict),

    #[error(transparent)]
    Rejected(#[from] Violation),

    #[error("{0}")]
    InvalidInput(String),

    /// The request line itself is unusable, e.g. a non-numeric path id.
    #[error("{0}")]
    BadRequest(String),

    #[error("Request timed out")]
    Timeout,

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::Rejected(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    pub fn detail(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        AppError::Internal(err.into())
    }
}

/// Body that failed to parse or deserialize: missing fields, wrong types,
/// bad JSON or a missing `application/json` content type.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(ref err) = self {
            tracing::error!(error = %format!("{err:#}"), "Request failed");
        }
        let body = serde_json::json!({ "detail": self.detail() });
        (self.status(), Json(body)).into_response()
    }
}
