//! Resource allocation service: employees, projects and the hours each
//! employee commits to each project.
//!
//! Allocation writes are admitted by the rules in [`services::validator`]
//! and executed atomically by a [`repository::Repository`] backend.

pub mod config;
pub mod error;
pub mod metrics;
pub mod migration;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod services;

pub use error::{AppError, Conflict, Entity};
pub use repository::{MemoryRepository, PgRepository, Repository, SharedRepository};
pub use routes::{app_router, AppState};
