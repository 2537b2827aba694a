//! Storage backends behind one injected interface.
//!
//! Handlers only see [`Repository`]. Allocation writes go through
//! [`crate::services::validator::commit_allocation`] inside whatever atomic
//! unit the backend provides, so both backends apply the same rules.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::allocation::{Allocation, AllocationDetail, NewAllocation};
use crate::models::employee::{Employee, NewEmployee};
use crate::models::project::{NewProject, Project};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Shared handle used by the router state.
pub type SharedRepository = Arc<dyn Repository>;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_employees(&self) -> Result<Vec<Employee>>;

    async fn create_employee(&self, new_employee: NewEmployee) -> Result<Employee>;

    async fn update_employee(&self, employee_id: i64, changes: NewEmployee) -> Result<Employee>;

    /// Fails with a conflict while allocations reference the employee.
    async fn delete_employee(&self, employee_id: i64) -> Result<Employee>;

    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn create_project(&self, new_project: NewProject) -> Result<Project>;

    async fn update_project(&self, project_id: i64, changes: NewProject) -> Result<Project>;

    /// Fails with a conflict while allocations reference the project.
    async fn delete_project(&self, project_id: i64) -> Result<Project>;

    async fn list_allocations(&self) -> Result<Vec<Allocation>>;

    async fn list_allocation_details(&self) -> Result<Vec<AllocationDetail>>;

    async fn create_allocation(&self, new_allocation: NewAllocation) -> Result<Allocation>;

    async fn update_allocation(
        &self,
        allocation_id: i64,
        changes: NewAllocation,
    ) -> Result<Allocation>;

    async fn delete_allocation(&self, allocation_id: i64) -> Result<Allocation>;
}
