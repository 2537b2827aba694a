//! In-process repository. One async mutex guards all state, so every write
//! (validation included) is serialized.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Repository;
use crate::error::{AppError, Conflict, Entity, Result};
use crate::models::allocation::{Allocation, AllocationDetail, NewAllocation};
use crate::models::employee::{Employee, NewEmployee};
use crate::models::project::{NewProject, Project};
use crate::services::detail::build_detail_rows;
use crate::services::validator::{self, AllocationStore};

#[derive(Debug, Default)]
struct MemoryState {
    employees: BTreeMap<i64, Employee>,
    projects: BTreeMap<i64, Project>,
    allocations: BTreeMap<i64, Allocation>,
    last_employee_id: i64,
    last_project_id: i64,
    last_allocation_id: i64,
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

impl MemoryState {
    fn employee_hours(&self, employee_id: i64, exclude: Option<i64>) -> i64 {
        self.allocations
            .values()
            .filter(|a| a.employee_id == employee_id && Some(a.allocation_id) != exclude)
            .map(|a| i64::from(a.allocation_hours))
            .sum()
    }

    fn project_hours(&self, project_id: i64, exclude: Option<i64>) -> i64 {
        self.allocations
            .values()
            .filter(|a| a.project_id == project_id && Some(a.allocation_id) != exclude)
            .map(|a| i64::from(a.allocation_hours))
            .sum()
    }

    fn employee_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.employees
            .values()
            .any(|e| e.employee_name == name && Some(e.employee_id) != except)
    }

    fn project_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.projects
            .values()
            .any(|p| p.project_name == name && Some(p.project_id) != except)
    }
}

/// Transaction view over the locked state.
struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

#[async_trait]
impl<'a> AllocationStore for MemoryTx<'a> {
    async fn get_employee(&mut self, employee_id: i64) -> Result<Option<Employee>> {
        Ok(self.state.employees.get(&employee_id).cloned())
    }

    async fn get_project(&mut self, project_id: i64) -> Result<Option<Project>> {
        Ok(self.state.projects.get(&project_id).cloned())
    }

    async fn get_allocation(&mut self, allocation_id: i64) -> Result<Option<Allocation>> {
        Ok(self.state.allocations.get(&allocation_id).cloned())
    }

    async fn sum_hours_by_employee(
        &mut self,
        employee_id: i64,
        exclude: Option<i64>,
    ) -> Result<i64> {
        Ok(self.state.employee_hours(employee_id, exclude))
    }

    async fn sum_hours_by_project(&mut self, project_id: i64, exclude: Option<i64>) -> Result<i64> {
        Ok(self.state.project_hours(project_id, exclude))
    }

    async fn find_allocation_by_pair(
        &mut self,
        employee_id: i64,
        project_id: i64,
        exclude: Option<i64>,
    ) -> Result<Option<Allocation>> {
        Ok(self
            .state
            .allocations
            .values()
            .find(|a| {
                a.employee_id == employee_id
                    && a.project_id == project_id
                    && Some(a.allocation_id) != exclude
            })
            .cloned())
    }

    async fn write_allocation(
        &mut self,
        existing: Option<i64>,
        values: &NewAllocation,
    ) -> Result<Allocation> {
        let allocation_id = match existing {
            Some(id) => id,
            None => next_id(&mut self.state.last_allocation_id),
        };
        let allocation = values.clone().into_allocation(allocation_id);
        self.state
            .allocations
            .insert(allocation_id, allocation.clone());
        Ok(allocation)
    }
}

/// Repository backed by process memory. Used for `--in-memory` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_employees(&self) -> Result<Vec<Employee>> {
        let state = self.state.lock().await;
        Ok(state.employees.values().cloned().collect())
    }

    async fn create_employee(&self, new_employee: NewEmployee) -> Result<Employee> {
        let mut state = self.state.lock().await;
        if state.employee_name_taken(&new_employee.employee_name, None) {
            return Err(Conflict::EmployeeNameTaken(new_employee.employee_name).into());
        }
        let employee_id = next_id(&mut state.last_employee_id);
        let employee = new_employee.into_employee(employee_id);
        state.employees.insert(employee_id, employee.clone());
        tracing::info!(employee_id, "Employee created");
        Ok(employee)
    }

    async fn update_employee(&self, employee_id: i64, changes: NewEmployee) -> Result<Employee> {
        let mut state = self.state.lock().await;
        if !state.employees.contains_key(&employee_id) {
            return Err(AppError::NotFound(Entity::Employee));
        }
        if state.employee_name_taken(&changes.employee_name, Some(employee_id)) {
            return Err(Conflict::EmployeeNameTaken(changes.employee_name).into());
        }
        let allocated = state.employee_hours(employee_id, None);
        validator::check_available_hours_update(allocated, changes.available_hrs)?;

        let employee = changes.into_employee(employee_id);
        state.employees.insert(employee_id, employee.clone());
        tracing::info!(employee_id, "Employee updated");
        Ok(employee)
    }

    async fn delete_employee(&self, employee_id: i64) -> Result<Employee> {
        let mut state = self.state.lock().await;
        if !state.employees.contains_key(&employee_id) {
            return Err(AppError::NotFound(Entity::Employee));
        }
        let allocations = state
            .allocations
            .values()
            .filter(|a| a.employee_id == employee_id)
            .count() as i64;
        if allocations > 0 {
            return Err(Conflict::EmployeeInUse { allocations }.into());
        }
        let employee = state
            .employees
            .remove(&employee_id)
            .ok_or(AppError::NotFound(Entity::Employee))?;
        crate::metrics::entity_deleted("employee");
        tracing::info!(employee_id, "Employee deleted");
        Ok(employee)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let state = self.state.lock().await;
        Ok(state.projects.values().cloned().collect())
    }

    async fn create_project(&self, new_project: NewProject) -> Result<Project> {
        let mut state = self.state.lock().await;
        if state.project_name_taken(&new_project.project_name, None) {
            return Err(Conflict::ProjectNameTaken(new_project.project_name).into());
        }
        let project_id = next_id(&mut state.last_project_id);
        let project = new_project.into_project(project_id);
        state.projects.insert(project_id, project.clone());
        tracing::info!(project_id, "Project created");
        Ok(project)
    }

    async fn update_project(&self, project_id: i64, changes: NewProject) -> Result<Project> {
        let mut state = self.state.lock().await;
        if !state.projects.contains_key(&project_id) {
            return Err(AppError::NotFound(Entity::Project));
        }
        if state.project_name_taken(&changes.project_name, Some(project_id)) {
            return Err(Conflict::ProjectNameTaken(changes.project_name).into());
        }
        let allocated = state.project_hours(project_id, None);
        validator::check_duration_update(allocated, changes.project_duration)?;

        let project = changes.into_project(project_id);
        state.projects.insert(project_id, project.clone());
        tracing::info!(project_id, "Project updated");
        Ok(project)
    }

    async fn delete_project(&self, project_id: i64) -> Result<Project> {
        let mut state = self.state.lock().await;
        if !state.projects.contains_key(&project_id) {
            return Err(AppError::NotFound(Entity::Project));
        }
        let allocations = state
            .allocations
            .values()
            .filter(|a| a.project_id == project_id)
            .count() as i64;
        if allocations > 0 {
            return Err(Conflict::ProjectInUse { allocations }.into());
        }
        let project = state
            .projects
            .remove(&project_id)
            .ok_or(AppError::NotFound(Entity::Project))?;
        crate::metrics::entity_deleted("project");
        tracing::info!(project_id, "Project deleted");
        Ok(project)
    }

    async fn list_allocations(&self) -> Result<Vec<Allocation>> {
        let state = self.state.lock().await;
        Ok(state.allocations.values().cloned().collect())
    }

    async fn list_allocation_details(&self) -> Result<Vec<AllocationDetail>> {
        let state = self.state.lock().await;
        let allocations: Vec<Allocation> = state.allocations.values().cloned().collect();
        let employees: Vec<Employee> = state.employees.values().cloned().collect();
        let projects: Vec<Project> = state.projects.values().cloned().collect();
        Ok(build_detail_rows(&allocations, &employees, &projects))
    }

    async fn create_allocation(&self, new_allocation: NewAllocation) -> Result<Allocation> {
        let mut state = self.state.lock().await;
        let mut tx = MemoryTx { state: &mut *state };
        validator::commit_allocation(&mut tx, &new_allocation, None).await
    }

    async fn update_allocation(
        &self,
        allocation_id: i64,
        changes: NewAllocation,
    ) -> Result<Allocation> {
        let mut state = self.state.lock().await;
        let mut tx = MemoryTx { state: &mut *state };
        validator::commit_allocation(&mut tx, &changes, Some(allocation_id)).await
    }

    async fn delete_allocation(&self, allocation_id: i64) -> Result<Allocation> {
        let mut state = self.state.lock().await;
        let allocation = state
            .allocations
            .remove(&allocation_id)
            .ok_or(AppError::NotFound(Entity::Allocation))?;
        crate::metrics::entity_deleted("allocation");
        tracing::info!(allocation_id, "Allocation deleted");
        Ok(allocation)
    }
}
