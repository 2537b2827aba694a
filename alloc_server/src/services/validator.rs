//! Allocation admission rules.
//!
//! A candidate allocation is judged against a transaction-scoped
//! [`AllocationStore`]. Checks run in a fixed order and the first failure
//! wins: existence, skill match, duplicate pair, employee cap, project cap.
//! The store must hand out a consistent snapshot for the whole sequence and
//! keep conflicting writers out until the write is committed.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{AppError, Conflict, Entity, Result};
use crate::models::allocation::{Allocation, NewAllocation};
use crate::models::employee::Employee;
use crate::models::project::Project;

/// System-wide ceiling on an employee's total allocated hours.
pub const HOUR_CEILING: i64 = 100;

/// Data access the validator needs, scoped to one transaction.
///
/// Row reads (`get_*`) lock the row until the transaction ends on backends
/// that support it.
#[async_trait]
pub trait AllocationStore: Send {
    async fn get_employee(&mut self, employee_id: i64) -> Result<Option<Employee>>;

    async fn get_project(&mut self, project_id: i64) -> Result<Option<Project>>;

    async fn get_allocation(&mut self, allocation_id: i64) -> Result<Option<Allocation>>;

    /// Sum of the employee's allocation hours, skipping `exclude`.
    async fn sum_hours_by_employee(
        &mut self,
        employee_id: i64,
        exclude: Option<i64>,
    ) -> Result<i64>;

    /// Sum of the project's allocation hours, skipping `exclude`.
    async fn sum_hours_by_project(
        &mut self,
        project_id: i64,
        exclude: Option<i64>,
    ) -> Result<i64>;

    async fn find_allocation_by_pair(
        &mut self,
        employee_id: i64,
        project_id: i64,
        exclude: Option<i64>,
    ) -> Result<Option<Allocation>>;

    /// Insert `values`, or overwrite allocation `existing` with them.
    async fn write_allocation(
        &mut self,
        existing: Option<i64>,
        values: &NewAllocation,
    ) -> Result<Allocation>;
}

/// A rule the requested write would break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("Skill mismatch: Employee has '{employee_skill}' but project requires '{required_skill}'")]
    SkillMismatch {
        employee_skill: String,
        required_skill: String,
    },

    #[error("Employee allocation exceeds 100 hours. Currently allocated: {allocated} hours")]
    HourCeiling { allocated: i64 },

    #[error("Employee only has {available} hours available. Already allocated: {allocated} hours")]
    AvailableHours { available: i32, allocated: i64 },

    #[error("Project '{project_name}' only has {duration} hours. Already allocated: {allocated} hours to other employees")]
    ProjectDuration {
        project_name: String,
        duration: i32,
        allocated: i64,
    },

    #[error("Employee has {allocated} hours allocated. Available hours cannot be reduced to {requested}")]
    AvailableBelowAllocated { allocated: i64, requested: i32 },

    #[error("Project has {allocated} hours allocated. Duration cannot be reduced to {requested}")]
    DurationBelowAllocated { allocated: i64, requested: i32 },
}

impl Violation {
    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Violation::SkillMismatch { .. } => "skill_mismatch",
            Violation::HourCeiling { .. } => "hour_ceiling",
            Violation::AvailableHours { .. } => "available_hours",
            Violation::ProjectDuration { .. } => "project_duration",
            Violation::AvailableBelowAllocated { .. } => "available_below_allocated",
            Violation::DurationBelowAllocated { .. } => "duration_below_allocated",
        }
    }
}

/// Case-insensitive, bidirectional substring test.
///
/// Literal substring semantics: "a" matches "Java". Kept as-is for
/// compatibility with existing data.
pub fn skills_match(employee_skill: &str, required_skill: &str) -> bool {
    let have = employee_skill.to_lowercase();
    let need = required_skill.to_lowercase();
    need.contains(&have) || have.contains(&need)
}

/// Employee cap: hard ceiling first, then the employee's own available hours.
pub fn check_employee_cap(
    employee: &Employee,
    allocated: i64,
    hours: i32,
) -> std::result::Result<(), Violation> {
    let total = allocated + i64::from(hours);
    if total > HOUR_CEILING {
        return Err(Violation::HourCeiling { allocated });
    }
    if total > i64::from(employee.available_hrs) {
        return Err(Violation::AvailableHours {
            available: employee.available_hrs,
            allocated,
        });
    }
    Ok(())
}

pub fn check_project_cap(
    project: &Project,
    allocated: i64,
    hours: i32,
) -> std::result::Result<(), Violation> {
    if allocated + i64::from(hours) > i64::from(project.project_duration) {
        return Err(Violation::ProjectDuration {
            project_name: project.project_name.clone(),
            duration: project.project_duration,
            allocated,
        });
    }
    Ok(())
}

/// An employee update may not drop `available_hrs` below what is already allocated.
pub fn check_available_hours_update(
    allocated: i64,
    requested: i32,
) -> std::result::Result<(), Violation> {
    if i64::from(requested) < allocated {
        return Err(Violation::AvailableBelowAllocated {
            allocated,
            requested,
        });
    }
    Ok(())
}

/// A project update may not drop its duration below what is already allocated.
pub fn check_duration_update(
    allocated: i64,
    requested: i32,
) -> std::result::Result<(), Violation> {
    if i64::from(requested) < allocated {
        return Err(Violation::DurationBelowAllocated {
            allocated,
            requested,
        });
    }
    Ok(())
}

/// Run the admission checks for `candidate`, ignoring allocation `exclude`.
pub async fn check_allocation<S>(
    store: &mut S,
    candidate: &NewAllocation,
    exclude: Option<i64>,
) -> Result<()>
where
    S: AllocationStore + ?Sized,
{
    let employee = store
        .get_employee(candidate.employee_id)
        .await?
        .ok_or(AppError::NotFound(Entity::Employee))?;
    let project = store
        .get_project(candidate.project_id)
        .await?
        .ok_or(AppError::NotFound(Entity::Project))?;

    if !skills_match(&employee.skilled_language, &project.project_skill_required) {
        return Err(Violation::SkillMismatch {
            employee_skill: employee.skilled_language,
            required_skill: project.project_skill_required,
        }
        .into());
    }

    if let Some(existing) = store
        .find_allocation_by_pair(candidate.employee_id, candidate.project_id, exclude)
        .await?
    {
        return Err(Conflict::DuplicatePair {
            existing_hours: existing.allocation_hours,
        }
        .into());
    }

    let employee_total = store
        .sum_hours_by_employee(candidate.employee_id, exclude)
        .await?;
    check_employee_cap(&employee, employee_total, candidate.allocation_hours)?;

    let project_total = store
        .sum_hours_by_project(candidate.project_id, exclude)
        .await?;
    check_project_cap(&project, project_total, candidate.allocation_hours)?;

    Ok(())
}

/// Validate and write an allocation. `existing` is the id being replaced on update.
pub async fn commit_allocation<S>(
    store: &mut S,
    candidate: &NewAllocation,
    existing: Option<i64>,
) -> Result<Allocation>
where
    S: AllocationStore + ?Sized,
{
    let op = if existing.is_some() { "update" } else { "create" };

    if let Some(allocation_id) = existing {
        store
            .get_allocation(allocation_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Allocation))?;
    }

    if let Err(err) = check_allocation(store, candidate, existing).await {
        record_rejection(&err, candidate);
        return Err(err);
    }

    let allocation = store.write_allocation(existing, candidate).await?;

    crate::metrics::allocation_committed(op);
    tracing::info!(
        allocation_id = allocation.allocation_id,
        employee_id = allocation.employee_id,
        project_id = allocation.project_id,
        hours = allocation.allocation_hours,
        op,
        "Allocation committed"
    );
    Ok(allocation)
}

fn record_rejection(err: &AppError, candidate: &NewAllocation) {
    let reason = match err {
        AppError::Rejected(v) => v.reason(),
        AppError::Conflict(_) => "duplicate_pair",
        AppError::NotFound(Entity::Employee) => "employee_not_found",
        AppError::NotFound(_) => "project_not_found",
        _ => return,
    };
    crate::metrics::allocation_rejected(reason);
    tracing::warn!(
        employee_id = candidate.employee_id,
        project_id = candidate.project_id,
        hours = candidate.allocation_hours,
        reason,
        "Allocation rejected: {err}"
    );
}
