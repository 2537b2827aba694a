//! allocation: Hours an employee commits to a project.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::schema::allocations;

/// Bounds for a single allocation's hours.
pub const MIN_ALLOCATION_HOURS: i32 = 1;
pub const MAX_ALLOCATION_HOURS: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = allocations)]
pub struct Allocation {
    pub allocation_id: i64,
    pub employee_id: i64,
    pub project_id: i64,
    pub allocation_hours: i32,
}

/// Create/update payload, and the candidate the validator judges.
#[derive(Debug, Clone, PartialEq, Eq, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = allocations)]
pub struct NewAllocation {
    pub employee_id: i64,
    pub project_id: i64,
    pub allocation_hours: i32,
}

impl NewAllocation {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.employee_id <= 0 {
            return Err(AppError::InvalidInput(
                "employee_id must be positive".to_string(),
            ));
        }
        if self.project_id <= 0 {
            return Err(AppError::InvalidInput(
                "project_id must be positive".to_string(),
            ));
        }
        if !(MIN_ALLOCATION_HOURS..=MAX_ALLOCATION_HOURS).contains(&self.allocation_hours) {
            return Err(AppError::InvalidInput(format!(
                "allocation_hours must be between {MIN_ALLOCATION_HOURS} and {MAX_ALLOCATION_HOURS}"
            )));
        }
        Ok(())
    }

    pub fn into_allocation(self, allocation_id: i64) -> Allocation {
        Allocation {
            allocation_id,
            employee_id: self.employee_id,
            project_id: self.project_id,
            allocation_hours: self.allocation_hours,
        }
    }
}

/// One row of the detailed allocation view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, QueryableByName)]
pub struct AllocationDetail {
    #[diesel(sql_type = BigInt)]
    pub allocation_id: i64,
    #[diesel(sql_type = BigInt)]
    pub employee_id: i64,
    #[diesel(sql_type = Text)]
    pub employee_name: String,
    #[diesel(sql_type = Text)]
    pub employee_skills: String,
    #[diesel(sql_type = BigInt)]
    pub project_id: i64,
    #[diesel(sql_type = Text)]
    pub project_name: String,
    #[diesel(sql_type = Text)]
    pub project_skills_required: String,
    #[diesel(sql_type = Integer)]
    pub allocation_hours: i32,
    #[diesel(sql_type = BigInt)]
    pub total_employee_hours: i64,
    #[diesel(sql_type = BigInt)]
    pub remaining_hours: i64,
}
