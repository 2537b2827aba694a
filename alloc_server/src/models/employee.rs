//! employee: A person with one skill and a ceiling on allocatable hours.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::schema::employees;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = employees)]
pub struct Employee {
    pub employee_id: i64,
    pub employee_name: String,
    pub skilled_language: String,
    pub available_hrs: i32,
}

/// Create/update payload. Updates replace every field.
#[derive(Debug, Clone, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = employees)]
pub struct NewEmployee {
    pub employee_name: String,
    pub skilled_language: String,
    pub available_hrs: i32,
}

impl NewEmployee {
    pub fn validate(&self) -> Result<(), AppError> {
        super::check_text("employee_name", &self.employee_name)?;
        super::check_text("skilled_language", &self.skilled_language)?;
        if self.available_hrs < 0 {
            return Err(AppError::InvalidInput(
                "available_hrs must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_employee(self, employee_id: i64) -> Employee {
        Employee {
            employee_id,
            employee_name: self.employee_name,
            skilled_language: self.skilled_language,
            available_hrs: self.available_hrs,
        }
    }
}
