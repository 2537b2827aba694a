//! project: Work with a fixed hour budget and one required skill.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::schema::projects;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = projects)]
pub struct Project {
    pub project_id: i64,
    pub project_name: String,
    pub project_duration: i32,
    pub project_skill_required: String,
}

#[derive(Debug, Clone, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub project_name: String,
    pub project_duration: i32,
    pub project_skill_required: String,
}

impl NewProject {
    pub fn validate(&self) -> Result<(), AppError> {
        super::check_text("project_name", &self.project_name)?;
        super::check_text("project_skill_required", &self.project_skill_required)?;
        if self.project_duration <= 0 {
            return Err(AppError::InvalidInput(
                "project_duration must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_project(self, project_id: i64) -> Project {
        Project {
            project_id,
            project_name: self.project_name,
            project_duration: self.project_duration,
            project_skill_required: self.project_skill_required,
        }
    }
}
