//! Detailed allocation view: each allocation joined with its employee and
//! project, plus the employee's total allocated hours.

use std::collections::HashMap;

use crate::models::allocation::{Allocation, AllocationDetail};
use crate::models::employee::Employee;
use crate::models::project::Project;
use crate::services::validator::HOUR_CEILING;

/// Build detailed rows with one grouped pass over `allocations`.
///
/// Allocations whose employee or project is missing are skipped. Output
/// follows the order of `allocations`.
pub fn build_detail_rows(
    allocations: &[Allocation],
    employees: &[Employee],
    projects: &[Project],
) -> Vec<AllocationDetail> {
    let employees: HashMap<i64, &Employee> =
        employees.iter().map(|e| (e.employee_id, e)).collect();
    let projects: HashMap<i64, &Project> = projects.iter().map(|p| (p.project_id, p)).collect();

    let mut totals: HashMap<i64, i64> = HashMap::new();
    for a in allocations {
        *totals.entry(a.employee_id).or_default() += i64::from(a.allocation_hours);
    }

    allocations
        .iter()
        .filter_map(|a| {
            let employee = employees.get(&a.employee_id)?;
            let project = projects.get(&a.project_id)?;
            let total = totals.get(&a.employee_id).copied().unwrap_or_default();
            Some(AllocationDetail {
                allocation_id: a.allocation_id,
                employee_id: a.employee_id,
                employee_name: employee.employee_name.clone(),
                employee_skills: employee.skilled_language.clone(),
                project_id: a.project_id,
                project_name: project.project_name.clone(),
                project_skills_required: project.project_skill_required.clone(),
                allocation_hours: a.allocation_hours,
                total_employee_hours: total,
                remaining_hours: HOUR_CEILING - total,
            })
        })
        .collect()
}
