//! Diesel table definitions for the allocation service.
//!
//! Tables: employees, projects, allocations.

diesel::table! {
    employees (employee_id) {
        employee_id -> Int8,
        employee_name -> Varchar,
        skilled_language -> Varchar,
        available_hrs -> Int4,
    }
}

diesel::table! {
    projects (project_id) {
        project_id -> Int8,
        project_name -> Varchar,
        project_duration -> Int4,
        project_skill_required -> Varchar,
    }
}

diesel::table! {
    allocations (allocation_id) {
        allocation_id -> Int8,
        employee_id -> Int8,
        project_id -> Int8,
        allocation_hours -> Int4,
    }
}

// Foreign key relationships
diesel::joinable!(allocations -> employees (employee_id));
diesel::joinable!(allocations -> projects (project_id));

diesel::allow_tables_to_appear_in_same_query!(employees, projects, allocations);
