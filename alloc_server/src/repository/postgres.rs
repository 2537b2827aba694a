//! PostgreSQL repository over a diesel-async deadpool.
//!
//! Allocation writes and shrinking employee/project updates run in a single
//! transaction. Rows are locked with `SELECT ... FOR UPDATE` in a fixed order
//! (allocation, employee, project) before any hour totals are read, so two
//! writers touching the same employee or project are serialized.

use anyhow::Context;
use async_trait::async_trait;
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use super::Repository;
use crate::error::{AppError, Conflict, Entity, Result};
use crate::models::allocation::{Allocation, AllocationDetail, NewAllocation};
use crate::models::employee::{Employee, NewEmployee};
use crate::models::project::{NewProject, Project};
use crate::schema::{allocations, employees, projects};
use crate::services::validator::{self, AllocationStore};

pub type PgPool = Pool<AsyncPgConnection>;

/// Detailed view in one pass: the per-employee total is a window aggregate.
const DETAIL_SQL: &str = "\
SELECT \
    a.allocation_id, \
    a.employee_id, \
    e.employee_name, \
    e.skilled_language AS employee_skills, \
    a.project_id, \
    p.project_name, \
    p.project_skill_required AS project_skills_required, \
    a.allocation_hours, \
    SUM(a.allocation_hours) OVER (PARTITION BY a.employee_id) AS total_employee_hours, \
    100 - SUM(a.allocation_hours) OVER (PARTITION BY a.employee_id) AS remaining_hours \
 FROM allocations a \
 JOIN employees e ON e.employee_id = a.employee_id \
 JOIN projects p ON p.project_id = a.project_id \
 ORDER BY a.allocation_id ASC";

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool for `database_url`. Connections are opened lazily.
    pub fn connect(database_url: &str, max_size: usize) -> anyhow::Result<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(max_size)
            .build()
            .context("building database pool")?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))?;
        crate::migration::run_migration(&mut conn).await
    }

    async fn conn(&self) -> Result<Object<AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("diesel pool: {e}")))
    }
}

fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

fn is_foreign_key_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
    )
}

async fn lock_employee(
    conn: &mut AsyncPgConnection,
    employee_id: i64,
) -> QueryResult<Option<Employee>> {
    employees::table
        .find(employee_id)
        .for_update()
        .first::<Employee>(conn)
        .await
        .optional()
}

async fn lock_project(
    conn: &mut AsyncPgConnection,
    project_id: i64,
) -> QueryResult<Option<Project>> {
    projects::table
        .find(project_id)
        .for_update()
        .first::<Project>(conn)
        .await
        .optional()
}

async fn employee_hours(
    conn: &mut AsyncPgConnection,
    employee_id: i64,
    exclude: Option<i64>,
) -> QueryResult<i64> {
    let mut query = allocations::table
        .filter(allocations::employee_id.eq(employee_id))
        .select(sum(allocations::allocation_hours))
        .into_boxed();
    if let Some(allocation_id) = exclude {
        query = query.filter(allocations::allocation_id.ne(allocation_id));
    }
    let total: Option<i64> = query.get_result(conn).await?;
    Ok(total.unwrap_or(0))
}

async fn project_hours(
    conn: &mut AsyncPgConnection,
    project_id: i64,
    exclude: Option<i64>,
) -> QueryResult<i64> {
    let mut query = allocations::table
        .filter(allocations::project_id.eq(project_id))
        .select(sum(allocations::allocation_hours))
        .into_boxed();
    if let Some(allocation_id) = exclude {
        query = query.filter(allocations::allocation_id.ne(allocation_id));
    }
    let total: Option<i64> = query.get_result(conn).await?;
    Ok(total.unwrap_or(0))
}

/// Transaction-scoped view handed to the validator.
struct PgAllocationStore<'c> {
    conn: &'c mut AsyncPgConnection,
}

#[async_trait]
impl<'c> AllocationStore for PgAllocationStore<'c> {
    async fn get_employee(&mut self, employee_id: i64) -> Result<Option<Employee>> {
        Ok(lock_employee(self.conn, employee_id).await?)
    }

    async fn get_project(&mut self, project_id: i64) -> Result<Option<Project>> {
        Ok(lock_project(self.conn, project_id).await?)
    }

    async fn get_allocation(&mut self, allocation_id: i64) -> Result<Option<Allocation>> {
        let allocation = allocations::table
            .find(allocation_id)
            .for_update()
            .first::<Allocation>(&mut *self.conn)
            .await
            .optional()?;
        Ok(allocation)
    }

    async fn sum_hours_by_employee(
        &mut self,
        employee_id: i64,
        exclude: Option<i64>,
    ) -> Result<i64> {
        Ok(employee_hours(self.conn, employee_id, exclude).await?)
    }

    async fn sum_hours_by_project(&mut self, project_id: i64, exclude: Option<i64>) -> Result<i64> {
        Ok(project_hours(self.conn, project_id, exclude).await?)
    }

    async fn find_allocation_by_pair(
        &mut self,
        employee_id: i64,
        project_id: i64,
        exclude: Option<i64>,
    ) -> Result<Option<Allocation>> {
        let mut query = allocations::table
            .filter(allocations::employee_id.eq(employee_id))
            .filter(allocations::project_id.eq(project_id))
            .into_boxed();
        if let Some(allocation_id) = exclude {
            query = query.filter(allocations::allocation_id.ne(allocation_id));
        }
        let allocation = query
            .first::<Allocation>(&mut *self.conn)
            .await
            .optional()?;
        Ok(allocation)
    }

    async fn write_allocation(
        &mut self,
        existing: Option<i64>,
        values: &NewAllocation,
    ) -> Result<Allocation> {
        let written = match existing {
            Some(allocation_id) => {
                diesel::update(allocations::table.find(allocation_id))
                    .set(values)
                    .get_result::<Allocation>(&mut *self.conn)
                    .await
            }
            None => {
                diesel::insert_into(allocations::table)
                    .values(values)
                    .get_result::<Allocation>(&mut *self.conn)
                    .await
            }
        };
        written.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::from(Conflict::DuplicatePairRace)
            } else {
                AppError::from(e)
            }
        })
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn list_employees(&self) -> Result<Vec<Employee>> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let results = employees::table
            .order(employees::employee_id.asc())
            .load::<Employee>(conn)
            .await?;
        Ok(results)
    }

    async fn create_employee(&self, new_employee: NewEmployee) -> Result<Employee> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let taken: i64 = employees::table
            .filter(employees::employee_name.eq(&new_employee.employee_name))
            .count()
            .get_result(conn)
            .await?;
        if taken > 0 {
            return Err(Conflict::EmployeeNameTaken(new_employee.employee_name).into());
        }

        let employee = diesel::insert_into(employees::table)
            .values(&new_employee)
            .get_result::<Employee>(conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::from(Conflict::EmployeeNameTaken(
                        new_employee.employee_name.clone(),
                    ))
                } else {
                    AppError::from(e)
                }
            })?;

        tracing::info!(employee_id = employee.employee_id, "Employee created");
        Ok(employee)
    }

    async fn update_employee(&self, employee_id: i64, changes: NewEmployee) -> Result<Employee> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let employee = conn
            .transaction::<_, AppError, _>(move |conn| {
                async move {
                    lock_employee(conn, employee_id)
                        .await?
                        .ok_or(AppError::NotFound(Entity::Employee))?;

                    let taken: i64 = employees::table
                        .filter(employees::employee_name.eq(&changes.employee_name))
                        .filter(employees::employee_id.ne(employee_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    if taken > 0 {
                        return Err(Conflict::EmployeeNameTaken(changes.employee_name).into());
                    }

                    let allocated = employee_hours(conn, employee_id, None).await?;
                    validator::check_available_hours_update(allocated, changes.available_hrs)?;

                    diesel::update(employees::table.find(employee_id))
                        .set(&changes)
                        .get_result::<Employee>(conn)
                        .await
                        .map_err(|e| {
                            if is_unique_violation(&e) {
                                AppError::from(Conflict::EmployeeNameTaken(
                                    changes.employee_name.clone(),
                                ))
                            } else {
                                AppError::from(e)
                            }
                        })
                }
                .scope_boxed()
            })
            .await?;

        tracing::info!(employee_id, "Employee updated");
        Ok(employee)
    }

    async fn delete_employee(&self, employee_id: i64) -> Result<Employee> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let employee = conn
            .transaction::<_, AppError, _>(move |conn| {
                async move {
                    let employee = lock_employee(conn, employee_id)
                        .await?
                        .ok_or(AppError::NotFound(Entity::Employee))?;

                    let references: i64 = allocations::table
                        .filter(allocations::employee_id.eq(employee_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    if references > 0 {
                        return Err(Conflict::EmployeeInUse {
                            allocations: references,
                        }
                        .into());
                    }

                    diesel::delete(employees::table.find(employee_id))
                        .execute(conn)
                        .await
                        .map_err(|e| {
                            if is_foreign_key_violation(&e) {
                                AppError::from(Conflict::StillReferenced(Entity::Employee))
                            } else {
                                AppError::from(e)
                            }
                        })?;
                    Ok(employee)
                }
                .scope_boxed()
            })
            .await?;

        crate::metrics::entity_deleted("employee");
        tracing::info!(employee_id, "Employee deleted");
        Ok(employee)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let results = projects::table
            .order(projects::project_id.asc())
            .load::<Project>(conn)
            .await?;
        Ok(results)
    }

    async fn create_project(&self, new_project: NewProject) -> Result<Project> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let taken: i64 = projects::table
            .filter(projects::project_name.eq(&new_project.project_name))
            .count()
            .get_result(conn)
            .await?;
        if taken > 0 {
            return Err(Conflict::ProjectNameTaken(new_project.project_name).into());
        }

        let project = diesel::insert_into(projects::table)
            .values(&new_project)
            .get_result::<Project>(conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::from(Conflict::ProjectNameTaken(new_project.project_name.clone()))
                } else {
                    AppError::from(e)
                }
            })?;

        tracing::info!(project_id = project.project_id, "Project created");
        Ok(project)
    }

    async fn update_project(&self, project_id: i64, changes: NewProject) -> Result<Project> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let project = conn
            .transaction::<_, AppError, _>(move |conn| {
                async move {
                    lock_project(conn, project_id)
                        .await?
                        .ok_or(AppError::NotFound(Entity::Project))?;

                    let taken: i64 = projects::table
                        .filter(projects::project_name.eq(&changes.project_name))
                        .filter(projects::project_id.ne(project_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    if taken > 0 {
                        return Err(Conflict::ProjectNameTaken(changes.project_name).into());
                    }

                    let allocated = project_hours(conn, project_id, None).await?;
                    validator::check_duration_update(allocated, changes.project_duration)?;

                    diesel::update(projects::table.find(project_id))
                        .set(&changes)
                        .get_result::<Project>(conn)
                        .await
                        .map_err(|e| {
                            if is_unique_violation(&e) {
                                AppError::from(Conflict::ProjectNameTaken(
                                    changes.project_name.clone(),
                                ))
                            } else {
                                AppError::from(e)
                            }
                        })
                }
                .scope_boxed()
            })
            .await?;

        tracing::info!(project_id, "Project updated");
        Ok(project)
    }

    async fn delete_project(&self, project_id: i64) -> Result<Project> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let project = conn
            .transaction::<_, AppError, _>(move |conn| {
                async move {
                    let project = lock_project(conn, project_id)
                        .await?
                        .ok_or(AppError::NotFound(Entity::Project))?;

                    let references: i64 = allocations::table
                        .filter(allocations::project_id.eq(project_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    if references > 0 {
                        return Err(Conflict::ProjectInUse {
                            allocations: references,
                        }
                        .into());
                    }

                    diesel::delete(projects::table.find(project_id))
                        .execute(conn)
                        .await
                        .map_err(|e| {
                            if is_foreign_key_violation(&e) {
                                AppError::from(Conflict::StillReferenced(Entity::Project))
                            } else {
                                AppError::from(e)
                            }
                        })?;
                    Ok(project)
                }
                .scope_boxed()
            })
            .await?;

        crate::metrics::entity_deleted("project");
        tracing::info!(project_id, "Project deleted");
        Ok(project)
    }

    async fn list_allocations(&self) -> Result<Vec<Allocation>> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let results = allocations::table
            .order(allocations::allocation_id.asc())
            .load::<Allocation>(conn)
            .await?;
        Ok(results)
    }

    async fn list_allocation_details(&self) -> Result<Vec<AllocationDetail>> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let results = diesel::sql_query(DETAIL_SQL)
            .load::<AllocationDetail>(conn)
            .await?;
        Ok(results)
    }

    async fn create_allocation(&self, new_allocation: NewAllocation) -> Result<Allocation> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, AppError, _>(move |conn| {
            async move {
                let mut store = PgAllocationStore { conn };
                validator::commit_allocation(&mut store, &new_allocation, None).await
            }
            .scope_boxed()
        })
        .await
    }

    async fn update_allocation(
        &self,
        allocation_id: i64,
        changes: NewAllocation,
    ) -> Result<Allocation> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, AppError, _>(move |conn| {
            async move {
                let mut store = PgAllocationStore { conn };
                validator::commit_allocation(&mut store, &changes, Some(allocation_id)).await
            }
            .scope_boxed()
        })
        .await
    }

    async fn delete_allocation(&self, allocation_id: i64) -> Result<Allocation> {
        let mut pooled = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let allocation = diesel::delete(allocations::table.find(allocation_id))
            .get_result::<Allocation>(conn)
            .await
            .optional()?
            .ok_or(AppError::NotFound(Entity::Allocation))?;

        crate::metrics::entity_deleted("allocation");
        tracing::info!(allocation_id, "Allocation deleted");
        Ok(allocation)
    }
}
