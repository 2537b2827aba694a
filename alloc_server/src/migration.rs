//! Schema migration for the allocation tables.

use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};

/// SQL migration for the three allocation tables.
///
/// Idempotent. The UNIQUE and FOREIGN KEY constraints are the store-level
/// backstop for the duplicate-pair check and the deletion block.
pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
    employee_id       BIGSERIAL PRIMARY KEY,
    employee_name     VARCHAR(100) NOT NULL UNIQUE,
    skilled_language  VARCHAR(100) NOT NULL,
    available_hrs     INTEGER NOT NULL CHECK (available_hrs >= 0)
);

CREATE TABLE IF NOT EXISTS projects (
    project_id              BIGSERIAL PRIMARY KEY,
    project_name            VARCHAR(100) NOT NULL UNIQUE,
    project_duration        INTEGER NOT NULL CHECK (project_duration > 0),
    project_skill_required  VARCHAR(100) NOT NULL
);

CREATE TABLE IF NOT EXISTS allocations (
    allocation_id     BIGSERIAL PRIMARY KEY,
    employee_id       BIGINT NOT NULL REFERENCES employees(employee_id) ON DELETE RESTRICT,
    project_id        BIGINT NOT NULL REFERENCES projects(project_id) ON DELETE RESTRICT,
    allocation_hours  INTEGER NOT NULL CHECK (allocation_hours BETWEEN 1 AND 100),
    CONSTRAINT allocations_employee_project_key UNIQUE (employee_id, project_id)
);

CREATE INDEX IF NOT EXISTS idx_allocations_employee ON allocations (employee_id);
CREATE INDEX IF NOT EXISTS idx_allocations_project ON allocations (project_id);
"#;

/// Run the allocation schema migration.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL)
        .await
        .map_err(|e| anyhow::anyhow!("allocation migration failed: {e}"))?;
    Ok(())
}
