// src/db/worker_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{WorkerDirectory, WorkerStore, constraint_error},
    models::worker::{Worker, WorkerDraft},
};

const WORKER_SELECT: &str = r#"
    SELECT
        w.id, w.employee_id, w.full_name, w.role_code,
        w.division_id, dv.name AS division_name,
        w.department_id, dp.name AS department_name,
        w.procurement_team, w.email, w.password_hash,
        w.last_login, w.created_at, w.updated_at
    FROM workers w
    LEFT JOIN divisions dv ON dv.id = w.division_id
    LEFT JOIN departments dp ON dp.id = w.department_id
"#;

const DUPLICATE_EMPLOYEE: &str = "Employee ID already exists";

// Everything that touches the `workers` table
#[derive(Clone)]
pub struct WorkerRepository {
    pool: PgPool,
}

impl WorkerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkerStore for WorkerRepository {
    async fn list(&self) -> Result<Vec<Worker>, AppError> {
        let query = format!("{} ORDER BY w.full_name, w.id", WORKER_SELECT);
        let workers = sqlx::query_as::<_, Worker>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(workers)
    }

    async fn create(&self, draft: &WorkerDraft, password_hash: &str) -> Result<Worker, AppError> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO workers
                (employee_id, full_name, role_code, division_id, department_id,
                 procurement_team, email, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&draft.employee_id)
        .bind(&draft.full_name)
        .bind(draft.role.code())
        .bind(draft.division_id)
        .bind(draft.department_id)
        .bind(&draft.procurement_team)
        .bind(&draft.email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, DUPLICATE_EMPLOYEE))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Worker not found".into()))
    }

    // A `None` hash keeps the stored password
    async fn update(
        &self,
        id: i32,
        draft: &WorkerDraft,
        password_hash: Option<&str>,
    ) -> Result<Worker, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE workers SET
                employee_id = $2, full_name = $3, role_code = $4,
                division_id = $5, department_id = $6, procurement_team = $7,
                email = $8, password_hash = COALESCE($9, password_hash),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&draft.employee_id)
        .bind(&draft.full_name)
        .bind(draft.role.code())
        .bind(draft.division_id)
        .bind(draft.department_id)
        .bind(&draft.procurement_team)
        .bind(&draft.email)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_error(e, DUPLICATE_EMPLOYEE))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Worker not found".into()));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Worker not found".into()))
    }

    async fn is_referenced(&self, id: i32) -> Result<bool, AppError> {
        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM programs WHERE requester_id = $1 OR assigned_officer_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(referenced)
    }

    async fn delete(&self, id: i32) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM workers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict("Worker is referenced by existing programs".into())
                }
                _ => e.into(),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Worker not found".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkerDirectory for WorkerRepository {
    async fn find_by_employee_id(&self, employee_id: &str) -> Result<Option<Worker>, AppError> {
        let query = format!("{} WHERE w.employee_id = $1", WORKER_SELECT);
        let worker = sqlx::query_as::<_, Worker>(&query)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(worker)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Worker>, AppError> {
        let query = format!("{} WHERE w.id = $1", WORKER_SELECT);
        let worker = sqlx::query_as::<_, Worker>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(worker)
    }

    async fn record_login(&self, id: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE workers SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
