// src/db/reference_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::{
    common::error::AppError,
    db::constraint_error,
    models::reference::{Activity, Department, Division, Domain, EngagementType, ProcessStep},
};

// Divisions, departments, domains, the activity pool and engagement type templates
#[derive(Clone)]
pub struct ReferenceRepository {
    pool: PgPool,
}

impl ReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // --- Divisions & departments ---

    pub async fn list_divisions(&self) -> Result<Vec<Division>, AppError> {
        let rows = sqlx::query_as::<_, Division>("SELECT id, name, is_internal FROM divisions ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create_division(&self, name: &str, is_internal: bool) -> Result<Division, AppError> {
        let row = sqlx::query_as::<_, Division>(
            "INSERT INTO divisions (name, is_internal) VALUES ($1, $2) RETURNING id, name, is_internal",
        )
        .bind(name)
        .bind(is_internal)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Division already exists"))?;
        Ok(row)
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        let rows = sqlx::query_as::<_, Department>(
            r#"
            SELECT d.id, d.name, d.division_id, dv.name AS division_name
            FROM departments d
            LEFT JOIN divisions dv ON dv.id = d.division_id
            ORDER BY dv.name, d.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_department(&self, name: &str, division_id: i32) -> Result<Department, AppError> {
        let row = sqlx::query_as::<_, Department>(
            r#"
            WITH inserted AS (
                INSERT INTO departments (name, division_id) VALUES ($1, $2)
                RETURNING id, name, division_id
            )
            SELECT i.id, i.name, i.division_id, dv.name AS division_name
            FROM inserted i
            LEFT JOIN divisions dv ON dv.id = i.division_id
            "#,
        )
        .bind(name)
        .bind(division_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Department already exists in this division"))?;
        Ok(row)
    }

    // --- Domains & activities ---

    pub async fn list_domains(&self) -> Result<Vec<Domain>, AppError> {
        let rows = sqlx::query_as::<_, Domain>("SELECT id, description FROM domains ORDER BY description")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create_domain(&self, description: &str) -> Result<Domain, AppError> {
        let row = sqlx::query_as::<_, Domain>(
            "INSERT INTO domains (description) VALUES ($1) RETURNING id, description",
        )
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Domain already exists"))?;
        Ok(row)
    }

    pub async fn list_activities(&self) -> Result<Vec<Activity>, AppError> {
        let rows = sqlx::query_as::<_, Activity>(
            "SELECT id, name, tools_and_resources FROM activity_pool ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_activity(
        &self,
        name: &str,
        tools_and_resources: Option<&str>,
    ) -> Result<Activity, AppError> {
        let row = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activity_pool (name, tools_and_resources) VALUES ($1, $2)
            RETURNING id, name, tools_and_resources
            "#,
        )
        .bind(name)
        .bind(tools_and_resources)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Activity already exists"))?;
        Ok(row)
    }

    // --- Engagement types ---

    pub async fn list_engagement_types(&self) -> Result<Vec<EngagementType>, AppError> {
        let mut types = sqlx::query_as::<_, EngagementType>(
            "SELECT id, name FROM engagement_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let rows: Vec<(i32, i16, Option<i32>)> = sqlx::query_as(
            r#"
            SELECT engagement_type_id, station_id, activity_id
            FROM engagement_type_processes
            ORDER BY engagement_type_id, station_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut steps: HashMap<i32, Vec<ProcessStep>> = HashMap::new();
        for (type_id, station_id, activity_id) in rows {
            steps
                .entry(type_id)
                .or_default()
                .push(ProcessStep { station_id, activity_id });
        }
        for engagement_type in types.iter_mut() {
            engagement_type.processes = steps.remove(&engagement_type.id).unwrap_or_default();
        }
        Ok(types)
    }

    pub async fn create_engagement_type(&self, name: &str) -> Result<EngagementType, AppError> {
        let row = sqlx::query_as::<_, EngagementType>(
            "INSERT INTO engagement_types (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Engagement type already exists"))?;
        Ok(row)
    }

    /// Replaces a template's steps. Delete and insert commit together or not at all.
    pub async fn replace_processes(
        &self,
        engagement_type_id: i32,
        steps: Vec<ProcessStep>,
    ) -> Result<Vec<ProcessStep>, AppError> {
        let mut tx = self.pool.begin().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM engagement_types WHERE id = $1)")
                .bind(engagement_type_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Engagement type not found".into()));
        }

        sqlx::query("DELETE FROM engagement_type_processes WHERE engagement_type_id = $1")
            .bind(engagement_type_id)
            .execute(&mut *tx)
            .await?;

        if !steps.is_empty() {
            let mut insert = QueryBuilder::<Postgres>::new(
                "INSERT INTO engagement_type_processes (engagement_type_id, station_id, activity_id) ",
            );
            insert.push_values(steps.iter(), |mut row, step| {
                row.push_bind(engagement_type_id)
                    .push_bind(step.station_id)
                    .push_bind(step.activity_id);
            });
            insert
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| constraint_error(e, "Duplicate station in process"))?;
        }

        tx.commit().await?;

        let mut steps = steps;
        steps.sort_by_key(|step| step.station_id);
        Ok(steps)
    }
}
