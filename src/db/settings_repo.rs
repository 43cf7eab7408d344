// src/db/settings_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::PermissionsSource,
    models::settings::{DisplayLabels, PermissionsConfig},
};

// Single-row tables (id = 1). No row means defaults.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn save_permissions(&self, config: PermissionsConfig) -> Result<PermissionsConfig, AppError> {
        let saved = sqlx::query_as::<_, PermissionsConfig>(
            r#"
            INSERT INTO permissions_config (id, assign_permissions, close_permissions)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE SET
                assign_permissions = EXCLUDED.assign_permissions,
                close_permissions = EXCLUDED.close_permissions,
                updated_at = NOW()
            RETURNING assign_permissions, close_permissions
            "#,
        )
        .bind(config.assign_permissions)
        .bind(config.close_permissions)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    pub async fn labels(&self) -> Result<DisplayLabels, AppError> {
        let labels = sqlx::query_as::<_, DisplayLabels>(
            r#"
            SELECT open_label, plan_label, in_progress_label, complete_label, done_label,
                   freeze_label, cancel_label, division_label, department_label, team_label
            FROM display_labels
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(labels.unwrap_or_default())
    }

    pub async fn save_labels(&self, labels: DisplayLabels) -> Result<DisplayLabels, AppError> {
        let saved = sqlx::query_as::<_, DisplayLabels>(
            r#"
            INSERT INTO display_labels
                (id, open_label, plan_label, in_progress_label, complete_label, done_label,
                 freeze_label, cancel_label, division_label, department_label, team_label)
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                open_label = EXCLUDED.open_label,
                plan_label = EXCLUDED.plan_label,
                in_progress_label = EXCLUDED.in_progress_label,
                complete_label = EXCLUDED.complete_label,
                done_label = EXCLUDED.done_label,
                freeze_label = EXCLUDED.freeze_label,
                cancel_label = EXCLUDED.cancel_label,
                division_label = EXCLUDED.division_label,
                department_label = EXCLUDED.department_label,
                team_label = EXCLUDED.team_label,
                updated_at = NOW()
            RETURNING open_label, plan_label, in_progress_label, complete_label, done_label,
                      freeze_label, cancel_label, division_label, department_label, team_label
            "#,
        )
        .bind(labels.open_label)
        .bind(labels.plan_label)
        .bind(labels.in_progress_label)
        .bind(labels.complete_label)
        .bind(labels.done_label)
        .bind(labels.freeze_label)
        .bind(labels.cancel_label)
        .bind(labels.division_label)
        .bind(labels.department_label)
        .bind(labels.team_label)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }
}

#[async_trait]
impl PermissionsSource for SettingsRepository {
    async fn permissions(&self) -> Result<PermissionsConfig, AppError> {
        let config = sqlx::query_as::<_, PermissionsConfig>(
            "SELECT assign_permissions, close_permissions FROM permissions_config WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(config.unwrap_or_default())
    }
}
