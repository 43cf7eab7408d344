// src/services/worker_service.rs

use bcrypt::hash;
use std::sync::Arc;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::WorkerStore,
    models::{
        role::Role,
        worker::{CreateWorkerPayload, UpdateWorkerPayload, Worker, WorkerDraft},
    },
};

#[derive(Clone)]
pub struct WorkerService {
    repo: Arc<dyn WorkerStore>,
    bcrypt_cost: u32,
}

async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || hash(&password, cost))
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;
    Ok(hashed)
}

impl WorkerService {
    pub fn new(repo: Arc<dyn WorkerStore>, bcrypt_cost: u32) -> Self {
        Self { repo, bcrypt_cost }
    }

    pub async fn list(&self) -> Result<Vec<Worker>, AppError> {
        self.repo.list().await
    }

    pub async fn create(&self, payload: CreateWorkerPayload) -> Result<Worker, AppError> {
        payload.validate()?;
        let role = Role::from_code(payload.role_code)?;

        let draft = WorkerDraft {
            employee_id: payload.employee_id,
            full_name: payload.full_name.trim().to_string(),
            role,
            division_id: payload.division_id,
            department_id: payload.department_id,
            procurement_team: payload.procurement_team,
            email: payload.email,
        }
        .normalized();

        let password_hash = hash_password(payload.password, self.bcrypt_cost).await?;
        let worker = self.repo.create(&draft, &password_hash).await?;
        tracing::info!(worker_id = worker.id, role = role.code(), "Worker created");
        Ok(worker)
    }

    pub async fn update(&self, id: i32, payload: UpdateWorkerPayload) -> Result<Worker, AppError> {
        payload.validate()?;
        let role = Role::from_code(payload.role_code)?;

        let draft = WorkerDraft {
            employee_id: payload.employee_id,
            full_name: payload.full_name.trim().to_string(),
            role,
            division_id: payload.division_id,
            department_id: payload.department_id,
            procurement_team: payload.procurement_team,
            email: payload.email,
        }
        .normalized();

        let password_hash = match payload.password {
            Some(password) => Some(hash_password(password, self.bcrypt_cost).await?),
            None => None,
        };

        let worker = self.repo.update(id, &draft, password_hash.as_deref()).await?;
        tracing::info!(worker_id = id, role = role.code(), "Worker updated");
        Ok(worker)
    }

    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        if self.repo.is_referenced(id).await? {
            return Err(AppError::Conflict(
                "Worker is referenced by existing programs".into(),
            ));
        }
        self.repo.delete(id).await?;
        tracing::info!(worker_id = id, "Worker deleted");
        Ok(())
    }
}
