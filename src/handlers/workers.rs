// src/handlers/workers.rs

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{
    common::{
        error::AppError,
        extract::{AppJson, AppPath},
        response::ApiResponse,
    },
    config::AppState,
    middleware::rbac::{RequireRole, WorkerEditors, WorkerReaders},
    models::worker::{CreateWorkerPayload, UpdateWorkerPayload, Worker},
};

// GET /workers
pub async fn list_workers(
    State(app_state): State<AppState>,
    _guard: RequireRole<WorkerReaders>,
) -> Result<ApiResponse<Vec<Worker>>, AppError> {
    let workers = app_state.worker_service.list().await?;
    Ok(ApiResponse::success(workers))
}

// POST /workers
pub async fn create_worker(
    State(app_state): State<AppState>,
    _guard: RequireRole<WorkerEditors>,
    AppJson(payload): AppJson<CreateWorkerPayload>,
) -> Result<ApiResponse<Worker>, AppError> {
    let worker = app_state.worker_service.create(payload).await?;
    Ok(ApiResponse::created(worker))
}

// PUT /workers/{id}
pub async fn update_worker(
    State(app_state): State<AppState>,
    _guard: RequireRole<WorkerEditors>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateWorkerPayload>,
) -> Result<ApiResponse<Worker>, AppError> {
    let worker = app_state.worker_service.update(id, payload).await?;
    Ok(ApiResponse::success(worker))
}

// DELETE /workers/{id}
pub async fn delete_worker(
    State(app_state): State<AppState>,
    RequireRole(principal, _): RequireRole<WorkerEditors>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Value>, AppError> {
    if id == principal.worker_id {
        return Err(AppError::Conflict("You cannot delete your own account".into()));
    }
    app_state.worker_service.delete(id).await?;
    Ok(Json(json!({ "success": true, "message": "Worker deleted" })))
}
