// src/handlers/programs.rs

use axum::extract::{Query, State};
use serde_json::{Map, Value};

use crate::{
    common::{
        error::AppError,
        extract::{AppJson, AppPath},
        response::ApiResponse,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{ProgramCreators, RequireRole},
    },
    models::program::{CreateProgramPayload, Program, StatusActionPayload},
    services::program_filter::{ProgramFilter, ProgramFilterParams},
};

// GET /programs?status=Plan,In Progress&assignedOfficerId=7
pub async fn list_programs(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(params): Query<ProgramFilterParams>,
) -> Result<ApiResponse<Vec<Program>>, AppError> {
    let filter = ProgramFilter::try_from(params)?;
    let programs = app_state.program_service.list(&principal, &filter).await?;
    Ok(ApiResponse::success(programs))
}

// GET /programs/{id}
pub async fn get_program(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> Result<ApiResponse<Program>, AppError> {
    let program = app_state.program_service.get(&principal, id).await?;
    Ok(ApiResponse::success(program))
}

// POST /programs
pub async fn create_program(
    State(app_state): State<AppState>,
    RequireRole(principal, _): RequireRole<ProgramCreators>,
    AppJson(payload): AppJson<CreateProgramPayload>,
) -> Result<ApiResponse<Program>, AppError> {
    let program = app_state.program_service.create(&principal, payload).await?;
    Ok(ApiResponse::created(program))
}

// PUT /programs/{id}; partial body, every key authorized before anything is written
pub async fn update_program(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
    AppJson(body): AppJson<Map<String, Value>>,
) -> Result<ApiResponse<Program>, AppError> {
    let program = app_state.program_service.update(&principal, id, body).await?;
    Ok(ApiResponse::success(program))
}

// POST /programs/{id}/status
pub async fn change_program_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<StatusActionPayload>,
) -> Result<ApiResponse<Program>, AppError> {
    let program = app_state
        .program_service
        .change_status(&principal, id, payload.action)
        .await?;
    Ok(ApiResponse::success(program))
}

// PUT /programs/{task_id}/stations/{station_id}
pub async fn update_station(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    AppPath((task_id, station_id)): AppPath<(i32, i16)>,
    AppJson(body): AppJson<Map<String, Value>>,
) -> Result<ApiResponse<Program>, AppError> {
    let program = app_state
        .program_service
        .update_station(&principal, task_id, station_id, body)
        .await?;
    Ok(ApiResponse::success(program))
}
