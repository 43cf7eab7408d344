// src/handlers/auth.rs

use axum::{Json, body::Bytes, extract::State};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    common::{error::AppError, extract::AppJson, response::ApiResponse},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::{LoginPayload, LoginResponse, LogoutPayload, RefreshPayload, RefreshResponse},
        worker::WorkerProfile,
    },
};

// POST /auth/login, /workers/login
pub async fn login(
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<LoginPayload>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;

    let (worker, pair) = app_state
        .auth_service
        .login(payload.employee_id.trim(), &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        user: WorkerProfile::from(&worker),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

// POST /auth/refresh, /workers/refresh
pub async fn refresh(
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<RefreshPayload>,
) -> Result<Json<RefreshResponse>, AppError> {
    let token = payload
        .refresh_token
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingRefreshToken)?;

    let pair = app_state.auth_service.refresh(&token).await?;

    Ok(Json(RefreshResponse {
        success: true,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

// POST /auth/logout, /workers/logout. Always succeeds; a body is optional.
pub async fn logout(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let payload: LogoutPayload = serde_json::from_slice(&body).unwrap_or_default();
    app_state.auth_service.logout(payload.refresh_token.as_deref())?;

    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

// GET /workers/me
pub async fn me(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<ApiResponse<WorkerProfile>, AppError> {
    let worker = app_state.auth_service.current_worker(&principal).await?;
    Ok(ApiResponse::success(WorkerProfile::from(&worker)))
}
