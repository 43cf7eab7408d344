// src/handlers/settings.rs

use axum::extract::State;

use crate::{
    common::{error::AppError, extract::AppJson, response::ApiResponse},
    config::AppState,
    db::PermissionsSource,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{InfrastructureAdmins, RequireRole},
    },
    models::settings::{DisplayLabels, PermissionsConfig},
};

// GET /settings/permissions
pub async fn get_permissions(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<ApiResponse<PermissionsConfig>, AppError> {
    let config = app_state.settings_repo.permissions().await?;
    Ok(ApiResponse::success(config))
}

// PUT /settings/permissions
pub async fn update_permissions(
    State(app_state): State<AppState>,
    RequireRole(principal, _): RequireRole<InfrastructureAdmins>,
    AppJson(config): AppJson<PermissionsConfig>,
) -> Result<ApiResponse<PermissionsConfig>, AppError> {
    let saved = app_state.settings_repo.save_permissions(config).await?;
    tracing::info!(
        worker_id = principal.worker_id,
        assign = ?saved.assign_permissions,
        close = ?saved.close_permissions,
        "Permissions config updated"
    );
    Ok(ApiResponse::success(saved))
}

// GET /settings/labels
pub async fn get_labels(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<ApiResponse<DisplayLabels>, AppError> {
    let labels = app_state.settings_repo.labels().await?;
    Ok(ApiResponse::success(labels))
}

// PUT /settings/labels; omitted labels fall back to their defaults
pub async fn update_labels(
    State(app_state): State<AppState>,
    _guard: RequireRole<InfrastructureAdmins>,
    AppJson(labels): AppJson<DisplayLabels>,
) -> Result<ApiResponse<DisplayLabels>, AppError> {
    let saved = app_state.settings_repo.save_labels(labels).await?;
    Ok(ApiResponse::success(saved))
}
