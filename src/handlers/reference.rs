// src/handlers/reference.rs

use axum::extract::State;
use std::collections::HashSet;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        extract::{AppJson, AppPath},
        response::ApiResponse,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{InfrastructureAdmins, RequireRole},
    },
    models::reference::{
        Activity, CreateActivityPayload, CreateDepartmentPayload, CreateDivisionPayload,
        CreateDomainPayload, CreateEngagementTypePayload, Department, Division, Domain,
        EngagementType, ProcessStep, ReplaceProcessesPayload,
    },
};

// --- Divisions ---

pub async fn list_divisions(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<Division>>, AppError> {
    Ok(ApiResponse::success(app_state.reference_repo.list_divisions().await?))
}

pub async fn create_division(
    State(app_state): State<AppState>,
    _guard: RequireRole<InfrastructureAdmins>,
    AppJson(payload): AppJson<CreateDivisionPayload>,
) -> Result<ApiResponse<Division>, AppError> {
    payload.validate()?;
    let division = app_state
        .reference_repo
        .create_division(payload.name.trim(), payload.is_internal)
        .await?;
    Ok(ApiResponse::created(division))
}

// --- Departments ---

pub async fn list_departments(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<Department>>, AppError> {
    Ok(ApiResponse::success(app_state.reference_repo.list_departments().await?))
}

pub async fn create_department(
    State(app_state): State<AppState>,
    _guard: RequireRole<InfrastructureAdmins>,
    AppJson(payload): AppJson<CreateDepartmentPayload>,
) -> Result<ApiResponse<Department>, AppError> {
    payload.validate()?;
    let department = app_state
        .reference_repo
        .create_department(payload.name.trim(), payload.division_id)
        .await?;
    Ok(ApiResponse::created(department))
}

// --- Domains ---

pub async fn list_domains(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<Domain>>, AppError> {
    Ok(ApiResponse::success(app_state.reference_repo.list_domains().await?))
}

pub async fn create_domain(
    State(app_state): State<AppState>,
    _guard: RequireRole<InfrastructureAdmins>,
    AppJson(payload): AppJson<CreateDomainPayload>,
) -> Result<ApiResponse<Domain>, AppError> {
    payload.validate()?;
    let domain = app_state
        .reference_repo
        .create_domain(payload.description.trim())
        .await?;
    Ok(ApiResponse::created(domain))
}

// --- Activity pool ---

pub async fn list_activities(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<Activity>>, AppError> {
    Ok(ApiResponse::success(app_state.reference_repo.list_activities().await?))
}

pub async fn create_activity(
    State(app_state): State<AppState>,
    _guard: RequireRole<InfrastructureAdmins>,
    AppJson(payload): AppJson<CreateActivityPayload>,
) -> Result<ApiResponse<Activity>, AppError> {
    payload.validate()?;
    let activity = app_state
        .reference_repo
        .create_activity(payload.name.trim(), payload.tools_and_resources.as_deref())
        .await?;
    Ok(ApiResponse::created(activity))
}

// --- Engagement types ---

pub async fn list_engagement_types(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<EngagementType>>, AppError> {
    Ok(ApiResponse::success(app_state.reference_repo.list_engagement_types().await?))
}

pub async fn create_engagement_type(
    State(app_state): State<AppState>,
    _guard: RequireRole<InfrastructureAdmins>,
    AppJson(payload): AppJson<CreateEngagementTypePayload>,
) -> Result<ApiResponse<EngagementType>, AppError> {
    payload.validate()?;
    let engagement_type = app_state
        .reference_repo
        .create_engagement_type(payload.name.trim())
        .await?;
    Ok(ApiResponse::created(engagement_type))
}

fn check_process(steps: &[ProcessStep]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for step in steps {
        if step.station_id <= 0 {
            return Err(AppError::Validation("Station ids must be positive".into()));
        }
        if !seen.insert(step.station_id) {
            return Err(AppError::Validation(format!(
                "Station {} appears more than once",
                step.station_id
            )));
        }
    }
    Ok(())
}

// PUT /engagement-types/{id}/processes
pub async fn replace_processes(
    State(app_state): State<AppState>,
    _guard: RequireRole<InfrastructureAdmins>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<ReplaceProcessesPayload>,
) -> Result<ApiResponse<Vec<ProcessStep>>, AppError> {
    check_process(&payload.processes)?;
    let steps = app_state
        .reference_repo
        .replace_processes(id, payload.processes)
        .await?;
    Ok(ApiResponse::success(steps))
}
