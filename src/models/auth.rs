// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    role::{Role, RoleError},
    worker::{Worker, WorkerProfile},
};

/// The authenticated identity making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub worker_id: i32,
    pub employee_id: String,
    pub role: Role,
    pub procurement_team: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

// Claims carried by both access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub worker_id: i32,
    pub employee_id: String,
    pub role_code: i16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procurement_team: Option<String>,
    pub kind: TokenKind,
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl TryFrom<&Claims> for Principal {
    type Error = RoleError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        Ok(Principal {
            worker_id: claims.worker_id,
            employee_id: claims.employee_id.clone(),
            role: Role::from_code(claims.role_code)?,
            procurement_team: claims.procurement_team.clone(),
        })
    }
}

impl From<&Worker> for Principal {
    fn from(worker: &Worker) -> Self {
        Principal {
            worker_id: worker.id,
            employee_id: worker.employee_id.clone(),
            role: worker.role_code,
            procurement_team: worker.procurement_team.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "Employee ID is required"))]
    pub employee_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutPayload {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: WorkerProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}
