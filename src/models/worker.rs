// src/models/worker.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::role::Role;

// A worker row, joined with its division/department names
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub id: i32,
    pub employee_id: String,
    pub full_name: String,
    #[sqlx(try_from = "i16")]
    pub role_code: Role,
    pub division_id: Option<i32>,
    pub division_name: Option<String>,
    pub department_id: Option<i32>,
    pub department_name: Option<String>,
    pub procurement_team: Option<String>,
    pub email: Option<String>,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the client sees about the logged-in worker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfile {
    pub id: i32,
    pub employee_id: String,
    pub full_name: String,
    pub role_code: Role,
    pub role_description: &'static str,
    pub division_id: Option<i32>,
    pub department_id: Option<i32>,
    pub procurement_team: Option<String>,
    pub email: Option<String>,
}

impl From<&Worker> for WorkerProfile {
    fn from(worker: &Worker) -> Self {
        Self {
            id: worker.id,
            employee_id: worker.employee_id.clone(),
            full_name: worker.full_name.clone(),
            role_code: worker.role_code,
            role_description: worker.role_code.name(),
            division_id: worker.division_id,
            department_id: worker.department_id,
            procurement_team: worker.procurement_team.clone(),
            email: worker.email.clone(),
        }
    }
}

fn validate_employee_id(value: &str) -> Result<(), ValidationError> {
    if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("employee_id")
            .with_message("Employee ID must be exactly 4 digits".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkerPayload {
    #[validate(custom(function = "validate_employee_id"))]
    pub employee_id: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    pub role_code: i16,
    pub division_id: Option<i32>,
    pub department_id: Option<i32>,
    pub procurement_team: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkerPayload {
    #[validate(custom(function = "validate_employee_id"))]
    pub employee_id: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    pub role_code: i16,
    pub division_id: Option<i32>,
    pub department_id: Option<i32>,
    pub procurement_team: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    // Absent keeps the current password
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

/// Worker fields after role-driven normalization, ready for persistence.
#[derive(Debug, Clone)]
pub struct WorkerDraft {
    pub employee_id: String,
    pub full_name: String,
    pub role: Role,
    pub division_id: Option<i32>,
    pub department_id: Option<i32>,
    pub procurement_team: Option<String>,
    pub email: Option<String>,
}

impl WorkerDraft {
    /// Drops affiliations the role does not use.
    pub fn normalized(mut self) -> Self {
        if !self.role.has_org_unit() {
            self.division_id = None;
            self.department_id = None;
        }
        if !self.role.has_procurement_team() {
            self.procurement_team = None;
        }
        self.procurement_team = self
            .procurement_team
            .map(|team| team.trim().to_string())
            .filter(|team| !team.is_empty());
        self
    }
}
