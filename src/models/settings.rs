// src/models/settings.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assign_permission_mode")]
pub enum AssignPermission {
    #[serde(rename = "Manager only")]
    #[sqlx(rename = "Manager only")]
    ManagerOnly,
    #[serde(rename = "Team leader")]
    #[sqlx(rename = "Team leader")]
    TeamLeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "close_permission_mode")]
pub enum ClosePermission {
    Automatic,
    #[serde(rename = "Manager only")]
    #[sqlx(rename = "Manager only")]
    ManagerOnly,
    #[serde(rename = "Team leader")]
    #[sqlx(rename = "Team leader")]
    TeamLeader,
}

/// Process-wide assignment/closure policy. A missing row means these defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsConfig {
    pub assign_permissions: AssignPermission,
    pub close_permissions: ClosePermission,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            assign_permissions: AssignPermission::ManagerOnly,
            close_permissions: ClosePermission::Automatic,
        }
    }
}

// Display names the UI shows for statuses and org structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayLabels {
    pub open_label: String,
    pub plan_label: String,
    pub in_progress_label: String,
    pub complete_label: String,
    pub done_label: String,
    pub freeze_label: String,
    pub cancel_label: String,
    pub division_label: String,
    pub department_label: String,
    pub team_label: String,
}

impl Default for DisplayLabels {
    fn default() -> Self {
        Self {
            open_label: "פתוח".into(),
            plan_label: "תכנון".into(),
            in_progress_label: "בביצוע".into(),
            complete_label: "הושלם".into(),
            done_label: "סגור".into(),
            freeze_label: "הקפאה".into(),
            cancel_label: "ביטול".into(),
            division_label: "אגף".into(),
            department_label: "מחלקה".into(),
            team_label: "צוות".into(),
        }
    }
}
