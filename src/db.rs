// src/db.rs
//
// Store seams the services depend on, plus their Postgres repositories.

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::{
        program::{NewProgram, Program, ProgramUpdate, StationUpdate},
        reference::ProcessStep,
        settings::PermissionsConfig,
        worker::{Worker, WorkerDraft},
    },
    services::{authorization::ProgramScope, lifecycle::Transition},
};

pub mod program_repo;
pub use program_repo::ProgramRepository;
pub mod reference_repo;
pub use reference_repo::ReferenceRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod worker_repo;
pub use worker_repo::WorkerRepository;

#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    async fn find_by_employee_id(&self, employee_id: &str) -> Result<Option<Worker>, AppError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<Worker>, AppError>;
    async fn record_login(&self, id: i32) -> Result<(), AppError>;
}

/// Worker management behind the system screens.
#[async_trait]
pub trait WorkerStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Worker>, AppError>;
    async fn create(&self, draft: &WorkerDraft, password_hash: &str) -> Result<Worker, AppError>;
    /// A `None` hash keeps the stored password.
    async fn update(
        &self,
        id: i32,
        draft: &WorkerDraft,
        password_hash: Option<&str>,
    ) -> Result<Worker, AppError>;
    /// True while any program names the worker as requester or officer.
    async fn is_referenced(&self, id: i32) -> Result<bool, AppError>;
    async fn delete(&self, id: i32) -> Result<(), AppError>;
}

#[async_trait]
pub trait ProgramStore: Send + Sync {
    /// Programs admitted by `scope`, stations attached.
    async fn list(&self, scope: &ProgramScope) -> Result<Vec<Program>, AppError>;
    async fn find(&self, id: i32) -> Result<Option<Program>, AppError>;
    async fn insert(&self, program: NewProgram) -> Result<i32, AppError>;
    /// Column changes, derived team, status and station replacement in one transaction,
    /// against the locked row. `Conflict` when its status is no longer `expected_status`.
    async fn apply_update(&self, id: i32, update: ProgramUpdate) -> Result<(), AppError>;
    /// Patches a station and advances the program from the stored station set, under the
    /// same lock and status check as `apply_update`. Returns the move, if any.
    async fn apply_station_update(
        &self,
        program_id: i32,
        station_id: i16,
        update: StationUpdate,
    ) -> Result<Option<Transition>, AppError>;
    /// `None` when the engagement type does not exist.
    async fn template_processes(
        &self,
        engagement_type_id: i32,
    ) -> Result<Option<Vec<ProcessStep>>, AppError>;
}

#[async_trait]
pub trait PermissionsSource: Send + Sync {
    /// The stored config, or the defaults when none was saved.
    async fn permissions(&self) -> Result<PermissionsConfig, AppError>;
}

/// Maps constraint failures to client errors; everything else stays a database error.
pub(crate) fn constraint_error(e: sqlx::Error, conflict: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(conflict.to_string());
        }
        if db_err.is_foreign_key_violation() {
            let constraint = db_err.constraint().unwrap_or("reference");
            return AppError::Validation(format!("Referenced record does not exist ({})", constraint));
        }
        if db_err.is_check_violation() {
            return AppError::Validation("Value out of range".into());
        }
    }
    e.into()
}
