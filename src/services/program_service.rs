// src/services/program_service.rs

use serde_json::{Map, Value};
use std::sync::Arc;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{PermissionsSource, ProgramStore, WorkerDirectory},
    models::{
        auth::Principal,
        program::{
            CreateProgramPayload, NewProgram, Program, ProgramChange, ProgramStatus, ProgramUpdate,
            StationChange, StationUpdate, StatusAction, parse_required_quarter,
        },
        role::Role,
    },
    services::{
        authorization::{self, CloseTrigger},
        lifecycle::{self, LifecycleEvent, StationProgress, Transition},
        program_filter::{ProgramFilter, select_programs},
    },
};

#[derive(Clone)]
pub struct ProgramService {
    programs: Arc<dyn ProgramStore>,
    permissions: Arc<dyn PermissionsSource>,
    workers: Arc<dyn WorkerDirectory>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

impl ProgramService {
    pub fn new(
        programs: Arc<dyn ProgramStore>,
        permissions: Arc<dyn PermissionsSource>,
        workers: Arc<dyn WorkerDirectory>,
    ) -> Self {
        Self { programs, permissions, workers }
    }

    async fn load(&self, id: i32) -> Result<Program, AppError> {
        self.programs
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Program not found".into()))
    }

    async fn load_visible(&self, principal: &Principal, id: i32) -> Result<Program, AppError> {
        let program = self.load(id).await?;
        if !authorization::can_view(principal, &program) {
            return Err(AppError::Forbidden("Access denied to this program".into()));
        }
        Ok(program)
    }

    // =========================================================================
    //  READS
    // =========================================================================

    pub async fn list(&self, principal: &Principal, filter: &ProgramFilter) -> Result<Vec<Program>, AppError> {
        let scope = authorization::default_scope(principal);
        let candidates = self.programs.list(&scope).await?;

        Ok(select_programs(principal, filter, candidates)
            .into_iter()
            .map(|program| authorization::redact(principal, program))
            .collect())
    }

    pub async fn get(&self, principal: &Principal, id: i32) -> Result<Program, AppError> {
        let program = self.load_visible(principal, id).await?;
        Ok(authorization::redact(principal, program))
    }

    // =========================================================================
    //  CREATE
    // =========================================================================

    pub async fn create(&self, principal: &Principal, payload: CreateProgramPayload) -> Result<Program, AppError> {
        // 1. Shape and permission
        payload.validate()?;
        authorization::authorize_creation(principal, &payload.fields())?;

        // 2. Requesters always file for themselves
        let requester_id = match principal.role {
            Role::Requester => principal.worker_id,
            _ => required(payload.requester_id, "requesterId")?,
        };

        let title = required(payload.title, "title")?;
        let quarter = required(payload.required_quarter, "requiredQuarter")?;

        let new_program = NewProgram {
            work_year: required(payload.work_year, "workYear")?,
            required_quarter: parse_required_quarter(&quarter)?,
            title: title.trim().to_string(),
            description: payload.description,
            requester_id,
            division_id: required(payload.division_id, "divisionId")?,
            department_id: payload.department_id,
            domain_id: payload.domain_id,
            complexity: payload.complexity,
            estimated_amount: payload.estimated_amount,
            currency: payload.currency,
            supplier_list: payload.supplier_list,
            justification: payload.justification,
            planning_source: payload.planning_source,
            start_date: payload.start_date,
        };

        // 3. Persist as Open
        let id = self.programs.insert(new_program).await?;
        tracing::info!(program_id = id, worker_id = principal.worker_id, "Program created");

        self.get(principal, id).await
    }

    // =========================================================================
    //  UPDATE
    // =========================================================================

    pub async fn update(&self, principal: &Principal, id: i32, body: Map<String, Value>) -> Result<Program, AppError> {
        // 1. Every key must parse before anything else happens
        let changes = ProgramChange::parse_all(body)?;

        let program = self.load_visible(principal, id).await?;
        if program.status.is_terminal() {
            return Err(AppError::Conflict(format!("Program is {}", program.status)));
        }

        // 2. Field-by-field authorization, all or nothing
        let permissions = self.permissions.permissions().await?;
        authorization::authorize_changes(principal, &program, &changes, &permissions)?;

        let mut update = ProgramUpdate::against(program.status);
        let mut planned = false;
        let template_editable = matches!(program.status, ProgramStatus::Open | ProgramStatus::Plan);

        // 3. Derived values
        for change in &changes {
            match change {
                ProgramChange::AssignedOfficerId(Some(officer_id)) => {
                    update.team_name = Some(self.officer_team(principal, *officer_id).await?);
                    planned = true;
                }
                ProgramChange::AssignedOfficerId(None) => {
                    update.team_name = Some(None);
                }
                ProgramChange::EngagementTypeId(_) if !template_editable => {
                    return Err(AppError::Conflict(
                        "Engagement type can only change before work starts".into(),
                    ));
                }
                ProgramChange::EngagementTypeId(Some(engagement_type_id)) => {
                    let steps = self
                        .programs
                        .template_processes(*engagement_type_id)
                        .await?
                        .ok_or_else(|| AppError::Validation("Engagement type not found".into()))?;
                    update.stations = Some(lifecycle::stations_from_template(&steps));
                    planned = true;
                }
                // No template, no stations
                ProgramChange::EngagementTypeId(None) => {
                    update.stations = Some(Vec::new());
                }
                _ => {}
            }
        }

        // 4. Open -> Plan once someone or something is assigned
        if planned && program.status == ProgramStatus::Open {
            let Transition { status, frozen_from } =
                lifecycle::transition(program.status, program.frozen_from, LifecycleEvent::Planned)?;
            update.lifecycle = Some((status, frozen_from));
        }

        let fields: Vec<&str> = changes.iter().map(|c| c.field().name()).collect();
        update.changes = changes;
        self.programs.apply_update(id, update).await?;
        tracing::info!(program_id = id, worker_id = principal.worker_id, ?fields, "Program updated");

        self.get(principal, id).await
    }

    /// The team an officer assignment implies. The target must be a buyer (role 2 or 3).
    async fn officer_team(&self, principal: &Principal, officer_id: i32) -> Result<Option<String>, AppError> {
        let officer = self
            .workers
            .find_by_id(officer_id)
            .await?
            .ok_or_else(|| AppError::Validation("Assigned officer does not exist".into()))?;

        if !officer.role_code.has_procurement_team() {
            return Err(AppError::Validation(
                "Assigned officer must be a team leader or an officer".into(),
            ));
        }

        // Team leaders staff their own team only
        if principal.role == Role::TeamLeader && officer.procurement_team != principal.procurement_team {
            return Err(AppError::Forbidden("Officer belongs to another team".into()));
        }

        Ok(officer.procurement_team)
    }

    // =========================================================================
    //  STATUS ACTIONS
    // =========================================================================

    pub async fn change_status(&self, principal: &Principal, id: i32, action: StatusAction) -> Result<Program, AppError> {
        let program = self.load_visible(principal, id).await?;

        let event = match action {
            StatusAction::Freeze => LifecycleEvent::Frozen,
            StatusAction::Cancel => LifecycleEvent::Cancelled,
            StatusAction::Resume => LifecycleEvent::Resumed,
            StatusAction::Close => LifecycleEvent::Closed,
        };

        if event == LifecycleEvent::Closed {
            let permissions = self.permissions.permissions().await?;
            if !authorization::can_close_program(CloseTrigger::User(principal), &program, &permissions) {
                return Err(AppError::Forbidden("Not allowed to close this program".into()));
            }
            if program.status == ProgramStatus::Complete
                && !StationProgress::of(&program.stations).final_completed
            {
                return Err(AppError::Conflict(
                    "The final station must be completed before closing".into(),
                ));
            }
        } else if !authorization::can_change_status(principal, &program) {
            return Err(AppError::Forbidden("Only managers can freeze, cancel or resume programs".into()));
        }

        let Transition { status, frozen_from } =
            lifecycle::transition(program.status, program.frozen_from, event)?;

        let update = ProgramUpdate {
            lifecycle: Some((status, frozen_from)),
            ..ProgramUpdate::against(program.status)
        };
        self.programs.apply_update(id, update).await?;
        tracing::info!(program_id = id, from = %program.status, to = %status, "Program status changed");

        self.get(principal, id).await
    }

    // =========================================================================
    //  STATIONS
    // =========================================================================

    pub async fn update_station(
        &self,
        principal: &Principal,
        program_id: i32,
        station_id: i16,
        body: Map<String, Value>,
    ) -> Result<Program, AppError> {
        let changes = StationChange::parse_all(body)?;

        let program = self.load_visible(principal, program_id).await?;
        if program.status.is_terminal() {
            return Err(AppError::Conflict(format!("Program is {}", program.status)));
        }

        // 1. Station must belong to the program
        if !program.stations.iter().any(|s| s.station_id == station_id) {
            return Err(AppError::NotFound("Station not found".into()));
        }

        // 2. Per-field permission
        for change in &changes {
            if !authorization::can_edit_station(principal, &program, change.field()) {
                return Err(AppError::Forbidden(format!(
                    "Not allowed to edit station field '{}'",
                    change.field().name()
                )));
            }
        }

        // 3. The store re-checks the status and advances from the stations it holds
        let permissions = self.permissions.permissions().await?;
        let update = StationUpdate {
            expected_status: program.status,
            changes,
            reporting_user_id: principal.worker_id,
            auto_close: authorization::can_close_program(CloseTrigger::System, &program, &permissions),
        };
        let moved = self.programs.apply_station_update(program_id, station_id, update).await?;

        if let Some(t) = moved {
            tracing::info!(program_id, station_id, from = %program.status, to = %t.status, "Station update advanced program");
        }

        self.get(principal, program_id).await
    }
}
