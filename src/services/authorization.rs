// src/services/authorization.rs
//
// Every view/edit/assign/close/create decision about programs is made here.
// Listing and mutation paths both consult these functions.

use crate::{
    common::error::AppError,
    models::{
        auth::Principal,
        program::{Program, ProgramChange, ProgramField, ProgramStatus, StationField},
        role::Role,
        settings::{AssignPermission, ClosePermission, PermissionsConfig},
    },
};

/// Roles allowed to open a new program.
pub const PROGRAM_CREATORS: &[Role] = &[Role::ProcurementManager, Role::Requester];

// =============================================================================
//  VISIBILITY
// =============================================================================

/// The implicit predicate applied before any explicit filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramScope {
    All,
    RequestedBy(i32),
    AssignedTo(i32),
    Team(String),
    Nothing,
}

impl ProgramScope {
    pub fn admits(&self, program: &Program) -> bool {
        match self {
            ProgramScope::All => true,
            ProgramScope::RequestedBy(id) => program.requester_id == *id,
            ProgramScope::AssignedTo(id) => program.assigned_officer_id == Some(*id),
            ProgramScope::Team(team) => program.team_name.as_deref() == Some(team.as_str()),
            ProgramScope::Nothing => false,
        }
    }
}

pub fn default_scope(principal: &Principal) -> ProgramScope {
    match principal.role {
        Role::ProcurementManager | Role::UnitManager | Role::Executive => ProgramScope::All,
        // Administrators and operators work the admin screens only
        Role::SystemAdministrator | Role::TechnicalOperator => ProgramScope::Nothing,
        Role::Requester => ProgramScope::RequestedBy(principal.worker_id),
        Role::Officer => ProgramScope::AssignedTo(principal.worker_id),
        Role::TeamLeader => match principal.procurement_team.as_deref() {
            Some(team) if !team.is_empty() => ProgramScope::Team(team.to_string()),
            _ => ProgramScope::Nothing,
        },
    }
}

pub fn can_view(principal: &Principal, program: &Program) -> bool {
    default_scope(principal).admits(program)
}

// =============================================================================
//  FIELD EDITS
// =============================================================================

fn is_general_field(field: ProgramField) -> bool {
    matches!(
        field,
        ProgramField::Title
            | ProgramField::Description
            | ProgramField::RequesterId
            | ProgramField::DivisionId
            | ProgramField::DepartmentId
            | ProgramField::EstimatedAmount
            | ProgramField::Currency
            | ProgramField::SupplierList
            | ProgramField::Justification
            | ProgramField::WorkYear
            | ProgramField::RequiredQuarter
    )
}

pub fn can_edit(
    principal: &Principal,
    program: &Program,
    field: ProgramField,
    permissions: &PermissionsConfig,
) -> bool {
    if !can_view(principal, program) {
        return false;
    }

    match principal.role {
        Role::ProcurementManager => match field {
            ProgramField::StartDate => {
                matches!(program.status, ProgramStatus::Open | ProgramStatus::Plan)
            }
            _ => true,
        },
        Role::TeamLeader => match field {
            ProgramField::AssignedOfficerId => {
                permissions.assign_permissions == AssignPermission::TeamLeader
            }
            ProgramField::OfficerNotes => true,
            _ => false,
        },
        Role::Officer => field == ProgramField::OfficerNotes,
        Role::Requester => {
            is_general_field(field)
                && program.status == ProgramStatus::Open
                && program.requester_id == principal.worker_id
        }
        Role::SystemAdministrator
        | Role::UnitManager
        | Role::Executive
        | Role::TechnicalOperator => false,
    }
}

/// All-or-nothing: the first disallowed field rejects the whole change set.
pub fn authorize_changes(
    principal: &Principal,
    program: &Program,
    changes: &[ProgramChange],
    permissions: &PermissionsConfig,
) -> Result<(), AppError> {
    if !can_view(principal, program) {
        return Err(AppError::Forbidden("Access denied to this program".into()));
    }

    for change in changes {
        let field = change.field();
        if !can_edit(principal, program, field, permissions) {
            return Err(AppError::Forbidden(format!(
                "Not allowed to edit field '{}'",
                field.name()
            )));
        }

        // Requesters may edit their own request but never hand it to someone else
        if let ProgramChange::RequesterId(id) = change {
            if principal.role == Role::Requester && *id != principal.worker_id {
                return Err(AppError::Forbidden(format!(
                    "Not allowed to edit field '{}'",
                    field.name()
                )));
            }
        }
    }
    Ok(())
}

pub fn can_assign_officer(principal: &Principal, permissions: &PermissionsConfig) -> bool {
    match principal.role {
        Role::ProcurementManager => true,
        Role::TeamLeader => permissions.assign_permissions == AssignPermission::TeamLeader,
        _ => false,
    }
}

// =============================================================================
//  CREATION
// =============================================================================

pub fn can_create_program(principal: &Principal) -> bool {
    PROGRAM_CREATORS.contains(&principal.role)
}

/// Checks the fields a create body sets. Requesters may only fill the general fields.
pub fn authorize_creation(principal: &Principal, fields: &[ProgramField]) -> Result<(), AppError> {
    if !can_create_program(principal) {
        return Err(AppError::Forbidden(
            "Only managers and requesters can create programs".into(),
        ));
    }
    if principal.role == Role::Requester {
        if let Some(field) = fields.iter().find(|field| !is_general_field(**field)) {
            return Err(AppError::Forbidden(format!(
                "Not allowed to set field '{}'",
                field.name()
            )));
        }
    }
    Ok(())
}

// =============================================================================
//  STATUS CHANGES
// =============================================================================

/// Who is asking for the `Complete -> Done` move.
#[derive(Debug, Clone, Copy)]
pub enum CloseTrigger<'a> {
    /// Final station completed and closing is automatic.
    System,
    User(&'a Principal),
}

pub fn can_close_program(
    trigger: CloseTrigger<'_>,
    program: &Program,
    permissions: &PermissionsConfig,
) -> bool {
    match trigger {
        CloseTrigger::System => permissions.close_permissions == ClosePermission::Automatic,
        CloseTrigger::User(principal) => {
            if !can_view(principal, program) {
                return false;
            }
            match permissions.close_permissions {
                // Automatic mode still lets a manager close by hand
                ClosePermission::Automatic | ClosePermission::ManagerOnly => {
                    principal.role == Role::ProcurementManager
                }
                ClosePermission::TeamLeader => match principal.role {
                    Role::ProcurementManager => true,
                    Role::TeamLeader => {
                        principal.procurement_team.is_some()
                            && program.team_name == principal.procurement_team
                    }
                    _ => false,
                },
            }
        }
    }
}

/// Freeze, cancel and resume are explicit manager actions.
pub fn can_change_status(principal: &Principal, program: &Program) -> bool {
    principal.role == Role::ProcurementManager && can_view(principal, program)
}

// =============================================================================
//  STATIONS AND NOTES
// =============================================================================

pub fn can_edit_station(principal: &Principal, program: &Program, field: StationField) -> bool {
    if !can_view(principal, program) {
        return false;
    }
    match field {
        StationField::CompletionDate | StationField::StationNotes => matches!(
            principal.role,
            Role::ProcurementManager | Role::TeamLeader | Role::Officer
        ),
        StationField::Reference | StationField::ActivityId => {
            principal.role == Role::ProcurementManager
        }
    }
}

pub fn can_read_planning_notes(principal: &Principal) -> bool {
    principal.role == Role::ProcurementManager
}

pub fn can_read_officer_notes(principal: &Principal) -> bool {
    matches!(
        principal.role,
        Role::ProcurementManager | Role::TeamLeader | Role::Officer
    )
}

/// Blanks the note fields the principal may not read.
pub fn redact(principal: &Principal, mut program: Program) -> Program {
    if !can_read_planning_notes(principal) {
        program.planning_notes = None;
    }
    if !can_read_officer_notes(principal) {
        program.officer_notes = None;
    }
    program
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    pub(crate) fn principal(worker_id: i32, role: Role, team: Option<&str>) -> Principal {
        Principal {
            worker_id,
            employee_id: format!("{:04}", worker_id),
            role,
            procurement_team: team.map(str::to_string),
        }
    }

    pub(crate) fn program(id: i32, status: ProgramStatus) -> Program {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        Program {
            id,
            work_year: 2025,
            required_quarter: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            title: format!("Program {}", id),
            description: None,
            status,
            frozen_from: None,
            requester_id: 40,
            requester_name: None,
            division_id: 1,
            division_name: None,
            department_id: None,
            department_name: None,
            domain_id: None,
            domain_name: None,
            complexity: None,
            engagement_type_id: None,
            engagement_type_name: None,
            assigned_officer_id: Some(7),
            assigned_officer_name: None,
            team_name: Some("Alpha".into()),
            estimated_amount: None,
            currency: None,
            supplier_list: None,
            justification: None,
            planning_source: None,
            start_date: None,
            planning_notes: Some("plan".into()),
            officer_notes: Some("officer".into()),
            created_at: created,
            updated_at: created,
            stations: Vec::new(),
        }
    }

    const ALL_FIELDS: [ProgramField; 19] = [
        ProgramField::Title,
        ProgramField::Description,
        ProgramField::RequesterId,
        ProgramField::DivisionId,
        ProgramField::DepartmentId,
        ProgramField::EstimatedAmount,
        ProgramField::Currency,
        ProgramField::SupplierList,
        ProgramField::Justification,
        ProgramField::WorkYear,
        ProgramField::RequiredQuarter,
        ProgramField::PlanningSource,
        ProgramField::DomainId,
        ProgramField::Complexity,
        ProgramField::EngagementTypeId,
        ProgramField::AssignedOfficerId,
        ProgramField::StartDate,
        ProgramField::OfficerNotes,
        ProgramField::PlanningNotes,
    ];

    fn principals() -> Vec<Principal> {
        vec![
            principal(1, Role::SystemAdministrator, None),
            principal(2, Role::ProcurementManager, None),
            principal(3, Role::TeamLeader, Some("Alpha")),
            principal(7, Role::Officer, Some("Alpha")),
            principal(40, Role::Requester, None),
            principal(5, Role::UnitManager, None),
            principal(6, Role::Executive, None),
            principal(9, Role::TechnicalOperator, None),
        ]
    }

    #[test]
    fn scope_follows_role() {
        assert_eq!(default_scope(&principal(7, Role::Officer, None)), ProgramScope::AssignedTo(7));
        assert_eq!(default_scope(&principal(4, Role::Requester, None)), ProgramScope::RequestedBy(4));
        assert_eq!(
            default_scope(&principal(2, Role::TeamLeader, Some("Alpha"))),
            ProgramScope::Team("Alpha".into())
        );
        assert_eq!(default_scope(&principal(2, Role::TeamLeader, None)), ProgramScope::Nothing);
        for role in [Role::ProcurementManager, Role::UnitManager, Role::Executive] {
            assert_eq!(default_scope(&principal(1, role, None)), ProgramScope::All);
        }
    }

    #[test]
    fn admin_roles_see_no_programs() {
        for role in [Role::SystemAdministrator, Role::TechnicalOperator] {
            let admin = principal(1, role, None);
            assert_eq!(default_scope(&admin), ProgramScope::Nothing);
            assert!(!can_view(&admin, &program(1, ProgramStatus::Plan)));
        }
    }

    #[test]
    fn officer_cannot_see_someone_elses_program() {
        let mut other = program(1, ProgramStatus::Plan);
        other.assigned_officer_id = Some(8);
        assert!(!can_view(&principal(7, Role::Officer, None), &other));
    }

    #[test]
    fn planning_notes_are_manager_only_everywhere() {
        for status in ProgramStatus::ALL {
            let program = program(1, status);
            for principal in principals() {
                for assign in [AssignPermission::ManagerOnly, AssignPermission::TeamLeader] {
                    let perms = PermissionsConfig {
                        assign_permissions: assign,
                        close_permissions: ClosePermission::Automatic,
                    };
                    assert_eq!(
                        can_edit(&principal, &program, ProgramField::PlanningNotes, &perms),
                        principal.role == Role::ProcurementManager
                    );
                }
            }
        }
    }

    #[test]
    fn read_only_roles_edit_nothing() {
        let program = program(1, ProgramStatus::Open);
        let perms = PermissionsConfig::default();
        for role in [Role::UnitManager, Role::Executive, Role::SystemAdministrator, Role::TechnicalOperator] {
            let viewer = principal(5, role, None);
            assert!(ALL_FIELDS.iter().all(|f| !can_edit(&viewer, &program, *f, &perms)));
        }
    }

    #[test]
    fn start_date_only_while_open_or_planned() {
        let manager = principal(2, Role::ProcurementManager, None);
        let perms = PermissionsConfig::default();
        assert!(can_edit(&manager, &program(1, ProgramStatus::Open), ProgramField::StartDate, &perms));
        assert!(can_edit(&manager, &program(1, ProgramStatus::Plan), ProgramField::StartDate, &perms));
        assert!(!can_edit(&manager, &program(1, ProgramStatus::InProgress), ProgramField::StartDate, &perms));
    }

    #[test]
    fn team_leader_assignment_depends_on_config() {
        let leader = principal(3, Role::TeamLeader, Some("Alpha"));
        let program = program(1, ProgramStatus::Open);
        let mut perms = PermissionsConfig::default();
        assert!(!can_edit(&leader, &program, ProgramField::AssignedOfficerId, &perms));
        assert!(!can_assign_officer(&leader, &perms));
        perms.assign_permissions = AssignPermission::TeamLeader;
        assert!(can_edit(&leader, &program, ProgramField::AssignedOfficerId, &perms));
        assert!(can_assign_officer(&leader, &perms));
    }

    #[test]
    fn requester_edits_only_own_open_programs() {
        let requester = principal(40, Role::Requester, None);
        let perms = PermissionsConfig::default();
        assert!(can_edit(&requester, &program(1, ProgramStatus::Open), ProgramField::Title, &perms));
        assert!(!can_edit(&requester, &program(1, ProgramStatus::Plan), ProgramField::Title, &perms));
        assert!(!can_edit(&requester, &program(1, ProgramStatus::Open), ProgramField::Complexity, &perms));

        let mut foreign = program(2, ProgramStatus::Open);
        foreign.requester_id = 41;
        assert!(!can_edit(&requester, &foreign, ProgramField::Title, &perms));
    }

    #[test]
    fn one_forbidden_field_rejects_the_whole_change_set() {
        let requester = principal(40, Role::Requester, None);
        let program = program(1, ProgramStatus::Open);
        let changes = vec![
            ProgramChange::Title("New".into()),
            ProgramChange::Complexity(Some(2)),
        ];
        let err = authorize_changes(&requester, &program, &changes, &PermissionsConfig::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg.contains("complexity")));
    }

    #[test]
    fn requester_cannot_reassign_the_request() {
        let requester = principal(40, Role::Requester, None);
        let program = program(1, ProgramStatus::Open);
        let perms = PermissionsConfig::default();
        assert!(authorize_changes(&requester, &program, &[ProgramChange::RequesterId(40)], &perms).is_ok());
        assert!(authorize_changes(&requester, &program, &[ProgramChange::RequesterId(41)], &perms).is_err());
    }

    #[test]
    fn creation_is_limited_to_managers_and_requesters() {
        let fields = [ProgramField::Title, ProgramField::WorkYear];
        assert!(authorize_creation(&principal(2, Role::ProcurementManager, None), &fields).is_ok());
        assert!(authorize_creation(&principal(40, Role::Requester, None), &fields).is_ok());
        assert!(authorize_creation(&principal(7, Role::Officer, None), &fields).is_err());
        assert!(
            authorize_creation(
                &principal(40, Role::Requester, None),
                &[ProgramField::Title, ProgramField::PlanningSource]
            )
            .is_err()
        );
    }

    #[test]
    fn closing_follows_the_configured_mode() {
        let manager = principal(2, Role::ProcurementManager, None);
        let leader = principal(3, Role::TeamLeader, Some("Alpha"));
        let other_leader = principal(4, Role::TeamLeader, Some("Beta"));
        let program = program(1, ProgramStatus::Complete);

        let mut perms = PermissionsConfig::default();
        assert!(can_close_program(CloseTrigger::System, &program, &perms));
        assert!(can_close_program(CloseTrigger::User(&manager), &program, &perms));
        assert!(!can_close_program(CloseTrigger::User(&leader), &program, &perms));

        perms.close_permissions = ClosePermission::ManagerOnly;
        assert!(!can_close_program(CloseTrigger::System, &program, &perms));
        assert!(can_close_program(CloseTrigger::User(&manager), &program, &perms));
        assert!(!can_close_program(CloseTrigger::User(&leader), &program, &perms));

        perms.close_permissions = ClosePermission::TeamLeader;
        assert!(can_close_program(CloseTrigger::User(&leader), &program, &perms));
        assert!(!can_close_program(CloseTrigger::User(&other_leader), &program, &perms));
    }

    #[test]
    fn station_fields_split_by_role() {
        let officer = principal(7, Role::Officer, Some("Alpha"));
        let manager = principal(2, Role::ProcurementManager, None);
        let program = program(1, ProgramStatus::Plan);
        assert!(can_edit_station(&officer, &program, StationField::CompletionDate));
        assert!(!can_edit_station(&officer, &program, StationField::Reference));
        assert!(can_edit_station(&manager, &program, StationField::ActivityId));
    }

    #[test]
    fn notes_are_redacted_by_role() {
        let requester = principal(40, Role::Requester, None);
        let officer = principal(7, Role::Officer, None);
        let redacted = redact(&requester, program(1, ProgramStatus::Open));
        assert_eq!(redacted.planning_notes, None);
        assert_eq!(redacted.officer_notes, None);
        let redacted = redact(&officer, program(1, ProgramStatus::Open));
        assert_eq!(redacted.planning_notes, None);
        assert_eq!(redacted.officer_notes.as_deref(), Some("officer"));
    }
}
