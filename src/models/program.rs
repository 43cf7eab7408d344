// src/models/program.rs

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::common::error::AppError;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "program_status")]
pub enum ProgramStatus {
    Open,
    Plan,
    #[serde(rename = "In Progress")]
    #[sqlx(rename = "In Progress")]
    InProgress,
    Complete,
    Done,
    Freeze,
    Cancel,
}

impl ProgramStatus {
    pub const ALL: [ProgramStatus; 7] = [
        ProgramStatus::Open,
        ProgramStatus::Plan,
        ProgramStatus::InProgress,
        ProgramStatus::Complete,
        ProgramStatus::Done,
        ProgramStatus::Freeze,
        ProgramStatus::Cancel,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProgramStatus::Open => "Open",
            ProgramStatus::Plan => "Plan",
            ProgramStatus::InProgress => "In Progress",
            ProgramStatus::Complete => "Complete",
            ProgramStatus::Done => "Done",
            ProgramStatus::Freeze => "Freeze",
            ProgramStatus::Cancel => "Cancel",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        ProgramStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(value))
            .or_else(|| value.eq_ignore_ascii_case("InProgress").then_some(ProgramStatus::InProgress))
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProgramStatus::Done | ProgramStatus::Cancel)
    }
}

impl fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// --- Entities ---

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub program_id: i32,
    pub station_id: i16,
    pub activity_id: Option<i32>,
    pub activity_name: Option<String>,
    pub completion_date: Option<NaiveDate>,
    pub reference: Option<String>,
    pub station_notes: Option<String>,
    pub reporting_user_id: Option<i32>,
    pub is_last_station: bool,
    pub last_update: DateTime<Utc>,
}

impl Station {
    pub fn is_completed(&self) -> bool {
        self.completion_date.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(rename = "taskId")]
    pub id: i32,
    pub work_year: i32,
    pub required_quarter: NaiveDate,
    pub title: String,
    pub description: Option<String>,
    pub status: ProgramStatus,
    pub frozen_from: Option<ProgramStatus>,
    pub requester_id: i32,
    pub requester_name: Option<String>,
    pub division_id: i32,
    pub division_name: Option<String>,
    pub department_id: Option<i32>,
    pub department_name: Option<String>,
    pub domain_id: Option<i32>,
    pub domain_name: Option<String>,
    pub complexity: Option<i16>,
    pub engagement_type_id: Option<i32>,
    pub engagement_type_name: Option<String>,
    pub assigned_officer_id: Option<i32>,
    pub assigned_officer_name: Option<String>,
    pub team_name: Option<String>,
    pub estimated_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub supplier_list: Option<String>,
    pub justification: Option<String>,
    pub planning_source: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub planning_notes: Option<String>,
    pub officer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "lastUpdate")]
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub stations: Vec<Station>,
}

/// A program about to be inserted. Status is always `Open`.
#[derive(Debug, Clone)]
pub struct NewProgram {
    pub work_year: i32,
    pub required_quarter: NaiveDate,
    pub title: String,
    pub description: Option<String>,
    pub requester_id: i32,
    pub division_id: i32,
    pub department_id: Option<i32>,
    pub domain_id: Option<i32>,
    pub complexity: Option<i16>,
    pub estimated_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub supplier_list: Option<String>,
    pub justification: Option<String>,
    pub planning_source: Option<String>,
    pub start_date: Option<NaiveDate>,
}

/// A station to create from an engagement type's template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStation {
    pub station_id: i16,
    pub activity_id: Option<i32>,
    pub is_last_station: bool,
}

// --- Quarters ---

/// First day of the quarter containing `date`.
pub fn truncate_to_quarter(date: NaiveDate) -> NaiveDate {
    let first_month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), first_month, 1).unwrap_or(date)
}

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp, or a `Qn/yy` label.
pub fn parse_required_quarter(raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    let invalid = || AppError::Validation(format!("Invalid requiredQuarter: '{}'", raw));

    if let Some(rest) = raw.strip_prefix('Q').or_else(|| raw.strip_prefix('q')) {
        let (quarter, year) = rest.split_once('/').ok_or_else(invalid)?;
        let quarter: u32 = quarter.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        if !(1..=4).contains(&quarter) {
            return Err(invalid());
        }
        let year = if year < 100 { 2000 + year } else { year };
        return NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1).ok_or_else(invalid);
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| invalid())?;
    Ok(truncate_to_quarter(date))
}

// --- Editable fields ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramField {
    Title,
    Description,
    RequesterId,
    DivisionId,
    DepartmentId,
    EstimatedAmount,
    Currency,
    SupplierList,
    Justification,
    WorkYear,
    RequiredQuarter,
    PlanningSource,
    DomainId,
    Complexity,
    EngagementTypeId,
    AssignedOfficerId,
    StartDate,
    OfficerNotes,
    PlanningNotes,
}

impl ProgramField {
    pub fn name(self) -> &'static str {
        match self {
            ProgramField::Title => "title",
            ProgramField::Description => "description",
            ProgramField::RequesterId => "requesterId",
            ProgramField::DivisionId => "divisionId",
            ProgramField::DepartmentId => "departmentId",
            ProgramField::EstimatedAmount => "estimatedAmount",
            ProgramField::Currency => "currency",
            ProgramField::SupplierList => "supplierList",
            ProgramField::Justification => "justification",
            ProgramField::WorkYear => "workYear",
            ProgramField::RequiredQuarter => "requiredQuarter",
            ProgramField::PlanningSource => "planningSource",
            ProgramField::DomainId => "domainId",
            ProgramField::Complexity => "complexity",
            ProgramField::EngagementTypeId => "engagementTypeId",
            ProgramField::AssignedOfficerId => "assignedOfficerId",
            ProgramField::StartDate => "startDate",
            ProgramField::OfficerNotes => "officerNotes",
            ProgramField::PlanningNotes => "planningNotes",
        }
    }
}

/// One typed change from a `PUT /programs/:id` body.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramChange {
    Title(String),
    Description(Option<String>),
    RequesterId(i32),
    DivisionId(i32),
    DepartmentId(Option<i32>),
    EstimatedAmount(Option<Decimal>),
    Currency(Option<String>),
    SupplierList(Option<String>),
    Justification(Option<String>),
    WorkYear(i32),
    RequiredQuarter(NaiveDate),
    PlanningSource(Option<String>),
    DomainId(Option<i32>),
    Complexity(Option<i16>),
    EngagementTypeId(Option<i32>),
    AssignedOfficerId(Option<i32>),
    StartDate(Option<NaiveDate>),
    OfficerNotes(Option<String>),
    PlanningNotes(Option<String>),
}

fn parse_value<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|_| AppError::Validation(format!("Invalid value for '{}'", key)))
}

fn parse_optional_date(key: &str, value: Value) -> Result<Option<NaiveDate>, AppError> {
    match parse_value::<Option<String>>(key, value)? {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.get(..10).unwrap_or(&raw), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid value for '{}'", key))),
    }
}

impl ProgramChange {
    pub fn parse(key: &str, value: Value) -> Result<Self, AppError> {
        let change = match key {
            "title" => {
                let title: String = parse_value(key, value)?;
                if title.trim().is_empty() {
                    return Err(AppError::Validation("Title cannot be empty".into()));
                }
                ProgramChange::Title(title)
            }
            "description" => ProgramChange::Description(parse_value(key, value)?),
            "requesterId" => ProgramChange::RequesterId(parse_value(key, value)?),
            "divisionId" => ProgramChange::DivisionId(parse_value(key, value)?),
            "departmentId" => ProgramChange::DepartmentId(parse_value(key, value)?),
            "estimatedAmount" => ProgramChange::EstimatedAmount(parse_value(key, value)?),
            "currency" => ProgramChange::Currency(parse_value(key, value)?),
            "supplierList" => ProgramChange::SupplierList(parse_value(key, value)?),
            "justification" => ProgramChange::Justification(parse_value(key, value)?),
            "workYear" => ProgramChange::WorkYear(parse_value(key, value)?),
            "requiredQuarter" => {
                let raw: String = parse_value(key, value)?;
                ProgramChange::RequiredQuarter(parse_required_quarter(&raw)?)
            }
            "planningSource" => ProgramChange::PlanningSource(parse_value(key, value)?),
            "domainId" => ProgramChange::DomainId(parse_value(key, value)?),
            "complexity" => {
                let complexity: Option<i16> = parse_value(key, value)?;
                if let Some(level) = complexity {
                    if !(1..=3).contains(&level) {
                        return Err(AppError::Validation("Complexity must be between 1 and 3".into()));
                    }
                }
                ProgramChange::Complexity(complexity)
            }
            "engagementTypeId" => ProgramChange::EngagementTypeId(parse_value(key, value)?),
            "assignedOfficerId" => ProgramChange::AssignedOfficerId(parse_value(key, value)?),
            "startDate" => ProgramChange::StartDate(parse_optional_date(key, value)?),
            "officerNotes" => ProgramChange::OfficerNotes(parse_value(key, value)?),
            "planningNotes" => ProgramChange::PlanningNotes(parse_value(key, value)?),
            "teamName" => {
                return Err(AppError::Validation(
                    "teamName is derived from the assigned officer and cannot be set".into(),
                ));
            }
            "status" | "frozenFrom" => {
                return Err(AppError::Validation(
                    "Status changes go through POST /programs/:id/status or station updates".into(),
                ));
            }
            other => return Err(AppError::Validation(format!("Unknown or read-only field '{}'", other))),
        };
        Ok(change)
    }

    /// Parses a whole JSON body. Any bad key fails the entire body.
    pub fn parse_all(body: Map<String, Value>) -> Result<Vec<Self>, AppError> {
        if body.is_empty() {
            return Err(AppError::Validation("No fields to update".into()));
        }
        body.into_iter()
            .map(|(key, value)| ProgramChange::parse(&key, value))
            .collect()
    }

    pub fn field(&self) -> ProgramField {
        match self {
            ProgramChange::Title(_) => ProgramField::Title,
            ProgramChange::Description(_) => ProgramField::Description,
            ProgramChange::RequesterId(_) => ProgramField::RequesterId,
            ProgramChange::DivisionId(_) => ProgramField::DivisionId,
            ProgramChange::DepartmentId(_) => ProgramField::DepartmentId,
            ProgramChange::EstimatedAmount(_) => ProgramField::EstimatedAmount,
            ProgramChange::Currency(_) => ProgramField::Currency,
            ProgramChange::SupplierList(_) => ProgramField::SupplierList,
            ProgramChange::Justification(_) => ProgramField::Justification,
            ProgramChange::WorkYear(_) => ProgramField::WorkYear,
            ProgramChange::RequiredQuarter(_) => ProgramField::RequiredQuarter,
            ProgramChange::PlanningSource(_) => ProgramField::PlanningSource,
            ProgramChange::DomainId(_) => ProgramField::DomainId,
            ProgramChange::Complexity(_) => ProgramField::Complexity,
            ProgramChange::EngagementTypeId(_) => ProgramField::EngagementTypeId,
            ProgramChange::AssignedOfficerId(_) => ProgramField::AssignedOfficerId,
            ProgramChange::StartDate(_) => ProgramField::StartDate,
            ProgramChange::OfficerNotes(_) => ProgramField::OfficerNotes,
            ProgramChange::PlanningNotes(_) => ProgramField::PlanningNotes,
        }
    }

    /// Applies the change to an in-memory copy.
    pub fn apply_to(&self, program: &mut Program) {
        match self.clone() {
            ProgramChange::Title(v) => program.title = v,
            ProgramChange::Description(v) => program.description = v,
            ProgramChange::RequesterId(v) => program.requester_id = v,
            ProgramChange::DivisionId(v) => program.division_id = v,
            ProgramChange::DepartmentId(v) => program.department_id = v,
            ProgramChange::EstimatedAmount(v) => program.estimated_amount = v,
            ProgramChange::Currency(v) => program.currency = v,
            ProgramChange::SupplierList(v) => program.supplier_list = v,
            ProgramChange::Justification(v) => program.justification = v,
            ProgramChange::WorkYear(v) => program.work_year = v,
            ProgramChange::RequiredQuarter(v) => program.required_quarter = v,
            ProgramChange::PlanningSource(v) => program.planning_source = v,
            ProgramChange::DomainId(v) => program.domain_id = v,
            ProgramChange::Complexity(v) => program.complexity = v,
            ProgramChange::EngagementTypeId(v) => program.engagement_type_id = v,
            ProgramChange::AssignedOfficerId(v) => program.assigned_officer_id = v,
            ProgramChange::StartDate(v) => program.start_date = v,
            ProgramChange::OfficerNotes(v) => program.officer_notes = v,
            ProgramChange::PlanningNotes(v) => program.planning_notes = v,
        }
    }
}

/// Everything a single program update persists, atomically.
#[derive(Debug, Clone)]
pub struct ProgramUpdate {
    /// The status the decision was made against; the write fails if it moved.
    pub expected_status: ProgramStatus,
    pub changes: Vec<ProgramChange>,
    /// `Some(team)` when the officer changed; the team is derived, never client-supplied.
    pub team_name: Option<Option<String>>,
    /// New `(status, frozen_from)` when the lifecycle moved.
    pub lifecycle: Option<(ProgramStatus, Option<ProgramStatus>)>,
    /// Replacement station set from an engagement type template.
    pub stations: Option<Vec<NewStation>>,
}

impl ProgramUpdate {
    pub fn against(expected_status: ProgramStatus) -> Self {
        Self {
            expected_status,
            changes: Vec::new(),
            team_name: None,
            lifecycle: None,
            stations: None,
        }
    }
}

// --- Station edits ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationField {
    CompletionDate,
    StationNotes,
    Reference,
    ActivityId,
}

impl StationField {
    pub fn name(self) -> &'static str {
        match self {
            StationField::CompletionDate => "completionDate",
            StationField::StationNotes => "stationNotes",
            StationField::Reference => "reference",
            StationField::ActivityId => "activityId",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StationChange {
    CompletionDate(Option<NaiveDate>),
    StationNotes(Option<String>),
    Reference(Option<String>),
    ActivityId(Option<i32>),
}

impl StationChange {
    pub fn parse(key: &str, value: Value) -> Result<Self, AppError> {
        Ok(match key {
            "completionDate" => StationChange::CompletionDate(parse_optional_date(key, value)?),
            "stationNotes" => StationChange::StationNotes(parse_value(key, value)?),
            "reference" => StationChange::Reference(parse_value(key, value)?),
            "activityId" => StationChange::ActivityId(parse_value(key, value)?),
            other => return Err(AppError::Validation(format!("Unknown or read-only field '{}'", other))),
        })
    }

    pub fn parse_all(body: Map<String, Value>) -> Result<Vec<Self>, AppError> {
        if body.is_empty() {
            return Err(AppError::Validation("No fields to update".into()));
        }
        body.into_iter()
            .map(|(key, value)| StationChange::parse(&key, value))
            .collect()
    }

    pub fn field(&self) -> StationField {
        match self {
            StationChange::CompletionDate(_) => StationField::CompletionDate,
            StationChange::StationNotes(_) => StationField::StationNotes,
            StationChange::Reference(_) => StationField::Reference,
            StationChange::ActivityId(_) => StationField::ActivityId,
        }
    }

    pub fn apply_to(&self, station: &mut Station) {
        match self.clone() {
            StationChange::CompletionDate(v) => station.completion_date = v,
            StationChange::StationNotes(v) => station.station_notes = v,
            StationChange::Reference(v) => station.reference = v,
            StationChange::ActivityId(v) => station.activity_id = v,
        }
    }
}

/// A station patch. The store advances the parent from the stations it holds after the patch.
#[derive(Debug, Clone)]
pub struct StationUpdate {
    pub expected_status: ProgramStatus,
    pub changes: Vec<StationChange>,
    pub reporting_user_id: i32,
    /// Whether `Complete -> Done` may happen without an explicit close.
    pub auto_close: bool,
}

// --- Payloads ---

#[derive(Debug, Deserialize, validator::Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProgramPayload {
    pub work_year: Option<i32>,
    pub required_quarter: Option<String>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub requester_id: Option<i32>,
    pub division_id: Option<i32>,
    pub department_id: Option<i32>,
    pub domain_id: Option<i32>,
    #[validate(range(min = 1, max = 3, message = "Complexity must be between 1 and 3"))]
    pub complexity: Option<i16>,
    pub estimated_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub supplier_list: Option<String>,
    pub justification: Option<String>,
    pub planning_source: Option<String>,
    pub start_date: Option<NaiveDate>,
}

impl CreateProgramPayload {
    /// The fields this body sets, for authorization.
    pub fn fields(&self) -> Vec<ProgramField> {
        let mut fields = vec![ProgramField::Title, ProgramField::WorkYear, ProgramField::RequiredQuarter];
        let optional = [
            (self.description.is_some(), ProgramField::Description),
            (self.division_id.is_some(), ProgramField::DivisionId),
            (self.department_id.is_some(), ProgramField::DepartmentId),
            (self.domain_id.is_some(), ProgramField::DomainId),
            (self.complexity.is_some(), ProgramField::Complexity),
            (self.estimated_amount.is_some(), ProgramField::EstimatedAmount),
            (self.currency.is_some(), ProgramField::Currency),
            (self.supplier_list.is_some(), ProgramField::SupplierList),
            (self.justification.is_some(), ProgramField::Justification),
            (self.planning_source.is_some(), ProgramField::PlanningSource),
            (self.start_date.is_some(), ProgramField::StartDate),
        ];
        fields.extend(optional.into_iter().filter(|(set, _)| *set).map(|(_, field)| field));
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusAction {
    Freeze,
    Cancel,
    Resume,
    Close,
}

#[derive(Debug, Deserialize)]
pub struct StatusActionPayload {
    pub action: StatusAction,
}
