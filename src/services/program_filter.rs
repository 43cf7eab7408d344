// src/services/program_filter.rs

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::HashSet;

use crate::{
    common::error::AppError,
    models::{
        auth::Principal,
        program::{Program, ProgramStatus},
        role::Role,
    },
    services::authorization::default_scope,
};

/// Raw `GET /programs` query string. Each value is a comma-separated OR-set.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramFilterParams {
    pub status: Option<String>,
    pub assigned_officer_id: Option<String>,
    pub domain_id: Option<String>,
    pub complexity: Option<String>,
    pub requester_id: Option<String>,
    pub team: Option<String>,
    pub quarter: Option<String>,
}

/// Explicit filter selections. `None` in a dimension means "not filtered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramFilter {
    pub statuses: Option<HashSet<ProgramStatus>>,
    pub officer_ids: Option<HashSet<i32>>,
    pub domain_ids: Option<HashSet<i32>>,
    pub complexities: Option<HashSet<i16>>,
    pub requester_ids: Option<HashSet<i32>>,
    pub teams: Option<HashSet<String>>,
    pub quarters: Option<HashSet<String>>,
}

fn split(raw: Option<String>) -> Option<Vec<String>> {
    let values: Vec<String> = raw?
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    (!values.is_empty()).then_some(values)
}

fn parse_numbers<T: std::str::FromStr + Eq + std::hash::Hash>(
    name: &str,
    raw: Option<String>,
) -> Result<Option<HashSet<T>>, AppError> {
    split(raw)
        .map(|values| {
            values
                .into_iter()
                .map(|v| {
                    v.parse::<T>()
                        .map_err(|_| AppError::Validation(format!("Invalid {} filter value '{}'", name, v)))
                })
                .collect()
        })
        .transpose()
}

impl TryFrom<ProgramFilterParams> for ProgramFilter {
    type Error = AppError;

    fn try_from(params: ProgramFilterParams) -> Result<Self, Self::Error> {
        let statuses = split(params.status)
            .map(|values| {
                values
                    .into_iter()
                    .map(|v| {
                        ProgramStatus::parse(&v)
                            .ok_or_else(|| AppError::Validation(format!("Unknown status '{}'", v)))
                    })
                    .collect::<Result<HashSet<_>, _>>()
            })
            .transpose()?;

        Ok(Self {
            statuses,
            officer_ids: parse_numbers("assignedOfficerId", params.assigned_officer_id)?,
            domain_ids: parse_numbers("domainId", params.domain_id)?,
            complexities: parse_numbers("complexity", params.complexity)?,
            requester_ids: parse_numbers("requesterId", params.requester_id)?,
            teams: split(params.team).map(|v| v.into_iter().collect()),
            quarters: split(params.quarter).map(|v| v.into_iter().collect()),
        })
    }
}

/// Status set used when the request names none.
pub fn default_statuses(role: Role) -> HashSet<ProgramStatus> {
    match role {
        Role::TeamLeader | Role::Officer => [
            ProgramStatus::Plan,
            ProgramStatus::InProgress,
            ProgramStatus::Complete,
        ]
        .into_iter()
        .collect(),
        _ => ProgramStatus::ALL
            .into_iter()
            .filter(|s| !matches!(s, ProgramStatus::Freeze | ProgramStatus::Cancel))
            .collect(),
    }
}

/// `Q{ceil(month/3)}/{yy}`, e.g. `Q2/25`.
pub fn quarter_label(date: NaiveDate) -> String {
    format!("Q{}/{:02}", date.month0() / 3 + 1, date.year().rem_euclid(100))
}

fn within<T: Eq + std::hash::Hash>(set: &Option<HashSet<T>>, value: Option<&T>) -> bool {
    match set {
        None => true,
        Some(set) => value.is_some_and(|v| set.contains(v)),
    }
}

impl ProgramFilter {
    pub fn matches(&self, program: &Program, statuses: &HashSet<ProgramStatus>) -> bool {
        statuses.contains(&program.status)
            && within(&self.officer_ids, program.assigned_officer_id.as_ref())
            && within(&self.domain_ids, program.domain_id.as_ref())
            && within(&self.complexities, program.complexity.as_ref())
            && within(&self.requester_ids, Some(&program.requester_id))
            && within(&self.teams, program.team_name.as_ref())
            && within(&self.quarters, Some(&quarter_label(program.required_quarter)))
    }
}

/// Scope first, explicit filters second, newest first. Filters can only narrow.
pub fn select_programs(
    principal: &Principal,
    filter: &ProgramFilter,
    candidates: Vec<Program>,
) -> Vec<Program> {
    let scope = default_scope(principal);
    let statuses = filter
        .statuses
        .clone()
        .unwrap_or_else(|| default_statuses(principal.role));

    let mut selected: Vec<Program> = candidates
        .into_iter()
        .filter(|p| scope.admits(p))
        .filter(|p| filter.matches(p, &statuses))
        .collect();

    selected.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    selected
}
