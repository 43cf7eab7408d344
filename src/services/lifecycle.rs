// src/services/lifecycle.rs

use std::collections::BTreeMap;

use crate::{
    common::error::AppError,
    models::{
        program::{NewStation, ProgramStatus, Station},
        reference::ProcessStep,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Officer or engagement type set on an open program.
    Planned,
    FirstStationCompleted,
    WorkStationsCompleted,
    Closed,
    Frozen,
    Cancelled,
    Resumed,
}

impl LifecycleEvent {
    pub fn name(self) -> &'static str {
        match self {
            LifecycleEvent::Planned => "plan",
            LifecycleEvent::FirstStationCompleted => "first station completion",
            LifecycleEvent::WorkStationsCompleted => "work stations completion",
            LifecycleEvent::Closed => "close",
            LifecycleEvent::Frozen => "freeze",
            LifecycleEvent::Cancelled => "cancel",
            LifecycleEvent::Resumed => "resume",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: ProgramStatus,
    /// The state to return to on resume; only set while frozen.
    pub frozen_from: Option<ProgramStatus>,
}

pub fn transition(
    status: ProgramStatus,
    frozen_from: Option<ProgramStatus>,
    event: LifecycleEvent,
) -> Result<Transition, AppError> {
    use LifecycleEvent::*;
    use ProgramStatus::*;

    let to = |status| Transition { status, frozen_from: None };

    let next = match (status, event) {
        (Open, Planned) => Some(to(Plan)),
        (Plan, FirstStationCompleted) => Some(to(InProgress)),
        (InProgress, WorkStationsCompleted) => Some(to(Complete)),
        (Complete, Closed) => Some(to(Done)),
        (Open | Plan | InProgress | Complete, Frozen) => Some(Transition {
            status: Freeze,
            frozen_from: Some(status),
        }),
        (Open | Plan | InProgress | Complete, Cancelled) => Some(to(Cancel)),
        (Freeze, Resumed) => frozen_from.filter(|prior| !prior.is_terminal() && *prior != Freeze).map(to),
        _ => None,
    };

    next.ok_or_else(|| AppError::InvalidTransition {
        from: status.label().to_string(),
        event: event.name().to_string(),
    })
}

// =============================================================================
//  STATION-DRIVEN PROGRESS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StationProgress {
    pub has_stations: bool,
    pub any_completed: bool,
    /// Every non-final station has a completion date.
    pub work_completed: bool,
    pub final_completed: bool,
}

impl StationProgress {
    pub fn of(stations: &[Station]) -> Self {
        Self {
            has_stations: !stations.is_empty(),
            any_completed: stations.iter().any(Station::is_completed),
            work_completed: stations
                .iter()
                .filter(|s| !s.is_last_station)
                .all(Station::is_completed),
            final_completed: stations
                .iter()
                .any(|s| s.is_last_station && s.is_completed()),
        }
    }
}

/// Walks the program forward as far as its stations allow, one legal step at a time.
/// `auto_close` decides whether `Complete -> Done` happens without an explicit close.
pub fn advance(
    status: ProgramStatus,
    progress: StationProgress,
    auto_close: bool,
) -> Result<Option<Transition>, AppError> {
    if !progress.has_stations {
        return Ok(None);
    }

    let mut current = Transition { status, frozen_from: None };
    let mut moved = false;
    loop {
        let event = match current.status {
            ProgramStatus::Plan if progress.any_completed => LifecycleEvent::FirstStationCompleted,
            ProgramStatus::InProgress if progress.work_completed => {
                LifecycleEvent::WorkStationsCompleted
            }
            ProgramStatus::Complete if progress.final_completed && auto_close => LifecycleEvent::Closed,
            _ => break,
        };
        current = transition(current.status, None, event)?;
        moved = true;
    }

    Ok(moved.then_some(current))
}

/// Fails with `Conflict` when the stored status is no longer the one a decision was made against.
pub fn ensure_status(current: ProgramStatus, expected: ProgramStatus) -> Result<(), AppError> {
    if current != expected {
        return Err(AppError::Conflict(format!(
            "Program status changed from {} to {}; reload and retry",
            expected, current
        )));
    }
    Ok(())
}

/// Builds a program's stations from a template: ordered by station id, the last one flagged final.
pub fn stations_from_template(steps: &[ProcessStep]) -> Vec<NewStation> {
    let ordered: BTreeMap<i16, Option<i32>> = steps
        .iter()
        .map(|step| (step.station_id, step.activity_id))
        .collect();
    let last = ordered.keys().next_back().copied();

    ordered
        .into_iter()
        .map(|(station_id, activity_id)| NewStation {
            station_id,
            activity_id,
            is_last_station: Some(station_id) == last,
        })
        .collect()
}
