// src/db/program_repo.rs

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::{
    common::error::AppError,
    db::{ProgramStore, constraint_error},
    models::{
        program::{
            NewProgram, Program, ProgramChange, ProgramStatus, ProgramUpdate, Station, StationChange,
            StationUpdate,
        },
        reference::ProcessStep,
    },
    services::{
        authorization::ProgramScope,
        lifecycle::{self, StationProgress, Transition},
    },
};

const PROGRAM_SELECT: &str = r#"
    SELECT
        p.id, p.work_year, p.required_quarter, p.title, p.description,
        p.status, p.frozen_from,
        p.requester_id, rq.full_name AS requester_name,
        p.division_id, dv.name AS division_name,
        p.department_id, dp.name AS department_name,
        p.domain_id, dm.description AS domain_name,
        p.complexity,
        p.engagement_type_id, et.name AS engagement_type_name,
        p.assigned_officer_id, ofc.full_name AS assigned_officer_name,
        p.team_name, p.estimated_amount, p.currency, p.supplier_list,
        p.justification, p.planning_source, p.start_date,
        p.planning_notes, p.officer_notes, p.created_at, p.updated_at
    FROM programs p
    LEFT JOIN workers rq ON rq.id = p.requester_id
    LEFT JOIN workers ofc ON ofc.id = p.assigned_officer_id
    LEFT JOIN divisions dv ON dv.id = p.division_id
    LEFT JOIN departments dp ON dp.id = p.department_id
    LEFT JOIN domains dm ON dm.id = p.domain_id
    LEFT JOIN engagement_types et ON et.id = p.engagement_type_id
"#;

const STATION_SELECT: &str = r#"
    SELECT
        s.program_id, s.station_id, s.activity_id, a.name AS activity_name,
        s.completion_date, s.reference, s.station_notes, s.reporting_user_id,
        s.is_last_station, s.last_update
    FROM program_stations s
    LEFT JOIN activity_pool a ON a.id = s.activity_id
    WHERE s.program_id = ANY($1)
    ORDER BY s.program_id, s.station_id
"#;

const INVALID_REFERENCE: &str = "Program conflicts with an existing record";

#[derive(Clone)]
pub struct ProgramRepository {
    pool: PgPool,
}

impl ProgramRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_stations(&self, programs: &mut [Program]) -> Result<(), AppError> {
        if programs.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = programs.iter().map(|p| p.id).collect();
        let stations = sqlx::query_as::<_, Station>(STATION_SELECT)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_program: HashMap<i32, Vec<Station>> = HashMap::new();
        for station in stations {
            by_program.entry(station.program_id).or_default().push(station);
        }
        for program in programs.iter_mut() {
            program.stations = by_program.remove(&program.id).unwrap_or_default();
        }
        Ok(())
    }
}

/// Locks the program row for the rest of the transaction and checks its status.
async fn lock_program(
    conn: &mut PgConnection,
    id: i32,
    expected: ProgramStatus,
) -> Result<ProgramStatus, AppError> {
    let current =
        sqlx::query_scalar::<_, ProgramStatus>("SELECT status FROM programs WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Program not found".into()))?;
    lifecycle::ensure_status(current, expected)?;
    Ok(current)
}

fn push_program_change(qb: &mut QueryBuilder<'_, Postgres>, change: ProgramChange) {
    match change {
        ProgramChange::Title(v) => qb.push(", title = ").push_bind(v),
        ProgramChange::Description(v) => qb.push(", description = ").push_bind(v),
        ProgramChange::RequesterId(v) => qb.push(", requester_id = ").push_bind(v),
        ProgramChange::DivisionId(v) => qb.push(", division_id = ").push_bind(v),
        ProgramChange::DepartmentId(v) => qb.push(", department_id = ").push_bind(v),
        ProgramChange::EstimatedAmount(v) => qb.push(", estimated_amount = ").push_bind(v),
        ProgramChange::Currency(v) => qb.push(", currency = ").push_bind(v),
        ProgramChange::SupplierList(v) => qb.push(", supplier_list = ").push_bind(v),
        ProgramChange::Justification(v) => qb.push(", justification = ").push_bind(v),
        ProgramChange::WorkYear(v) => qb.push(", work_year = ").push_bind(v),
        ProgramChange::RequiredQuarter(v) => qb.push(", required_quarter = ").push_bind(v),
        ProgramChange::PlanningSource(v) => qb.push(", planning_source = ").push_bind(v),
        ProgramChange::DomainId(v) => qb.push(", domain_id = ").push_bind(v),
        ProgramChange::Complexity(v) => qb.push(", complexity = ").push_bind(v),
        ProgramChange::EngagementTypeId(v) => qb.push(", engagement_type_id = ").push_bind(v),
        ProgramChange::AssignedOfficerId(v) => qb.push(", assigned_officer_id = ").push_bind(v),
        ProgramChange::StartDate(v) => qb.push(", start_date = ").push_bind(v),
        ProgramChange::OfficerNotes(v) => qb.push(", officer_notes = ").push_bind(v),
        ProgramChange::PlanningNotes(v) => qb.push(", planning_notes = ").push_bind(v),
    };
}

fn push_station_change(qb: &mut QueryBuilder<'_, Postgres>, change: StationChange) {
    match change {
        StationChange::CompletionDate(v) => qb.push(", completion_date = ").push_bind(v),
        StationChange::StationNotes(v) => qb.push(", station_notes = ").push_bind(v),
        StationChange::Reference(v) => qb.push(", reference = ").push_bind(v),
        StationChange::ActivityId(v) => qb.push(", activity_id = ").push_bind(v),
    };
}

#[async_trait]
impl ProgramStore for ProgramRepository {
    async fn list(&self, scope: &ProgramScope) -> Result<Vec<Program>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(PROGRAM_SELECT);
        match scope {
            ProgramScope::All => {}
            ProgramScope::RequestedBy(id) => {
                qb.push(" WHERE p.requester_id = ").push_bind(*id);
            }
            ProgramScope::AssignedTo(id) => {
                qb.push(" WHERE p.assigned_officer_id = ").push_bind(*id);
            }
            ProgramScope::Team(team) => {
                qb.push(" WHERE p.team_name = ").push_bind(team.clone());
            }
            ProgramScope::Nothing => return Ok(Vec::new()),
        }
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");

        let mut programs = qb.build_query_as::<Program>().fetch_all(&self.pool).await?;
        self.attach_stations(&mut programs).await?;
        Ok(programs)
    }

    async fn find(&self, id: i32) -> Result<Option<Program>, AppError> {
        let query = format!("{} WHERE p.id = $1", PROGRAM_SELECT);
        let program = sqlx::query_as::<_, Program>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match program {
            Some(program) => {
                let mut found = [program];
                self.attach_stations(&mut found).await?;
                let [program] = found;
                Ok(Some(program))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, program: NewProgram) -> Result<i32, AppError> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO programs
                (work_year, required_quarter, title, description, status,
                 requester_id, division_id, department_id, domain_id, complexity,
                 estimated_amount, currency, supplier_list, justification,
                 planning_source, start_date)
            VALUES ($1, $2, $3, $4, 'Open', $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            "#,
        )
        .bind(program.work_year)
        .bind(program.required_quarter)
        .bind(program.title)
        .bind(program.description)
        .bind(program.requester_id)
        .bind(program.division_id)
        .bind(program.department_id)
        .bind(program.domain_id)
        .bind(program.complexity)
        .bind(program.estimated_amount)
        .bind(program.currency)
        .bind(program.supplier_list)
        .bind(program.justification)
        .bind(program.planning_source)
        .bind(program.start_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, INVALID_REFERENCE))?;

        Ok(id)
    }

    async fn apply_update(&self, id: i32, update: ProgramUpdate) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        lock_program(&mut *tx, id, update.expected_status).await?;

        // 1. Program columns
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE programs SET updated_at = NOW()");
        for change in update.changes {
            push_program_change(&mut qb, change);
        }
        if let Some(team) = update.team_name {
            qb.push(", team_name = ").push_bind(team);
        }
        if let Some((status, frozen_from)) = update.lifecycle {
            qb.push(", status = ").push_bind(status);
            qb.push(", frozen_from = ").push_bind(frozen_from);
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| constraint_error(e, INVALID_REFERENCE))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Program not found".into()));
        }

        // 2. Station set, replaced wholesale
        if let Some(stations) = update.stations {
            sqlx::query("DELETE FROM program_stations WHERE program_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            if !stations.is_empty() {
                let mut insert = QueryBuilder::<Postgres>::new(
                    "INSERT INTO program_stations (program_id, station_id, activity_id, is_last_station) ",
                );
                insert.push_values(stations, |mut row, station| {
                    row.push_bind(id)
                        .push_bind(station.station_id)
                        .push_bind(station.activity_id)
                        .push_bind(station.is_last_station);
                });
                insert
                    .build()
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| constraint_error(e, INVALID_REFERENCE))?;
            }
        }

        // 3. All or nothing
        tx.commit().await?;
        Ok(())
    }

    async fn apply_station_update(
        &self,
        program_id: i32,
        station_id: i16,
        update: StationUpdate,
    ) -> Result<Option<Transition>, AppError> {
        let mut tx = self.pool.begin().await?;
        let status = lock_program(&mut *tx, program_id, update.expected_status).await?;

        // 1. The patch
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE program_stations SET last_update = NOW()");
        qb.push(", reporting_user_id = ").push_bind(update.reporting_user_id);
        for change in update.changes {
            push_station_change(&mut qb, change);
        }
        qb.push(" WHERE program_id = ").push_bind(program_id);
        qb.push(" AND station_id = ").push_bind(station_id);

        let result = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| constraint_error(e, INVALID_REFERENCE))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Station not found".into()));
        }

        // 2. Progress from the stored rows, parallel station edits included
        let stations = sqlx::query_as::<_, Station>(STATION_SELECT)
            .bind(vec![program_id])
            .fetch_all(&mut *tx)
            .await?;
        let moved = lifecycle::advance(status, StationProgress::of(&stations), update.auto_close)?;

        let mut parent = QueryBuilder::<Postgres>::new("UPDATE programs SET updated_at = NOW()");
        if let Some(Transition { status, frozen_from }) = moved {
            parent.push(", status = ").push_bind(status);
            parent.push(", frozen_from = ").push_bind(frozen_from);
        }
        parent.push(" WHERE id = ").push_bind(program_id);
        parent.build().execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(moved)
    }

    async fn template_processes(
        &self,
        engagement_type_id: i32,
    ) -> Result<Option<Vec<ProcessStep>>, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM engagement_types WHERE id = $1)")
                .bind(engagement_type_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Ok(None);
        }

        let steps = sqlx::query_as::<_, ProcessStep>(
            r#"
            SELECT station_id, activity_id
            FROM engagement_type_processes
            WHERE engagement_type_id = $1
            ORDER BY station_id
            "#,
        )
        .bind(engagement_type_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(steps))
    }
}
