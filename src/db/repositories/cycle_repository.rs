use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::{deserialize_json, serialize_json};
use crate::error::{AppError, AppResult};
use crate::models::cycle::{AppraisalCycle, CycleType};

const SELECT_COLUMNS: &str = r#"
    SELECT id, cycle_type, period, owner_id, participants, status_by_user, roles_by_user, reminders, created_at
    FROM appraisal_cycles
"#;

#[derive(Debug, Clone)]
pub struct CycleRow {
    pub id: String,
    pub cycle_type: String,
    pub period: String,
    pub owner_id: Option<String>,
    pub participants: String,
    pub status_by_user: String,
    pub roles_by_user: String,
    pub reminders: String,
    pub created_at: String,
}

impl CycleRow {
    pub fn from_record(cycle: &AppraisalCycle) -> AppResult<Self> {
        Ok(Self {
            id: cycle.id.clone(),
            cycle_type: cycle.cycle_type.as_str().to_string(),
            period: cycle.period.clone(),
            owner_id: cycle.owner_id.clone(),
            participants: serialize_json(&cycle.participants)?,
            status_by_user: serialize_json(&cycle.status_by_user)?,
            roles_by_user: serialize_json(&cycle.roles_by_user)?,
            reminders: serialize_json(&cycle.reminders)?,
            created_at: cycle.created_at.clone(),
        })
    }

    pub fn into_record(self) -> AppResult<AppraisalCycle> {
        let cycle_type = CycleType::try_from(self.cycle_type.as_str()).map_err(AppError::validation)?;

        Ok(AppraisalCycle {
            id: self.id,
            cycle_type,
            period: self.period,
            owner_id: self.owner_id,
            participants: deserialize_json(&self.participants)?,
            status_by_user: deserialize_json(&self.status_by_user)?,
            roles_by_user: deserialize_json(&self.roles_by_user)?,
            reminders: deserialize_json(&self.reminders)?,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for CycleRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            cycle_type: row.get("cycle_type")?,
            period: row.get("period")?,
            owner_id: row.get("owner_id")?,
            participants: row.get("participants")?,
            status_by_user: row.get("status_by_user")?,
            roles_by_user: row.get("roles_by_user")?,
            reminders: row.get("reminders")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct CycleRepository;

impl CycleRepository {
    pub fn insert(conn: &Connection, cycle: &AppraisalCycle) -> AppResult<()> {
        let row = CycleRow::from_record(cycle)?;

        conn.execute(
            r#"
                INSERT INTO appraisal_cycles (
                    id, cycle_type, period, owner_id, participants, status_by_user,
                    roles_by_user, reminders, created_at
                ) VALUES (
                    :id, :cycle_type, :period, :owner_id, :participants, :status_by_user,
                    :roles_by_user, :reminders, :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":cycle_type": &row.cycle_type,
                ":period": &row.period,
                ":owner_id": &row.owner_id,
                ":participants": &row.participants,
                ":status_by_user": &row.status_by_user,
                ":roles_by_user": &row.roles_by_user,
                ":reminders": &row.reminders,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, cycle: &AppraisalCycle) -> AppResult<()> {
        let row = CycleRow::from_record(cycle)?;

        let affected = conn.execute(
            r#"
                UPDATE appraisal_cycles SET
                    period = :period,
                    owner_id = :owner_id,
                    participants = :participants,
                    status_by_user = :status_by_user,
                    roles_by_user = :roles_by_user,
                    reminders = :reminders
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":period": &row.period,
                ":owner_id": &row.owner_id,
                ":participants": &row.participants,
                ":status_by_user": &row.status_by_user,
                ":roles_by_user": &row.roles_by_user,
                ":reminders": &row.reminders,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<AppraisalCycle> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = :id");
        let row = conn
            .query_row(&sql, named_params! {":id": id}, |row| CycleRow::try_from(row))
            .optional()?;

        match row {
            Some(row) => row.into_record(),
            None => Err(AppError::not_found()),
        }
    }

    pub fn list(conn: &Connection) -> AppResult<Vec<AppraisalCycle>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at ASC, rowid ASC");
        let mut stmt = conn.prepare(&sql)?;

        let cycles = stmt
            .query_map([], |row| CycleRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(cycles)
    }
}
