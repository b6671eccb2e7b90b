use std::collections::BTreeMap;
use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::{format_date, parse_date};
use crate::error::{AppError, AppResult};
use crate::models::leave::{LeaveRecord, LeaveStatus, LeaveType};

#[derive(Debug, Clone)]
pub struct LeaveRow {
    pub id: String,
    pub user_id: String,
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
    pub reason: String,
}

impl LeaveRow {
    pub fn into_record(self) -> AppResult<LeaveRecord> {
        let leave_type = LeaveType::try_from(self.leave_type.as_str()).map_err(AppError::validation)?;
        let status = LeaveStatus::try_from(self.status.as_str()).map_err(AppError::validation)?;

        Ok(LeaveRecord {
            id: self.id,
            user_id: self.user_id,
            leave_type,
            start_date: parse_date(&self.start_date)?,
            end_date: parse_date(&self.end_date)?,
            status,
            reason: self.reason,
        })
    }
}

impl TryFrom<&Row<'_>> for LeaveRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            leave_type: row.get("leave_type")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            status: row.get("status")?,
            reason: row.get("reason")?,
        })
    }
}

pub struct LeaveRepository;

impl LeaveRepository {
    pub fn insert(conn: &Connection, record: &LeaveRecord) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO leaves (id, user_id, leave_type, start_date, end_date, status, reason)
                VALUES (:id, :user_id, :leave_type, :start_date, :end_date, :status, :reason)
            "#,
            named_params! {
                ":id": &record.id,
                ":user_id": &record.user_id,
                ":leave_type": record.leave_type.as_str(),
                ":start_date": format_date(record.start_date),
                ":end_date": format_date(record.end_date),
                ":status": record.status.as_str(),
                ":reason": &record.reason,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<LeaveRecord> {
        let row = conn
            .query_row(
                r#"
                    SELECT id, user_id, leave_type, start_date, end_date, status, reason
                    FROM leaves
                    WHERE id = :id
                "#,
                named_params! {":id": id},
                |row| LeaveRow::try_from(row),
            )
            .optional()?;

        match row {
            Some(row) => row.into_record(),
            None => Err(AppError::not_found()),
        }
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<LeaveRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, leave_type, start_date, end_date, status, reason
                FROM leaves
                ORDER BY start_date ASC, id ASC
            "#,
        )?;

        let records = stmt
            .query_map([], |row| LeaveRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<LeaveRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, leave_type, start_date, end_date, status, reason
                FROM leaves
                WHERE user_id = :user_id
                ORDER BY start_date DESC, id ASC
            "#,
        )?;

        let records = stmt
            .query_map(named_params! {":user_id": user_id}, |row| LeaveRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn update_status(conn: &Connection, id: &str, status: LeaveStatus) -> AppResult<()> {
        let affected = conn.execute(
            "UPDATE leaves SET status = :status WHERE id = :id",
            named_params! {":id": id, ":status": status.as_str()},
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    /// Stored allowances only; callers fill in defaults for missing types.
    pub fn allowances_for(conn: &Connection, user_id: &str) -> AppResult<BTreeMap<LeaveType, f64>> {
        let mut stmt = conn.prepare(
            "SELECT leave_type, days FROM leave_allowances WHERE user_id = :user_id",
        )?;

        let rows = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                Ok((row.get::<_, String>("leave_type")?, row.get::<_, f64>("days")?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(kind, days)| {
                LeaveType::try_from(kind.as_str())
                    .map(|kind| (kind, days))
                    .map_err(AppError::validation)
            })
            .collect()
    }

    pub fn set_allowance(
        conn: &Connection,
        user_id: &str,
        leave_type: LeaveType,
        days: f64,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO leave_allowances (user_id, leave_type, days)
                VALUES (:user_id, :leave_type, :days)
                ON CONFLICT(user_id, leave_type) DO UPDATE SET days = excluded.days
            "#,
            named_params! {
                ":user_id": user_id,
                ":leave_type": leave_type.as_str(),
                ":days": days,
            },
        )?;

        Ok(())
    }

    pub fn list_allowances(conn: &Connection) -> AppResult<Vec<(String, LeaveType, f64)>> {
        let mut stmt = conn.prepare(
            "SELECT user_id, leave_type, days FROM leave_allowances ORDER BY user_id, leave_type",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>("user_id")?,
                    row.get::<_, String>("leave_type")?,
                    row.get::<_, f64>("days")?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(user_id, kind, days)| {
                LeaveType::try_from(kind.as_str())
                    .map(|kind| (user_id, kind, days))
                    .map_err(AppError::validation)
            })
            .collect()
    }
}
