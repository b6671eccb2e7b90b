use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::{format_date, parse_date};
use crate::error::{AppError, AppResult};
use crate::models::checkin::CheckIn;

#[derive(Debug, Clone)]
pub struct CheckInRow {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub mood: f64,
    pub stress: i64,
    pub workload: i64,
    pub note: String,
}

impl CheckInRow {
    pub fn into_record(self) -> AppResult<CheckIn> {
        Ok(CheckIn {
            id: self.id,
            user_id: self.user_id,
            date: parse_date(&self.date)?,
            mood: self.mood,
            stress: self.stress.clamp(1, 5) as u8,
            workload: self.workload.clamp(1, 5) as u8,
            note: self.note,
        })
    }
}

impl TryFrom<&Row<'_>> for CheckInRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            date: row.get("date")?,
            mood: row.get("mood")?,
            stress: row.get("stress")?,
            workload: row.get("workload")?,
            note: row.get("note")?,
        })
    }
}

pub struct CheckInRepository;

impl CheckInRepository {
    /// Inserts or replaces the check-in for `(user_id, date)` and returns the stored row.
    pub fn upsert(conn: &Connection, check_in: &CheckIn) -> AppResult<CheckIn> {
        conn.execute(
            r#"
                INSERT INTO check_ins (id, user_id, date, mood, stress, workload, note, updated_at)
                VALUES (:id, :user_id, :date, :mood, :stress, :workload, :note, CURRENT_TIMESTAMP)
                ON CONFLICT(user_id, date) DO UPDATE SET
                    mood = excluded.mood,
                    stress = excluded.stress,
                    workload = excluded.workload,
                    note = excluded.note,
                    updated_at = CURRENT_TIMESTAMP
            "#,
            named_params! {
                ":id": &check_in.id,
                ":user_id": &check_in.user_id,
                ":date": format_date(check_in.date),
                ":mood": check_in.mood,
                ":stress": check_in.stress as i64,
                ":workload": check_in.workload as i64,
                ":note": &check_in.note,
            },
        )?;

        Self::find(conn, &check_in.user_id, check_in.date)?.ok_or_else(AppError::not_found)
    }

    pub fn find(conn: &Connection, user_id: &str, date: NaiveDate) -> AppResult<Option<CheckIn>> {
        let row = conn
            .query_row(
                r#"
                    SELECT id, user_id, date, mood, stress, workload, note
                    FROM check_ins
                    WHERE user_id = :user_id AND date = :date
                "#,
                named_params! {":user_id": user_id, ":date": format_date(date)},
                |row| CheckInRow::try_from(row),
            )
            .optional()?;

        row.map(CheckInRow::into_record).transpose()
    }

    pub fn list_for_user_between(
        conn: &Connection,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<CheckIn>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, date, mood, stress, workload, note
                FROM check_ins
                WHERE user_id = :user_id AND date >= :start AND date <= :end
                ORDER BY date ASC
            "#,
        )?;

        let records = stmt
            .query_map(
                named_params! {
                    ":user_id": user_id,
                    ":start": format_date(start),
                    ":end": format_date(end),
                },
                |row| CheckInRow::try_from(row),
            )?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_between(conn: &Connection, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<CheckIn>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, date, mood, stress, workload, note
                FROM check_ins
                WHERE date >= :start AND date <= :end
                ORDER BY date ASC, user_id ASC
            "#,
        )?;

        let records = stmt
            .query_map(
                named_params! {":start": format_date(start), ":end": format_date(end)},
                |row| CheckInRow::try_from(row),
            )?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<CheckIn>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, date, mood, stress, workload, note
                FROM check_ins
                ORDER BY date ASC, user_id ASC
            "#,
        )?;

        let records = stmt
            .query_map([], |row| CheckInRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    /// Removes check-ins dated strictly before `cutoff`; returns the number removed.
    pub fn delete_before(conn: &Connection, cutoff: NaiveDate) -> AppResult<usize> {
        let removed = conn.execute(
            "DELETE FROM check_ins WHERE date < :cutoff",
            named_params! {":cutoff": format_date(cutoff)},
        )?;
        Ok(removed)
    }
}
