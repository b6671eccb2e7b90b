use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, Row};

use crate::db::repositories::{format_timestamp, parse_timestamp};
use crate::error::{AppError, AppResult};
use crate::models::mood::{Mood, MoodEntry, MoodSession};

#[derive(Debug, Clone)]
pub struct MoodEntryRow {
    pub id: String,
    pub employee_id: String,
    pub session: String,
    pub mood: String,
    pub intensity: i64,
    pub notes: String,
    pub timestamp: String,
}

impl MoodEntryRow {
    pub fn from_record(entry: &MoodEntry) -> Self {
        Self {
            id: entry.id.clone(),
            employee_id: entry.employee_id.clone(),
            session: entry.session.as_str().to_string(),
            mood: entry.mood.as_str().to_string(),
            intensity: i64::from(entry.intensity),
            notes: entry.notes.clone(),
            timestamp: format_timestamp(entry.timestamp),
        }
    }

    pub fn into_record(self) -> AppResult<MoodEntry> {
        let session = MoodSession::try_from(self.session.as_str()).map_err(AppError::validation)?;
        let mood = Mood::try_from(self.mood.as_str()).map_err(AppError::validation)?;

        Ok(MoodEntry {
            id: self.id,
            employee_id: self.employee_id,
            session,
            mood,
            intensity: self.intensity.clamp(1, 5) as u8,
            notes: self.notes,
            timestamp: parse_timestamp(&self.timestamp)?,
        })
    }
}

impl TryFrom<&Row<'_>> for MoodEntryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            employee_id: row.get("employee_id")?,
            session: row.get("session")?,
            mood: row.get("mood")?,
            intensity: row.get("intensity")?,
            notes: row.get("notes")?,
            timestamp: row.get("timestamp")?,
        })
    }
}

pub struct MoodRepository;

impl MoodRepository {
    pub fn insert(conn: &Connection, entry: &MoodEntry) -> AppResult<()> {
        let row = MoodEntryRow::from_record(entry);

        conn.execute(
            r#"
                INSERT INTO mood_entries (id, employee_id, session, mood, intensity, notes, timestamp)
                VALUES (:id, :employee_id, :session, :mood, :intensity, :notes, :timestamp)
            "#,
            named_params! {
                ":id": &row.id,
                ":employee_id": &row.employee_id,
                ":session": &row.session,
                ":mood": &row.mood,
                ":intensity": row.intensity,
                ":notes": &row.notes,
                ":timestamp": &row.timestamp,
            },
        )?;

        Ok(())
    }

    pub fn list_for_employee_since(
        conn: &Connection,
        employee_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<MoodEntry>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, employee_id, session, mood, intensity, notes, timestamp
                FROM mood_entries
                WHERE employee_id = :employee_id AND timestamp >= :since
                ORDER BY timestamp ASC
            "#,
        )?;

        let entries = stmt
            .query_map(
                named_params! {":employee_id": employee_id, ":since": format_timestamp(since)},
                |row| MoodEntryRow::try_from(row),
            )?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(entries)
    }

    pub fn list_since(conn: &Connection, since: DateTime<Utc>) -> AppResult<Vec<MoodEntry>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, employee_id, session, mood, intensity, notes, timestamp
                FROM mood_entries
                WHERE timestamp >= :since
                ORDER BY timestamp ASC
            "#,
        )?;

        let entries = stmt
            .query_map(named_params! {":since": format_timestamp(since)}, |row| {
                MoodEntryRow::try_from(row)
            })?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(entries)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<MoodEntry>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, employee_id, session, mood, intensity, notes, timestamp
                FROM mood_entries
                ORDER BY timestamp ASC
            "#,
        )?;

        let entries = stmt
            .query_map([], |row| MoodEntryRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(entries)
    }
}
