use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::{format_date, parse_date};
use crate::error::{AppError, AppResult};
use crate::models::notification::{Notification, NotificationKind};

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub kind: String,
    pub user_id: String,
    pub date: String,
    pub message: String,
    pub ts: String,
}

impl NotificationRow {
    pub fn into_record(self) -> AppResult<Notification> {
        let kind = NotificationKind::try_from(self.kind.as_str()).map_err(AppError::validation)?;
        Ok(Notification {
            id: self.id,
            kind,
            user_id: self.user_id,
            date: self.date,
            message: self.message,
            ts: self.ts,
        })
    }
}

impl TryFrom<&Row<'_>> for NotificationRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            kind: row.get("kind")?,
            user_id: row.get("user_id")?,
            date: row.get("date")?,
            message: row.get("message")?,
            ts: row.get("ts")?,
        })
    }
}

pub struct NotificationRepository;

impl NotificationRepository {
    /// Idempotent by id; returns `false` when the notification already existed.
    pub fn insert(conn: &Connection, notification: &Notification) -> AppResult<bool> {
        let inserted = conn.execute(
            r#"
                INSERT INTO notifications (id, kind, user_id, date, message, ts)
                VALUES (:id, :kind, :user_id, :date, :message, :ts)
                ON CONFLICT(id) DO NOTHING
            "#,
            named_params! {
                ":id": &notification.id,
                ":kind": notification.kind.as_str(),
                ":user_id": &notification.user_id,
                ":date": &notification.date,
                ":message": &notification.message,
                ":ts": &notification.ts,
            },
        )?;

        Ok(inserted > 0)
    }

    /// Newest first, optionally restricted to one user and/or kind.
    pub fn list(
        conn: &Connection,
        user_id: Option<&str>,
        kind: Option<NotificationKind>,
    ) -> AppResult<Vec<Notification>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, kind, user_id, date, message, ts
                FROM notifications
                WHERE (:user_id IS NULL OR user_id = :user_id)
                  AND (:kind IS NULL OR kind = :kind)
                ORDER BY ts DESC, rowid DESC
            "#,
        )?;

        let records = stmt
            .query_map(
                named_params! {":user_id": user_id, ":kind": kind.map(|kind| kind.as_str())},
                |row| NotificationRow::try_from(row),
            )?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn dismiss_nudge(
        conn: &Connection,
        user_id: &str,
        nudge_key: &str,
        until: NaiveDate,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO nudge_dismissals (user_id, nudge_key, until_date)
                VALUES (:user_id, :nudge_key, :until_date)
                ON CONFLICT(user_id, nudge_key) DO UPDATE SET until_date = excluded.until_date
            "#,
            named_params! {
                ":user_id": user_id,
                ":nudge_key": nudge_key,
                ":until_date": format_date(until),
            },
        )?;

        Ok(())
    }

    pub fn nudge_dismissed_until(
        conn: &Connection,
        user_id: &str,
        nudge_key: &str,
    ) -> AppResult<Option<NaiveDate>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT until_date FROM nudge_dismissals WHERE user_id = :user_id AND nudge_key = :nudge_key",
                named_params! {":user_id": user_id, ":nudge_key": nudge_key},
                |row| row.get(0),
            )
            .optional()?;

        raw.as_deref().map(parse_date).transpose()
    }
}
