use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::{deserialize_json, serialize_json};
use crate::error::{AppError, AppResult};
use crate::models::appraisal::{Appraisal, AppraisalStatus};

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, period, status, self_review, manager_review, peers, summary, created_at, updated_at
    FROM appraisals
"#;

#[derive(Debug, Clone)]
pub struct AppraisalRow {
    pub id: String,
    pub user_id: String,
    pub period: String,
    pub status: String,
    pub self_review: String,
    pub manager_review: String,
    pub peers: String,
    pub summary: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AppraisalRow {
    pub fn from_record(appraisal: &Appraisal) -> AppResult<Self> {
        Ok(Self {
            id: appraisal.id.clone(),
            user_id: appraisal.user_id.clone(),
            period: appraisal.period.clone(),
            status: appraisal.status.as_str().to_string(),
            self_review: serialize_json(&appraisal.self_review)?,
            manager_review: serialize_json(&appraisal.manager)?,
            peers: serialize_json(&appraisal.peers)?,
            summary: appraisal.summary.as_ref().map(serialize_json).transpose()?,
            created_at: appraisal.created_at.clone(),
            updated_at: appraisal.updated_at.clone(),
        })
    }

    pub fn into_record(self) -> AppResult<Appraisal> {
        let status = AppraisalStatus::try_from(self.status.as_str()).map_err(AppError::validation)?;

        Ok(Appraisal {
            id: self.id,
            user_id: self.user_id,
            period: self.period,
            status,
            self_review: deserialize_json(&self.self_review)?,
            manager: deserialize_json(&self.manager_review)?,
            peers: deserialize_json(&self.peers)?,
            summary: match self.summary {
                Some(raw) if !raw.is_empty() => Some(deserialize_json(&raw)?),
                _ => None,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for AppraisalRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            period: row.get("period")?,
            status: row.get("status")?,
            self_review: row.get("self_review")?,
            manager_review: row.get("manager_review")?,
            peers: row.get("peers")?,
            summary: row.get("summary")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct AppraisalRepository;

impl AppraisalRepository {
    pub fn find(conn: &Connection, user_id: &str, period: &str) -> AppResult<Option<Appraisal>> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = :user_id AND period = :period");
        let row = conn
            .query_row(
                &sql,
                named_params! {":user_id": user_id, ":period": period},
                |row| AppraisalRow::try_from(row),
            )
            .optional()?;

        row.map(AppraisalRow::into_record).transpose()
    }

    pub fn insert(conn: &Connection, appraisal: &Appraisal) -> AppResult<()> {
        let row = AppraisalRow::from_record(appraisal)?;

        conn.execute(
            r#"
                INSERT INTO appraisals (
                    id, user_id, period, status, self_review, manager_review, peers, summary,
                    created_at, updated_at
                ) VALUES (
                    :id, :user_id, :period, :status, :self_review, :manager_review, :peers, :summary,
                    :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":period": &row.period,
                ":status": &row.status,
                ":self_review": &row.self_review,
                ":manager_review": &row.manager_review,
                ":peers": &row.peers,
                ":summary": &row.summary,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, appraisal: &Appraisal) -> AppResult<()> {
        let row = AppraisalRow::from_record(appraisal)?;

        let affected = conn.execute(
            r#"
                UPDATE appraisals SET
                    status = :status,
                    self_review = :self_review,
                    manager_review = :manager_review,
                    peers = :peers,
                    summary = :summary,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":status": &row.status,
                ":self_review": &row.self_review,
                ":manager_review": &row.manager_review,
                ":peers": &row.peers,
                ":summary": &row.summary,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    /// Newest first.
    pub fn list_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<Appraisal>> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = :user_id ORDER BY created_at DESC, period DESC");
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(named_params! {":user_id": user_id}, |row| AppraisalRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<Appraisal>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at ASC");
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map([], |row| AppraisalRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }
}
