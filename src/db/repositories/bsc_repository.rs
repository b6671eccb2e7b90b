use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::{deserialize_json, serialize_json};
use crate::error::{AppError, AppResult};
use crate::models::bsc::{BscObjective, BscReview, BscStatus, Perspective};

const OBJECTIVE_COLUMNS: &str = r#"
    SELECT id, user_id, department, perspective, objective, kpis, target, actual, status, initiative, theme
    FROM bsc_objectives
"#;

#[derive(Debug, Clone)]
pub struct BscObjectiveRow {
    pub id: String,
    pub user_id: String,
    pub department: String,
    pub perspective: String,
    pub objective: String,
    pub kpis: String,
    pub target: f64,
    pub actual: f64,
    pub status: String,
    pub initiative: String,
    pub theme: String,
}

impl BscObjectiveRow {
    pub fn into_record(self) -> AppResult<BscObjective> {
        let perspective = Perspective::try_from(self.perspective.as_str()).map_err(AppError::validation)?;
        let status = BscStatus::try_from(self.status.as_str()).map_err(AppError::validation)?;

        Ok(BscObjective {
            id: self.id,
            user_id: self.user_id,
            department: self.department,
            perspective,
            objective: self.objective,
            kpis: deserialize_json(&self.kpis)?,
            target: self.target,
            actual: self.actual,
            status,
            initiative: self.initiative,
            theme: self.theme,
        })
    }
}

impl TryFrom<&Row<'_>> for BscObjectiveRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            department: row.get("department")?,
            perspective: row.get("perspective")?,
            objective: row.get("objective")?,
            kpis: row.get("kpis")?,
            target: row.get("target")?,
            actual: row.get("actual")?,
            status: row.get("status")?,
            initiative: row.get("initiative")?,
            theme: row.get("theme")?,
        })
    }
}

impl TryFrom<&Row<'_>> for BscReview {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            subject_id: row.get("subject_id")?,
            cycle_id: row.get("cycle_id")?,
            period: row.get("period")?,
            objective_id: row.get("objective_id")?,
            rater_id: row.get("rater_id")?,
            rater_role: row.get("rater_role")?,
            rating: row.get("rating")?,
            comment: row.get("comment")?,
            ts: row.get("ts")?,
        })
    }
}

pub struct BscRepository;

impl BscRepository {
    pub fn upsert_objective(conn: &Connection, objective: &BscObjective) -> AppResult<()> {
        let kpis = serialize_json(&objective.kpis)?;

        conn.execute(
            r#"
                INSERT INTO bsc_objectives (
                    id, user_id, department, perspective, objective, kpis, target, actual,
                    status, initiative, theme, created_at
                ) VALUES (
                    :id, :user_id, :department, :perspective, :objective, :kpis, :target, :actual,
                    :status, :initiative, :theme, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                )
                ON CONFLICT(id) DO UPDATE SET
                    department = excluded.department,
                    perspective = excluded.perspective,
                    objective = excluded.objective,
                    kpis = excluded.kpis,
                    target = excluded.target,
                    actual = excluded.actual,
                    status = excluded.status,
                    initiative = excluded.initiative,
                    theme = excluded.theme
            "#,
            named_params! {
                ":id": &objective.id,
                ":user_id": &objective.user_id,
                ":department": &objective.department,
                ":perspective": objective.perspective.as_str(),
                ":objective": &objective.objective,
                ":kpis": &kpis,
                ":target": objective.target,
                ":actual": objective.actual,
                ":status": objective.status.as_str(),
                ":initiative": &objective.initiative,
                ":theme": &objective.theme,
            },
        )?;

        Ok(())
    }

    pub fn find_objective(conn: &Connection, id: &str) -> AppResult<BscObjective> {
        let sql = format!("{OBJECTIVE_COLUMNS} WHERE id = :id");
        let row = conn
            .query_row(&sql, named_params! {":id": id}, |row| BscObjectiveRow::try_from(row))
            .optional()?;

        match row {
            Some(row) => row.into_record(),
            None => Err(AppError::not_found()),
        }
    }

    pub fn list_objectives_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<BscObjective>> {
        let sql = format!("{OBJECTIVE_COLUMNS} WHERE user_id = :user_id ORDER BY rowid ASC");
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(named_params! {":user_id": user_id}, |row| BscObjectiveRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_objectives(conn: &Connection) -> AppResult<Vec<BscObjective>> {
        let sql = format!("{OBJECTIVE_COLUMNS} ORDER BY user_id ASC, rowid ASC");
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map([], |row| BscObjectiveRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn delete_objective(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM bsc_objectives WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn insert_review(conn: &Connection, review: &BscReview) -> AppResult<i64> {
        conn.execute(
            r#"
                INSERT INTO bsc_reviews (
                    subject_id, cycle_id, period, objective_id, rater_id, rater_role, rating, comment, ts
                ) VALUES (
                    :subject_id, :cycle_id, :period, :objective_id, :rater_id, :rater_role, :rating, :comment, :ts
                )
            "#,
            named_params! {
                ":subject_id": &review.subject_id,
                ":cycle_id": &review.cycle_id,
                ":period": &review.period,
                ":objective_id": &review.objective_id,
                ":rater_id": &review.rater_id,
                ":rater_role": &review.rater_role,
                ":rating": &review.rating,
                ":comment": &review.comment,
                ":ts": &review.ts,
            },
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn list_reviews_for_subject(conn: &Connection, subject_id: &str) -> AppResult<Vec<BscReview>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, subject_id, cycle_id, period, objective_id, rater_id, rater_role, rating, comment, ts
                FROM bsc_reviews
                WHERE subject_id = :subject_id
                ORDER BY id ASC
            "#,
        )?;

        let reviews = stmt
            .query_map(named_params! {":subject_id": subject_id}, |row| BscReview::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reviews)
    }

    pub fn list_reviews(conn: &Connection) -> AppResult<Vec<BscReview>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, subject_id, cycle_id, period, objective_id, rater_id, rater_role, rating, comment, ts
                FROM bsc_reviews
                ORDER BY id ASC
            "#,
        )?;

        let reviews = stmt
            .query_map([], |row| BscReview::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reviews)
    }
}
