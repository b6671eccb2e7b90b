use std::convert::TryFrom;

use rusqlite::{named_params, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::kpi::{KpiRecord, KpiTemplate, TemplateScope};

#[derive(Debug, Clone)]
pub struct KpiTemplateRow {
    pub scope: String,
    pub scope_name: String,
    pub key: String,
    pub title: String,
    pub unit: String,
    pub weight: f64,
    pub target: f64,
    pub kra: Option<String>,
}

impl KpiTemplateRow {
    pub fn into_record(self) -> AppResult<KpiTemplate> {
        let scope = TemplateScope::try_from(self.scope.as_str()).map_err(AppError::validation)?;
        Ok(KpiTemplate {
            scope,
            scope_name: self.scope_name,
            key: self.key,
            title: self.title,
            unit: self.unit,
            weight: self.weight,
            target: self.target,
            kra: self.kra,
        })
    }
}

impl TryFrom<&Row<'_>> for KpiTemplateRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            scope: row.get("scope")?,
            scope_name: row.get("scope_name")?,
            key: row.get("key")?,
            title: row.get("title")?,
            unit: row.get("unit")?,
            weight: row.get("weight")?,
            target: row.get("target")?,
            kra: row.get("kra")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct KpiRow {
    pub id: String,
    pub user_id: String,
    pub key: String,
    pub title: String,
    pub unit: String,
    pub weight: f64,
    pub target: f64,
    pub actual: f64,
    pub kra: Option<String>,
}

impl KpiRow {
    pub fn into_record(self) -> KpiRecord {
        KpiRecord {
            id: self.id,
            user_id: self.user_id,
            key: self.key,
            title: self.title,
            unit: self.unit,
            weight: self.weight,
            target: self.target,
            actual: self.actual,
            kra: self.kra,
        }
    }
}

impl TryFrom<&Row<'_>> for KpiRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            key: row.get("key")?,
            title: row.get("title")?,
            unit: row.get("unit")?,
            weight: row.get("weight")?,
            target: row.get("target")?,
            actual: row.get("actual")?,
            kra: row.get("kra")?,
        })
    }
}

pub struct KpiRepository;

impl KpiRepository {
    pub fn templates_for(
        conn: &Connection,
        scope: TemplateScope,
        scope_name: &str,
    ) -> AppResult<Vec<KpiTemplate>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT scope, scope_name, key, title, unit, weight, target, kra
                FROM kpi_templates
                WHERE scope = :scope AND scope_name = :scope_name
                ORDER BY position ASC, key ASC
            "#,
        )?;

        let templates = stmt
            .query_map(
                named_params! {":scope": scope.as_str(), ":scope_name": scope_name},
                |row| KpiTemplateRow::try_from(row),
            )?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(templates)
    }

    pub fn upsert_template(conn: &Connection, template: &KpiTemplate) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO kpi_templates (scope, scope_name, key, title, unit, weight, target, kra, position)
                VALUES (
                    :scope, :scope_name, :key, :title, :unit, :weight, :target, :kra,
                    (SELECT COALESCE(MAX(position), -1) + 1 FROM kpi_templates)
                )
                ON CONFLICT(scope, scope_name, key) DO UPDATE SET
                    title = excluded.title,
                    unit = excluded.unit,
                    weight = excluded.weight,
                    target = excluded.target,
                    kra = excluded.kra
            "#,
            named_params! {
                ":scope": template.scope.as_str(),
                ":scope_name": &template.scope_name,
                ":key": &template.key,
                ":title": &template.title,
                ":unit": &template.unit,
                ":weight": template.weight,
                ":target": template.target,
                ":kra": &template.kra,
            },
        )?;

        Ok(())
    }

    pub fn list_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<KpiRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, key, title, unit, weight, target, actual, kra
                FROM user_kpis
                WHERE user_id = :user_id
                ORDER BY position ASC, id ASC
            "#,
        )?;

        let records = stmt
            .query_map(named_params! {":user_id": user_id}, |row| KpiRow::try_from(row))?
            .map(|row| row.map(KpiRow::into_record).map_err(AppError::from))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<KpiRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, key, title, unit, weight, target, actual, kra
                FROM user_kpis
                ORDER BY user_id ASC, position ASC
            "#,
        )?;

        let records = stmt
            .query_map([], |row| KpiRow::try_from(row))?
            .map(|row| row.map(KpiRow::into_record).map_err(AppError::from))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn count_for_user(conn: &Connection, user_id: &str) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM user_kpis WHERE user_id = :user_id",
            named_params! {":user_id": user_id},
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// New KPIs are appended after the user's existing ones.
    pub fn upsert(conn: &Connection, kpi: &KpiRecord) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO user_kpis (id, user_id, key, title, unit, weight, target, actual, kra, position)
                VALUES (
                    :id, :user_id, :key, :title, :unit, :weight, :target, :actual, :kra,
                    (SELECT COALESCE(MAX(position), -1) + 1 FROM user_kpis WHERE user_id = :user_id)
                )
                ON CONFLICT(user_id, id) DO UPDATE SET
                    key = excluded.key,
                    title = excluded.title,
                    unit = excluded.unit,
                    weight = excluded.weight,
                    target = excluded.target,
                    actual = excluded.actual,
                    kra = excluded.kra
            "#,
            named_params! {
                ":id": &kpi.id,
                ":user_id": &kpi.user_id,
                ":key": &kpi.key,
                ":title": &kpi.title,
                ":unit": &kpi.unit,
                ":weight": kpi.weight,
                ":target": kpi.target,
                ":actual": kpi.actual,
                ":kra": &kpi.kra,
            },
        )?;

        Ok(())
    }

    pub fn delete(conn: &Connection, user_id: &str, kpi_id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM user_kpis WHERE user_id = :user_id AND id = :id",
            named_params! {":user_id": user_id, ":id": kpi_id},
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }
}
