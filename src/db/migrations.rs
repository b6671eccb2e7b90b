use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection};
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::kpi::DEFAULT_KPI_TEMPLATES;

const USER_VERSION: i32 = 5;

#[derive(Debug)]
pub struct MigrationInfo {
    pub version: i32,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}

pub fn run(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL,
            rollback_sql TEXT
        );
        "#,
    )?;

    let mut current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version < 1 {
        info!(target: "app::db", version = current_version, "running migration v1");
        migrate_to_v1(conn)?;
        current_version = 1;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(
            conn,
            1,
            "Add emotional pulse mood entries",
            Some("DROP TABLE IF EXISTS mood_entries;"),
        )?;
    }

    if current_version < 2 {
        info!(target: "app::db", version = current_version, "running migration v2");
        migrate_to_v2(conn)?;
        current_version = 2;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(
            conn,
            2,
            "Add KPI templates and per-user KPIs",
            Some(
                r#"
                DROP TABLE IF EXISTS user_kpis;
                DROP TABLE IF EXISTS kpi_templates;
                "#,
            ),
        )?;
    }

    if current_version < 3 {
        info!(target: "app::db", version = current_version, "running migration v3");
        migrate_to_v3(conn)?;
        current_version = 3;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(
            conn,
            3,
            "Add appraisals, balanced scorecard and appraisal cycles",
            Some(
                r#"
                DROP TABLE IF EXISTS appraisal_cycles;
                DROP TABLE IF EXISTS bsc_reviews;
                DROP TABLE IF EXISTS bsc_objectives;
                DROP TABLE IF EXISTS appraisals;
                "#,
            ),
        )?;
    }

    if current_version < 4 {
        info!(target: "app::db", version = current_version, "running migration v4");
        migrate_to_v4(conn)?;
        current_version = 4;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(
            conn,
            4,
            "Add notifications, nudge dismissals and leave allowances",
            Some(
                r#"
                DROP TABLE IF EXISTS leave_allowances;
                DROP TABLE IF EXISTS nudge_dismissals;
                DROP TABLE IF EXISTS notifications;
                "#,
            ),
        )?;
    }

    if current_version < 5 {
        info!(target: "app::db", version = current_version, "running migration v5");
        migrate_to_v5(conn)?;
        current_version = 5;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(
            conn,
            5,
            "Add monthly base salary to employees",
            Some("ALTER TABLE employees DROP COLUMN salary;"),
        )?;
    }

    if current_version != USER_VERSION {
        conn.execute(&format!("PRAGMA user_version = {}", USER_VERSION), [])?;
    }

    Ok(())
}

fn record_migration(
    conn: &Connection,
    version: i32,
    description: &str,
    rollback_sql: Option<&str>,
) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR REPLACE INTO migration_history (version, description, applied_at, rollback_sql) VALUES (?, ?, ?, ?)",
        (version, description, now, rollback_sql),
    )?;
    Ok(())
}

pub fn rollback_to_version(conn: &Connection, target_version: i32) -> AppResult<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if target_version >= current_version {
        warn!(
            target: "app::db",
            target_version,
            current_version,
            "rollback target is not below the current version"
        );
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "SELECT version, rollback_sql FROM migration_history WHERE version > ? ORDER BY version DESC",
    )?;

    let scripts = stmt
        .query_map([target_version], |row| {
            Ok((row.get::<_, i32>(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (version, rollback_sql) in scripts {
        match rollback_sql {
            Some(sql) => {
                info!(target: "app::db", version, "rolling back migration");
                conn.execute_batch(&sql)?;
            }
            None => warn!(target: "app::db", version, "no rollback script for migration"),
        }
    }

    conn.execute(&format!("PRAGMA user_version = {}", target_version), [])?;
    conn.execute(
        "DELETE FROM migration_history WHERE version > ?",
        [target_version],
    )?;

    Ok(())
}

pub fn get_migration_history(conn: &Connection) -> AppResult<Vec<MigrationInfo>> {
    let mut stmt = conn.prepare(
        "SELECT version, description, applied_at FROM migration_history ORDER BY version",
    )?;

    let migrations = stmt
        .query_map([], |row| {
            let applied_at: String = row.get(2)?;
            let applied_at = DateTime::parse_from_rfc3339(&applied_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        2,
                        "applied_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Utc);

            Ok(MigrationInfo {
                version: row.get(0)?,
                description: row.get(1)?,
                applied_at,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(migrations)
}

fn migrate_to_v1(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS mood_entries (
            id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL,
            session TEXT NOT NULL CHECK (session IN ('morning', 'evening')),
            mood TEXT NOT NULL,
            intensity INTEGER NOT NULL CHECK (intensity BETWEEN 1 AND 5),
            notes TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_mood_entries_employee_ts
            ON mood_entries(employee_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_mood_entries_ts
            ON mood_entries(timestamp);
        "#,
    )?;

    Ok(())
}

fn migrate_to_v2(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kpi_templates (
            scope TEXT NOT NULL CHECK (scope IN ('department', 'role')),
            scope_name TEXT NOT NULL,
            key TEXT NOT NULL,
            title TEXT NOT NULL,
            unit TEXT NOT NULL,
            weight REAL NOT NULL,
            target REAL NOT NULL,
            kra TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (scope, scope_name, key)
        );

        CREATE TABLE IF NOT EXISTS user_kpis (
            id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            key TEXT NOT NULL,
            title TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT '',
            weight REAL NOT NULL DEFAULT 0,
            target REAL NOT NULL DEFAULT 0,
            actual REAL NOT NULL DEFAULT 0,
            kra TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, id)
        );
        "#,
    )?;

    let mut stmt = conn.prepare(
        r#"
        INSERT INTO kpi_templates (scope, scope_name, key, title, unit, weight, target, kra, position)
        VALUES (:scope, :scope_name, :key, :title, :unit, :weight, :target, :kra, :position)
        ON CONFLICT(scope, scope_name, key) DO NOTHING
        "#,
    )?;

    for (position, seed) in DEFAULT_KPI_TEMPLATES.iter().enumerate() {
        stmt.execute(named_params! {
            ":scope": seed.scope.as_str(),
            ":scope_name": seed.scope_name,
            ":key": seed.key,
            ":title": seed.title,
            ":unit": seed.unit,
            ":weight": seed.weight,
            ":target": seed.target,
            ":kra": seed.kra,
            ":position": position as i64,
        })?;
    }

    Ok(())
}

fn migrate_to_v3(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS appraisals (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            period TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'in_progress',
            self_review TEXT NOT NULL DEFAULT '{}',
            manager_review TEXT NOT NULL DEFAULT '{}',
            peers TEXT NOT NULL DEFAULT '[]',
            summary TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, period)
        );

        CREATE TABLE IF NOT EXISTS bsc_objectives (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            department TEXT NOT NULL,
            perspective TEXT NOT NULL,
            objective TEXT NOT NULL,
            kpis TEXT NOT NULL DEFAULT '[]',
            target REAL NOT NULL DEFAULT 0,
            actual REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'not_started',
            initiative TEXT NOT NULL DEFAULT '',
            theme TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_bsc_objectives_user_id
            ON bsc_objectives(user_id);

        CREATE TABLE IF NOT EXISTS bsc_reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_id TEXT NOT NULL,
            cycle_id TEXT NOT NULL,
            period TEXT NOT NULL,
            objective_id TEXT NOT NULL,
            rater_id TEXT NOT NULL,
            rater_role TEXT NOT NULL,
            rating REAL,
            comment TEXT NOT NULL DEFAULT '',
            ts TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_bsc_reviews_subject_id
            ON bsc_reviews(subject_id);

        CREATE TABLE IF NOT EXISTS appraisal_cycles (
            id TEXT PRIMARY KEY,
            cycle_type TEXT NOT NULL CHECK (cycle_type IN ('360', 'bsc')),
            period TEXT NOT NULL,
            owner_id TEXT,
            participants TEXT NOT NULL DEFAULT '[]',
            status_by_user TEXT NOT NULL DEFAULT '{}',
            roles_by_user TEXT NOT NULL DEFAULT '{}',
            reminders TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );
        "#,
    )?;

    Ok(())
}

fn migrate_to_v4(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,
            message TEXT NOT NULL,
            ts TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_user_id
            ON notifications(user_id, ts);

        CREATE TABLE IF NOT EXISTS nudge_dismissals (
            user_id TEXT NOT NULL,
            nudge_key TEXT NOT NULL,
            until_date TEXT NOT NULL,
            PRIMARY KEY (user_id, nudge_key)
        );

        CREATE TABLE IF NOT EXISTS leave_allowances (
            user_id TEXT NOT NULL,
            leave_type TEXT NOT NULL,
            days REAL NOT NULL,
            PRIMARY KEY (user_id, leave_type)
        );
        "#,
    )?;

    Ok(())
}

fn migrate_to_v5(conn: &Connection) -> AppResult<()> {
    let has_salary = conn
        .prepare("SELECT 1 FROM pragma_table_info('employees') WHERE name = 'salary'")?
        .exists([])?;
    if !has_salary {
        conn.execute("ALTER TABLE employees ADD COLUMN salary REAL", [])?;
    }
    Ok(())
}
