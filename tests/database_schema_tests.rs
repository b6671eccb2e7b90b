use hr_pulse_lib::db::{migrations, DbPool};
use tempfile::tempdir;

fn table_exists(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
}

fn column_names(conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

#[test]
fn test_all_tables_created() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        for table in [
            "employees",
            "check_ins",
            "leaves",
            "app_settings",
            "mood_entries",
            "kpi_templates",
            "user_kpis",
            "appraisals",
            "bsc_objectives",
            "bsc_reviews",
            "appraisal_cycles",
            "notifications",
            "nudge_dismissals",
            "leave_allowances",
            "migration_history",
        ] {
            assert!(table_exists(conn, table)?, "missing table {table}");
        }

        let columns = column_names(conn, "check_ins")?;
        for column in ["id", "user_id", "date", "mood", "stress", "workload", "note"] {
            assert!(columns.iter().any(|c| c == column), "check_ins.{column}");
        }

        let columns = column_names(conn, "employees")?;
        for column in ["start_date", "salary"] {
            assert!(columns.iter().any(|c| c == column), "employees.{column}");
        }

        let columns = column_names(conn, "mood_entries")?;
        for column in ["employee_id", "session", "mood", "intensity", "timestamp"] {
            assert!(columns.iter().any(|c| c == column), "mood_entries.{column}");
        }

        Ok(())
    })
    .expect("table verification");
}

#[test]
fn test_check_ins_unique_per_user_and_day() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        conn.execute(
            "INSERT INTO check_ins (id, user_id, date, mood, stress, workload, note)
             VALUES ('c1', 'u1', '2025-03-10', 0, 3, 3, '')",
            [],
        )?;
        let duplicate = conn.execute(
            "INSERT INTO check_ins (id, user_id, date, mood, stress, workload, note)
             VALUES ('c2', 'u1', '2025-03-10', 1, 2, 2, '')",
            [],
        );
        assert!(duplicate.is_err());

        let bad_intensity = conn.execute(
            "INSERT INTO mood_entries (id, employee_id, session, mood, intensity, notes, timestamp)
             VALUES ('m1', 'u1', 'morning', 'calm', 7, '', '2025-03-10T08:00:00Z')",
            [],
        );
        assert!(bad_intensity.is_err());
        Ok(())
    })
    .expect("constraint verification");
}

#[test]
fn test_kpi_templates_seeded_once() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let pool = DbPool::new(path.clone()).expect("db pool");

    let first: i64 = pool
        .with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM kpi_templates", [], |row| row.get(0))?)
        })
        .expect("count templates");
    assert!(first > 0);

    let reopened = DbPool::new(path).expect("db pool");
    let second: i64 = reopened
        .with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM kpi_templates", [], |row| row.get(0))?)
        })
        .expect("count templates");
    assert_eq!(first, second);
}

#[test]
fn test_database_indexes_exist() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'index'")?;
        let indexes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        for index in [
            "idx_employees_department",
            "idx_check_ins_date",
            "idx_leaves_user_id",
            "idx_mood_entries_employee_ts",
            "idx_bsc_objectives_user_id",
            "idx_notifications_user_id",
        ] {
            assert!(indexes.iter().any(|name| name == index), "missing index {index}");
        }
        Ok(())
    })
    .expect("index verification");
}

#[test]
fn test_migration_history_tracking() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        assert_eq!(version, 5);

        let history = migrations::get_migration_history(conn)?;
        let versions: Vec<i32> = history.iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2, 3, 4, 5]);
        assert!(history.iter().all(|m| !m.description.is_empty()));
        Ok(())
    })
    .expect("migration history");
}

#[test]
fn test_rollback_and_remigrate() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        migrations::rollback_to_version(conn, 4)?;
        assert!(!column_names(conn, "employees")?.iter().any(|c| c == "salary"));
        assert!(table_exists(conn, "leave_allowances")?);

        migrations::rollback_to_version(conn, 2)?;

        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        assert_eq!(version, 2);
        assert!(!table_exists(conn, "appraisals")?);
        assert!(!table_exists(conn, "notifications")?);
        assert!(table_exists(conn, "user_kpis")?);
        assert_eq!(migrations::get_migration_history(conn)?.len(), 2);

        migrations::rollback_to_version(conn, 3)?;
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        assert_eq!(version, 2);
        Ok(())
    })
    .expect("rollback");

    pool.with_connection(|conn| {
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        assert_eq!(version, 5);
        assert!(table_exists(conn, "appraisals")?);
        assert!(column_names(conn, "employees")?.iter().any(|c| c == "salary"));
        assert!(table_exists(conn, "leave_allowances")?);
        Ok(())
    })
    .expect("remigration");
}
