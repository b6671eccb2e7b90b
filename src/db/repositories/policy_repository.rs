use std::collections::HashMap;

use rusqlite::{named_params, Connection};

use crate::error::AppResult;

/// Scoring-policy values an operator has overridden. Absent keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOverrides {
    values: HashMap<String, String>,
    pub last_changed: Option<String>,
}

impl PolicyOverrides {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub struct PolicyRepository;

impl PolicyRepository {
    pub fn load_overrides(conn: &Connection) -> AppResult<PolicyOverrides> {
        let mut stmt = conn.prepare("SELECT key, value, updated_at FROM app_settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>("key")?,
                row.get::<_, String>("value")?,
                row.get::<_, String>("updated_at")?,
            ))
        })?;

        let mut overrides = PolicyOverrides::default();
        for row in rows {
            let (key, value, updated_at) = row?;
            if overrides.last_changed.as_deref() < Some(updated_at.as_str()) {
                overrides.last_changed = Some(updated_at);
            }
            overrides.values.insert(key, value);
        }

        Ok(overrides)
    }

    /// `Some` stores the override, `None` drops it so the default applies again.
    pub fn apply_changes(conn: &Connection, changes: &[(&str, Option<String>)]) -> AppResult<()> {
        let mut store = conn.prepare_cached(
            r#"
                INSERT INTO app_settings (key, value)
                VALUES (:key, :value)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = CURRENT_TIMESTAMP
            "#,
        )?;
        let mut clear = conn.prepare_cached("DELETE FROM app_settings WHERE key = :key")?;

        for (key, value) in changes {
            match value {
                Some(value) => store.execute(named_params! {":key": key, ":value": value})?,
                None => clear.execute(named_params! {":key": key})?,
            };
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use tempfile::TempDir;

    #[test]
    fn overrides_can_be_set_replaced_and_cleared() {
        let temp_dir = TempDir::new().unwrap();
        let pool = DbPool::new(temp_dir.path().join("policy.sqlite")).unwrap();

        let overrides = pool
            .with_transaction(|tx| {
                PolicyRepository::apply_changes(
                    tx,
                    &[
                        ("burnout_window_days", Some("21".into())),
                        ("remote_sync_url", Some("https://hr.example.com".into())),
                    ],
                )?;
                PolicyRepository::apply_changes(
                    tx,
                    &[
                        ("burnout_window_days", Some("10".into())),
                        ("remote_sync_url", None),
                        ("never_stored", None),
                    ],
                )?;
                PolicyRepository::load_overrides(tx)
            })
            .unwrap();

        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.value("burnout_window_days"), Some("10"));
        assert_eq!(overrides.value("remote_sync_url"), None);
        assert!(overrides.last_changed.is_some());
    }

    #[test]
    fn fresh_store_has_no_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let pool = DbPool::new(temp_dir.path().join("policy.sqlite")).unwrap();
        let overrides = pool.with_connection(PolicyRepository::load_overrides).unwrap();
        assert!(overrides.is_empty());
        assert_eq!(overrides.last_changed, None);
    }
}
