pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::Path;

use tracing::info;

use crate::commands::AppState;
use crate::db::DbPool;
use crate::error::AppResult;

const LIVE_DB_FILE: &str = "hr-pulse.sqlite";
const DEMO_DB_FILE: &str = "hr-pulse-demo.sqlite";
const LOG_DIR: &str = "logs";

/// Wires logging, the live store and the demo store under `data_dir`.
pub fn bootstrap(data_dir: &Path) -> AppResult<AppState> {
    let log_dir = data_dir.join(LOG_DIR);
    std::fs::create_dir_all(&log_dir)?;
    crate::utils::logger::init_logging(&log_dir)?;

    let pool = DbPool::new(data_dir.join(LIVE_DB_FILE))?;
    let demo_pool = DbPool::new(data_dir.join(DEMO_DB_FILE))?;
    let state = AppState::new(pool)?.with_demo(demo_pool);

    info!(target: "app::db", data_dir = %data_dir.display(), "application state ready");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bootstrap_creates_both_stores() {
        let dir = tempdir().unwrap();
        let state = bootstrap(dir.path()).unwrap();

        assert!(dir.path().join(LIVE_DB_FILE).exists());
        assert!(dir.path().join(DEMO_DB_FILE).exists());
        assert!(dir.path().join(LOG_DIR).is_dir());
        assert!(state.demo().is_ok());
        assert_eq!(state.db().path(), dir.path().join(LIVE_DB_FILE).as_path());
    }
}
