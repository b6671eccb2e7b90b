use std::time::Duration;

use chrono::Utc;

use crate::commands::{run_blocking, AppState, CommandResult};
use crate::services::demo_generator::DEFAULT_SEED_DAYS;

const DEFAULT_TICK_MS: u64 = 1_000;

pub async fn demo_seed(state: &AppState, days: Option<u32>) -> CommandResult<usize> {
    let app_state = state.clone();
    let days = days.unwrap_or(DEFAULT_SEED_DAYS);
    run_blocking(move || app_state.demo()?.seed(days, Utc::now().date_naive())).await
}

pub async fn demo_start(state: &AppState, interval_ms: Option<u64>) -> CommandResult<()> {
    let app_state = state.clone();
    let interval = Duration::from_millis(interval_ms.unwrap_or(DEFAULT_TICK_MS).max(100));
    run_blocking(move || app_state.demo()?.start(interval)).await
}

pub async fn demo_stop(state: &AppState) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.demo()?.stop();
        Ok(())
    })
    .await
}
