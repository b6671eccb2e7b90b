use chrono::Utc;

use crate::commands::{run_blocking, AppState, CommandResult};
use crate::models::mood::{BurnoutAlert, BurnoutRisk, MoodAverage, MoodEntry, MoodEntryInput};

pub async fn mood_record(state: &AppState, payload: MoodEntryInput) -> CommandResult<MoodEntry> {
    let app_state = state.clone();
    let stored = run_blocking(move || app_state.mood().record_mood(payload, Utc::now())).await?;
    state.mirror("mood_entries", &stored);
    Ok(stored)
}

pub async fn mood_entries(
    state: &AppState,
    employee_id: Option<String>,
    days: u32,
) -> CommandResult<Vec<MoodEntry>> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .mood()
            .get_mood_entries(employee_id.as_deref(), days, Utc::now())
    })
    .await
}

pub async fn mood_burnout_risk(state: &AppState, employee_id: String) -> CommandResult<BurnoutRisk> {
    let app_state = state.clone();
    run_blocking(move || app_state.mood().burnout_risk(&employee_id, Utc::now())).await
}

pub async fn mood_burnout_alerts(state: &AppState) -> CommandResult<Vec<BurnoutAlert>> {
    let app_state = state.clone();
    run_blocking(move || app_state.mood().burnout_alerts(Utc::now())).await
}

pub async fn mood_burnout_insights(state: &AppState) -> CommandResult<Vec<BurnoutAlert>> {
    let app_state = state.clone();
    run_blocking(move || app_state.mood().burnout_insights(Utc::now())).await
}

pub async fn mood_department_averages(state: &AppState) -> CommandResult<Vec<MoodAverage>> {
    let app_state = state.clone();
    run_blocking(move || app_state.mood().department_mood_averages()).await
}

pub async fn mood_team_heatmap(state: &AppState, days: Option<u32>) -> CommandResult<Vec<MoodAverage>> {
    let app_state = state.clone();
    run_blocking(move || app_state.mood().team_heatmap(days, Utc::now())).await
}
