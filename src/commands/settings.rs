use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::models::settings::ScoringPolicy;
use crate::services::settings_service::SettingsUpdateInput;

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState) -> CommandResult<ScoringPolicy> {
    let app_state = state.clone();
    run_blocking(move || app_state.settings().get()).await
}

pub async fn settings_update(
    state: &AppState,
    payload: SettingsUpdatePayload,
) -> CommandResult<ScoringPolicy> {
    let app_state = state.clone();
    let input = payload.into_input();
    run_blocking(move || app_state.settings().update(input)).await
}

/// Pushes the full record store to the configured backend.
pub async fn sync_push_snapshot(state: &AppState) -> CommandResult<bool> {
    Ok(state.sync().push_snapshot().await)
}

pub async fn sync_load_state(state: &AppState) -> CommandResult<Option<JsonValue>> {
    Ok(state.sync().load_state().await)
}

pub async fn sync_export_snapshot(state: &AppState) -> CommandResult<JsonValue> {
    let app_state = state.clone();
    run_blocking(move || app_state.sync().export_snapshot()).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatePayload {
    #[serde(default)]
    checkin_default_mood: Option<f64>,
    #[serde(default)]
    checkin_default_stress: Option<u8>,
    #[serde(default)]
    checkin_default_workload: Option<u8>,
    #[serde(default)]
    engagement_window_days: Option<u32>,
    #[serde(default)]
    burnout_window_days: Option<u32>,
    #[serde(default)]
    burnout_alert_threshold: Option<u8>,
    #[serde(default)]
    burnout_insight_threshold: Option<u8>,
    #[serde(default)]
    burnout_alert_limit: Option<usize>,
    #[serde(default)]
    pulse_alert_mood: Option<f64>,
    #[serde(default)]
    pulse_alert_stress: Option<u8>,
    #[serde(default)]
    pulse_alert_workload: Option<u8>,
    #[serde(default)]
    workload_streak_days: Option<u32>,
    #[serde(default)]
    demo_retention_days: Option<u32>,
    #[serde(default)]
    remote_sync_mode: Option<String>,
    #[serde(default)]
    remote_sync_url: Option<String>,
    #[serde(default)]
    remove_remote_sync_url: Option<bool>,
    #[serde(default)]
    remote_sync_key: Option<String>,
    #[serde(default)]
    remove_remote_sync_key: Option<bool>,
    #[serde(default)]
    remote_state_key: Option<String>,
}

fn clearable(value: Option<String>, remove: Option<bool>) -> Option<Option<String>> {
    if remove == Some(true) {
        Some(None)
    } else {
        value.map(Some)
    }
}

impl SettingsUpdatePayload {
    fn into_input(self) -> SettingsUpdateInput {
        SettingsUpdateInput {
            checkin_default_mood: self.checkin_default_mood,
            checkin_default_stress: self.checkin_default_stress,
            checkin_default_workload: self.checkin_default_workload,
            engagement_window_days: self.engagement_window_days,
            burnout_window_days: self.burnout_window_days,
            burnout_alert_threshold: self.burnout_alert_threshold,
            burnout_insight_threshold: self.burnout_insight_threshold,
            burnout_alert_limit: self.burnout_alert_limit,
            pulse_alert_mood: self.pulse_alert_mood,
            pulse_alert_stress: self.pulse_alert_stress,
            pulse_alert_workload: self.pulse_alert_workload,
            workload_streak_days: self.workload_streak_days,
            demo_retention_days: self.demo_retention_days,
            remote_sync_mode: self.remote_sync_mode,
            remote_sync_url: clearable(self.remote_sync_url, self.remove_remote_sync_url),
            remote_sync_key: clearable(self.remote_sync_key, self.remove_remote_sync_key),
            remote_state_key: self.remote_state_key,
        }
    }
}
