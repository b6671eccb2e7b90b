use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::checkin::CheckInDefaults;

pub const DEFAULT_REMOTE_STATE_KEY: &str = "lumion_hr_state";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteSyncMode {
    #[default]
    Off,
    Rest,
    Supabase,
}

impl RemoteSyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteSyncMode::Off => "off",
            RemoteSyncMode::Rest => "rest",
            RemoteSyncMode::Supabase => "supabase",
        }
    }
}

impl fmt::Display for RemoteSyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RemoteSyncMode {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "off" | "" => Ok(RemoteSyncMode::Off),
            "rest" => Ok(RemoteSyncMode::Rest),
            "supabase" => Ok(RemoteSyncMode::Supabase),
            other => Err(format!("unsupported remote sync mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSyncConfig {
    pub mode: RemoteSyncMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub state_key: String,
}

impl RemoteSyncConfig {
    pub fn disabled() -> Self {
        Self {
            mode: RemoteSyncMode::Off,
            url: None,
            key: None,
            state_key: DEFAULT_REMOTE_STATE_KEY.to_string(),
        }
    }
}

/// Thresholds and field defaults consumed by the scoring services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringPolicy {
    pub check_in_defaults: CheckInDefaults,
    pub engagement_window_days: u32,
    pub burnout_window_days: u32,
    pub burnout_alert_threshold: u8,
    pub burnout_insight_threshold: u8,
    pub burnout_alert_limit: usize,
    pub pulse_alert_mood: f64,
    pub pulse_alert_stress: u8,
    pub pulse_alert_workload: u8,
    pub workload_streak_days: u32,
    pub demo_retention_days: u32,
    pub remote_sync: RemoteSyncConfig,
    pub updated_at: Option<String>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            check_in_defaults: CheckInDefaults::default(),
            engagement_window_days: 30,
            burnout_window_days: 14,
            burnout_alert_threshold: 75,
            burnout_insight_threshold: 60,
            burnout_alert_limit: 5,
            pulse_alert_mood: -1.0,
            pulse_alert_stress: 4,
            pulse_alert_workload: 4,
            workload_streak_days: 3,
            demo_retention_days: 90,
            remote_sync: RemoteSyncConfig::disabled(),
            updated_at: None,
        }
    }
}
