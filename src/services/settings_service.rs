use std::fmt::Display;
use std::str::FromStr;
use std::sync::RwLock;

use chrono::Utc;
use tracing::{info, warn};

use crate::db::repositories::policy_repository::{PolicyOverrides, PolicyRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::checkin::{MOOD_MAX, MOOD_MIN, SCALE_MAX, SCALE_MIN};
use crate::models::settings::{RemoteSyncConfig, RemoteSyncMode, ScoringPolicy};

const KEY_CHECKIN_DEFAULT_MOOD: &str = "checkin_default_mood";
const KEY_CHECKIN_DEFAULT_STRESS: &str = "checkin_default_stress";
const KEY_CHECKIN_DEFAULT_WORKLOAD: &str = "checkin_default_workload";
const KEY_ENGAGEMENT_WINDOW_DAYS: &str = "engagement_window_days";
const KEY_BURNOUT_WINDOW_DAYS: &str = "burnout_window_days";
const KEY_BURNOUT_ALERT_THRESHOLD: &str = "burnout_alert_threshold";
const KEY_BURNOUT_INSIGHT_THRESHOLD: &str = "burnout_insight_threshold";
const KEY_BURNOUT_ALERT_LIMIT: &str = "burnout_alert_limit";
const KEY_PULSE_ALERT_MOOD: &str = "pulse_alert_mood";
const KEY_PULSE_ALERT_STRESS: &str = "pulse_alert_stress";
const KEY_PULSE_ALERT_WORKLOAD: &str = "pulse_alert_workload";
const KEY_WORKLOAD_STREAK_DAYS: &str = "workload_streak_days";
const KEY_DEMO_RETENTION_DAYS: &str = "demo_retention_days";
const KEY_REMOTE_SYNC_MODE: &str = "remote_sync_mode";
const KEY_REMOTE_SYNC_URL: &str = "remote_sync_url";
const KEY_REMOTE_SYNC_KEY: &str = "remote_sync_key";
const KEY_REMOTE_STATE_KEY: &str = "remote_state_key";

const MAX_WINDOW_DAYS: u32 = 365;
const MAX_STREAK_DAYS: u32 = 7;

#[derive(Debug, Default, Clone)]
pub struct SettingsUpdateInput {
    pub checkin_default_mood: Option<f64>,
    pub checkin_default_stress: Option<u8>,
    pub checkin_default_workload: Option<u8>,
    pub engagement_window_days: Option<u32>,
    pub burnout_window_days: Option<u32>,
    pub burnout_alert_threshold: Option<u8>,
    pub burnout_insight_threshold: Option<u8>,
    pub burnout_alert_limit: Option<usize>,
    pub pulse_alert_mood: Option<f64>,
    pub pulse_alert_stress: Option<u8>,
    pub pulse_alert_workload: Option<u8>,
    pub workload_streak_days: Option<u32>,
    pub demo_retention_days: Option<u32>,
    pub remote_sync_mode: Option<String>,
    /// `Some(None)` clears the stored value.
    pub remote_sync_url: Option<Option<String>>,
    pub remote_sync_key: Option<Option<String>>,
    pub remote_state_key: Option<String>,
}

pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<ScoringPolicy>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<ScoringPolicy> {
        if let Ok(guard) = self.cache.read() {
            if let Some(policy) = guard.as_ref() {
                return Ok(policy.clone());
            }
        }

        let policy = self.load_policy_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(policy.clone());
        }
        Ok(policy)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<ScoringPolicy> {
        let mut current = self.get()?;
        let mut changes: Vec<(&'static str, Option<String>)> = Vec::new();

        if let Some(mood) = input.checkin_default_mood {
            ensure_mood(KEY_CHECKIN_DEFAULT_MOOD, mood)?;
            current.check_in_defaults.mood = mood;
            changes.push((KEY_CHECKIN_DEFAULT_MOOD, Some(mood.to_string())));
        }

        if let Some(stress) = input.checkin_default_stress {
            ensure_scale(KEY_CHECKIN_DEFAULT_STRESS, stress)?;
            current.check_in_defaults.stress = stress;
            changes.push((KEY_CHECKIN_DEFAULT_STRESS, Some(stress.to_string())));
        }

        if let Some(workload) = input.checkin_default_workload {
            ensure_scale(KEY_CHECKIN_DEFAULT_WORKLOAD, workload)?;
            current.check_in_defaults.workload = workload;
            changes.push((KEY_CHECKIN_DEFAULT_WORKLOAD, Some(workload.to_string())));
        }

        if let Some(days) = input.engagement_window_days {
            ensure_window(KEY_ENGAGEMENT_WINDOW_DAYS, days, MAX_WINDOW_DAYS)?;
            current.engagement_window_days = days;
            changes.push((KEY_ENGAGEMENT_WINDOW_DAYS, Some(days.to_string())));
        }

        if let Some(days) = input.burnout_window_days {
            ensure_window(KEY_BURNOUT_WINDOW_DAYS, days, MAX_WINDOW_DAYS)?;
            current.burnout_window_days = days;
            changes.push((KEY_BURNOUT_WINDOW_DAYS, Some(days.to_string())));
        }

        if let Some(threshold) = input.burnout_alert_threshold {
            ensure_percent(KEY_BURNOUT_ALERT_THRESHOLD, threshold)?;
            current.burnout_alert_threshold = threshold;
            changes.push((KEY_BURNOUT_ALERT_THRESHOLD, Some(threshold.to_string())));
        }

        if let Some(threshold) = input.burnout_insight_threshold {
            ensure_percent(KEY_BURNOUT_INSIGHT_THRESHOLD, threshold)?;
            current.burnout_insight_threshold = threshold;
            changes.push((KEY_BURNOUT_INSIGHT_THRESHOLD, Some(threshold.to_string())));
        }

        if current.burnout_insight_threshold > current.burnout_alert_threshold {
            return Err(AppError::validation(
                "burnout insight threshold must not exceed the alert threshold",
            ));
        }

        if let Some(limit) = input.burnout_alert_limit {
            if limit == 0 {
                return Err(AppError::validation("burnout alert limit must be at least 1"));
            }
            current.burnout_alert_limit = limit;
            changes.push((KEY_BURNOUT_ALERT_LIMIT, Some(limit.to_string())));
        }

        if let Some(mood) = input.pulse_alert_mood {
            ensure_mood(KEY_PULSE_ALERT_MOOD, mood)?;
            current.pulse_alert_mood = mood;
            changes.push((KEY_PULSE_ALERT_MOOD, Some(mood.to_string())));
        }

        if let Some(stress) = input.pulse_alert_stress {
            ensure_scale(KEY_PULSE_ALERT_STRESS, stress)?;
            current.pulse_alert_stress = stress;
            changes.push((KEY_PULSE_ALERT_STRESS, Some(stress.to_string())));
        }

        if let Some(workload) = input.pulse_alert_workload {
            ensure_scale(KEY_PULSE_ALERT_WORKLOAD, workload)?;
            current.pulse_alert_workload = workload;
            changes.push((KEY_PULSE_ALERT_WORKLOAD, Some(workload.to_string())));
        }

        if let Some(days) = input.workload_streak_days {
            ensure_window(KEY_WORKLOAD_STREAK_DAYS, days, MAX_STREAK_DAYS)?;
            current.workload_streak_days = days;
            changes.push((KEY_WORKLOAD_STREAK_DAYS, Some(days.to_string())));
        }

        if let Some(days) = input.demo_retention_days {
            ensure_window(KEY_DEMO_RETENTION_DAYS, days, MAX_WINDOW_DAYS)?;
            current.demo_retention_days = days;
            changes.push((KEY_DEMO_RETENTION_DAYS, Some(days.to_string())));
        }

        if let Some(mode) = input.remote_sync_mode.as_deref() {
            let mode = RemoteSyncMode::try_from(mode).map_err(AppError::validation)?;
            current.remote_sync.mode = mode;
            changes.push((KEY_REMOTE_SYNC_MODE, Some(mode.as_str().to_string())));
        }

        if let Some(url) = input.remote_sync_url {
            let url = normalize_optional(url);
            if let Some(value) = url.as_deref() {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(AppError::validation(
                        "remote sync url must start with http:// or https://",
                    ));
                }
            }
            current.remote_sync.url = url.map(|value| value.trim_end_matches('/').to_string());
            changes.push((KEY_REMOTE_SYNC_URL, current.remote_sync.url.clone()));
        }

        if let Some(key) = input.remote_sync_key {
            current.remote_sync.key = normalize_optional(key);
            changes.push((KEY_REMOTE_SYNC_KEY, current.remote_sync.key.clone()));
        }

        if let Some(state_key) = input.remote_state_key {
            let state_key = state_key.trim().to_string();
            if state_key.is_empty() {
                return Err(AppError::validation("remote state key cannot be empty"));
            }
            current.remote_sync.state_key = state_key.clone();
            changes.push((KEY_REMOTE_STATE_KEY, Some(state_key)));
        }

        if current.remote_sync.mode != RemoteSyncMode::Off && current.remote_sync.url.is_none() {
            return Err(AppError::validation(
                "remote sync requires a url when enabled",
            ));
        }

        self.db
            .with_transaction(|tx| PolicyRepository::apply_changes(tx, &changes))?;

        current.updated_at = Some(Utc::now().to_rfc3339());
        info!(target: "app::settings", changed = changes.len(), "scoring policy updated");

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }

        Ok(current)
    }

    pub fn remote_sync(&self) -> AppResult<RemoteSyncConfig> {
        Ok(self.get()?.remote_sync)
    }

    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }
    }

    fn load_policy_from_db(&self) -> AppResult<ScoringPolicy> {
        self.db.with_connection(|conn| {
            let overrides = PolicyRepository::load_overrides(conn)?;
            let defaults = ScoringPolicy::default();

            let updated_at = overrides.last_changed.clone();

            let mut policy = ScoringPolicy {
                engagement_window_days: parse_setting(
                    &overrides,
                    KEY_ENGAGEMENT_WINDOW_DAYS,
                    defaults.engagement_window_days,
                    |days| (1..=MAX_WINDOW_DAYS).contains(days),
                ),
                burnout_window_days: parse_setting(
                    &overrides,
                    KEY_BURNOUT_WINDOW_DAYS,
                    defaults.burnout_window_days,
                    |days| (1..=MAX_WINDOW_DAYS).contains(days),
                ),
                burnout_alert_threshold: parse_setting(
                    &overrides,
                    KEY_BURNOUT_ALERT_THRESHOLD,
                    defaults.burnout_alert_threshold,
                    |value| *value <= 100,
                ),
                burnout_insight_threshold: parse_setting(
                    &overrides,
                    KEY_BURNOUT_INSIGHT_THRESHOLD,
                    defaults.burnout_insight_threshold,
                    |value| *value <= 100,
                ),
                burnout_alert_limit: parse_setting(
                    &overrides,
                    KEY_BURNOUT_ALERT_LIMIT,
                    defaults.burnout_alert_limit,
                    |value| *value >= 1,
                ),
                pulse_alert_mood: parse_setting(
                    &overrides,
                    KEY_PULSE_ALERT_MOOD,
                    defaults.pulse_alert_mood,
                    |value| (MOOD_MIN..=MOOD_MAX).contains(value),
                ),
                pulse_alert_stress: parse_setting(
                    &overrides,
                    KEY_PULSE_ALERT_STRESS,
                    defaults.pulse_alert_stress,
                    in_scale,
                ),
                pulse_alert_workload: parse_setting(
                    &overrides,
                    KEY_PULSE_ALERT_WORKLOAD,
                    defaults.pulse_alert_workload,
                    in_scale,
                ),
                workload_streak_days: parse_setting(
                    &overrides,
                    KEY_WORKLOAD_STREAK_DAYS,
                    defaults.workload_streak_days,
                    |days| (1..=MAX_STREAK_DAYS).contains(days),
                ),
                demo_retention_days: parse_setting(
                    &overrides,
                    KEY_DEMO_RETENTION_DAYS,
                    defaults.demo_retention_days,
                    |days| (1..=MAX_WINDOW_DAYS).contains(days),
                ),
                updated_at,
                ..defaults.clone()
            };

            policy.check_in_defaults.mood = parse_setting(
                &overrides,
                KEY_CHECKIN_DEFAULT_MOOD,
                defaults.check_in_defaults.mood,
                |value| (MOOD_MIN..=MOOD_MAX).contains(value),
            );
            policy.check_in_defaults.stress = parse_setting(
                &overrides,
                KEY_CHECKIN_DEFAULT_STRESS,
                defaults.check_in_defaults.stress,
                in_scale,
            );
            policy.check_in_defaults.workload = parse_setting(
                &overrides,
                KEY_CHECKIN_DEFAULT_WORKLOAD,
                defaults.check_in_defaults.workload,
                in_scale,
            );

            policy.remote_sync.mode = match overrides.value(KEY_REMOTE_SYNC_MODE) {
                Some(raw) => RemoteSyncMode::try_from(raw).unwrap_or_else(|err| {
                    warn!(target: "app::settings", key = KEY_REMOTE_SYNC_MODE, error = %err, "invalid stored setting, using default");
                    RemoteSyncMode::Off
                }),
                None => RemoteSyncMode::Off,
            };
            policy.remote_sync.url = overrides.value(KEY_REMOTE_SYNC_URL).map(str::to_string);
            policy.remote_sync.key = overrides.value(KEY_REMOTE_SYNC_KEY).map(str::to_string);
            if let Some(state_key) = overrides.value(KEY_REMOTE_STATE_KEY) {
                policy.remote_sync.state_key = state_key.to_string();
            }

            Ok(policy)
        })
    }
}

fn parse_setting<T, F>(overrides: &PolicyOverrides, key: &str, default: T, valid: F) -> T
where
    T: FromStr + Display + Copy,
    F: Fn(&T) -> bool,
{
    let Some(raw) = overrides.value(key) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!(
                target: "app::settings",
                key,
                value = %raw,
                default = %default,
                "invalid stored setting, using default"
            );
            default
        }
    }
}

fn in_scale(value: &u8) -> bool {
    (SCALE_MIN..=SCALE_MAX).contains(value)
}

fn ensure_mood(key: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || !(MOOD_MIN..=MOOD_MAX).contains(&value) {
        return Err(AppError::validation(format!(
            "{key} must be between {MOOD_MIN} and {MOOD_MAX}"
        )));
    }
    Ok(())
}

fn ensure_scale(key: &str, value: u8) -> AppResult<()> {
    if !in_scale(&value) {
        return Err(AppError::validation(format!(
            "{key} must be between {SCALE_MIN} and {SCALE_MAX}"
        )));
    }
    Ok(())
}

fn ensure_percent(key: &str, value: u8) -> AppResult<()> {
    if value > 100 {
        return Err(AppError::validation(format!("{key} must be between 0 and 100")));
    }
    Ok(())
}

fn ensure_window(key: &str, days: u32, max: u32) -> AppResult<()> {
    if days == 0 || days > max {
        return Err(AppError::validation(format!(
            "{key} must be between 1 and {max} days"
        )));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
