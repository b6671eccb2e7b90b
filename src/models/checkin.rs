use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const MOOD_MIN: f64 = -2.0;
pub const MOOD_MAX: f64 = 2.0;
pub const SCALE_MIN: u8 = 1;
pub const SCALE_MAX: u8 = 5;

/// Daily pulse check-in. At most one per user and calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub mood: f64,
    pub stress: u8,
    pub workload: u8,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInInput {
    pub user_id: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub mood: Option<f64>,
    #[serde(default)]
    pub stress: Option<i64>,
    #[serde(default)]
    pub workload: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Values substituted for omitted check-in fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInDefaults {
    pub mood: f64,
    pub stress: u8,
    pub workload: u8,
}

impl Default for CheckInDefaults {
    fn default() -> Self {
        Self {
            mood: 0.0,
            stress: 3,
            workload: 3,
        }
    }
}

impl CheckInInput {
    /// Applies the field defaults and clamps every axis into its domain.
    pub fn into_check_in(self, id: String, defaults: &CheckInDefaults, today: NaiveDate) -> CheckIn {
        let mood = self
            .mood
            .filter(|value| value.is_finite())
            .unwrap_or(defaults.mood)
            .clamp(MOOD_MIN, MOOD_MAX);

        CheckIn {
            id,
            user_id: self.user_id,
            date: self.date.unwrap_or(today),
            mood,
            stress: clamp_scale(self.stress, defaults.stress),
            workload: clamp_scale(self.workload, defaults.workload),
            note: self.note.unwrap_or_default().trim().to_string(),
        }
    }
}

fn clamp_scale(value: Option<i64>, default: u8) -> u8 {
    match value {
        Some(value) => value.clamp(SCALE_MIN as i64, SCALE_MAX as i64) as u8,
        None => default.clamp(SCALE_MIN, SCALE_MAX),
    }
}

/// Trailing window of calendar days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckInWindow {
    LastDays { days: u32 },
    Range { start: NaiveDate, end: NaiveDate },
}

impl CheckInWindow {
    pub fn last_days(days: u32) -> Self {
        CheckInWindow::LastDays { days }
    }

    /// Inclusive `(start, end)` bounds. `LastDays` ends at `as_of`.
    pub fn bounds(&self, as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            CheckInWindow::LastDays { days } => {
                let span = i64::from(days.max(1)) - 1;
                (as_of - Duration::days(span), as_of)
            }
            CheckInWindow::Range { start, end } if start <= end => (start, end),
            CheckInWindow::Range { start, end } => (end, start),
        }
    }
}
