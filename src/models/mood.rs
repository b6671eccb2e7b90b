use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Joy,
    Calm,
    Focused,
    Stressed,
    Anxious,
    Sad,
    Angry,
    Tired,
}

impl Mood {
    pub const ALL: [Mood; 8] = [
        Mood::Joy,
        Mood::Calm,
        Mood::Focused,
        Mood::Stressed,
        Mood::Anxious,
        Mood::Sad,
        Mood::Angry,
        Mood::Tired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Joy => "joy",
            Mood::Calm => "calm",
            Mood::Focused => "focused",
            Mood::Stressed => "stressed",
            Mood::Anxious => "anxious",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Tired => "tired",
        }
    }

    /// Moods counted towards burnout stress intensity.
    pub fn is_stress_like(&self) -> bool {
        matches!(self, Mood::Stressed | Mood::Anxious | Mood::Tired | Mood::Sad)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Mood {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Mood::ALL
            .iter()
            .copied()
            .find(|mood| mood.as_str() == value)
            .ok_or_else(|| format!("unsupported mood: {value}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MoodSession {
    Morning,
    Evening,
}

impl MoodSession {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodSession::Morning => "morning",
            MoodSession::Evening => "evening",
        }
    }

    pub fn for_hour(hour: u32) -> Self {
        if (5..13).contains(&hour) {
            MoodSession::Morning
        } else {
            MoodSession::Evening
        }
    }
}

impl fmt::Display for MoodSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MoodSession {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "morning" => Ok(MoodSession::Morning),
            "evening" => Ok(MoodSession::Evening),
            other => Err(format!("unsupported mood session: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: String,
    pub employee_id: String,
    pub session: MoodSession,
    pub mood: Mood,
    pub intensity: u8,
    #[serde(default)]
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

impl MoodEntry {
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntryInput {
    pub employee_id: String,
    #[serde(default)]
    pub session: Option<MoodSession>,
    pub mood: Mood,
    pub intensity: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyDelta {
    pub date: NaiveDate,
    pub morning: u8,
    pub evening: u8,
    pub delta: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BurnoutRisk {
    pub score: u8,
    pub avg_stress_intensity: f64,
    pub neg_days: usize,
    pub days: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BurnoutAlert {
    pub employee_id: String,
    pub name: String,
    pub department: String,
    pub risk: BurnoutRisk,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoodAverage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub mood: Mood,
    pub average_intensity: f64,
    pub count: usize,
}
