use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::checkin::CheckIn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EngagementIndex {
    pub index: i64,
    pub count: usize,
}

/// Equal-weighted mean of per-user indices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CohortEngagement {
    pub index: i64,
    pub count: usize,
    pub respondents: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentEngagement {
    pub department: String,
    pub index: i64,
    /// People in the department with at least one check-in in the window.
    pub respondents: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrendPoint {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseAlert {
    pub check_in: CheckIn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPulseAverage {
    pub date: NaiveDate,
    pub mood: f64,
    pub stress: f64,
    pub workload: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PulseTrend {
    pub days: Vec<DailyPulseAverage>,
    pub mood_stress_correlation: f64,
    pub mood_workload_correlation: f64,
    /// Trailing 7-point moving average of the daily mood series.
    pub mood_sma: Vec<f64>,
    /// Last moving-average value, projected forward.
    pub mood_forecast: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadNudge {
    pub user_id: String,
    pub streak: u32,
    pub due: bool,
    pub dismissed: bool,
}
