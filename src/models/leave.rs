use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::employee::CohortFilter;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Exam,
    Compassionate,
    Casual,
    Earned,
    Unpaid,
    Absent,
}

impl LeaveType {
    pub const ALL: [LeaveType; 8] = [
        LeaveType::Annual,
        LeaveType::Sick,
        LeaveType::Exam,
        LeaveType::Compassionate,
        LeaveType::Casual,
        LeaveType::Earned,
        LeaveType::Unpaid,
        LeaveType::Absent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Exam => "exam",
            LeaveType::Compassionate => "compassionate",
            LeaveType::Casual => "casual",
            LeaveType::Earned => "earned",
            LeaveType::Unpaid => "unpaid",
            LeaveType::Absent => "absent",
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LeaveType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        LeaveType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unsupported leave type: {value}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LeaveStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(LeaveStatus::Pending),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            other => Err(format!("unsupported leave status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRecord {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
    #[serde(default)]
    pub reason: String,
}

impl LeaveRecord {
    pub fn days(&self) -> i64 {
        leave_days(self.start_date, self.end_date)
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

/// Inclusive day span, never less than one.
pub fn leave_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveInput {
    pub user_id: String,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: Option<LeaveStatus>,
    #[serde(default)]
    pub reason: Option<String>,
}

pub const DEFAULT_ALLOWANCES: [(LeaveType, f64); 4] = [
    (LeaveType::Annual, 20.0),
    (LeaveType::Sick, 3.0),
    (LeaveType::Exam, 3.0),
    (LeaveType::Compassionate, 3.0),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub allocated: f64,
    pub used: i64,
    pub remaining: f64,
}

/// Which leave records an aggregate covers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveScope {
    #[serde(default)]
    pub cohort: CohortFilter,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl LeaveScope {
    /// Missing bounds are open.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }

    /// A record is in range when its start or its end falls inside the bounds.
    pub fn in_range(&self, record: &LeaveRecord) -> bool {
        self.contains(record.start_date) || self.contains(record.end_date)
    }
}

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveAggregate {
    pub totals_by_type: BTreeMap<LeaveType, i64>,
    pub total_days: i64,
    pub avg_by_department: BTreeMap<String, f64>,
    pub avg_by_gender: BTreeMap<String, f64>,
    /// Sunday first.
    pub by_weekday: [i64; 7],
    pub trend_by_month: BTreeMap<String, BTreeMap<LeaveType, i64>>,
    pub compliance_rate: i64,
    pub headcount: usize,
    pub avg_days_per_employee: f64,
    pub avg_annual_allowance: f64,
}

/// Leave kinds priced into the paid-leave cost estimate.
pub const COSTED_LEAVE_TYPES: [LeaveType; 3] = [LeaveType::Sick, LeaveType::Casual, LeaveType::Earned];

/// Headline people metrics for one scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkforceOverview {
    pub headcount: usize,
    /// Mean KPI aggregate; people without KPIs count as 0.
    pub avg_kpi_score: i64,
    pub avg_leave_days: f64,
    /// 100 minus five points per average leave day, kept within 50..=95.
    pub engagement_proxy: i64,
    pub avg_tenure_months: i64,
    pub new_hires: usize,
    /// New hires as a percentage of headcount.
    pub hiring_rate: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_new_hire_tenure_months: Option<i64>,
    pub monthly_payroll: f64,
    pub avg_salary: f64,
    pub paid_leave_days: i64,
    pub paid_leave_cost: f64,
}
