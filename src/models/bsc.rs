use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    Financial,
    Customer,
    Process,
    Learning,
}

impl Perspective {
    pub const ALL: [Perspective; 4] = [
        Perspective::Financial,
        Perspective::Customer,
        Perspective::Process,
        Perspective::Learning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Perspective::Financial => "financial",
            Perspective::Customer => "customer",
            Perspective::Process => "process",
            Perspective::Learning => "learning",
        }
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Perspective {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Perspective::ALL
            .iter()
            .copied()
            .find(|perspective| perspective.as_str() == value)
            .ok_or_else(|| format!("unsupported perspective: {value}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BscStatus {
    OnTrack,
    AtRisk,
    OffTrack,
    Completed,
    NotStarted,
}

impl BscStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BscStatus::OnTrack => "on_track",
            BscStatus::AtRisk => "at_risk",
            BscStatus::OffTrack => "off_track",
            BscStatus::Completed => "completed",
            BscStatus::NotStarted => "not_started",
        }
    }
}

impl fmt::Display for BscStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BscStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "on_track" => Ok(BscStatus::OnTrack),
            "at_risk" => Ok(BscStatus::AtRisk),
            "off_track" => Ok(BscStatus::OffTrack),
            "completed" => Ok(BscStatus::Completed),
            "not_started" => Ok(BscStatus::NotStarted),
            other => Err(format!("unsupported bsc status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BscObjective {
    pub id: String,
    pub user_id: String,
    pub department: String,
    pub perspective: Perspective,
    pub objective: String,
    #[serde(default)]
    pub kpis: Vec<String>,
    pub target: f64,
    pub actual: f64,
    pub status: BscStatus,
    #[serde(default)]
    pub initiative: String,
    #[serde(default)]
    pub theme: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BscObjectiveInput {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub department: Option<String>,
    pub perspective: Perspective,
    pub objective: String,
    #[serde(default)]
    pub kpis: Vec<String>,
    pub target: f64,
    #[serde(default)]
    pub actual: f64,
    #[serde(default)]
    pub status: Option<BscStatus>,
    #[serde(default)]
    pub initiative: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BscProgressUpdate {
    #[serde(default)]
    pub actual: Option<f64>,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub status: Option<BscStatus>,
    #[serde(default)]
    pub initiative: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveScores {
    pub financial: i64,
    pub customer: i64,
    pub process: i64,
    pub learning: i64,
}

impl PerspectiveScores {
    pub fn get(&self, perspective: Perspective) -> i64 {
        match perspective {
            Perspective::Financial => self.financial,
            Perspective::Customer => self.customer,
            Perspective::Process => self.process,
            Perspective::Learning => self.learning,
        }
    }

    pub fn set(&mut self, perspective: Perspective, value: i64) {
        match perspective {
            Perspective::Financial => self.financial = value,
            Perspective::Customer => self.customer = value,
            Perspective::Process => self.process = value,
            Perspective::Learning => self.learning = value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BscReview {
    pub id: i64,
    pub subject_id: String,
    pub cycle_id: String,
    pub period: String,
    pub objective_id: String,
    pub rater_id: String,
    pub rater_role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub comment: String,
    pub ts: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveRating {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
}
