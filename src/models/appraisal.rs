use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Rating key used for a single overall score.
pub const OVERALL_RATING_KEY: &str = "__overall";

pub type Ratings = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppraisalStatus {
    InProgress,
    Completed,
}

impl AppraisalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppraisalStatus::InProgress => "in_progress",
            AppraisalStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppraisalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AppraisalStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "in_progress" => Ok(AppraisalStatus::InProgress),
            "completed" => Ok(AppraisalStatus::Completed),
            other => Err(format!("unsupported appraisal status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelfReview {
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagerReview {
    #[serde(default)]
    pub reviewer_id: Option<String>,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeerFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalSummary {
    pub kpi_score: i64,
    pub self_score: i64,
    pub manager_score: i64,
    pub overall: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appraisal {
    pub id: String,
    pub user_id: String,
    pub period: String,
    pub status: AppraisalStatus,
    #[serde(rename = "self")]
    pub self_review: SelfReview,
    pub manager: ManagerReview,
    pub peers: Vec<PeerFeedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<AppraisalSummary>,
    pub created_at: String,
    pub updated_at: String,
}

impl Appraisal {
    pub fn is_finalized(&self) -> bool {
        self.status == AppraisalStatus::Completed
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfReviewUpdate {
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerReviewUpdate {
    #[serde(default)]
    pub reviewer_id: Option<String>,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub status: Option<AppraisalStatus>,
}
