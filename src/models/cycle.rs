use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::appraisal::Ratings;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CycleType {
    #[serde(rename = "360")]
    ThreeSixty,
    #[serde(rename = "bsc")]
    Bsc,
}

impl CycleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleType::ThreeSixty => "360",
            CycleType::Bsc => "bsc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CycleType::ThreeSixty => "360",
            CycleType::Bsc => "BSC",
        }
    }
}

impl fmt::Display for CycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CycleType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "360" => Ok(CycleType::ThreeSixty),
            "bsc" => Ok(CycleType::Bsc),
            other => Err(format!("unsupported cycle type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Invited,
    InProgress,
    Completed,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Invited => "invited",
            ParticipantStatus::InProgress => "in_progress",
            ParticipantStatus::Completed => "completed",
        }
    }

    /// Forward-only: invited -> in_progress -> completed.
    pub fn can_advance_to(&self, next: ParticipantStatus) -> bool {
        matches!(
            (self, next),
            (ParticipantStatus::Invited, ParticipantStatus::InProgress)
                | (ParticipantStatus::InProgress, ParticipantStatus::Completed)
        )
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ParticipantStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "invited" => Ok(ParticipantStatus::Invited),
            "in_progress" => Ok(ParticipantStatus::InProgress),
            "completed" => Ok(ParticipantStatus::Completed),
            other => Err(format!("unsupported participant status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RaterRoles {
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub directs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub user_id: String,
    pub ts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalCycle {
    pub id: String,
    #[serde(rename = "type")]
    pub cycle_type: CycleType,
    pub period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub participants: Vec<String>,
    pub status_by_user: BTreeMap<String, ParticipantStatus>,
    pub roles_by_user: BTreeMap<String, RaterRoles>,
    pub reminders: Vec<Reminder>,
    pub created_at: String,
}

impl AppraisalCycle {
    pub fn roles_for(&self, user_id: &str) -> RaterRoles {
        self.roles_by_user.get(user_id).cloned().unwrap_or_default()
    }

    pub fn status_for(&self, user_id: &str) -> ParticipantStatus {
        self.status_by_user
            .get(user_id)
            .copied()
            .unwrap_or(ParticipantStatus::Invited)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleInput {
    #[serde(rename = "type")]
    pub cycle_type: CycleType,
    pub period: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleParticipant {
    pub user_id: String,
    pub roles: RaterRoles,
    pub status: ParticipantStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewerRole {
    Manager,
    Direct,
    Peer,
    Subject,
}

impl ReviewerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewerRole::Manager => "manager",
            ReviewerRole::Direct => "direct",
            ReviewerRole::Peer => "peer",
            ReviewerRole::Subject => "subject",
        }
    }
}

impl fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerTask {
    pub cycle_id: String,
    #[serde(rename = "type")]
    pub cycle_type: CycleType,
    pub role: ReviewerRole,
    pub subject_id: String,
    pub period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub cycle_id: String,
    pub subject_id: String,
    pub rater_id: String,
    pub role: ReviewerRole,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub comments: Option<String>,
}
