use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppraisalInvite,
    Reminder,
    WorkloadNudge,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AppraisalInvite => "appraisal_invite",
            NotificationKind::Reminder => "reminder",
            NotificationKind::WorkloadNudge => "workload_nudge",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "appraisal_invite" => Ok(NotificationKind::AppraisalInvite),
            "reminder" => Ok(NotificationKind::Reminder),
            "workload_nudge" => Ok(NotificationKind::WorkloadNudge),
            other => Err(format!("unsupported notification kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub user_id: String,
    /// Calendar day or period the notification refers to.
    pub date: String,
    pub message: String,
    pub ts: String,
}
