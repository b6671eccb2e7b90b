use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repositories::cycle_repository::CycleRepository;
use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::format_timestamp;
use crate::db::repositories::notification_repository::NotificationRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::appraisal::{ManagerReviewUpdate, PeerFeedback, OVERALL_RATING_KEY};
use crate::models::bsc::{BscReview, ObjectiveRating};
use crate::models::cycle::{
    AppraisalCycle, CycleInput, CycleParticipant, CycleType, FeedbackSubmission,
    ParticipantStatus, RaterRoles, Reminder, ReviewerRole, ReviewerTask,
};
use crate::models::employee::Employee;
use crate::models::notification::{Notification, NotificationKind};
use crate::services::appraisal_service::{validate_period, AppraisalService};
use crate::services::bsc_service::BscService;

const MAX_DEFAULT_PEERS: usize = 3;
const MAX_DEFAULT_DIRECTS: usize = 3;

fn invitation(cycle: &AppraisalCycle, user_id: &str, ts: &str) -> Notification {
    Notification {
        id: format!("invite:{}:{}", cycle.id, user_id),
        kind: NotificationKind::AppraisalInvite,
        user_id: user_id.to_string(),
        date: cycle.period.clone(),
        message: format!("{} review invitation for {}", cycle.cycle_type.label(), cycle.period),
        ts: ts.to_string(),
    }
}

/// Default rater assignment for one 360 subject.
pub fn default_raters(subject_id: &str, employees: &[Employee]) -> RaterRoles {
    let subject = employees.iter().find(|employee| employee.id == subject_id);

    let peers = match subject {
        Some(subject) => employees
            .iter()
            .filter(|candidate| {
                candidate.id != subject_id
                    && candidate.manager_id.as_deref() != Some(subject_id)
                    && candidate.department == subject.department
            })
            .take(MAX_DEFAULT_PEERS)
            .map(|candidate| candidate.id.clone())
            .collect(),
        None => Vec::new(),
    };

    let manager = subject
        .and_then(|subject| subject.manager_id.as_deref())
        .filter(|manager_id| employees.iter().any(|employee| employee.id == *manager_id))
        .map(str::to_string);

    let directs = employees
        .iter()
        .filter(|employee| employee.manager_id.as_deref() == Some(subject_id))
        .take(MAX_DEFAULT_DIRECTS)
        .map(|employee| employee.id.clone())
        .collect();

    RaterRoles {
        peers,
        manager,
        directs,
    }
}

pub struct CycleService {
    db: DbPool,
    appraisals: Arc<AppraisalService>,
    bsc: Arc<BscService>,
}

impl CycleService {
    pub fn new(db: DbPool, appraisals: Arc<AppraisalService>, bsc: Arc<BscService>) -> Self {
        Self { db, appraisals, bsc }
    }

    /// Creates the cycle and invites every participant.
    pub fn create_cycle(&self, input: CycleInput) -> AppResult<AppraisalCycle> {
        validate_period(&input.period)?;

        let mut participants: Vec<String> = Vec::new();
        for user_id in input.participants {
            if !user_id.trim().is_empty() && !participants.contains(&user_id) {
                participants.push(user_id);
            }
        }

        let now = format_timestamp(Utc::now());
        let cycle = AppraisalCycle {
            id: format!("cycle-{}", Uuid::new_v4()),
            cycle_type: input.cycle_type,
            period: input.period.trim().to_string(),
            owner_id: input.owner_id,
            status_by_user: participants
                .iter()
                .map(|user_id| (user_id.clone(), ParticipantStatus::Invited))
                .collect(),
            participants,
            roles_by_user: BTreeMap::new(),
            reminders: Vec::new(),
            created_at: now.clone(),
        };

        self.db.with_transaction(|tx| {
            CycleRepository::insert(tx, &cycle)?;
            for user_id in &cycle.participants {
                NotificationRepository::insert(tx, &invitation(&cycle, user_id, &now))?;
            }
            Ok(())
        })?;

        info!(
            target: "app::cycle",
            cycle_id = %cycle.id,
            cycle_type = %cycle.cycle_type,
            participants = cycle.participants.len(),
            "appraisal cycle created"
        );

        Ok(cycle)
    }

    pub fn find(&self, cycle_id: &str) -> AppResult<AppraisalCycle> {
        self.db
            .with_connection(|conn| CycleRepository::find_by_id(conn, cycle_id))
    }

    pub fn list(&self) -> AppResult<Vec<AppraisalCycle>> {
        self.db.with_connection(|conn| CycleRepository::list(conn))
    }

    pub fn cycles_for_user(&self, user_id: &str) -> AppResult<Vec<AppraisalCycle>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|cycle| cycle.participants.iter().any(|id| id == user_id))
            .collect())
    }

    pub fn participants(&self, cycle_id: &str) -> AppResult<Vec<CycleParticipant>> {
        let cycle = self.find(cycle_id)?;
        Ok(cycle
            .participants
            .iter()
            .map(|user_id| CycleParticipant {
                user_id: user_id.clone(),
                roles: cycle.roles_for(user_id),
                status: cycle.status_for(user_id),
            })
            .collect())
    }

    /// Adds people to the cycle. Everyone listed is (re)invited; existing states are kept.
    pub fn assign_participants(&self, cycle_id: &str, user_ids: Vec<String>) -> AppResult<AppraisalCycle> {
        let now = format_timestamp(Utc::now());

        self.db.with_transaction(|tx| {
            let mut cycle = CycleRepository::find_by_id(tx, cycle_id)?;
            for user_id in user_ids.iter().filter(|id| !id.trim().is_empty()) {
                if !cycle.participants.contains(user_id) {
                    cycle.participants.push(user_id.clone());
                }
                cycle
                    .status_by_user
                    .entry(user_id.clone())
                    .or_insert(ParticipantStatus::Invited);
                NotificationRepository::insert(tx, &invitation(&cycle, user_id, &now))?;
            }
            CycleRepository::update(tx, &cycle)?;
            Ok(cycle)
        })
    }

    /// Fills in peers, manager and directs for every participant of a 360 cycle.
    pub fn assign_default_raters(&self, cycle_id: &str) -> AppResult<AppraisalCycle> {
        self.db.with_transaction(|tx| {
            let mut cycle = CycleRepository::find_by_id(tx, cycle_id)?;
            if cycle.cycle_type != CycleType::ThreeSixty {
                return Err(AppError::validation("default raters apply to 360 cycles only"));
            }

            let employees = EmployeeRepository::list(tx)?;
            for user_id in &cycle.participants {
                cycle
                    .roles_by_user
                    .insert(user_id.clone(), default_raters(user_id, &employees));
            }
            CycleRepository::update(tx, &cycle)?;

            debug!(target: "app::cycle", cycle_id, "default raters assigned");
            Ok(cycle)
        })
    }

    pub fn update_participant_status(
        &self,
        cycle_id: &str,
        user_id: &str,
        status: ParticipantStatus,
    ) -> AppResult<AppraisalCycle> {
        self.db.with_transaction(|tx| {
            let mut cycle = CycleRepository::find_by_id(tx, cycle_id)?;
            if !cycle.participants.iter().any(|id| id == user_id) {
                return Err(AppError::not_found());
            }

            let current = cycle.status_for(user_id);
            if current == status {
                return Ok(cycle);
            }
            if !current.can_advance_to(status) {
                return Err(AppError::validation_with_details(
                    format!("cannot move participant from {current} to {status}"),
                    serde_json::json!({ "from": current, "to": status }),
                ));
            }

            cycle.status_by_user.insert(user_id.to_string(), status);
            CycleRepository::update(tx, &cycle)?;

            info!(target: "app::cycle", cycle_id, user_id, %status, "participant status changed");
            Ok(cycle)
        })
    }

    /// Logs a reminder and notifies the participant; their status is left alone.
    pub fn send_reminder(&self, cycle_id: &str, user_id: &str) -> AppResult<Reminder> {
        let now = Utc::now();
        let ts = format_timestamp(now);

        self.db.with_transaction(|tx| {
            let mut cycle = CycleRepository::find_by_id(tx, cycle_id)?;
            let reminder = Reminder {
                user_id: user_id.to_string(),
                ts: ts.clone(),
            };
            cycle.reminders.push(reminder.clone());
            CycleRepository::update(tx, &cycle)?;

            NotificationRepository::insert(
                tx,
                &Notification {
                    id: format!("reminder:{}:{}:{}", cycle.id, user_id, now.timestamp_millis()),
                    kind: NotificationKind::Reminder,
                    user_id: user_id.to_string(),
                    date: cycle.period.clone(),
                    message: format!(
                        "Reminder: complete {} review for {}",
                        cycle.cycle_type.label(),
                        cycle.period
                    ),
                    ts: ts.clone(),
                },
            )?;

            Ok(reminder)
        })
    }

    /// Everything `user_id` is expected to rate across all cycles.
    pub fn reviewer_tasks(&self, user_id: &str) -> AppResult<Vec<ReviewerTask>> {
        let (cycles, employees) = self.db.with_connection(|conn| {
            Ok((CycleRepository::list(conn)?, EmployeeRepository::list(conn)?))
        })?;
        let manager_of: HashMap<&str, Option<&str>> = employees
            .iter()
            .map(|employee| (employee.id.as_str(), employee.manager_id.as_deref()))
            .collect();

        let mut tasks = Vec::new();
        for cycle in &cycles {
            let task = |role: ReviewerRole, subject_id: &str| ReviewerTask {
                cycle_id: cycle.id.clone(),
                cycle_type: cycle.cycle_type,
                role,
                subject_id: subject_id.to_string(),
                period: cycle.period.clone(),
            };

            for subject_id in &cycle.participants {
                match cycle.cycle_type {
                    CycleType::ThreeSixty => {
                        let roles = cycle.roles_for(subject_id);
                        if roles.manager.as_deref() == Some(user_id) {
                            tasks.push(task(ReviewerRole::Manager, subject_id));
                        }
                        if roles.directs.iter().any(|id| id == user_id) {
                            tasks.push(task(ReviewerRole::Direct, subject_id));
                        }
                        if roles.peers.iter().any(|id| id == user_id) {
                            tasks.push(task(ReviewerRole::Peer, subject_id));
                        }
                    }
                    CycleType::Bsc => {
                        tasks.push(task(ReviewerRole::Subject, subject_id));
                        let has_manager = manager_of
                            .get(subject_id.as_str())
                            .copied()
                            .flatten()
                            .map_or(false, |manager_id| manager_of.contains_key(manager_id));
                        if has_manager {
                            tasks.push(task(ReviewerRole::Manager, subject_id));
                        }
                    }
                }
            }
        }

        Ok(tasks)
    }

    /// Records 360 feedback on the subject's appraisal for the cycle period.
    pub fn submit_feedback(&self, submission: FeedbackSubmission) -> AppResult<()> {
        let cycle = self.find(&submission.cycle_id)?;
        if cycle.cycle_type != CycleType::ThreeSixty {
            return Err(AppError::validation("feedback can only be submitted to 360 cycles"));
        }

        match submission.role {
            ReviewerRole::Manager => {
                self.appraisals.update_manager_review(
                    &submission.subject_id,
                    &cycle.period,
                    ManagerReviewUpdate {
                        reviewer_id: Some(submission.rater_id.clone()),
                        ratings: submission.ratings,
                        comments: submission.comments.filter(|c| !c.is_empty()),
                        status: None,
                    },
                )?;
            }
            _ => {
                let rating = submission.ratings.get(OVERALL_RATING_KEY).copied();
                if rating.is_none() {
                    warn!(
                        target: "app::cycle",
                        cycle_id = %cycle.id,
                        rater_id = %submission.rater_id,
                        "peer feedback without an overall rating"
                    );
                }
                self.appraisals.upsert_peer_feedback(
                    &submission.subject_id,
                    &cycle.period,
                    PeerFeedback {
                        id: Some(format!(
                            "{}:{}:{}",
                            cycle.id, submission.rater_id, submission.subject_id
                        )),
                        name: String::new(),
                        email: String::new(),
                        rating,
                        comment: submission.comments.unwrap_or_default(),
                    },
                )?;
            }
        }

        debug!(
            target: "app::cycle",
            cycle_id = %cycle.id,
            subject_id = %submission.subject_id,
            role = %submission.role,
            "feedback submitted"
        );
        Ok(())
    }

    pub fn submit_bsc_review(
        &self,
        cycle_id: &str,
        subject_id: &str,
        rater_id: &str,
        ratings_by_objective: BTreeMap<String, ObjectiveRating>,
    ) -> AppResult<Vec<BscReview>> {
        let cycle = self.find(cycle_id)?;
        if cycle.cycle_type != CycleType::Bsc {
            return Err(AppError::validation("scorecard reviews belong to bsc cycles"));
        }
        self.bsc
            .submit_review(cycle_id, subject_id, rater_id, &cycle.period, ratings_by_objective)
    }

    pub fn notifications(
        &self,
        user_id: Option<&str>,
        kind: Option<NotificationKind>,
    ) -> AppResult<Vec<Notification>> {
        self.db
            .with_connection(|conn| NotificationRepository::list(conn, user_id, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(id: &str, department: &str, manager_id: Option<&str>) -> Employee {
        Employee {
            id: id.into(),
            name: id.into(),
            email: format!("{id}@lumion.test"),
            department: department.into(),
            role: None,
            location: "HQ".into(),
            gender: None,
            manager_id: manager_id.map(str::to_string),
            start_date: None,
            salary: None,
        }
    }

    #[test]
    fn default_raters_exclude_self_and_directs() {
        let employees = vec![
            employee("boss", "Engineering", None),
            employee("lead", "Engineering", Some("boss")),
            employee("dev1", "Engineering", Some("lead")),
            employee("dev2", "Engineering", Some("lead")),
            employee("qa", "Engineering", Some("boss")),
            employee("sales", "Sales", Some("boss")),
        ];

        let roles = default_raters("lead", &employees);
        assert_eq!(roles.manager.as_deref(), Some("boss"));
        assert_eq!(roles.directs, vec!["dev1".to_string(), "dev2".to_string()]);
        assert_eq!(roles.peers, vec!["boss".to_string(), "qa".to_string()]);
    }

    #[test]
    fn unknown_subject_gets_no_peers() {
        let roles = default_raters("ghost", &[employee("a", "Sales", None)]);
        assert!(roles.peers.is_empty());
        assert!(roles.manager.is_none());
    }
}
