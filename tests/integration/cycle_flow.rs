use std::collections::BTreeMap;
use std::sync::Arc;

use hr_pulse_lib::commands::cycles::cycles_submit_feedback;
use hr_pulse_lib::commands::performance::bsc_submit_review;
use hr_pulse_lib::commands::AppState;
use hr_pulse_lib::db::DbPool;
use hr_pulse_lib::models::appraisal::OVERALL_RATING_KEY;
use hr_pulse_lib::models::bsc::ObjectiveRating;
use hr_pulse_lib::models::cycle::{
    CycleInput, CycleType, FeedbackSubmission, ParticipantStatus, ReviewerRole,
};
use hr_pulse_lib::models::employee::EmployeeInput;
use hr_pulse_lib::models::notification::NotificationKind;
use hr_pulse_lib::services::appraisal_service::AppraisalService;
use hr_pulse_lib::services::bsc_service::BscService;
use hr_pulse_lib::services::cycle_service::CycleService;
use hr_pulse_lib::services::employee_service::EmployeeService;
use tempfile::tempdir;

const PERIOD: &str = "Q2-2025";

fn hire(employees: &EmployeeService, id: &str, department: &str, manager: Option<&str>) {
    employees
        .upsert(EmployeeInput {
            id: Some(id.into()),
            name: format!("Person {id}"),
            email: format!("{id}@lumion.com"),
            department: Some(department.into()),
            manager_id: manager.map(str::to_string),
            ..Default::default()
        })
        .expect("employee saved");
}

/// maya manages ann and bo, ann manages cy, dee sits in another department.
fn org(pool: &DbPool) {
    let employees = EmployeeService::new(pool.clone());
    hire(&employees, "maya", "Engineering", None);
    hire(&employees, "ann", "Engineering", Some("maya"));
    hire(&employees, "bo", "Engineering", Some("maya"));
    hire(&employees, "cy", "Engineering", Some("ann"));
    hire(&employees, "dee", "Sales", None);
}

fn services(pool: &DbPool) -> (CycleService, Arc<AppraisalService>) {
    let appraisals = Arc::new(AppraisalService::new(pool.clone()));
    let bsc = Arc::new(BscService::new(pool.clone()));
    (
        CycleService::new(pool.clone(), Arc::clone(&appraisals), bsc),
        appraisals,
    )
}

fn submission(cycle_id: &str, rater: &str, role: ReviewerRole, key: &str, rating: f64) -> FeedbackSubmission {
    FeedbackSubmission {
        cycle_id: cycle_id.into(),
        subject_id: "ann".into(),
        rater_id: rater.into(),
        role,
        ratings: BTreeMap::from([(key.to_string(), rating)]),
        comments: Some(format!("from {rater}")),
    }
}

#[test]
fn three_sixty_cycle_invites_and_assigns_raters() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("cycles.sqlite")).expect("db pool");
    org(&pool);
    let (cycles, _) = services(&pool);

    let cycle = cycles
        .create_cycle(CycleInput {
            cycle_type: CycleType::ThreeSixty,
            period: PERIOD.into(),
            participants: vec!["ann".into(), "bo".into(), "ann".into()],
            owner_id: Some("maya".into()),
        })
        .expect("cycle created");
    assert_eq!(cycle.participants, vec!["ann", "bo"]);
    assert_eq!(cycle.status_for("ann"), ParticipantStatus::Invited);

    let invites = cycles
        .notifications(Some("ann"), Some(NotificationKind::AppraisalInvite))
        .expect("notifications");
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].id, format!("invite:{}:ann", cycle.id));

    let cycle = cycles.assign_default_raters(&cycle.id).expect("raters");
    let ann = cycle.roles_for("ann");
    assert_eq!(ann.peers, vec!["bo", "maya"]);
    assert_eq!(ann.manager.as_deref(), Some("maya"));
    assert_eq!(ann.directs, vec!["cy"]);
    let bo = cycle.roles_for("bo");
    assert_eq!(bo.peers, vec!["ann", "cy", "maya"]);
    assert!(bo.directs.is_empty());

    let maya_tasks = cycles.reviewer_tasks("maya").expect("tasks");
    let roles: Vec<(ReviewerRole, &str)> = maya_tasks
        .iter()
        .map(|task| (task.role, task.subject_id.as_str()))
        .collect();
    assert_eq!(
        roles,
        vec![
            (ReviewerRole::Manager, "ann"),
            (ReviewerRole::Peer, "ann"),
            (ReviewerRole::Manager, "bo"),
            (ReviewerRole::Peer, "bo"),
        ]
    );

    let cy_tasks = cycles.reviewer_tasks("cy").expect("tasks");
    assert_eq!(cy_tasks.len(), 2);
    assert_eq!(cy_tasks[0].role, ReviewerRole::Direct);
    assert!(cycles.reviewer_tasks("dee").expect("tasks").is_empty());

    let cycle = cycles
        .assign_participants(&cycle.id, vec!["cy".into(), "ann".into()])
        .expect("participants added");
    assert_eq!(cycle.participants, vec!["ann", "bo", "cy"]);
    assert_eq!(cycles.participants(&cycle.id).expect("participants").len(), 3);
    assert_eq!(cycles.cycles_for_user("cy").expect("cycles").len(), 1);
}

#[test]
fn participant_status_only_moves_forward() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("cycles.sqlite")).expect("db pool");
    org(&pool);
    let (cycles, _) = services(&pool);
    let cycle = cycles
        .create_cycle(CycleInput {
            cycle_type: CycleType::ThreeSixty,
            period: PERIOD.into(),
            participants: vec!["ann".into()],
            owner_id: None,
        })
        .expect("cycle created");

    assert!(cycles
        .update_participant_status(&cycle.id, "ann", ParticipantStatus::Completed)
        .is_err());

    let updated = cycles
        .update_participant_status(&cycle.id, "ann", ParticipantStatus::InProgress)
        .expect("advanced");
    assert_eq!(updated.status_for("ann"), ParticipantStatus::InProgress);
    cycles
        .update_participant_status(&cycle.id, "ann", ParticipantStatus::InProgress)
        .expect("same status is accepted");
    assert!(cycles
        .update_participant_status(&cycle.id, "ann", ParticipantStatus::Invited)
        .is_err());

    let missing = cycles
        .update_participant_status(&cycle.id, "dee", ParticipantStatus::InProgress)
        .expect_err("not a participant");
    assert!(missing.is_not_found());

    let reminder = cycles.send_reminder(&cycle.id, "ann").expect("reminder");
    assert_eq!(reminder.user_id, "ann");
    let cycle = cycles.find(&cycle.id).expect("cycle");
    assert_eq!(cycle.reminders.len(), 1);
    assert_eq!(cycle.status_for("ann"), ParticipantStatus::InProgress);
    assert_eq!(
        cycles
            .notifications(Some("ann"), Some(NotificationKind::Reminder))
            .expect("notifications")
            .len(),
        1
    );
}

#[test]
fn feedback_lands_on_the_subject_appraisal() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("cycles.sqlite")).expect("db pool");
    org(&pool);
    let (cycles, appraisals) = services(&pool);
    let cycle = cycles
        .create_cycle(CycleInput {
            cycle_type: CycleType::ThreeSixty,
            period: PERIOD.into(),
            participants: vec!["ann".into()],
            owner_id: Some("maya".into()),
        })
        .expect("cycle created");

    cycles
        .submit_feedback(submission(&cycle.id, "maya", ReviewerRole::Manager, "overall", 4.0))
        .expect("manager feedback");
    cycles
        .submit_feedback(submission(&cycle.id, "cy", ReviewerRole::Direct, OVERALL_RATING_KEY, 3.0))
        .expect("direct feedback");
    cycles
        .submit_feedback(submission(&cycle.id, "cy", ReviewerRole::Direct, OVERALL_RATING_KEY, 5.0))
        .expect("direct feedback resubmitted");

    let appraisal = appraisals
        .find("ann", PERIOD)
        .expect("lookup")
        .expect("appraisal started");
    assert_eq!(appraisal.manager.reviewer_id.as_deref(), Some("maya"));
    assert_eq!(appraisal.manager.ratings.get("overall"), Some(&4.0));
    assert_eq!(appraisal.manager.comments, "from maya");
    assert_eq!(appraisal.peers.len(), 1);
    assert_eq!(
        appraisal.peers[0].id.as_deref(),
        Some(format!("{}:cy:ann", cycle.id).as_str())
    );
    assert_eq!(appraisal.peers[0].rating, Some(5.0));
}

#[test]
fn bsc_cycles_fan_out_subject_and_manager_tasks() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("cycles.sqlite")).expect("db pool");
    org(&pool);
    let (cycles, _) = services(&pool);
    let cycle = cycles
        .create_cycle(CycleInput {
            cycle_type: CycleType::Bsc,
            period: PERIOD.into(),
            participants: vec!["ann".into(), "dee".into()],
            owner_id: None,
        })
        .expect("cycle created");

    let tasks = cycles.reviewer_tasks("maya").expect("tasks");
    let roles: Vec<(ReviewerRole, &str)> = tasks
        .iter()
        .map(|task| (task.role, task.subject_id.as_str()))
        .collect();
    assert_eq!(
        roles,
        vec![
            (ReviewerRole::Subject, "ann"),
            (ReviewerRole::Manager, "ann"),
            (ReviewerRole::Subject, "dee"),
        ]
    );
    assert!(tasks.iter().all(|task| task.cycle_type == CycleType::Bsc));

    assert!(cycles
        .assign_default_raters(&cycle.id)
        .expect_err("360 only")
        .to_string()
        .contains("360"));
    assert!(cycles
        .submit_feedback(submission(&cycle.id, "maya", ReviewerRole::Manager, "overall", 4.0))
        .is_err());

    let reviews = cycles
        .submit_bsc_review(
            &cycle.id,
            "ann",
            "maya",
            BTreeMap::from([
                (
                    "bsc-1".to_string(),
                    ObjectiveRating {
                        role: Some("manager".into()),
                        rating: Some(4.0),
                        comment: None,
                    },
                ),
                ("bsc-2".to_string(), ObjectiveRating::default()),
            ]),
        )
        .expect("reviews stored");
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].rater_role, "manager");
    assert_eq!(reviews[0].period, PERIOD);
}

#[test]
fn rejects_invalid_periods() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("cycles.sqlite")).expect("db pool");
    let (cycles, _) = services(&pool);
    assert!(cycles
        .create_cycle(CycleInput {
            cycle_type: CycleType::ThreeSixty,
            period: "spring".into(),
            participants: vec!["ann".into()],
            owner_id: None,
        })
        .is_err());
    assert!(cycles.list().expect("cycles").is_empty());
}

#[tokio::test]
async fn commands_enforce_cycle_types() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("cycles.sqlite")).expect("db pool");
    org(&pool);
    let state = AppState::new(pool).expect("app state");
    let cycle = state
        .cycles()
        .create_cycle(CycleInput {
            cycle_type: CycleType::ThreeSixty,
            period: PERIOD.into(),
            participants: vec!["ann".into()],
            owner_id: None,
        })
        .expect("cycle created");

    let error = bsc_submit_review(
        &state,
        cycle.id.clone(),
        "ann".into(),
        "maya".into(),
        BTreeMap::new(),
    )
    .await
    .expect_err("360 cycle rejects scorecard reviews");
    assert_eq!(error.code, "VALIDATION_ERROR");

    let missing = cycles_submit_feedback(
        &state,
        FeedbackSubmission {
            cycle_id: "cycle-missing".into(),
            ..submission(&cycle.id, "maya", ReviewerRole::Manager, "overall", 4.0)
        },
    )
    .await
    .expect_err("unknown cycle");
    assert_eq!(missing.code, "NOT_FOUND");
}
