use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use hr_pulse_lib::commands::pulse::{pulse_submit_check_in, pulse_user_index};
use hr_pulse_lib::commands::AppState;
use hr_pulse_lib::db::DbPool;
use hr_pulse_lib::models::checkin::CheckInInput;
use hr_pulse_lib::models::employee::{CohortFilter, EmployeeInput};
use hr_pulse_lib::services::employee_service::EmployeeService;
use hr_pulse_lib::services::engagement_service::EngagementService;
use hr_pulse_lib::services::settings_service::{SettingsService, SettingsUpdateInput};
use tempfile::tempdir;

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
}

fn hire(employees: &EmployeeService, id: &str, department: &str) {
    employees
        .upsert(EmployeeInput {
            id: Some(id.into()),
            name: format!("Person {id}"),
            email: format!("{id}@lumion.com"),
            department: Some(department.into()),
            ..Default::default()
        })
        .expect("employee saved");
}

fn check_in(user_id: &str, day: &str, mood: f64, stress: i64, workload: i64) -> CheckInInput {
    CheckInInput {
        user_id: user_id.into(),
        date: Some(date(day)),
        mood: Some(mood),
        stress: Some(stress),
        workload: Some(workload),
        note: None,
    }
}

#[test]
fn org_and_department_indices_weight_people_equally() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("pulse.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let employees = EmployeeService::new(pool.clone());
    let engagement = EngagementService::new(pool.clone(), Arc::clone(&settings));
    let today = date("2025-03-10");

    hire(&employees, "alice", "Engineering");
    hire(&employees, "bob", "Engineering");
    hire(&employees, "carol", "Sales");

    for input in [
        check_in("alice", "2025-03-10", 2.0, 1, 1),
        check_in("alice", "2025-03-09", 0.0, 3, 3),
        check_in("bob", "2025-03-10", -2.0, 5, 5),
        check_in("carol", "2025-03-10", 0.0, 3, 3),
    ] {
        engagement.upsert_check_in(input, today).expect("check-in saved");
    }

    let alice = engagement
        .user_index("alice", Some(30), today)
        .expect("user index")
        .expect("alice has data");
    assert_eq!(alice.index, 75);
    assert_eq!(alice.count, 2);

    let org = engagement
        .org_index(Some(30), today)
        .expect("org index")
        .expect("org has data");
    assert_eq!(org.index, 42);
    assert_eq!(org.count, 4);
    assert_eq!(org.respondents, 3);

    let engineering = engagement
        .cohort_index(&CohortFilter::department("Engineering"), Some(30), today)
        .expect("cohort index")
        .expect("engineering has data");
    assert_eq!(engineering.index, 38);

    let breakdown = engagement
        .department_breakdown(Some(30), today)
        .expect("department breakdown");
    let labels: Vec<(&str, i64)> = breakdown
        .iter()
        .map(|row| (row.department.as_str(), row.index))
        .collect();
    assert_eq!(labels, vec![("Sales", 50), ("Engineering", 38)]);

    let alerts = engagement.threshold_alerts(10).expect("alerts");
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].check_in.user_id, "bob");
    assert_eq!(alerts[0].department.as_deref(), Some("Engineering"));

    assert!(engagement
        .user_index("nobody", Some(30), today)
        .expect("user index")
        .is_none());
}

#[test]
fn resubmitting_same_day_replaces_the_check_in() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("pulse.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let engagement = EngagementService::new(pool.clone(), settings);
    let today = date("2025-03-10");

    engagement
        .upsert_check_in(check_in("alice", "2025-03-10", 2.0, 1, 1), today)
        .expect("first");
    engagement
        .upsert_check_in(check_in("alice", "2025-03-10", -1.0, 4, 2), today)
        .expect("second");

    let stored = engagement
        .find_check_in("alice", today)
        .expect("lookup")
        .expect("stored");
    assert_eq!(stored.mood, -1.0);
    assert_eq!(stored.stress, 4);

    let user = engagement
        .user_index("alice", Some(7), today)
        .expect("index")
        .expect("has data");
    assert_eq!(user.count, 1);
}

#[test]
fn omitted_fields_take_configured_defaults() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("pulse.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let engagement = EngagementService::new(pool.clone(), Arc::clone(&settings));
    let today = date("2025-03-10");

    let stored = engagement
        .upsert_check_in(
            CheckInInput {
                user_id: "alice".into(),
                stress: Some(9),
                ..Default::default()
            },
            today,
        )
        .expect("check-in saved");
    assert_eq!(stored.date, today);
    assert_eq!(stored.mood, 0.0);
    assert_eq!(stored.stress, 5);
    assert_eq!(stored.workload, 3);

    settings
        .update(SettingsUpdateInput {
            checkin_default_workload: Some(2),
            ..Default::default()
        })
        .expect("settings updated");
    let stored = engagement
        .upsert_check_in(
            CheckInInput {
                user_id: "bob".into(),
                ..Default::default()
            },
            today,
        )
        .expect("check-in saved");
    assert_eq!(stored.workload, 2);
}

#[test]
fn workload_streak_nudge_respects_dismissal() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("pulse.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let engagement = EngagementService::new(pool.clone(), settings);
    let today = date("2025-03-10");

    for day in ["2025-03-07", "2025-03-08", "2025-03-09"] {
        engagement
            .upsert_check_in(check_in("dave", day, 0.0, 3, 5), today)
            .expect("check-in saved");
    }

    let nudge = engagement.workload_streak_nudge("dave", today).expect("nudge");
    assert_eq!(nudge.streak, 3);
    assert!(nudge.due);

    let until = engagement
        .dismiss_workload_nudge("dave", today, None)
        .expect("dismissed");
    assert_eq!(until, date("2025-03-17"));

    let nudge = engagement.workload_streak_nudge("dave", today).expect("nudge");
    assert!(nudge.dismissed);
    assert!(!nudge.due);

    let later = engagement
        .workload_streak_nudge("dave", date("2025-03-18"))
        .expect("nudge");
    assert!(!later.dismissed);
    assert!(!later.due);
}

#[tokio::test]
async fn commands_store_and_score_check_ins() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("pulse.sqlite")).expect("db pool");
    let state = AppState::new(pool).expect("app state");

    let stored = pulse_submit_check_in(
        &state,
        CheckInInput {
            user_id: "erin".into(),
            mood: Some(2.0),
            stress: Some(1),
            workload: Some(1),
            ..Default::default()
        },
    )
    .await
    .expect("command succeeded");
    assert_eq!(stored.date, Utc::now().date_naive());

    let index = pulse_user_index(&state, "erin".into(), Some(7))
        .await
        .expect("command succeeded")
        .expect("has data");
    assert_eq!(index.index, 100);

    let error = pulse_submit_check_in(&state, CheckInInput::default())
        .await
        .expect_err("blank user rejected");
    assert_eq!(error.code, "VALIDATION_ERROR");
}
