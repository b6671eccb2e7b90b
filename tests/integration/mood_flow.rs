use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use hr_pulse_lib::commands::mood::mood_record;
use hr_pulse_lib::commands::AppState;
use hr_pulse_lib::db::DbPool;
use hr_pulse_lib::models::employee::EmployeeInput;
use hr_pulse_lib::models::mood::{Mood, MoodEntryInput, MoodSession};
use hr_pulse_lib::services::employee_service::EmployeeService;
use hr_pulse_lib::services::mood_service::MoodService;
use hr_pulse_lib::services::settings_service::SettingsService;
use tempfile::tempdir;

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid instant")
}

fn entry(employee_id: &str, mood: Mood, intensity: i64, timestamp: DateTime<Utc>) -> MoodEntryInput {
    MoodEntryInput {
        employee_id: employee_id.into(),
        session: None,
        mood,
        intensity,
        notes: None,
        timestamp: Some(timestamp),
    }
}

fn setup() -> (MoodService, EmployeeService, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("mood.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let employees = EmployeeService::new(pool.clone());
    (MoodService::new(pool, settings), employees, dir)
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

#[test]
fn falling_evenings_raise_burnout_alerts() {
    let (mood, employees, _dir) = setup();
    let now = at(10, 18);
    hire(&employees, "sam", "Engineering");
    hire(&employees, "lee", "Sales");

    for day in [8, 9] {
        let morning = mood
            .record_mood(entry("sam", Mood::Joy, 5, at(day, 8)), now)
            .expect("morning saved");
        assert_eq!(morning.session, MoodSession::Morning);
        let evening = mood
            .record_mood(entry("sam", Mood::Tired, 4, at(day, 19)), now)
            .expect("evening saved");
        assert_eq!(evening.session, MoodSession::Evening);
    }
    mood.record_mood(entry("lee", Mood::Calm, 3, at(9, 8)), now)
        .expect("saved");
    mood.record_mood(entry("lee", Mood::Calm, 4, at(9, 19)), now)
        .expect("saved");

    let risk = mood.burnout_risk("sam", now).expect("risk");
    assert_eq!(risk.score, 88);
    assert_eq!(risk.neg_days, 2);
    assert_eq!(risk.days, 2);

    let calm = mood.burnout_risk("lee", now).expect("risk");
    assert_eq!(calm.score, 0);

    let alerts = mood.burnout_alerts(now).expect("alerts");
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].employee_id, "sam");
    assert_eq!(alerts[0].department, "Engineering");

    let insights = mood.burnout_insights(now).expect("insights");
    assert_eq!(insights.len(), 1);

    let weeks_later = at(28, 12);
    assert!(mood.burnout_alerts(weeks_later).expect("alerts").is_empty());
}

#[test]
fn heatmap_and_department_averages_cover_every_mood() {
    let (mood, employees, _dir) = setup();
    let now = at(10, 18);
    hire(&employees, "sam", "Engineering");
    hire(&employees, "lee", "Sales");

    mood.record_mood(entry("sam", Mood::Tired, 4, at(9, 19)), now)
        .expect("saved");
    mood.record_mood(entry("sam", Mood::Tired, 2, at(10, 8)), now)
        .expect("saved");
    mood.record_mood(entry("lee", Mood::Joy, 5, at(10, 9)), now)
        .expect("saved");

    let heatmap = mood.team_heatmap(None, now).expect("heatmap");
    assert_eq!(heatmap.len(), Mood::ALL.len());
    let tired = heatmap
        .iter()
        .find(|row| row.mood == Mood::Tired)
        .expect("tired row");
    assert_eq!(tired.count, 2);
    assert!((tired.average_intensity - 3.0).abs() < 1e-9);
    let angry = heatmap
        .iter()
        .find(|row| row.mood == Mood::Angry)
        .expect("angry row");
    assert_eq!(angry.count, 0);
    assert_eq!(angry.average_intensity, 0.0);

    let by_department = mood.department_mood_averages().expect("averages");
    assert_eq!(by_department.len(), 2 * Mood::ALL.len());
    let sales_joy = by_department
        .iter()
        .find(|row| row.department.as_deref() == Some("Sales") && row.mood == Mood::Joy)
        .expect("sales joy");
    assert_eq!(sales_joy.average_intensity, 5.0);
}

#[test]
fn rejects_out_of_range_intensity() {
    let (mood, _employees, _dir) = setup();
    let error = mood
        .record_mood(entry("sam", Mood::Calm, 6, at(10, 9)), at(10, 9))
        .expect_err("intensity 6 rejected");
    assert!(error.to_string().contains("intensity"));

    assert!(mood
        .get_mood_entries(Some("sam"), 7, at(10, 9))
        .expect("entries")
        .is_empty());
}

#[tokio::test]
async fn command_reports_validation_details() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("mood.sqlite")).expect("db pool");
    let state = AppState::new(pool).expect("app state");

    let error = mood_record(&state, entry("sam", Mood::Sad, 0, Utc::now()))
        .await
        .expect_err("intensity 0 rejected");
    assert_eq!(error.code, "VALIDATION_ERROR");
    assert_eq!(error.details, Some(serde_json::json!({ "intensity": 0 })));

    let stored = mood_record(&state, entry("sam", Mood::Sad, 2, Utc::now()))
        .await
        .expect("saved");
    assert_eq!(stored.intensity, 2);
}
