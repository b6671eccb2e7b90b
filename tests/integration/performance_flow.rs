use std::collections::BTreeMap;

use hr_pulse_lib::db::DbPool;
use hr_pulse_lib::models::appraisal::{AppraisalStatus, ManagerReviewUpdate, SelfReviewUpdate};
use hr_pulse_lib::models::bsc::{BscObjectiveInput, BscProgressUpdate, Perspective};
use hr_pulse_lib::models::employee::EmployeeInput;
use hr_pulse_lib::models::kpi::KpiInput;
use hr_pulse_lib::services::appraisal_service::AppraisalService;
use hr_pulse_lib::services::bsc_service::BscService;
use hr_pulse_lib::services::employee_service::EmployeeService;
use hr_pulse_lib::services::kpi_service::KpiService;
use tempfile::tempdir;

fn hire(employees: &EmployeeService, id: &str, department: &str, role: Option<&str>) {
    employees
        .upsert(EmployeeInput {
            id: Some(id.into()),
            name: format!("Person {id}"),
            email: format!("{id}@lumion.com"),
            department: Some(department.into()),
            role: role.map(str::to_string),
            ..Default::default()
        })
        .expect("employee saved");
}

fn ratings(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
    values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn kpis_and_reviews_roll_up_into_the_appraisal_summary() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("performance.sqlite")).expect("db pool");
    let employees = EmployeeService::new(pool.clone());
    let kpis = KpiService::new(pool.clone());
    let appraisals = AppraisalService::new(pool.clone());

    hire(&employees, "ada", "Engineering", Some("Software Engineer"));

    let provisioned = kpis.ensure_user_kpis("ada").expect("kpis provisioned");
    assert!(provisioned.was_created());
    let keys: Vec<&str> = provisioned.value().iter().map(|k| k.key.as_str()).collect();
    assert_eq!(keys, vec!["features", "bugsFixed", "reviews", "velocity"]);
    assert!(!kpis.ensure_user_kpis("ada").expect("second call").was_created());
    assert_eq!(kpis.aggregate("ada").expect("aggregate").score, 0);

    for (id, key, title, weight, target) in [
        ("kpi-features", "features", "Features Delivered", 35.0, 6.0),
        ("kpi-bugsFixed", "bugsFixed", "Bugs Resolved", 25.0, 20.0),
    ] {
        kpis.upsert_kpi(
            "ada",
            KpiInput {
                id: Some(id.into()),
                key: key.into(),
                title: title.into(),
                weight,
                target,
                actual: target,
                ..Default::default()
            },
        )
        .expect("kpi updated");
    }
    let aggregate = kpis.aggregate("ada").expect("aggregate");
    assert_eq!(aggregate.score, 60);
    assert_eq!(aggregate.weight_sum, 100.0);
    assert_eq!(aggregate.count, 4);

    let started = appraisals.get_or_start("ada", "Q1-2025").expect("appraisal");
    assert!(started.was_created());
    assert_eq!(started.value().status, AppraisalStatus::InProgress);

    appraisals
        .update_self_review(
            "ada",
            "Q1-2025",
            SelfReviewUpdate {
                ratings: ratings(&[("quality", 4.0), ("delivery", 5.0)]),
                comments: Some("steady quarter".into()),
            },
        )
        .expect("self review");
    appraisals
        .update_manager_review(
            "ada",
            "Q1-2025",
            ManagerReviewUpdate {
                reviewer_id: Some("grace".into()),
                ratings: ratings(&[("overall", 4.0)]),
                ..Default::default()
            },
        )
        .expect("manager review");

    let summary = appraisals
        .compute_and_save_summary("ada", "Q1-2025")
        .expect("summary");
    assert_eq!(summary.kpi_score, 60);
    assert_eq!(summary.self_score, 90);
    assert_eq!(summary.manager_score, 80);
    assert_eq!(summary.overall, 70);

    let finalized = appraisals.finalize("ada", "Q1-2025").expect("finalized");
    assert_eq!(finalized.status, AppraisalStatus::Completed);
    assert_eq!(finalized.summary, Some(summary));
    assert_eq!(finalized.manager.reviewer_id.as_deref(), Some("grace"));

    let history = appraisals.history("ada").expect("history");
    assert_eq!(history.len(), 1);
}

#[test]
fn invalid_input_is_rejected_without_side_effects() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("performance.sqlite")).expect("db pool");
    let kpis = KpiService::new(pool.clone());
    let appraisals = AppraisalService::new(pool.clone());

    assert!(appraisals.get_or_start("ada", "Q5-2025").is_err());
    assert!(appraisals
        .update_self_review(
            "ada",
            "2025",
            SelfReviewUpdate {
                ratings: ratings(&[("quality", 6.0)]),
                comments: None,
            },
        )
        .is_err());
    assert!(appraisals.find("ada", "2025").expect("lookup").is_none());

    let missing = kpis.ensure_user_kpis("ghost").expect_err("unknown employee");
    assert!(missing.is_not_found());
    assert!(kpis.delete_kpi("ghost", "kpi-x").expect_err("nothing to delete").is_not_found());
}

#[test]
fn unknown_departments_fall_back_to_admin_templates() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("performance.sqlite")).expect("db pool");
    let employees = EmployeeService::new(pool.clone());
    let kpis = KpiService::new(pool.clone());

    hire(&employees, "lin", "Logistics", None);
    let created = kpis.ensure_user_kpis("lin").expect("kpis").into_inner();
    let keys: Vec<&str> = created.iter().map(|k| k.key.as_str()).collect();
    assert_eq!(keys, vec!["sla", "attendance", "requests"]);
    assert!(created.iter().all(|k| k.actual == 0.0));
}

#[test]
fn scorecard_scores_follow_objective_progress() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("performance.sqlite")).expect("db pool");
    let employees = EmployeeService::new(pool.clone());
    let bsc = BscService::new(pool.clone());

    hire(&employees, "ada", "Engineering", None);
    let seeded = bsc.seed_defaults("ada").expect("seeded");
    assert!(seeded.was_created());
    assert!(seeded.value().iter().all(|o| o.department == "Engineering"));
    assert!(!bsc.seed_defaults("ada").expect("second call").was_created());

    let scores = bsc.scores_for("ada").expect("scores");
    assert_eq!(
        (scores.financial, scores.customer, scores.process, scores.learning),
        (72, 80, 72, 55)
    );

    let stretch = bsc
        .add_objective(BscObjectiveInput {
            id: None,
            user_id: "ada".into(),
            department: None,
            perspective: Perspective::Financial,
            objective: "Cut cloud spend".into(),
            kpis: vec!["Monthly bill".into()],
            target: 10.0,
            actual: 15.0,
            status: None,
            initiative: None,
            theme: None,
        })
        .expect("objective added");
    assert_eq!(bsc.scores_for("ada").expect("scores").financial, 96);

    bsc.update_progress(
        &stretch.id,
        BscProgressUpdate {
            actual: Some(5.0),
            ..Default::default()
        },
    )
    .expect("progress updated");
    assert_eq!(bsc.scores_for("ada").expect("scores").financial, 61);

    bsc.delete_objective(&stretch.id).expect("deleted");
    assert_eq!(bsc.objectives_for("ada").expect("objectives").len(), 4);

    let missing = bsc
        .update_progress("bsc-missing", BscProgressUpdate::default())
        .expect_err("unknown objective");
    assert!(missing.is_not_found());
}
