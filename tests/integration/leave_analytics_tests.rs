use chrono::NaiveDate;
use hr_pulse_lib::commands::leave::leave_overview;
use hr_pulse_lib::commands::AppState;
use hr_pulse_lib::db::DbPool;
use hr_pulse_lib::models::kpi::KpiInput;
use hr_pulse_lib::models::employee::{CohortFilter, EmployeeInput};
use hr_pulse_lib::models::leave::{LeaveInput, LeaveScope, LeaveStatus, LeaveType};
use hr_pulse_lib::services::employee_service::EmployeeService;
use hr_pulse_lib::services::kpi_service::KpiService;
use hr_pulse_lib::services::leave_service::LeaveService;
use tempfile::tempdir;

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
}

fn hire(employees: &EmployeeService, id: &str, department: &str, gender: Option<&str>) {
    employees
        .upsert(EmployeeInput {
            id: Some(id.into()),
            name: format!("Person {id}"),
            email: format!("{id}@lumion.com"),
            department: Some(department.into()),
            gender: gender.map(str::to_string),
            ..Default::default()
        })
        .expect("employee saved");
}

fn leave(
    user_id: &str,
    leave_type: LeaveType,
    start: &str,
    end: &str,
    status: LeaveStatus,
) -> LeaveInput {
    LeaveInput {
        user_id: user_id.into(),
        leave_type,
        start_date: date(start),
        end_date: date(end),
        status: Some(status),
        reason: None,
    }
}

fn seeded() -> (LeaveService, String, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("leave.sqlite")).expect("db pool");
    let employees = EmployeeService::new(pool.clone());
    let service = LeaveService::new(pool);

    hire(&employees, "ann", "Engineering", Some("Female"));
    hire(&employees, "ben", "Engineering", Some("Male"));
    hire(&employees, "cid", "Sales", None);

    service
        .add_leave(leave("ann", LeaveType::Annual, "2025-05-05", "2025-05-09", LeaveStatus::Approved))
        .expect("annual leave");
    let sick = service
        .add_leave(leave("ben", LeaveType::Sick, "2025-05-12", "2025-05-12", LeaveStatus::Pending))
        .expect("sick leave");
    service
        .add_leave(leave("cid", LeaveType::Absent, "2025-06-02", "2025-06-03", LeaveStatus::Approved))
        .expect("absence");
    service
        .set_allowance("ann", LeaveType::Annual, 25.0)
        .expect("allowance");

    (service, sick.id, dir)
}

#[test]
fn aggregate_over_everyone() {
    let (service, _, _dir) = seeded();
    let aggregate = service
        .leave_aggregate(&LeaveScope::default())
        .expect("aggregate");

    assert_eq!(aggregate.total_days, 8);
    assert_eq!(aggregate.totals_by_type.get(&LeaveType::Annual), Some(&5));
    assert_eq!(aggregate.totals_by_type.get(&LeaveType::Sick), Some(&1));
    assert_eq!(aggregate.totals_by_type.get(&LeaveType::Absent), Some(&2));
    assert_eq!(aggregate.compliance_rate, 75);

    assert_eq!(aggregate.avg_by_department.get("Engineering"), Some(&3.0));
    assert_eq!(aggregate.avg_by_department.get("Sales"), Some(&2.0));
    assert_eq!(aggregate.avg_by_gender.get("Female"), Some(&5.0));
    assert_eq!(aggregate.avg_by_gender.get("Male"), Some(&1.0));
    assert_eq!(aggregate.avg_by_gender.get("Others"), Some(&2.0));

    assert_eq!(aggregate.by_weekday, [0, 8, 0, 0, 0, 0, 0]);
    assert_eq!(aggregate.trend_by_month.len(), 2);
    assert_eq!(
        aggregate.trend_by_month["2025-06"].get(&LeaveType::Absent),
        Some(&2)
    );

    assert_eq!(aggregate.headcount, 3);
    assert_eq!(aggregate.avg_days_per_employee, 2.7);
    assert_eq!(aggregate.avg_annual_allowance, 21.7);
}

#[test]
fn cohort_and_date_range_narrow_the_scope() {
    let (service, _, _dir) = seeded();

    let engineering = service
        .leave_aggregate(&LeaveScope {
            cohort: CohortFilter::department("Engineering"),
            ..LeaveScope::default()
        })
        .expect("aggregate");
    assert_eq!(engineering.headcount, 2);
    assert_eq!(engineering.total_days, 6);
    assert_eq!(engineering.compliance_rate, 100);

    let june = LeaveScope {
        from: Some(date("2025-06-01")),
        ..LeaveScope::default()
    };
    assert_eq!(service.get_leaves(&june).expect("leaves").len(), 1);
    let aggregate = service.leave_aggregate(&june).expect("aggregate");
    assert_eq!(aggregate.total_days, 2);
    assert_eq!(aggregate.headcount, 3);
    assert_eq!(aggregate.avg_by_department.get("Engineering"), Some(&0.0));
    assert_eq!(aggregate.compliance_rate, 0);
}

#[test]
fn balances_ignore_rejected_leave() {
    let (service, sick_id, _dir) = seeded();

    let balances = service.leave_balances("ann").expect("balances");
    assert_eq!(balances.len(), 4);
    let annual = balances
        .iter()
        .find(|b| b.leave_type == LeaveType::Annual)
        .expect("annual balance");
    assert_eq!(annual.allocated, 25.0);
    assert_eq!(annual.used, 5);
    assert_eq!(annual.remaining, 20.0);

    let sick_used = |service: &LeaveService| {
        service
            .leave_balances("ben")
            .expect("balances")
            .into_iter()
            .find(|b| b.leave_type == LeaveType::Sick)
            .expect("sick balance")
            .used
    };
    assert_eq!(sick_used(&service), 1);

    let rejected = service
        .set_status(&sick_id, LeaveStatus::Rejected)
        .expect("status updated");
    assert_eq!(rejected.status, LeaveStatus::Rejected);
    assert_eq!(sick_used(&service), 0);
}

#[test]
fn who_is_out_lists_approved_leave_only() {
    let (service, _, _dir) = seeded();

    let out = service
        .employees_on_leave(Some("Engineering"), Some(date("2025-05-07")))
        .expect("on leave");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].0.id, "ann");

    assert!(service
        .employees_on_leave(Some("Engineering"), Some(date("2025-05-12")))
        .expect("on leave")
        .is_empty());
    assert_eq!(
        service
            .employees_on_leave(None, Some(date("2025-06-03")))
            .expect("on leave")
            .len(),
        1
    );
}

#[test]
fn rejects_reversed_ranges() {
    let (service, _, _dir) = seeded();
    let error = service
        .add_leave(leave("ann", LeaveType::Sick, "2025-05-09", "2025-05-05", LeaveStatus::Pending))
        .expect_err("reversed range");
    assert!(error.to_string().contains("end date"));
}

fn hire_paid(employees: &EmployeeService, id: &str, start: &str, salary: f64) {
    employees
        .upsert(EmployeeInput {
            id: Some(id.into()),
            name: format!("Person {id}"),
            email: format!("{id}@lumion.com"),
            department: Some("Finance".into()),
            start_date: Some(start.into()),
            salary: Some(salary),
            ..Default::default()
        })
        .expect("employee saved");
}

#[tokio::test]
async fn finance_overview_prices_paid_leave() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("overview.sqlite")).expect("db pool");
    let employees = EmployeeService::new(pool.clone());
    let leaves = LeaveService::new(pool.clone());

    hire_paid(&employees, "dee", "2023-03-01", 300_000.0);
    hire_paid(&employees, "eve", "2025-02-01", 180_000.0);
    hire(&employees, "fay", "Sales", None);
    KpiService::new(pool.clone())
        .upsert_kpi(
            "dee",
            KpiInput {
                key: "close".into(),
                title: "Books closed on time".into(),
                weight: 100.0,
                target: 10.0,
                actual: 8.0,
                ..Default::default()
            },
        )
        .expect("kpi saved");

    for input in [
        leave("dee", LeaveType::Sick, "2025-03-03", "2025-03-04", LeaveStatus::Approved),
        leave("eve", LeaveType::Earned, "2025-03-10", "2025-03-12", LeaveStatus::Approved),
        leave("eve", LeaveType::Unpaid, "2025-03-13", "2025-03-13", LeaveStatus::Approved),
        leave("fay", LeaveType::Casual, "2025-03-10", "2025-03-14", LeaveStatus::Approved),
    ] {
        leaves.add_leave(input).expect("leave recorded");
    }

    let scope = LeaveScope {
        cohort: CohortFilter::department("Finance"),
        from: Some(date("2025-01-01")),
        to: Some(date("2025-06-30")),
    };
    let state = AppState::new(pool).expect("app state");
    let overview = leave_overview(&state, Some(scope), Some(date("2025-07-01")))
        .await
        .expect("overview");

    assert_eq!(overview.headcount, 2);
    assert_eq!(overview.avg_kpi_score, 40);
    assert_eq!(overview.avg_leave_days, 3.0);
    assert_eq!(overview.engagement_proxy, 85);
    assert_eq!(overview.avg_tenure_months, 16);
    assert_eq!(overview.new_hires, 1);
    assert_eq!(overview.hiring_rate, 50);
    assert_eq!(overview.avg_new_hire_tenure_months, Some(5));
    assert_eq!(overview.monthly_payroll, 480_000.0);
    assert_eq!(overview.avg_salary, 240_000.0);
    assert_eq!(overview.paid_leave_days, 5);
    assert_eq!(overview.paid_leave_cost, 54_545.0);
}
