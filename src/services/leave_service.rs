use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::kpi_repository::KpiRepository;
use crate::db::repositories::leave_repository::LeaveRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::employee::{CohortFilter, Employee};
use crate::models::kpi::KpiRecord;
use crate::models::leave::{
    LeaveAggregate, LeaveBalance, LeaveInput, LeaveRecord, LeaveScope, LeaveStatus, LeaveType,
    WorkforceOverview, COSTED_LEAVE_TYPES, DEFAULT_ALLOWANCES,
};
use crate::services::kpi_service::compute_kpi_aggregate;

const UNSPECIFIED_GENDER: &str = "Others";
const DAYS_PER_MONTH: f64 = 30.4;
const WORKING_DAYS_PER_MONTH: f64 = 22.0;
const ENGAGEMENT_PROXY_MIN: f64 = 50.0;
const ENGAGEMENT_PROXY_MAX: f64 = 95.0;
const ENGAGEMENT_POINTS_PER_LEAVE_DAY: f64 = 5.0;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Stored allowances with the defaults filled in for missing types.
pub fn effective_allowances(stored: &BTreeMap<LeaveType, f64>) -> BTreeMap<LeaveType, f64> {
    let mut allowances: BTreeMap<LeaveType, f64> = DEFAULT_ALLOWANCES.iter().copied().collect();
    allowances.extend(stored.iter().map(|(kind, days)| (*kind, *days)));
    allowances
}

/// Rolls scoped leave records up over the scoped people.
pub fn compute_leave_aggregate(
    people: &[Employee],
    records: &[LeaveRecord],
    allowances: &HashMap<String, BTreeMap<LeaveType, f64>>,
) -> LeaveAggregate {
    let person_by_id: HashMap<&str, &Employee> =
        people.iter().map(|person| (person.id.as_str(), person)).collect();

    let mut totals_by_type: BTreeMap<LeaveType, i64> = BTreeMap::new();
    let mut trend_by_month: BTreeMap<String, BTreeMap<LeaveType, i64>> = BTreeMap::new();
    let mut by_weekday = [0_i64; 7];
    let mut total_days = 0_i64;
    let mut absent_days = 0_i64;

    let mut department_days: BTreeMap<String, (i64, usize)> = BTreeMap::new();
    let mut gender_days: BTreeMap<String, (i64, usize)> = BTreeMap::new();
    for person in people {
        department_days.entry(person.department.clone()).or_default().1 += 1;
        gender_days.entry(gender_label(person)).or_default().1 += 1;
    }

    for record in records {
        let Some(person) = person_by_id.get(record.user_id.as_str()) else {
            continue;
        };
        let days = record.days();

        *totals_by_type.entry(record.leave_type).or_default() += days;
        total_days += days;
        if record.leave_type == LeaveType::Absent {
            absent_days += days;
        }

        let weekday = record.start_date.weekday().num_days_from_sunday() as usize;
        by_weekday[weekday] += days;

        let month = record.start_date.format("%Y-%m").to_string();
        *trend_by_month
            .entry(month)
            .or_default()
            .entry(record.leave_type)
            .or_default() += days;

        department_days.entry(person.department.clone()).or_default().0 += days;
        gender_days.entry(gender_label(person)).or_default().0 += days;
    }

    let averages = |buckets: BTreeMap<String, (i64, usize)>| -> BTreeMap<String, f64> {
        buckets
            .into_iter()
            .filter(|(_, (_, headcount))| *headcount > 0)
            .map(|(label, (days, headcount))| (label, round1(days as f64 / headcount as f64)))
            .collect()
    };

    let compliance_rate = if total_days == 0 {
        100
    } else {
        ((total_days - absent_days) as f64 / total_days as f64 * 100.0).round() as i64
    };

    let headcount = people.len();
    let avg_annual_allowance = if headcount == 0 {
        0.0
    } else {
        let sum: f64 = people
            .iter()
            .map(|person| {
                let stored = allowances.get(&person.id).cloned().unwrap_or_default();
                effective_allowances(&stored)
                    .get(&LeaveType::Annual)
                    .copied()
                    .unwrap_or(0.0)
            })
            .sum();
        round1(sum / headcount as f64)
    };

    LeaveAggregate {
        totals_by_type,
        total_days,
        avg_by_department: averages(department_days),
        avg_by_gender: averages(gender_days),
        by_weekday,
        trend_by_month,
        compliance_rate,
        headcount,
        avg_days_per_employee: if headcount == 0 {
            0.0
        } else {
            round1(total_days as f64 / headcount as f64)
        },
        avg_annual_allowance,
    }
}

fn start_day(person: &Employee) -> Option<NaiveDate> {
    let raw = person.start_date.as_deref()?.trim();
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
}

fn months_between(start: NaiveDate, as_of: NaiveDate) -> f64 {
    ((as_of - start).num_days() as f64 / DAYS_PER_MONTH).max(0.0)
}

fn rounded_mean(values: &[f64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    Some((values.iter().sum::<f64>() / values.len() as f64).round() as i64)
}

/// Dashboard overview of the scoped people.
///
/// `records` should already be limited to the scope; `scope` is used again to
/// pick new hires by start date. People without a readable start date are left
/// out of tenure and hiring figures, and `kpi_scores` misses count as 0.
pub fn compute_workforce_overview(
    people: &[Employee],
    records: &[LeaveRecord],
    kpi_scores: &HashMap<String, i64>,
    scope: &LeaveScope,
    as_of: NaiveDate,
) -> WorkforceOverview {
    let headcount = people.len();
    let in_scope: std::collections::HashSet<&str> =
        people.iter().map(|person| person.id.as_str()).collect();
    let records: Vec<&LeaveRecord> = records
        .iter()
        .filter(|record| in_scope.contains(record.user_id.as_str()))
        .collect();

    let kpis: Vec<f64> = people
        .iter()
        .map(|person| kpi_scores.get(&person.id).copied().unwrap_or(0) as f64)
        .collect();

    let total_days: i64 = records.iter().map(|record| record.days()).sum();
    let avg_leave_days = round1(total_days as f64 / headcount.max(1) as f64);
    let engagement_proxy = (100.0 - avg_leave_days * ENGAGEMENT_POINTS_PER_LEAVE_DAY)
        .round()
        .clamp(ENGAGEMENT_PROXY_MIN, ENGAGEMENT_PROXY_MAX) as i64;

    let starts: Vec<NaiveDate> = people.iter().filter_map(start_day).collect();
    let tenures: Vec<f64> = starts.iter().map(|start| months_between(*start, as_of)).collect();
    let hire_tenures: Vec<f64> = starts
        .iter()
        .filter(|start| scope.contains(**start))
        .map(|start| months_between(*start, as_of))
        .collect();
    let new_hires = hire_tenures.len();

    let monthly_payroll: f64 = people.iter().filter_map(|person| person.salary).sum();
    let avg_salary = if headcount == 0 {
        0.0
    } else {
        (monthly_payroll / headcount as f64).round()
    };
    let paid_leave_days: i64 = records
        .iter()
        .filter(|record| COSTED_LEAVE_TYPES.contains(&record.leave_type))
        .map(|record| record.days())
        .sum();

    WorkforceOverview {
        headcount,
        avg_kpi_score: rounded_mean(&kpis).unwrap_or(0),
        avg_leave_days,
        engagement_proxy,
        avg_tenure_months: rounded_mean(&tenures).unwrap_or(0),
        new_hires,
        hiring_rate: if headcount == 0 {
            0
        } else {
            (new_hires as f64 / headcount as f64 * 100.0).round() as i64
        },
        avg_new_hire_tenure_months: rounded_mean(&hire_tenures),
        monthly_payroll,
        avg_salary,
        paid_leave_days,
        paid_leave_cost: (paid_leave_days as f64 * avg_salary / WORKING_DAYS_PER_MONTH).round(),
    }
}

fn gender_label(person: &Employee) -> String {
    person
        .gender
        .clone()
        .filter(|gender| !gender.trim().is_empty())
        .unwrap_or_else(|| UNSPECIFIED_GENDER.to_string())
}

pub struct LeaveService {
    db: DbPool,
}

impl LeaveService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn add_leave(&self, input: LeaveInput) -> AppResult<LeaveRecord> {
        if input.user_id.trim().is_empty() {
            return Err(AppError::validation("leave requires a user id"));
        }
        if input.end_date < input.start_date {
            return Err(AppError::validation_with_details(
                "leave end date precedes its start date",
                serde_json::json!({
                    "startDate": input.start_date,
                    "endDate": input.end_date,
                }),
            ));
        }

        let record = LeaveRecord {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            leave_type: input.leave_type,
            start_date: input.start_date,
            end_date: input.end_date,
            status: input.status.unwrap_or(LeaveStatus::Pending),
            reason: input.reason.unwrap_or_default().trim().to_string(),
        };

        self.db
            .with_connection(|conn| LeaveRepository::insert(conn, &record))?;

        info!(
            target: "app::leave",
            user_id = %record.user_id,
            leave_type = %record.leave_type,
            days = record.days(),
            "leave recorded"
        );

        Ok(record)
    }

    pub fn set_status(&self, leave_id: &str, status: LeaveStatus) -> AppResult<LeaveRecord> {
        self.db.with_transaction(|tx| {
            LeaveRepository::update_status(tx, leave_id, status)?;
            LeaveRepository::find_by_id(tx, leave_id)
        })
    }

    pub fn set_allowance(&self, user_id: &str, leave_type: LeaveType, days: f64) -> AppResult<()> {
        if !days.is_finite() || days < 0.0 {
            return Err(AppError::validation("allowance must be a non-negative number of days"));
        }
        self.db
            .with_connection(|conn| LeaveRepository::set_allowance(conn, user_id, leave_type, days))
    }

    /// Leave records of the scoped people, restricted to the scope's date range.
    pub fn get_leaves(&self, scope: &LeaveScope) -> AppResult<Vec<LeaveRecord>> {
        let (_, records) = self.scoped(scope)?;
        Ok(records)
    }

    /// Allocation and consumption per allowance type. Rejected leave does not count.
    pub fn leave_balances(&self, user_id: &str) -> AppResult<Vec<LeaveBalance>> {
        let (stored, records) = self.db.with_connection(|conn| {
            Ok((
                LeaveRepository::allowances_for(conn, user_id)?,
                LeaveRepository::list_for_user(conn, user_id)?,
            ))
        })?;

        let mut used: BTreeMap<LeaveType, i64> = BTreeMap::new();
        for record in records.iter().filter(|r| r.status != LeaveStatus::Rejected) {
            *used.entry(record.leave_type).or_default() += record.days();
        }

        Ok(effective_allowances(&stored)
            .into_iter()
            .map(|(leave_type, allocated)| {
                let used = used.get(&leave_type).copied().unwrap_or(0);
                LeaveBalance {
                    leave_type,
                    allocated,
                    used,
                    remaining: allocated - used as f64,
                }
            })
            .collect())
    }

    pub fn leave_aggregate(&self, scope: &LeaveScope) -> AppResult<LeaveAggregate> {
        let (people, records) = self.scoped(scope)?;
        let allowances = self.db.with_connection(|conn| {
            let mut by_user: HashMap<String, BTreeMap<LeaveType, f64>> = HashMap::new();
            for (user_id, leave_type, days) in LeaveRepository::list_allowances(conn)? {
                by_user.entry(user_id).or_default().insert(leave_type, days);
            }
            Ok(by_user)
        })?;

        let aggregate = compute_leave_aggregate(&people, &records, &allowances);
        debug!(
            target: "app::leave",
            headcount = aggregate.headcount,
            total_days = aggregate.total_days,
            "leave aggregate computed"
        );
        Ok(aggregate)
    }

    pub fn workforce_overview(
        &self,
        scope: &LeaveScope,
        as_of: NaiveDate,
    ) -> AppResult<WorkforceOverview> {
        let (people, records) = self.scoped(scope)?;

        let mut kpis_by_user: HashMap<String, Vec<KpiRecord>> = HashMap::new();
        for kpi in self.db.with_connection(KpiRepository::list_all)? {
            kpis_by_user.entry(kpi.user_id.clone()).or_default().push(kpi);
        }
        let kpi_scores: HashMap<String, i64> = kpis_by_user
            .into_iter()
            .map(|(user_id, kpis)| (user_id, compute_kpi_aggregate(&kpis).score))
            .collect();

        let overview = compute_workforce_overview(&people, &records, &kpi_scores, scope, as_of);
        debug!(
            target: "app::leave",
            headcount = overview.headcount,
            new_hires = overview.new_hires,
            paid_leave_days = overview.paid_leave_days,
            "workforce overview computed"
        );
        Ok(overview)
    }

    /// Approved leave covering `day`, optionally for one department.
    pub fn employees_on_leave(
        &self,
        department: Option<&str>,
        day: Option<NaiveDate>,
    ) -> AppResult<Vec<(Employee, LeaveRecord)>> {
        let day = day.unwrap_or_else(|| Utc::now().date_naive());
        let filter = CohortFilter {
            department: department.map(str::to_string),
            ..CohortFilter::default()
        };

        let (people, records) = self.db.with_connection(|conn| {
            Ok((EmployeeRepository::list(conn)?, LeaveRepository::list_all(conn)?))
        })?;
        let people: HashMap<String, Employee> = people
            .into_iter()
            .filter(|person| filter.matches(person))
            .map(|person| (person.id.clone(), person))
            .collect();

        Ok(records
            .into_iter()
            .filter(|record| record.status == LeaveStatus::Approved && record.covers(day))
            .filter_map(|record| {
                people
                    .get(&record.user_id)
                    .map(|person| (person.clone(), record))
            })
            .collect())
    }

    fn scoped(&self, scope: &LeaveScope) -> AppResult<(Vec<Employee>, Vec<LeaveRecord>)> {
        let (people, records) = self.db.with_connection(|conn| {
            Ok((EmployeeRepository::list(conn)?, LeaveRepository::list_all(conn)?))
        })?;

        let people: Vec<Employee> = people
            .into_iter()
            .filter(|person| scope.cohort.matches(person))
            .collect();
        let ids: std::collections::HashSet<&str> =
            people.iter().map(|person| person.id.as_str()).collect();
        let records = records
            .into_iter()
            .filter(|record| ids.contains(record.user_id.as_str()) && scope.in_range(record))
            .collect();

        Ok((people, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn person(id: &str, department: &str, gender: Option<&str>) -> Employee {
        Employee {
            id: id.into(),
            name: id.into(),
            email: format!("{id}@lumion.test"),
            department: department.into(),
            role: None,
            location: "HQ".into(),
            gender: gender.map(str::to_string),
            manager_id: None,
            start_date: None,
            salary: None,
        }
    }

    fn leave(user_id: &str, kind: LeaveType, start: &str, end: &str) -> LeaveRecord {
        LeaveRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            leave_type: kind,
            start_date: date(start),
            end_date: date(end),
            status: LeaveStatus::Approved,
            reason: String::new(),
        }
    }

    #[test]
    fn empty_scope_is_fully_compliant() {
        let aggregate = compute_leave_aggregate(&[], &[], &HashMap::new());
        assert_eq!(aggregate.compliance_rate, 100);
        assert_eq!(aggregate.total_days, 0);
        assert_eq!(aggregate.avg_days_per_employee, 0.0);
    }

    #[test]
    fn aggregate_rolls_up_days() {
        let people = vec![
            person("a", "Sales", Some("Female")),
            person("b", "Sales", None),
            person("c", "Engineering", Some("Male")),
        ];
        // 2025-03-02 is a Sunday.
        let records = vec![
            leave("a", LeaveType::Sick, "2025-03-02", "2025-03-04"),
            leave("b", LeaveType::Absent, "2025-03-03", "2025-03-03"),
            leave("c", LeaveType::Annual, "2025-04-07", "2025-04-11"),
            leave("ghost", LeaveType::Annual, "2025-04-07", "2025-04-11"),
        ];

        let aggregate = compute_leave_aggregate(&people, &records, &HashMap::new());

        assert_eq!(aggregate.total_days, 9);
        assert_eq!(aggregate.totals_by_type.get(&LeaveType::Sick), Some(&3));
        assert_eq!(aggregate.compliance_rate, 89);
        assert_eq!(aggregate.by_weekday[0], 3);
        assert_eq!(aggregate.by_weekday[1], 6);
        assert_eq!(aggregate.avg_by_department.get("Sales"), Some(&2.0));
        assert_eq!(aggregate.avg_by_department.get("Engineering"), Some(&5.0));
        assert_eq!(aggregate.avg_by_gender.get("Others"), Some(&1.0));
        assert_eq!(aggregate.trend_by_month["2025-03"][&LeaveType::Absent], 1);
        assert_eq!(aggregate.avg_annual_allowance, 20.0);
        assert_eq!(aggregate.headcount, 3);
    }

    fn hired(id: &str, start: Option<&str>, salary: Option<f64>) -> Employee {
        Employee {
            start_date: start.map(str::to_string),
            salary,
            ..person(id, "Sales", None)
        }
    }

    #[test]
    fn overview_blends_kpis_tenure_hiring_and_cost() {
        let people = vec![
            hired("a", Some("2024-01-01"), Some(200_000.0)),
            hired("b", Some("2025-01-01T09:00:00Z"), Some(240_000.0)),
            hired("c", None, None),
        ];
        let records = vec![
            leave("a", LeaveType::Sick, "2025-03-03", "2025-03-05"),
            leave("b", LeaveType::Casual, "2025-04-01", "2025-04-02"),
            leave("c", LeaveType::Annual, "2025-05-05", "2025-05-08"),
            leave("ghost", LeaveType::Sick, "2025-05-05", "2025-05-30"),
        ];
        let scores = HashMap::from([("a".to_string(), 80), ("b".to_string(), 90)]);
        let scope = LeaveScope {
            from: Some(date("2025-01-01")),
            to: Some(date("2025-12-31")),
            ..LeaveScope::default()
        };

        let overview =
            compute_workforce_overview(&people, &records, &scores, &scope, date("2025-07-01"));

        assert_eq!(overview.headcount, 3);
        assert_eq!(overview.avg_kpi_score, 57);
        assert_eq!(overview.avg_leave_days, 3.0);
        assert_eq!(overview.engagement_proxy, 85);
        assert_eq!(overview.avg_tenure_months, 12);
        assert_eq!(overview.new_hires, 1);
        assert_eq!(overview.hiring_rate, 33);
        assert_eq!(overview.avg_new_hire_tenure_months, Some(6));
        assert_eq!(overview.monthly_payroll, 440_000.0);
        assert_eq!(overview.avg_salary, 146_667.0);
        assert_eq!(overview.paid_leave_days, 5);
        assert_eq!(overview.paid_leave_cost, 33_333.0);
    }

    #[test]
    fn empty_overview_is_all_zero() {
        let overview = compute_workforce_overview(
            &[],
            &[],
            &HashMap::new(),
            &LeaveScope::default(),
            date("2025-07-01"),
        );
        assert_eq!(overview.headcount, 0);
        assert_eq!(overview.hiring_rate, 0);
        assert_eq!(overview.engagement_proxy, 95);
        assert_eq!(overview.avg_new_hire_tenure_months, None);
        assert_eq!(overview.paid_leave_cost, 0.0);
    }

    #[test]
    fn heavy_leave_floors_engagement_proxy() {
        let people = vec![hired("a", Some("2026-01-01"), None)];
        let records = vec![leave("a", LeaveType::Unpaid, "2025-03-03", "2025-03-14")];
        let overview = compute_workforce_overview(
            &people,
            &records,
            &HashMap::new(),
            &LeaveScope::default(),
            date("2025-07-01"),
        );
        assert_eq!(overview.engagement_proxy, 50);
        assert_eq!(overview.avg_tenure_months, 0);
        assert_eq!(overview.paid_leave_days, 0);
    }

    #[test]
    fn balances_fill_defaults_and_skip_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let pool = DbPool::new(temp_dir.path().join("leave.sqlite")).unwrap();
        let service = LeaveService::new(pool.clone());

        service.set_allowance("u1", LeaveType::Annual, 25.0).unwrap();
        let approved = service
            .add_leave(LeaveInput {
                user_id: "u1".into(),
                leave_type: LeaveType::Annual,
                start_date: date("2025-06-02"),
                end_date: date("2025-06-06"),
                status: Some(LeaveStatus::Approved),
                reason: None,
            })
            .unwrap();
        let rejected = service
            .add_leave(LeaveInput {
                user_id: "u1".into(),
                leave_type: LeaveType::Sick,
                start_date: date("2025-06-09"),
                end_date: date("2025-06-09"),
                status: None,
                reason: Some("flu".into()),
            })
            .unwrap();
        service.set_status(&rejected.id, LeaveStatus::Rejected).unwrap();

        let balances = service.leave_balances("u1").unwrap();
        let annual = balances.iter().find(|b| b.leave_type == LeaveType::Annual).unwrap();
        assert_eq!(annual.allocated, 25.0);
        assert_eq!(annual.used, approved.days());
        assert_eq!(annual.remaining, 20.0);
        let sick = balances.iter().find(|b| b.leave_type == LeaveType::Sick).unwrap();
        assert_eq!(sick.used, 0);
        assert_eq!(sick.allocated, 3.0);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let pool = DbPool::new(temp_dir.path().join("leave.sqlite")).unwrap();
        let service = LeaveService::new(pool);

        let err = service
            .add_leave(LeaveInput {
                user_id: "u1".into(),
                leave_type: LeaveType::Casual,
                start_date: date("2025-06-09"),
                end_date: date("2025-06-02"),
                status: None,
                reason: None,
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
