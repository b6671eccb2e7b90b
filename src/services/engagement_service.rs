use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::check_in_repository::CheckInRepository;
use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::notification_repository::NotificationRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::checkin::{CheckIn, CheckInInput, CheckInWindow};
use crate::models::employee::{CohortFilter, Employee};
use crate::models::engagement::{
    CohortEngagement, DailyPulseAverage, DepartmentEngagement, EngagementIndex, PulseAlert,
    PulseTrend, WeeklyTrendPoint, WorkloadNudge,
};
use crate::services::settings_service::SettingsService;

pub const WORKLOAD_NUDGE_KEY: &str = "highWorkloadStreak";
pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

const MOOD_WEIGHT: f64 = 0.5;
const STRESS_WEIGHT: f64 = 0.3;
const WORKLOAD_WEIGHT: f64 = 0.2;
const HIGH_WORKLOAD: u8 = 4;
const STREAK_LOOKBACK_DAYS: i64 = 7;
const NUDGE_SNOOZE_DAYS: i64 = 7;
const FORECAST_WINDOW: usize = 7;

/// Wellbeing score of one check-in on a 0..=100 scale.
pub fn check_in_score(check_in: &CheckIn) -> f64 {
    let mood_pct = (check_in.mood + 2.0) / 4.0;
    let stress_pct = 1.0 - (f64::from(check_in.stress) - 1.0) / 4.0;
    let workload_pct = 1.0 - (f64::from(check_in.workload) - 1.0) / 4.0;

    100.0 * (MOOD_WEIGHT * mood_pct + STRESS_WEIGHT * stress_pct + WORKLOAD_WEIGHT * workload_pct)
}

/// Rounded mean score, or `None` when there is nothing to average.
pub fn compute_engagement_index(check_ins: &[CheckIn]) -> Option<i64> {
    if check_ins.is_empty() {
        return None;
    }

    let total: f64 = check_ins.iter().map(check_in_score).sum();
    Some((total / check_ins.len() as f64).round() as i64)
}

/// Cohort index: every member counts once regardless of how often they checked in.
pub fn mean_of_indices(indices: &[i64]) -> Option<i64> {
    if indices.is_empty() {
        return None;
    }

    let total: i64 = indices.iter().sum();
    Some((total as f64 / indices.len() as f64).round() as i64)
}

/// Pearson correlation over the common tail of both series; 0 when undefined.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }

    let xs = &xs[xs.len() - n..];
    let ys = &ys[ys.len() - n..];
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let numerator: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let spread_x: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum::<f64>().sqrt();
    let spread_y: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum::<f64>().sqrt();
    let denominator = spread_x * spread_y;

    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }

    (numerator / denominator).clamp(-1.0, 1.0)
}

/// Trailing simple moving average; early points average what is available.
pub fn simple_moving_average(series: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let segment = &series[start..=i];
            segment.iter().sum::<f64>() / segment.len() as f64
        })
        .collect()
}

/// Consecutive high-workload days ending at `today`, looking back at most a week.
/// A missing check-in for `today` itself does not break the streak.
pub fn workload_streak(by_date: &HashMap<NaiveDate, u8>, today: NaiveDate, target: u32) -> u32 {
    let mut streak = 0;

    for offset in 0..STREAK_LOOKBACK_DAYS {
        let day = today - Duration::days(offset);
        match by_date.get(&day) {
            Some(workload) if *workload >= HIGH_WORKLOAD => streak += 1,
            None if offset == 0 => continue,
            _ => break,
        }

        if streak >= target {
            break;
        }
    }

    streak
}

pub struct EngagementService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl EngagementService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    /// Stores the check-in for `(user, date)`, replacing an earlier one for the same day.
    pub fn upsert_check_in(&self, input: CheckInInput, today: NaiveDate) -> AppResult<CheckIn> {
        if input.user_id.trim().is_empty() {
            return Err(AppError::validation("check-in requires a user id"));
        }

        let policy = self.settings.get()?;
        let check_in = input.into_check_in(
            Uuid::new_v4().to_string(),
            &policy.check_in_defaults,
            today,
        );

        let stored = self
            .db
            .with_connection(|conn| CheckInRepository::upsert(conn, &check_in))?;

        info!(
            target: "app::pulse",
            user_id = %stored.user_id,
            date = %stored.date,
            "check-in saved"
        );

        Ok(stored)
    }

    pub fn get_check_ins(
        &self,
        user_id: &str,
        window: CheckInWindow,
        as_of: NaiveDate,
    ) -> AppResult<Vec<CheckIn>> {
        let (start, end) = window.bounds(as_of);
        self.db.with_connection(|conn| {
            CheckInRepository::list_for_user_between(conn, user_id, start, end)
        })
    }

    pub fn find_check_in(&self, user_id: &str, date: NaiveDate) -> AppResult<Option<CheckIn>> {
        self.db
            .with_connection(|conn| CheckInRepository::find(conn, user_id, date))
    }

    pub fn user_index(
        &self,
        user_id: &str,
        days: Option<u32>,
        as_of: NaiveDate,
    ) -> AppResult<Option<EngagementIndex>> {
        let days = self.window_days(days)?;
        let check_ins = self.get_check_ins(user_id, CheckInWindow::last_days(days), as_of)?;

        Ok(compute_engagement_index(&check_ins).map(|index| EngagementIndex {
            index,
            count: check_ins.len(),
        }))
    }

    pub fn cohort_index(
        &self,
        filter: &CohortFilter,
        days: Option<u32>,
        as_of: NaiveDate,
    ) -> AppResult<Option<CohortEngagement>> {
        let days = self.window_days(days)?;
        let (grouped, _) = self.grouped_window(filter, days, as_of)?;

        let indices: Vec<i64> = grouped
            .values()
            .filter_map(|check_ins| compute_engagement_index(check_ins))
            .collect();
        let count = grouped.values().map(Vec::len).sum();

        Ok(mean_of_indices(&indices).map(|index| CohortEngagement {
            index,
            count,
            respondents: indices.len(),
        }))
    }

    pub fn org_index(&self, days: Option<u32>, as_of: NaiveDate) -> AppResult<Option<CohortEngagement>> {
        self.cohort_index(&CohortFilter::all(), days, as_of)
    }

    /// Per-department index, highest first.
    pub fn department_breakdown(
        &self,
        days: Option<u32>,
        as_of: NaiveDate,
    ) -> AppResult<Vec<DepartmentEngagement>> {
        let days = self.window_days(days)?;
        let (grouped, employees) = self.grouped_window(&CohortFilter::all(), days, as_of)?;

        let mut by_department: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        for (user_id, check_ins) in &grouped {
            let Some(index) = compute_engagement_index(check_ins) else {
                continue;
            };
            let department = employees
                .get(user_id)
                .map(|employee| employee.department.clone())
                .unwrap_or_else(|| UNASSIGNED_DEPARTMENT.to_string());
            by_department.entry(department).or_default().push(index);
        }

        let mut rows: Vec<DepartmentEngagement> = by_department
            .into_iter()
            .filter_map(|(department, indices)| {
                mean_of_indices(&indices).map(|index| DepartmentEngagement {
                    department,
                    index,
                    respondents: indices.len(),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.index.cmp(&a.index).then_with(|| a.department.cmp(&b.department)));

        Ok(rows)
    }

    /// Oldest week first; the last bucket ends at `as_of`.
    pub fn weekly_trend(&self, weeks: u32, as_of: NaiveDate) -> AppResult<Vec<WeeklyTrendPoint>> {
        let weeks = weeks.max(1);
        let earliest = as_of - Duration::days(i64::from(weeks) * 7 - 1);
        let check_ins = self
            .db
            .with_connection(|conn| CheckInRepository::list_between(conn, earliest, as_of))?;

        let points = (0..weeks)
            .rev()
            .map(|week| {
                let week_end = as_of - Duration::days(i64::from(week) * 7);
                let week_start = week_end - Duration::days(6);

                let mut per_user: HashMap<&str, Vec<CheckIn>> = HashMap::new();
                for check_in in check_ins
                    .iter()
                    .filter(|c| c.date >= week_start && c.date <= week_end)
                {
                    per_user
                        .entry(check_in.user_id.as_str())
                        .or_default()
                        .push(check_in.clone());
                }

                let indices: Vec<i64> = per_user
                    .values()
                    .filter_map(|list| compute_engagement_index(list))
                    .collect();

                WeeklyTrendPoint {
                    week_start,
                    week_end,
                    index: mean_of_indices(&indices),
                }
            })
            .collect();

        Ok(points)
    }

    /// Check-ins crossing any alert threshold, newest first.
    pub fn threshold_alerts(&self, limit: usize) -> AppResult<Vec<PulseAlert>> {
        let policy = self.settings.get()?;

        let (check_ins, employees) = self.db.with_connection(|conn| {
            Ok((
                CheckInRepository::list_all(conn)?,
                EmployeeRepository::list(conn)?,
            ))
        })?;
        let employees: HashMap<String, Employee> = employees
            .into_iter()
            .map(|employee| (employee.id.clone(), employee))
            .collect();

        let alerts = check_ins
            .into_iter()
            .rev()
            .filter(|c| {
                c.mood <= policy.pulse_alert_mood
                    || c.stress >= policy.pulse_alert_stress
                    || c.workload >= policy.pulse_alert_workload
            })
            .take(limit)
            .map(|check_in| {
                let employee = employees.get(&check_in.user_id);
                PulseAlert {
                    employee_name: employee.map(|e| e.name.clone()),
                    department: employee.map(|e| e.department.clone()),
                    check_in,
                }
            })
            .collect();

        Ok(alerts)
    }

    pub fn pulse_trend(&self, days: Option<u32>, as_of: NaiveDate) -> AppResult<PulseTrend> {
        let days = self.window_days(days)?;
        let (start, end) = CheckInWindow::last_days(days).bounds(as_of);
        let check_ins = self
            .db
            .with_connection(|conn| CheckInRepository::list_between(conn, start, end))?;

        let mut by_date: BTreeMap<NaiveDate, Vec<&CheckIn>> = BTreeMap::new();
        for check_in in &check_ins {
            by_date.entry(check_in.date).or_default().push(check_in);
        }

        let daily: Vec<DailyPulseAverage> = by_date
            .into_iter()
            .map(|(date, list)| {
                let n = list.len() as f64;
                DailyPulseAverage {
                    date,
                    mood: list.iter().map(|c| c.mood).sum::<f64>() / n,
                    stress: list.iter().map(|c| f64::from(c.stress)).sum::<f64>() / n,
                    workload: list.iter().map(|c| f64::from(c.workload)).sum::<f64>() / n,
                    count: list.len(),
                }
            })
            .collect();

        let moods: Vec<f64> = daily.iter().map(|d| d.mood).collect();
        let stresses: Vec<f64> = daily.iter().map(|d| d.stress).collect();
        let workloads: Vec<f64> = daily.iter().map(|d| d.workload).collect();
        let mood_sma = simple_moving_average(&moods, FORECAST_WINDOW);
        let mood_forecast = mood_sma.last().copied().unwrap_or(0.0);

        Ok(PulseTrend {
            mood_stress_correlation: pearson(&moods, &stresses),
            mood_workload_correlation: pearson(&moods, &workloads),
            days: daily,
            mood_sma,
            mood_forecast,
        })
    }

    pub fn workload_streak_nudge(&self, user_id: &str, today: NaiveDate) -> AppResult<WorkloadNudge> {
        let policy = self.settings.get()?;
        let since = today - Duration::days(STREAK_LOOKBACK_DAYS - 1);

        let (check_ins, dismissed_until) = self.db.with_connection(|conn| {
            Ok((
                CheckInRepository::list_for_user_between(conn, user_id, since, today)?,
                NotificationRepository::nudge_dismissed_until(conn, user_id, WORKLOAD_NUDGE_KEY)?,
            ))
        })?;

        let by_date: HashMap<NaiveDate, u8> =
            check_ins.iter().map(|c| (c.date, c.workload)).collect();
        let streak = workload_streak(&by_date, today, policy.workload_streak_days);
        let dismissed = dismissed_until.map_or(false, |until| today <= until);
        let due = streak >= policy.workload_streak_days && !dismissed;

        debug!(target: "app::pulse", user_id, streak, due, dismissed, "workload streak evaluated");

        Ok(WorkloadNudge {
            user_id: user_id.to_string(),
            streak,
            due,
            dismissed,
        })
    }

    /// Snoozes the workload nudge; defaults to one week from `today`.
    pub fn dismiss_workload_nudge(
        &self,
        user_id: &str,
        today: NaiveDate,
        until: Option<NaiveDate>,
    ) -> AppResult<NaiveDate> {
        let until = until.unwrap_or(today + Duration::days(NUDGE_SNOOZE_DAYS));
        self.db.with_connection(|conn| {
            NotificationRepository::dismiss_nudge(conn, user_id, WORKLOAD_NUDGE_KEY, until)
        })?;
        Ok(until)
    }

    fn window_days(&self, days: Option<u32>) -> AppResult<u32> {
        match days {
            Some(days) => Ok(days.max(1)),
            None => Ok(self.settings.get()?.engagement_window_days),
        }
    }

    /// Window check-ins grouped per user, restricted to the cohort.
    fn grouped_window(
        &self,
        filter: &CohortFilter,
        days: u32,
        as_of: NaiveDate,
    ) -> AppResult<(BTreeMap<String, Vec<CheckIn>>, HashMap<String, Employee>)> {
        let (start, end) = CheckInWindow::last_days(days).bounds(as_of);
        let (check_ins, employees) = self.db.with_connection(|conn| {
            Ok((
                CheckInRepository::list_between(conn, start, end)?,
                EmployeeRepository::list(conn)?,
            ))
        })?;

        let employees: HashMap<String, Employee> = employees
            .into_iter()
            .map(|employee| (employee.id.clone(), employee))
            .collect();
        let unfiltered = *filter == CohortFilter::all();

        let mut grouped: BTreeMap<String, Vec<CheckIn>> = BTreeMap::new();
        for check_in in check_ins {
            let in_cohort = match employees.get(&check_in.user_id) {
                Some(employee) => filter.matches(employee),
                None => unfiltered,
            };
            if in_cohort {
                grouped.entry(check_in.user_id.clone()).or_default().push(check_in);
            }
        }

        Ok((grouped, employees))
    }
}
