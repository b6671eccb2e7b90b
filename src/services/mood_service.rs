use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::mood_repository::MoodRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::mood::{
    BurnoutAlert, BurnoutRisk, DailyDelta, Mood, MoodAverage, MoodEntry, MoodEntryInput,
    MoodSession,
};
use crate::services::settings_service::SettingsService;

const INTENSITY_MIN: i64 = 1;
const INTENSITY_MAX: i64 = 5;
const STRESS_SHARE: f64 = 60.0;
const DELTA_SHARE: f64 = 40.0;
pub const DEFAULT_HEATMAP_DAYS: u32 = 7;

/// Evening minus morning intensity for each day that has both sessions.
/// A later entry for the same session replaces an earlier one.
pub fn daily_deltas(entries: &[MoodEntry]) -> Vec<DailyDelta> {
    let mut by_day: BTreeMap<NaiveDate, (Option<u8>, Option<u8>)> = BTreeMap::new();

    let mut ordered: Vec<&MoodEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.timestamp);

    for entry in ordered {
        let slot = by_day.entry(entry.day()).or_default();
        match entry.session {
            MoodSession::Morning => slot.0 = Some(entry.intensity),
            MoodSession::Evening => slot.1 = Some(entry.intensity),
        }
    }

    by_day
        .into_iter()
        .filter_map(|(date, sessions)| match sessions {
            (Some(morning), Some(evening)) => Some(DailyDelta {
                date,
                morning,
                evening,
                delta: i32::from(evening) - i32::from(morning),
            }),
            _ => None,
        })
        .collect()
}

/// Risk from stress-like intensity (60%) and the share of days whose mood dropped (40%).
pub fn compute_burnout_risk(entries: &[MoodEntry]) -> BurnoutRisk {
    let stress_like: Vec<u8> = entries
        .iter()
        .filter(|entry| entry.mood.is_stress_like())
        .map(|entry| entry.intensity)
        .collect();
    let avg_stress_intensity = if stress_like.is_empty() {
        0.0
    } else {
        stress_like.iter().map(|v| f64::from(*v)).sum::<f64>() / stress_like.len() as f64
    };

    let deltas = daily_deltas(entries);
    let neg_days = deltas.iter().filter(|delta| delta.delta < 0).count();
    let days = deltas.len();

    let raw = (avg_stress_intensity / 5.0) * STRESS_SHARE
        + (neg_days as f64 / days.max(1) as f64) * DELTA_SHARE;

    BurnoutRisk {
        score: raw.round().min(100.0) as u8,
        avg_stress_intensity,
        neg_days,
        days,
    }
}

fn mean_intensity_by_mood<'a, I>(entries: I) -> BTreeMap<Mood, (f64, usize)>
where
    I: IntoIterator<Item = &'a MoodEntry>,
{
    let mut sums: BTreeMap<Mood, (f64, usize)> =
        Mood::ALL.iter().map(|mood| (*mood, (0.0, 0))).collect();
    for entry in entries {
        let slot = sums.entry(entry.mood).or_insert((0.0, 0));
        slot.0 += f64::from(entry.intensity);
        slot.1 += 1;
    }
    sums
}

fn to_averages(department: Option<&str>, sums: BTreeMap<Mood, (f64, usize)>) -> Vec<MoodAverage> {
    Mood::ALL
        .iter()
        .map(|mood| {
            let (sum, count) = sums.get(mood).copied().unwrap_or((0.0, 0));
            MoodAverage {
                department: department.map(str::to_string),
                mood: *mood,
                average_intensity: if count == 0 { 0.0 } else { sum / count as f64 },
                count,
            }
        })
        .collect()
}

pub struct MoodService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl MoodService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    pub fn record_mood(&self, input: MoodEntryInput, now: DateTime<Utc>) -> AppResult<MoodEntry> {
        if input.employee_id.trim().is_empty() {
            return Err(AppError::validation("mood entry requires an employee id"));
        }
        if !(INTENSITY_MIN..=INTENSITY_MAX).contains(&input.intensity) {
            return Err(AppError::validation_with_details(
                "intensity must be between 1 and 5",
                serde_json::json!({ "intensity": input.intensity }),
            ));
        }

        let timestamp = input.timestamp.unwrap_or(now);
        let entry = MoodEntry {
            id: Uuid::new_v4().to_string(),
            employee_id: input.employee_id,
            session: input
                .session
                .unwrap_or_else(|| MoodSession::for_hour(timestamp.hour())),
            mood: input.mood,
            intensity: input.intensity as u8,
            notes: input.notes.unwrap_or_default().trim().to_string(),
            timestamp,
        };

        self.db
            .with_connection(|conn| MoodRepository::insert(conn, &entry))?;

        info!(
            target: "app::mood",
            employee_id = %entry.employee_id,
            session = %entry.session,
            mood = %entry.mood,
            "mood recorded"
        );

        Ok(entry)
    }

    /// Entries newer than `days` before `now`, oldest first.
    pub fn get_mood_entries(
        &self,
        employee_id: Option<&str>,
        days: u32,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<MoodEntry>> {
        let since = now - Duration::days(i64::from(days));
        self.db.with_connection(|conn| match employee_id {
            Some(employee_id) => MoodRepository::list_for_employee_since(conn, employee_id, since),
            None => MoodRepository::list_since(conn, since),
        })
    }

    pub fn burnout_risk(&self, employee_id: &str, now: DateTime<Utc>) -> AppResult<BurnoutRisk> {
        let window = self.settings.get()?.burnout_window_days;
        let entries = self.get_mood_entries(Some(employee_id), window, now)?;
        Ok(compute_burnout_risk(&entries))
    }

    /// Employees at or above the alert threshold, highest risk first.
    pub fn burnout_alerts(&self, now: DateTime<Utc>) -> AppResult<Vec<BurnoutAlert>> {
        let policy = self.settings.get()?;
        let mut alerts = self.risks_at_or_above(policy.burnout_alert_threshold, now)?;
        alerts.truncate(policy.burnout_alert_limit);
        Ok(alerts)
    }

    pub fn burnout_insights(&self, now: DateTime<Utc>) -> AppResult<Vec<BurnoutAlert>> {
        let threshold = self.settings.get()?.burnout_insight_threshold;
        self.risks_at_or_above(threshold, now)
    }

    /// Mean intensity per mood for every department, across all entries.
    pub fn department_mood_averages(&self) -> AppResult<Vec<MoodAverage>> {
        let (employees, entries) = self.db.with_connection(|conn| {
            Ok((EmployeeRepository::list(conn)?, MoodRepository::list_all(conn)?))
        })?;

        let department_of: HashMap<&str, &str> = employees
            .iter()
            .map(|employee| (employee.id.as_str(), employee.department.as_str()))
            .collect();

        let mut by_department: BTreeMap<&str, Vec<&MoodEntry>> = employees
            .iter()
            .map(|employee| (employee.department.as_str(), Vec::new()))
            .collect();
        for entry in &entries {
            if let Some(department) = department_of.get(entry.employee_id.as_str()) {
                by_department.entry(*department).or_default().push(entry);
            }
        }

        Ok(by_department
            .into_iter()
            .flat_map(|(department, list)| {
                to_averages(Some(department), mean_intensity_by_mood(list))
            })
            .collect())
    }

    pub fn team_heatmap(&self, days: Option<u32>, now: DateTime<Utc>) -> AppResult<Vec<MoodAverage>> {
        let entries = self.get_mood_entries(None, days.unwrap_or(DEFAULT_HEATMAP_DAYS), now)?;
        Ok(to_averages(None, mean_intensity_by_mood(&entries)))
    }

    fn risks_at_or_above(&self, threshold: u8, now: DateTime<Utc>) -> AppResult<Vec<BurnoutAlert>> {
        let policy = self.settings.get()?;
        let since = now - Duration::days(i64::from(policy.burnout_window_days));

        let (employees, entries) = self.db.with_connection(|conn| {
            Ok((EmployeeRepository::list(conn)?, MoodRepository::list_since(conn, since)?))
        })?;

        let mut by_employee: HashMap<&str, Vec<MoodEntry>> = HashMap::new();
        for entry in &entries {
            by_employee
                .entry(entry.employee_id.as_str())
                .or_default()
                .push(entry.clone());
        }

        let mut alerts: Vec<BurnoutAlert> = employees
            .iter()
            .filter_map(|employee| {
                let list = by_employee.get(employee.id.as_str())?;
                let risk = compute_burnout_risk(list);
                (risk.score >= threshold).then(|| BurnoutAlert {
                    employee_id: employee.id.clone(),
                    name: employee.name.clone(),
                    department: employee.department.clone(),
                    risk,
                })
            })
            .collect();
        alerts.sort_by(|a, b| {
            b.risk
                .score
                .cmp(&a.risk.score)
                .then_with(|| a.name.cmp(&b.name))
        });

        debug!(target: "app::mood", threshold, matched = alerts.len(), "burnout risks evaluated");
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::employee::Employee;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn entry(day: u32, session: MoodSession, mood: Mood, intensity: u8) -> MoodEntry {
        let hour = match session {
            MoodSession::Morning => 9,
            MoodSession::Evening => 18,
        };
        MoodEntry {
            id: Uuid::new_v4().to_string(),
            employee_id: "e1".into(),
            session,
            mood,
            intensity,
            notes: String::new(),
            timestamp: at(day, hour),
        }
    }

    fn setup_service() -> (MoodService, DbPool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = DbPool::new(temp_dir.path().join("mood.sqlite")).unwrap();
        let settings = Arc::new(SettingsService::new(pool.clone()));
        (MoodService::new(pool.clone(), settings), pool, temp_dir)
    }

    #[test]
    fn deltas_need_both_sessions() {
        let entries = vec![
            entry(1, MoodSession::Morning, Mood::Calm, 4),
            entry(1, MoodSession::Evening, Mood::Tired, 2),
            entry(2, MoodSession::Morning, Mood::Joy, 3),
        ];
        let deltas = daily_deltas(&entries);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].delta, -2);
    }

    #[test]
    fn burnout_score_matches_reference_scenario() {
        let mut entries = Vec::new();
        let deltas = [-1, -2, -1, 1, 0];
        for (i, delta) in deltas.iter().enumerate() {
            let day = i as u32 + 1;
            entries.push(entry(day, MoodSession::Morning, Mood::Stressed, 4));
            entries.push(entry(day, MoodSession::Evening, Mood::Calm, (4 + delta) as u8));
        }

        let risk = compute_burnout_risk(&entries);
        assert_eq!(risk.avg_stress_intensity, 4.0);
        assert_eq!(risk.neg_days, 3);
        assert_eq!(risk.days, 5);
        assert_eq!(risk.score, 72);
    }

    fn week(dropping_days: u32, stress_intensity: u8) -> Vec<MoodEntry> {
        let mut entries = Vec::new();
        for day in 1..=4 {
            if day <= dropping_days {
                entries.push(entry(day, MoodSession::Morning, Mood::Joy, 5));
                entries.push(entry(day, MoodSession::Evening, Mood::Calm, 4));
            } else {
                entries.push(entry(day, MoodSession::Morning, Mood::Calm, 2));
                entries.push(entry(day, MoodSession::Evening, Mood::Calm, 3));
            }
        }
        // Morning-only days add stress readings without adding deltas.
        entries.push(entry(10, MoodSession::Morning, Mood::Stressed, stress_intensity));
        entries.push(entry(11, MoodSession::Morning, Mood::Anxious, stress_intensity));
        entries
    }

    #[test]
    fn burnout_never_falls_as_stress_intensity_rises() {
        let scores: Vec<u8> = (1..=5)
            .map(|intensity| {
                let risk = compute_burnout_risk(&week(2, intensity));
                assert_eq!((risk.neg_days, risk.days), (2, 4));
                assert_eq!(risk.avg_stress_intensity, f64::from(intensity));
                risk.score
            })
            .collect();

        assert!(scores.windows(2).all(|pair| pair[0] <= pair[1]), "{scores:?}");
        assert!(scores[4] > scores[0]);
    }

    #[test]
    fn burnout_never_falls_as_more_days_drop() {
        let scores: Vec<u8> = (0..=4)
            .map(|dropping| {
                let risk = compute_burnout_risk(&week(dropping, 3));
                assert_eq!(risk.avg_stress_intensity, 3.0);
                assert_eq!(risk.neg_days, dropping as usize);
                risk.score
            })
            .collect();

        assert!(scores.windows(2).all(|pair| pair[0] <= pair[1]), "{scores:?}");
        assert_eq!(scores, vec![36, 46, 56, 66, 76]);
    }

    #[test]
    fn empty_history_scores_zero() {
        let risk = compute_burnout_risk(&[]);
        assert_eq!(risk.score, 0);
        assert_eq!(risk.days, 0);
    }

    #[test]
    fn intensity_outside_scale_is_rejected() {
        let (service, _pool, _guard) = setup_service();
        let err = service
            .record_mood(
                MoodEntryInput {
                    employee_id: "e1".into(),
                    session: None,
                    mood: Mood::Joy,
                    intensity: 6,
                    notes: None,
                    timestamp: None,
                },
                at(3, 10),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn session_is_derived_from_hour() {
        let (service, _pool, _guard) = setup_service();
        let recorded = service
            .record_mood(
                MoodEntryInput {
                    employee_id: "e1".into(),
                    session: None,
                    mood: Mood::Focused,
                    intensity: 3,
                    notes: Some(" fine ".into()),
                    timestamp: None,
                },
                at(3, 20),
            )
            .unwrap();
        assert_eq!(recorded.session, MoodSession::Evening);
        assert_eq!(recorded.notes, "fine");
    }

    #[test]
    fn alerts_rank_high_risk_employees() {
        let (service, pool, _guard) = setup_service();
        pool.with_connection(|conn| {
            for (id, name) in [("e1", "Ada"), ("e2", "Bola")] {
                EmployeeRepository::upsert(
                    conn,
                    &Employee {
                        id: id.into(),
                        name: name.into(),
                        email: format!("{id}@lumion.test"),
                        department: "Engineering".into(),
                        role: None,
                        location: "HQ".into(),
                        gender: None,
                        manager_id: None,
                        start_date: None,
                        salary: None,
                    },
                )?;
            }
            for day in 1..=3 {
                let mut morning = entry(day, MoodSession::Morning, Mood::Anxious, 5);
                let mut evening = entry(day, MoodSession::Evening, Mood::Stressed, 4);
                morning.employee_id = "e1".into();
                evening.employee_id = "e1".into();
                MoodRepository::insert(conn, &morning)?;
                MoodRepository::insert(conn, &evening)?;

                let mut calm = entry(day, MoodSession::Morning, Mood::Joy, 4);
                calm.employee_id = "e2".into();
                MoodRepository::insert(conn, &calm)?;
            }
            Ok(())
        })
        .unwrap();

        let alerts = service.burnout_alerts(at(4, 12)).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].employee_id, "e1");
        assert_eq!(alerts[0].risk.score, 94);

        let heatmap = service.team_heatmap(None, at(4, 12)).unwrap();
        let joy = heatmap.iter().find(|avg| avg.mood == Mood::Joy).unwrap();
        assert_eq!(joy.count, 3);
        assert_eq!(joy.average_intensity, 4.0);

        let departments = service.department_mood_averages().unwrap();
        assert_eq!(departments.len(), Mood::ALL.len());
    }
}
