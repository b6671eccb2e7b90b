use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use tracing::{debug, error, info};

use crate::db::repositories::check_in_repository::CheckInRepository;
use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::checkin::{CheckIn, MOOD_MAX, MOOD_MIN};
use crate::models::employee::Employee;
use crate::services::settings_service::SettingsService;

pub const DEMO_DEPARTMENTS: [&str; 6] = [
    "Engineering",
    "Sales",
    "Marketing",
    "HR",
    "Finance",
    "Operations",
];
pub const DEMO_HEADCOUNT: usize = 30;
pub const DEFAULT_SEED_DAYS: u32 = 60;
const DEMO_BASE_SALARY: f64 = 160_000.0;
const DEMO_SALARY_STEP: f64 = 15_000.0;
const MIN_BATCH: usize = 10;
const BATCH_SHARE: f64 = 0.4;

const DEMO_NOTES: [&str; 8] = [
    "good progress",
    "blocked on task",
    "tight deadline",
    "need support",
    "smooth release",
    "delayed by vendor",
    "customer escalation",
    "code review win",
];

fn to_scale(value: f64) -> u8 {
    value.round().clamp(1.0, 5.0) as u8
}

/// One synthetic check-in; `phase` keeps each person's mood drifting smoothly.
fn synthetic_check_in<R: Rng>(rng: &mut R, user_id: &str, date: NaiveDate, phase: f64) -> CheckIn {
    let base_mood = 0.2 * phase.sin() - 0.1 * (phase / 1.4).cos();
    let mood = (base_mood + rng.gen_range(-0.3..0.3)).clamp(MOOD_MIN, MOOD_MAX);
    let stress_bias = if mood < 0.0 { 0.3 } else { -0.1 };
    let stress = to_scale(3.0 + rng.gen_range(-0.6..0.6) + stress_bias);
    let workload = to_scale(3.0 + rng.gen_range(-0.75..0.75));
    let note = if rng.gen_bool(0.25) {
        DEMO_NOTES[rng.gen_range(0..DEMO_NOTES.len())].to_string()
    } else {
        String::new()
    };

    CheckIn {
        id: format!("demo-{user_id}-{date}"),
        user_id: user_id.to_string(),
        date,
        mood: (mood * 100.0).round() / 100.0,
        stress,
        workload,
        note,
    }
}

fn demo_employee(index: usize) -> Employee {
    Employee {
        id: format!("u-demo-{index}"),
        name: format!("Demo User {index}"),
        email: format!("demo{index}@lumion.com"),
        department: DEMO_DEPARTMENTS[index % DEMO_DEPARTMENTS.len()].to_string(),
        role: None,
        location: "HQ".to_string(),
        gender: None,
        manager_id: None,
        start_date: None,
        salary: Some(DEMO_BASE_SALARY + (index % 8) as f64 * DEMO_SALARY_STEP),
    }
}

/// Number of people refreshed per tick.
pub fn batch_size(headcount: usize) -> usize {
    MIN_BATCH.max((headcount as f64 * BATCH_SHARE).floor() as usize)
}

/// Synthetic pulse stream over its own store; the live store is never written.
pub struct DemoPulseGenerator {
    db: DbPool,
    settings: Arc<SettingsService>,
    running: Arc<AtomicBool>,
}

impl DemoPulseGenerator {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self {
            db,
            settings,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.db
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Populates the demo directory when empty and backfills `days` of check-ins.
    pub fn seed(&self, days: u32, today: NaiveDate) -> AppResult<usize> {
        let written = self.db.with_transaction(|tx| {
            if EmployeeRepository::count(tx)? == 0 {
                for index in 0..DEMO_HEADCOUNT {
                    EmployeeRepository::upsert(tx, &demo_employee(index))?;
                }
            }

            let employees = EmployeeRepository::list(tx)?;
            let mut rng = rand::thread_rng();
            let mut written = 0;
            for offset in (0..=i64::from(days)).rev() {
                let date = today - Duration::days(offset);
                for (index, employee) in employees.iter().enumerate() {
                    let phase = index as f64 + offset as f64 / 7.0;
                    let check_in = synthetic_check_in(&mut rng, &employee.id, date, phase);
                    CheckInRepository::upsert(tx, &check_in)?;
                    written += 1;
                }
            }
            Ok(written)
        })?;

        info!(target: "app::demo", days, written, "demo store seeded");
        Ok(written)
    }

    /// Refreshes today's check-in for a batch of people and trims old data.
    pub fn tick(&self, today: NaiveDate) -> AppResult<usize> {
        let retention = self.settings.get()?.demo_retention_days;
        let cutoff = today - Duration::days(i64::from(retention));
        let salt = Utc::now().timestamp_millis() as f64 / 60_000.0;

        let (written, trimmed) = self.db.with_transaction(|tx| {
            let employees = EmployeeRepository::list(tx)?;
            if employees.is_empty() {
                return Ok((0, 0));
            }

            let mut rng = rand::thread_rng();
            let batch = batch_size(employees.len());
            for i in 0..batch {
                let employee = &employees[i % employees.len()];
                let phase = salt + i as f64 * 0.5;
                let check_in = synthetic_check_in(&mut rng, &employee.id, today, phase);
                CheckInRepository::upsert(tx, &check_in)?;
            }

            let trimmed = CheckInRepository::delete_before(tx, cutoff)?;
            Ok((batch, trimmed))
        })?;

        debug!(target: "app::demo", written, trimmed, "demo tick");
        Ok(written)
    }

    /// Starts the background stream; calling it while running does nothing.
    pub fn start(self: &Arc<Self>, interval: StdDuration) -> AppResult<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let runner = Arc::clone(self);
        if let Err(err) = thread::Builder::new()
            .name("demo-pulse-generator".to_string())
            .spawn(move || runner.run_loop(interval))
        {
            self.running.store(false, Ordering::SeqCst);
            error!(target: "app::demo", error = %err, "failed to start demo generator thread");
            return Err(AppError::other(format!("cannot start demo generator: {err}")));
        }

        info!(target: "app::demo", interval_ms = interval.as_millis() as u64, "demo stream started");
        Ok(())
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!(target: "app::demo", "demo stream stopped");
        }
    }

    fn run_loop(&self, interval: StdDuration) {
        while self.running.load(Ordering::SeqCst) {
            thread::sleep(interval);
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.tick(Utc::now().date_naive()) {
                error!(target: "app::demo", error = %err, "demo tick failed");
            }
        }
    }
}
