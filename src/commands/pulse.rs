use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::commands::{run_blocking, AppState, CommandResult};
use crate::models::checkin::{CheckIn, CheckInInput, CheckInWindow};
use crate::models::engagement::{
    CohortEngagement, DepartmentEngagement, EngagementIndex, PulseAlert, PulseTrend,
    WeeklyTrendPoint, WorkloadNudge,
};

const DEFAULT_ALERT_LIMIT: usize = 20;
const DEFAULT_TREND_WEEKS: u32 = 8;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn pulse_submit_check_in(
    state: &AppState,
    payload: CheckInInput,
) -> CommandResult<CheckIn> {
    let app_state = state.clone();
    let stored = run_blocking(move || app_state.engagement().upsert_check_in(payload, today())).await?;
    state.mirror("check_ins", &stored);
    Ok(stored)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInQuery {
    pub user_id: String,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl CheckInQuery {
    fn window(&self, default_days: u32) -> CheckInWindow {
        match (self.start, self.end) {
            (Some(start), Some(end)) => CheckInWindow::Range { start, end },
            _ => CheckInWindow::last_days(self.days.unwrap_or(default_days)),
        }
    }
}

pub async fn pulse_check_ins(state: &AppState, query: CheckInQuery) -> CommandResult<Vec<CheckIn>> {
    let app_state = state.clone();
    run_blocking(move || {
        let default_days = app_state.settings().get()?.engagement_window_days;
        app_state
            .engagement()
            .get_check_ins(&query.user_id, query.window(default_days), today())
    })
    .await
}

pub async fn pulse_user_index(
    state: &AppState,
    user_id: String,
    days: Option<u32>,
) -> CommandResult<Option<EngagementIndex>> {
    let app_state = state.clone();
    run_blocking(move || app_state.engagement().user_index(&user_id, days, today())).await
}

pub async fn pulse_org_index(
    state: &AppState,
    days: Option<u32>,
) -> CommandResult<Option<CohortEngagement>> {
    let app_state = state.clone();
    run_blocking(move || app_state.engagement().org_index(days, today())).await
}

pub async fn pulse_department_breakdown(
    state: &AppState,
    days: Option<u32>,
) -> CommandResult<Vec<DepartmentEngagement>> {
    let app_state = state.clone();
    run_blocking(move || app_state.engagement().department_breakdown(days, today())).await
}

pub async fn pulse_weekly_trend(
    state: &AppState,
    weeks: Option<u32>,
) -> CommandResult<Vec<WeeklyTrendPoint>> {
    let app_state = state.clone();
    let weeks = weeks.unwrap_or(DEFAULT_TREND_WEEKS);
    run_blocking(move || app_state.engagement().weekly_trend(weeks, today())).await
}

pub async fn pulse_alerts(state: &AppState, limit: Option<usize>) -> CommandResult<Vec<PulseAlert>> {
    let app_state = state.clone();
    let limit = limit.unwrap_or(DEFAULT_ALERT_LIMIT);
    run_blocking(move || app_state.engagement().threshold_alerts(limit)).await
}

pub async fn pulse_trend(state: &AppState, days: Option<u32>) -> CommandResult<PulseTrend> {
    let app_state = state.clone();
    run_blocking(move || app_state.engagement().pulse_trend(days, today())).await
}

pub async fn pulse_workload_nudge(state: &AppState, user_id: String) -> CommandResult<WorkloadNudge> {
    let app_state = state.clone();
    run_blocking(move || app_state.engagement().workload_streak_nudge(&user_id, today())).await
}

pub async fn pulse_dismiss_workload_nudge(
    state: &AppState,
    user_id: String,
    until: Option<NaiveDate>,
) -> CommandResult<NaiveDate> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .engagement()
            .dismiss_workload_nudge(&user_id, today(), until)
    })
    .await
}
