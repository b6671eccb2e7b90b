use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::commands::{run_blocking, AppState, CommandResult};
use crate::models::employee::Employee;
use crate::models::leave::{
    LeaveAggregate, LeaveBalance, LeaveInput, LeaveRecord, LeaveScope, LeaveStatus, LeaveType,
    WorkforceOverview,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnLeaveEntry {
    pub employee: Employee,
    pub leave: LeaveRecord,
}

pub async fn leave_add(state: &AppState, payload: LeaveInput) -> CommandResult<LeaveRecord> {
    let app_state = state.clone();
    let stored = run_blocking(move || app_state.leave().add_leave(payload)).await?;
    state.mirror("leaves", &stored);
    Ok(stored)
}

pub async fn leave_set_status(
    state: &AppState,
    leave_id: String,
    status: LeaveStatus,
) -> CommandResult<LeaveRecord> {
    let app_state = state.clone();
    let stored = run_blocking(move || app_state.leave().set_status(&leave_id, status)).await?;
    state.mirror("leaves", &stored);
    Ok(stored)
}

pub async fn leave_set_allowance(
    state: &AppState,
    user_id: String,
    leave_type: LeaveType,
    days: f64,
) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || app_state.leave().set_allowance(&user_id, leave_type, days)).await
}

pub async fn leave_list(state: &AppState, scope: Option<LeaveScope>) -> CommandResult<Vec<LeaveRecord>> {
    let app_state = state.clone();
    let scope = scope.unwrap_or_default();
    run_blocking(move || app_state.leave().get_leaves(&scope)).await
}

pub async fn leave_balances(state: &AppState, user_id: String) -> CommandResult<Vec<LeaveBalance>> {
    let app_state = state.clone();
    run_blocking(move || app_state.leave().leave_balances(&user_id)).await
}

pub async fn leave_aggregate(state: &AppState, scope: Option<LeaveScope>) -> CommandResult<LeaveAggregate> {
    let app_state = state.clone();
    let scope = scope.unwrap_or_default();
    run_blocking(move || app_state.leave().leave_aggregate(&scope)).await
}

/// Headline metrics for the dashboard; `as_of` defaults to today.
pub async fn leave_overview(
    state: &AppState,
    scope: Option<LeaveScope>,
    as_of: Option<NaiveDate>,
) -> CommandResult<WorkforceOverview> {
    let app_state = state.clone();
    let scope = scope.unwrap_or_default();
    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
    run_blocking(move || app_state.leave().workforce_overview(&scope, as_of)).await
}

pub async fn leave_who_is_out(
    state: &AppState,
    department: Option<String>,
    day: Option<NaiveDate>,
) -> CommandResult<Vec<OnLeaveEntry>> {
    let app_state = state.clone();
    let pairs = run_blocking(move || {
        app_state
            .leave()
            .employees_on_leave(department.as_deref(), day)
    })
    .await?;

    Ok(pairs
        .into_iter()
        .map(|(employee, leave)| OnLeaveEntry { employee, leave })
        .collect())
}
