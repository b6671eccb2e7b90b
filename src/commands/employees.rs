use crate::commands::{run_blocking, AppState, CommandResult};
use crate::models::employee::{CohortFilter, Employee, EmployeeInput};

pub async fn employees_upsert(state: &AppState, payload: EmployeeInput) -> CommandResult<Employee> {
    let app_state = state.clone();
    let stored = run_blocking(move || app_state.employees().upsert(payload)).await?;
    state.mirror("employees", &stored);
    Ok(stored)
}

pub async fn employees_get(state: &AppState, id: String) -> CommandResult<Employee> {
    let app_state = state.clone();
    run_blocking(move || app_state.employees().find(&id)).await
}

pub async fn employees_list(
    state: &AppState,
    filter: Option<CohortFilter>,
) -> CommandResult<Vec<Employee>> {
    let app_state = state.clone();
    let filter = filter.unwrap_or_default();
    run_blocking(move || app_state.employees().list(&filter)).await
}

pub async fn employees_directs(state: &AppState, manager_id: String) -> CommandResult<Vec<Employee>> {
    let app_state = state.clone();
    run_blocking(move || app_state.employees().directs_of(&manager_id)).await
}

pub async fn employees_remove(state: &AppState, id: String) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || app_state.employees().remove(&id)).await
}
