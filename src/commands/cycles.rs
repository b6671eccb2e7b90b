use crate::commands::{run_blocking, AppState, CommandResult};
use crate::models::cycle::{
    AppraisalCycle, CycleInput, CycleParticipant, FeedbackSubmission, ParticipantStatus, Reminder,
    ReviewerTask,
};
use crate::models::notification::{Notification, NotificationKind};

pub async fn cycles_create(state: &AppState, payload: CycleInput) -> CommandResult<AppraisalCycle> {
    let app_state = state.clone();
    let cycle = run_blocking(move || app_state.cycles().create_cycle(payload)).await?;
    state.mirror("cycles", &cycle);
    Ok(cycle)
}

pub async fn cycles_list(state: &AppState, user_id: Option<String>) -> CommandResult<Vec<AppraisalCycle>> {
    let app_state = state.clone();
    run_blocking(move || match user_id {
        Some(user_id) => app_state.cycles().cycles_for_user(&user_id),
        None => app_state.cycles().list(),
    })
    .await
}

pub async fn cycles_get(state: &AppState, cycle_id: String) -> CommandResult<AppraisalCycle> {
    let app_state = state.clone();
    run_blocking(move || app_state.cycles().find(&cycle_id)).await
}

pub async fn cycles_participants(
    state: &AppState,
    cycle_id: String,
) -> CommandResult<Vec<CycleParticipant>> {
    let app_state = state.clone();
    run_blocking(move || app_state.cycles().participants(&cycle_id)).await
}

pub async fn cycles_assign_participants(
    state: &AppState,
    cycle_id: String,
    user_ids: Vec<String>,
) -> CommandResult<AppraisalCycle> {
    let app_state = state.clone();
    run_blocking(move || app_state.cycles().assign_participants(&cycle_id, user_ids)).await
}

pub async fn cycles_assign_default_raters(
    state: &AppState,
    cycle_id: String,
) -> CommandResult<AppraisalCycle> {
    let app_state = state.clone();
    run_blocking(move || app_state.cycles().assign_default_raters(&cycle_id)).await
}

pub async fn cycles_update_status(
    state: &AppState,
    cycle_id: String,
    user_id: String,
    status: ParticipantStatus,
) -> CommandResult<AppraisalCycle> {
    let app_state = state.clone();
    let cycle = run_blocking(move || {
        app_state
            .cycles()
            .update_participant_status(&cycle_id, &user_id, status)
    })
    .await?;
    state.mirror("cycles", &cycle);
    Ok(cycle)
}

pub async fn cycles_send_reminder(
    state: &AppState,
    cycle_id: String,
    user_id: String,
) -> CommandResult<Reminder> {
    let app_state = state.clone();
    run_blocking(move || app_state.cycles().send_reminder(&cycle_id, &user_id)).await
}

pub async fn cycles_reviewer_tasks(state: &AppState, user_id: String) -> CommandResult<Vec<ReviewerTask>> {
    let app_state = state.clone();
    run_blocking(move || app_state.cycles().reviewer_tasks(&user_id)).await
}

pub async fn cycles_submit_feedback(
    state: &AppState,
    submission: FeedbackSubmission,
) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || app_state.cycles().submit_feedback(submission)).await
}

pub async fn notifications_list(
    state: &AppState,
    user_id: Option<String>,
    kind: Option<NotificationKind>,
) -> CommandResult<Vec<Notification>> {
    let app_state = state.clone();
    run_blocking(move || app_state.cycles().notifications(user_id.as_deref(), kind)).await
}
