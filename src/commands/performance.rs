use std::collections::BTreeMap;

use crate::commands::{run_blocking, AppState, CommandResult};
use crate::models::appraisal::{
    Appraisal, AppraisalSummary, ManagerReviewUpdate, PeerFeedback, SelfReviewUpdate,
};
use crate::models::bsc::{
    BscObjective, BscObjectiveInput, BscProgressUpdate, BscReview, ObjectiveRating,
    PerspectiveScores,
};
use crate::models::kpi::{KpiAggregate, KpiInput, KpiRecord, KpiTemplate};
use crate::models::Provisioned;

pub async fn kpi_templates(
    state: &AppState,
    department: String,
    role: Option<String>,
) -> CommandResult<Vec<KpiTemplate>> {
    let app_state = state.clone();
    run_blocking(move || app_state.kpis().templates(&department, role.as_deref())).await
}

pub async fn kpi_list(state: &AppState, user_id: String) -> CommandResult<Vec<KpiRecord>> {
    let app_state = state.clone();
    run_blocking(move || app_state.kpis().list_kpis(&user_id)).await
}

pub async fn kpi_ensure_defaults(
    state: &AppState,
    user_id: String,
) -> CommandResult<Provisioned<Vec<KpiRecord>>> {
    let app_state = state.clone();
    let provisioned = run_blocking(move || app_state.kpis().ensure_user_kpis(&user_id)).await?;
    if provisioned.was_created() {
        for kpi in provisioned.value() {
            state.mirror("kpis", kpi);
        }
    }
    Ok(provisioned)
}

pub async fn kpi_upsert(state: &AppState, user_id: String, payload: KpiInput) -> CommandResult<KpiRecord> {
    let app_state = state.clone();
    let stored = run_blocking(move || app_state.kpis().upsert_kpi(&user_id, payload)).await?;
    state.mirror("kpis", &stored);
    Ok(stored)
}

pub async fn kpi_delete(state: &AppState, user_id: String, kpi_id: String) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || app_state.kpis().delete_kpi(&user_id, &kpi_id)).await
}

pub async fn kpi_aggregate(state: &AppState, user_id: String) -> CommandResult<KpiAggregate> {
    let app_state = state.clone();
    run_blocking(move || app_state.kpis().aggregate(&user_id)).await
}

pub async fn appraisal_open(
    state: &AppState,
    user_id: String,
    period: String,
) -> CommandResult<Provisioned<Appraisal>> {
    let app_state = state.clone();
    run_blocking(move || app_state.appraisals().get_or_start(&user_id, &period)).await
}

pub async fn appraisal_update_self(
    state: &AppState,
    user_id: String,
    period: String,
    update: SelfReviewUpdate,
) -> CommandResult<Appraisal> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .appraisals()
            .update_self_review(&user_id, &period, update)
    })
    .await
}

pub async fn appraisal_update_manager(
    state: &AppState,
    user_id: String,
    period: String,
    update: ManagerReviewUpdate,
) -> CommandResult<Appraisal> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .appraisals()
            .update_manager_review(&user_id, &period, update)
    })
    .await
}

pub async fn appraisal_add_peer_feedback(
    state: &AppState,
    user_id: String,
    period: String,
    feedback: PeerFeedback,
) -> CommandResult<Appraisal> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .appraisals()
            .add_peer_feedback(&user_id, &period, feedback)
    })
    .await
}

pub async fn appraisal_finalize(
    state: &AppState,
    user_id: String,
    period: String,
) -> CommandResult<Appraisal> {
    let app_state = state.clone();
    let stored = run_blocking(move || app_state.appraisals().finalize(&user_id, &period)).await?;
    state.mirror("appraisals", &stored);
    Ok(stored)
}

pub async fn appraisal_history(state: &AppState, user_id: String) -> CommandResult<Vec<Appraisal>> {
    let app_state = state.clone();
    run_blocking(move || app_state.appraisals().history(&user_id)).await
}

pub async fn appraisal_compute_summary(
    state: &AppState,
    user_id: String,
    period: String,
) -> CommandResult<AppraisalSummary> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .appraisals()
            .compute_and_save_summary(&user_id, &period)
    })
    .await
}

pub async fn bsc_objectives(state: &AppState, user_id: Option<String>) -> CommandResult<Vec<BscObjective>> {
    let app_state = state.clone();
    run_blocking(move || match user_id {
        Some(user_id) => app_state.bsc().objectives_for(&user_id),
        None => app_state.bsc().all_objectives(),
    })
    .await
}

pub async fn bsc_seed_defaults(
    state: &AppState,
    user_id: String,
) -> CommandResult<Provisioned<Vec<BscObjective>>> {
    let app_state = state.clone();
    run_blocking(move || app_state.bsc().seed_defaults(&user_id)).await
}

pub async fn bsc_add_objective(
    state: &AppState,
    payload: BscObjectiveInput,
) -> CommandResult<BscObjective> {
    let app_state = state.clone();
    let stored = run_blocking(move || app_state.bsc().add_objective(payload)).await?;
    state.mirror("bsc_objectives", &stored);
    Ok(stored)
}

pub async fn bsc_update_progress(
    state: &AppState,
    objective_id: String,
    update: BscProgressUpdate,
) -> CommandResult<BscObjective> {
    let app_state = state.clone();
    let stored = run_blocking(move || app_state.bsc().update_progress(&objective_id, update)).await?;
    state.mirror("bsc_objectives", &stored);
    Ok(stored)
}

pub async fn bsc_delete_objective(state: &AppState, objective_id: String) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking(move || app_state.bsc().delete_objective(&objective_id)).await
}

pub async fn bsc_scores(state: &AppState, user_id: String) -> CommandResult<PerspectiveScores> {
    let app_state = state.clone();
    run_blocking(move || app_state.bsc().scores_for(&user_id)).await
}

pub async fn bsc_reviews(state: &AppState, subject_id: String) -> CommandResult<Vec<BscReview>> {
    let app_state = state.clone();
    run_blocking(move || app_state.bsc().reviews_for(&subject_id)).await
}

pub async fn bsc_submit_review(
    state: &AppState,
    cycle_id: String,
    subject_id: String,
    rater_id: String,
    ratings: BTreeMap<String, ObjectiveRating>,
) -> CommandResult<Vec<BscReview>> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .cycles()
            .submit_bsc_review(&cycle_id, &subject_id, &rater_id, ratings)
    })
    .await
}
