use chrono::Utc;
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::appraisal_repository::AppraisalRepository;
use crate::db::repositories::format_timestamp;
use crate::db::repositories::kpi_repository::KpiRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::appraisal::{
    Appraisal, AppraisalStatus, AppraisalSummary, ManagerReview, ManagerReviewUpdate,
    PeerFeedback, Ratings, SelfReview, SelfReviewUpdate,
};
use crate::models::Provisioned;
use crate::services::kpi_service::compute_kpi_aggregate;

const KPI_WEIGHT: f64 = 0.6;
const SELF_WEIGHT: f64 = 0.2;
const MANAGER_WEIGHT: f64 = 0.2;
const RATING_MIN: f64 = 1.0;
const RATING_MAX: f64 = 5.0;

static PERIOD_PATTERN: OnceCell<Regex> = OnceCell::new();

fn period_pattern() -> AppResult<&'static Regex> {
    PERIOD_PATTERN.get_or_try_init(|| {
        Regex::new(r"^(Q[1-4]|H[12])-\d{4}$|^\d{4}(-\d{2})?$")
            .map_err(|err| AppError::other(format!("invalid period pattern: {err}")))
    })
}

/// Accepts `Q1-2025`, `H2-2025`, `2025` and `2025-03`.
pub fn validate_period(period: &str) -> AppResult<()> {
    if period_pattern()?.is_match(period.trim()) {
        Ok(())
    } else {
        Err(AppError::validation(format!("invalid appraisal period: {period}")))
    }
}

/// Mean rating as a percentage of the 5-point scale; 0 when there are no ratings.
pub fn rating_score(ratings: &Ratings) -> i64 {
    if ratings.is_empty() {
        return 0;
    }
    let mean = ratings.values().sum::<f64>() / ratings.len() as f64;
    (mean / RATING_MAX * 100.0).round() as i64
}

pub fn compute_summary(kpi_score: i64, self_ratings: &Ratings, manager_ratings: &Ratings) -> AppraisalSummary {
    let self_score = rating_score(self_ratings);
    let manager_score = rating_score(manager_ratings);
    let overall = KPI_WEIGHT * kpi_score as f64
        + SELF_WEIGHT * self_score as f64
        + MANAGER_WEIGHT * manager_score as f64;

    AppraisalSummary {
        kpi_score,
        self_score,
        manager_score,
        overall: overall.round() as i64,
    }
}

fn ensure_ratings(ratings: &Ratings) -> AppResult<()> {
    let invalid: Vec<&String> = ratings
        .iter()
        .filter(|(_, value)| !value.is_finite() || **value < RATING_MIN || **value > RATING_MAX)
        .map(|(key, _)| key)
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation_with_details(
            "ratings must be between 1 and 5",
            serde_json::json!({ "keys": invalid }),
        ))
    }
}

pub struct AppraisalService {
    db: DbPool,
}

impl AppraisalService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn find(&self, user_id: &str, period: &str) -> AppResult<Option<Appraisal>> {
        self.db
            .with_connection(|conn| AppraisalRepository::find(conn, user_id, period))
    }

    pub fn get_or_start(&self, user_id: &str, period: &str) -> AppResult<Provisioned<Appraisal>> {
        validate_period(period)?;

        self.db.with_transaction(|tx| {
            if let Some(existing) = AppraisalRepository::find(tx, user_id, period)? {
                return Ok(Provisioned::Existing(existing));
            }

            let now = format_timestamp(Utc::now());
            let appraisal = Appraisal {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                period: period.to_string(),
                status: AppraisalStatus::InProgress,
                self_review: SelfReview::default(),
                manager: ManagerReview::default(),
                peers: Vec::new(),
                summary: None,
                created_at: now.clone(),
                updated_at: now,
            };
            AppraisalRepository::insert(tx, &appraisal)?;

            info!(target: "app::performance", user_id, period, "appraisal started");
            Ok(Provisioned::Created(appraisal))
        })
    }

    pub fn update_self_review(
        &self,
        user_id: &str,
        period: &str,
        update: SelfReviewUpdate,
    ) -> AppResult<Appraisal> {
        ensure_ratings(&update.ratings)?;

        self.mutate(user_id, period, |appraisal| {
            appraisal.self_review.ratings.extend(update.ratings);
            if let Some(comments) = update.comments {
                appraisal.self_review.comments = comments;
            }
        })
    }

    pub fn update_manager_review(
        &self,
        user_id: &str,
        period: &str,
        update: ManagerReviewUpdate,
    ) -> AppResult<Appraisal> {
        ensure_ratings(&update.ratings)?;

        self.mutate(user_id, period, |appraisal| {
            appraisal.manager.ratings.extend(update.ratings);
            appraisal.manager.reviewer_id = update.reviewer_id;
            if let Some(comments) = update.comments {
                appraisal.manager.comments = comments;
            }
            if let Some(status) = update.status {
                appraisal.status = status;
            }
        })
    }

    pub fn add_peer_feedback(
        &self,
        user_id: &str,
        period: &str,
        feedback: PeerFeedback,
    ) -> AppResult<Appraisal> {
        if let Some(rating) = feedback.rating {
            if !(RATING_MIN..=RATING_MAX).contains(&rating) {
                return Err(AppError::validation("peer rating must be between 1 and 5"));
            }
        }

        self.mutate(user_id, period, |appraisal| appraisal.peers.push(feedback))
    }

    /// Inserts or replaces the peer entry with the same id.
    pub(crate) fn upsert_peer_feedback(
        &self,
        user_id: &str,
        period: &str,
        feedback: PeerFeedback,
    ) -> AppResult<Appraisal> {
        self.mutate(user_id, period, |appraisal| {
            match appraisal
                .peers
                .iter_mut()
                .find(|peer| peer.id.is_some() && peer.id == feedback.id)
            {
                Some(existing) => *existing = feedback,
                None => appraisal.peers.push(feedback),
            }
        })
    }

    pub fn finalize(&self, user_id: &str, period: &str) -> AppResult<Appraisal> {
        let appraisal = self.mutate(user_id, period, |appraisal| {
            appraisal.status = AppraisalStatus::Completed;
        })?;
        info!(target: "app::performance", user_id, period, "appraisal finalized");
        Ok(appraisal)
    }

    /// All of a user's appraisals, newest first.
    pub fn history(&self, user_id: &str) -> AppResult<Vec<Appraisal>> {
        self.db
            .with_connection(|conn| AppraisalRepository::list_for_user(conn, user_id))
    }

    /// Recomputes the summary from current KPIs and ratings and stores it.
    pub fn compute_and_save_summary(&self, user_id: &str, period: &str) -> AppResult<AppraisalSummary> {
        self.get_or_start(user_id, period)?;

        self.db.with_transaction(|tx| {
            let mut appraisal =
                AppraisalRepository::find(tx, user_id, period)?.ok_or_else(AppError::not_found)?;
            let kpis = KpiRepository::list_for_user(tx, user_id)?;
            let kpi_score = compute_kpi_aggregate(&kpis).score;

            let summary = compute_summary(
                kpi_score,
                &appraisal.self_review.ratings,
                &appraisal.manager.ratings,
            );
            appraisal.summary = Some(summary);
            appraisal.updated_at = format_timestamp(Utc::now());
            AppraisalRepository::update(tx, &appraisal)?;

            debug!(target: "app::performance", user_id, period, overall = summary.overall, "summary saved");
            Ok(summary)
        })
    }

    fn mutate<F>(&self, user_id: &str, period: &str, apply: F) -> AppResult<Appraisal>
    where
        F: FnOnce(&mut Appraisal),
    {
        self.get_or_start(user_id, period)?;

        self.db.with_transaction(|tx| {
            let mut appraisal =
                AppraisalRepository::find(tx, user_id, period)?.ok_or_else(AppError::not_found)?;
            apply(&mut appraisal);
            appraisal.updated_at = format_timestamp(Utc::now());
            AppraisalRepository::update(tx, &appraisal)?;
            Ok(appraisal)
        })
    }
}
