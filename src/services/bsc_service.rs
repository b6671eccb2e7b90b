use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::bsc_repository::BscRepository;
use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::format_timestamp;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::bsc::{
    BscObjective, BscObjectiveInput, BscProgressUpdate, BscReview, BscStatus, ObjectiveRating,
    Perspective, PerspectiveScores,
};
use crate::models::employee::DEFAULT_DEPARTMENT;
use crate::models::Provisioned;

const MAX_OBJECTIVE_PCT: f64 = 120.0;
const DEFAULT_RATER_ROLE: &str = "subject";

struct ObjectiveSeed {
    perspective: Perspective,
    objective: &'static str,
    kpis: [&'static str; 2],
    target: f64,
    actual: f64,
    status: BscStatus,
    initiative: &'static str,
    theme: &'static str,
}

const DEFAULT_OBJECTIVES: [ObjectiveSeed; 4] = [
    ObjectiveSeed {
        perspective: Perspective::Financial,
        objective: "Improve revenue conversion",
        kpis: ["Win Rate", "Monthly Revenue"],
        target: 100.0,
        actual: 72.0,
        status: BscStatus::AtRisk,
        initiative: "Deal coaching",
        theme: "growth",
    },
    ObjectiveSeed {
        perspective: Perspective::Customer,
        objective: "Increase customer satisfaction",
        kpis: ["CSAT", "Response Time"],
        target: 5.0,
        actual: 4.0,
        status: BscStatus::OnTrack,
        initiative: "Support SLAs",
        theme: "quality",
    },
    ObjectiveSeed {
        perspective: Perspective::Process,
        objective: "Enhance deployment efficiency",
        kpis: ["Deployments", "MTTR"],
        target: 25.0,
        actual: 18.0,
        status: BscStatus::OnTrack,
        initiative: "CI/CD enhancements",
        theme: "efficiency",
    },
    ObjectiveSeed {
        perspective: Perspective::Learning,
        objective: "Upskill engineering team",
        kpis: ["Certifications", "Training Hours"],
        target: 40.0,
        actual: 22.0,
        status: BscStatus::OffTrack,
        initiative: "Quarterly workshops",
        theme: "innovation",
    },
];

/// Achievement of one objective, capped at 120; 0 when the target is not positive.
pub fn objective_pct(objective: &BscObjective) -> i64 {
    if objective.target <= 0.0 || !objective.target.is_finite() {
        return 0;
    }
    (objective.actual / objective.target * 100.0)
        .min(MAX_OBJECTIVE_PCT)
        .round() as i64
}

/// Mean objective achievement per perspective; perspectives without objectives score 0.
pub fn perspective_scores(objectives: &[BscObjective]) -> PerspectiveScores {
    let mut buckets: BTreeMap<&str, (Perspective, i64, usize)> = BTreeMap::new();
    for objective in objectives {
        let slot = buckets
            .entry(objective.perspective.as_str())
            .or_insert((objective.perspective, 0, 0));
        slot.1 += objective_pct(objective);
        slot.2 += 1;
    }

    let mut scores = PerspectiveScores::default();
    for (_, (perspective, sum, count)) in buckets {
        scores.set(perspective, (sum as f64 / count as f64).round() as i64);
    }
    scores
}

pub struct BscService {
    db: DbPool,
}

impl BscService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn objectives_for(&self, user_id: &str) -> AppResult<Vec<BscObjective>> {
        self.db
            .with_connection(|conn| BscRepository::list_objectives_for_user(conn, user_id))
    }

    pub fn all_objectives(&self) -> AppResult<Vec<BscObjective>> {
        self.db
            .with_connection(|conn| BscRepository::list_objectives(conn))
    }

    /// Installs the starter scorecard for a user who has none.
    pub fn seed_defaults(&self, user_id: &str) -> AppResult<Provisioned<Vec<BscObjective>>> {
        self.db.with_transaction(|tx| {
            let existing = BscRepository::list_objectives_for_user(tx, user_id)?;
            if !existing.is_empty() {
                return Ok(Provisioned::Existing(existing));
            }

            let department = EmployeeRepository::find_by_id(tx, user_id)?
                .map(|employee| employee.department)
                .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string());

            let objectives: Vec<BscObjective> = DEFAULT_OBJECTIVES
                .iter()
                .map(|seed| BscObjective {
                    id: format!("bsc-{}", Uuid::new_v4()),
                    user_id: user_id.to_string(),
                    department: department.clone(),
                    perspective: seed.perspective,
                    objective: seed.objective.to_string(),
                    kpis: seed.kpis.iter().map(|kpi| kpi.to_string()).collect(),
                    target: seed.target,
                    actual: seed.actual,
                    status: seed.status,
                    initiative: seed.initiative.to_string(),
                    theme: seed.theme.to_string(),
                })
                .collect();

            for objective in &objectives {
                BscRepository::upsert_objective(tx, objective)?;
            }

            info!(target: "app::performance", user_id, %department, "default scorecard seeded");
            Ok(Provisioned::Created(objectives))
        })
    }

    pub fn add_objective(&self, input: BscObjectiveInput) -> AppResult<BscObjective> {
        if input.objective.trim().is_empty() {
            return Err(AppError::validation("objective text is required"));
        }
        if !input.target.is_finite() || !input.actual.is_finite() {
            return Err(AppError::validation("objective target and actual must be numbers"));
        }

        self.db.with_transaction(|tx| {
            let department = match input.department.filter(|d| !d.trim().is_empty()) {
                Some(department) => department,
                None => EmployeeRepository::find_by_id(tx, &input.user_id)?
                    .map(|employee| employee.department)
                    .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
            };

            let objective = BscObjective {
                id: input
                    .id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("bsc-{}", Uuid::new_v4())),
                user_id: input.user_id,
                department,
                perspective: input.perspective,
                objective: input.objective.trim().to_string(),
                kpis: input.kpis,
                target: input.target,
                actual: input.actual,
                status: input.status.unwrap_or(BscStatus::NotStarted),
                initiative: input.initiative.unwrap_or_default(),
                theme: input.theme.unwrap_or_default(),
            };
            BscRepository::upsert_objective(tx, &objective)?;
            Ok(objective)
        })
    }

    pub fn update_progress(&self, objective_id: &str, update: BscProgressUpdate) -> AppResult<BscObjective> {
        self.db.with_transaction(|tx| {
            let mut objective = BscRepository::find_objective(tx, objective_id)?;
            if let Some(actual) = update.actual {
                objective.actual = actual;
            }
            if let Some(target) = update.target {
                objective.target = target;
            }
            if let Some(status) = update.status {
                objective.status = status;
            }
            if let Some(initiative) = update.initiative {
                objective.initiative = initiative;
            }
            BscRepository::upsert_objective(tx, &objective)?;

            debug!(target: "app::performance", objective_id, status = %objective.status, "objective progress updated");
            Ok(objective)
        })
    }

    pub fn delete_objective(&self, objective_id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| BscRepository::delete_objective(conn, objective_id))
    }

    pub fn scores_for(&self, user_id: &str) -> AppResult<PerspectiveScores> {
        Ok(perspective_scores(&self.objectives_for(user_id)?))
    }

    /// Stores one review row per rated objective.
    pub fn submit_review(
        &self,
        cycle_id: &str,
        subject_id: &str,
        rater_id: &str,
        period: &str,
        ratings_by_objective: BTreeMap<String, ObjectiveRating>,
    ) -> AppResult<Vec<BscReview>> {
        let ts = format_timestamp(Utc::now());

        self.db.with_transaction(|tx| {
            let mut stored = Vec::with_capacity(ratings_by_objective.len());
            for (objective_id, payload) in ratings_by_objective {
                let mut review = BscReview {
                    id: 0,
                    subject_id: subject_id.to_string(),
                    cycle_id: cycle_id.to_string(),
                    period: period.to_string(),
                    objective_id,
                    rater_id: rater_id.to_string(),
                    rater_role: payload
                        .role
                        .filter(|role| !role.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_RATER_ROLE.to_string()),
                    rating: payload.rating,
                    comment: payload.comment.unwrap_or_default(),
                    ts: ts.clone(),
                };
                review.id = BscRepository::insert_review(tx, &review)?;
                stored.push(review);
            }
            Ok(stored)
        })
    }

    pub fn reviews_for(&self, subject_id: &str) -> AppResult<Vec<BscReview>> {
        self.db
            .with_connection(|conn| BscRepository::list_reviews_for_subject(conn, subject_id))
    }
}
