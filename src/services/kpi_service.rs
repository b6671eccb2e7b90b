use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::kpi_repository::KpiRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::kpi::{
    KpiAggregate, KpiInput, KpiRecord, KpiTemplate, TemplateScope, FALLBACK_TEMPLATE_DEPARTMENT,
};
use crate::models::Provisioned;

const MAX_ACHIEVEMENT_PCT: f64 = 120.0;
const EXPECTED_WEIGHT_SUM: f64 = 100.0;
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
const DEFAULT_KRA: &str = "General";

/// Percent of target reached, capped at 120; 0 when the target is not positive.
pub fn achievement_pct(actual: f64, target: f64) -> f64 {
    if target <= 0.0 || !target.is_finite() {
        return 0.0;
    }
    (actual / target * 100.0).clamp(0.0, MAX_ACHIEVEMENT_PCT)
}

/// True when the weights add up to 100, allowing for decimal noise such as 33.3/33.3/33.4.
pub fn weights_total_hundred(weight_sum: f64) -> bool {
    (weight_sum - EXPECTED_WEIGHT_SUM).abs() <= WEIGHT_SUM_TOLERANCE
}

/// Weight-normalised achievement. Weights need not sum to 100.
pub fn compute_kpi_aggregate(kpis: &[KpiRecord]) -> KpiAggregate {
    let weight_sum: f64 = kpis.iter().map(|kpi| kpi.weight).sum();
    if kpis.is_empty() || weight_sum == 0.0 {
        return KpiAggregate {
            score: 0,
            weight_sum,
            count: kpis.len(),
        };
    }

    let weighted: f64 = kpis
        .iter()
        .map(|kpi| achievement_pct(kpi.actual, kpi.target) * kpi.weight / weight_sum)
        .sum();

    KpiAggregate {
        score: weighted.round() as i64,
        weight_sum,
        count: kpis.len(),
    }
}

pub struct KpiService {
    db: DbPool,
}

impl KpiService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Role templates win over department templates; unknown departments fall back to Admin.
    pub fn templates(&self, department: &str, role: Option<&str>) -> AppResult<Vec<KpiTemplate>> {
        self.db.with_connection(|conn| {
            if let Some(role) = role.filter(|role| !role.trim().is_empty()) {
                let by_role = KpiRepository::templates_for(conn, TemplateScope::Role, role)?;
                if !by_role.is_empty() {
                    return Ok(by_role);
                }
            }

            let by_department =
                KpiRepository::templates_for(conn, TemplateScope::Department, department)?;
            if !by_department.is_empty() {
                return Ok(by_department);
            }

            KpiRepository::templates_for(conn, TemplateScope::Department, FALLBACK_TEMPLATE_DEPARTMENT)
        })
    }

    pub fn list_kpis(&self, user_id: &str) -> AppResult<Vec<KpiRecord>> {
        self.db
            .with_connection(|conn| KpiRepository::list_for_user(conn, user_id))
    }

    /// Instantiates the matching template set when the user has no KPIs yet.
    pub fn ensure_user_kpis(&self, user_id: &str) -> AppResult<Provisioned<Vec<KpiRecord>>> {
        let existing = self.list_kpis(user_id)?;
        if !existing.is_empty() {
            return Ok(Provisioned::Existing(existing));
        }

        let employee = self
            .db
            .with_connection(|conn| EmployeeRepository::find_by_id(conn, user_id))?
            .ok_or_else(AppError::not_found)?;
        let templates = self.templates(&employee.department, employee.role.as_deref())?;

        let kpis: Vec<KpiRecord> = templates
            .into_iter()
            .map(|template| KpiRecord {
                id: format!("kpi-{}", template.key),
                user_id: user_id.to_string(),
                key: template.key,
                title: template.title,
                unit: template.unit,
                weight: template.weight,
                target: template.target,
                actual: 0.0,
                kra: Some(template.kra.unwrap_or_else(|| DEFAULT_KRA.to_string())),
            })
            .collect();

        self.db.with_transaction(|tx| {
            for kpi in &kpis {
                KpiRepository::upsert(tx, kpi)?;
            }
            Ok(())
        })?;

        info!(
            target: "app::performance",
            user_id,
            department = %employee.department,
            count = kpis.len(),
            "kpis provisioned from template"
        );

        Ok(Provisioned::Created(kpis))
    }

    pub fn upsert_kpi(&self, user_id: &str, input: KpiInput) -> AppResult<KpiRecord> {
        let key = input.key.trim();
        if key.is_empty() {
            return Err(AppError::validation("kpi key is required"));
        }
        if input.title.trim().is_empty() {
            return Err(AppError::validation("kpi title is required"));
        }
        if !input.weight.is_finite() || input.weight < 0.0 {
            return Err(AppError::validation("kpi weight must be a non-negative number"));
        }
        if !input.target.is_finite() || !input.actual.is_finite() {
            return Err(AppError::validation("kpi target and actual must be numbers"));
        }

        let kpi = KpiRecord {
            id: input
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: user_id.to_string(),
            key: key.to_string(),
            title: input.title.trim().to_string(),
            unit: input.unit.unwrap_or_default(),
            weight: input.weight,
            target: input.target,
            actual: input.actual,
            kra: input.kra.filter(|kra| !kra.trim().is_empty()),
        };

        let kpis = self.db.with_transaction(|tx| {
            KpiRepository::upsert(tx, &kpi)?;
            KpiRepository::list_for_user(tx, user_id)
        })?;

        let aggregate = compute_kpi_aggregate(&kpis);
        if !weights_total_hundred(aggregate.weight_sum) {
            warn!(
                target: "app::performance",
                user_id,
                weight_sum = aggregate.weight_sum,
                "kpi weights do not sum to 100"
            );
        }
        debug!(target: "app::performance", user_id, kpi_id = %kpi.id, "kpi saved");

        Ok(kpi)
    }

    pub fn delete_kpi(&self, user_id: &str, kpi_id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| KpiRepository::delete(conn, user_id, kpi_id))
    }

    pub fn aggregate(&self, user_id: &str) -> AppResult<KpiAggregate> {
        Ok(compute_kpi_aggregate(&self.list_kpis(user_id)?))
    }
}
