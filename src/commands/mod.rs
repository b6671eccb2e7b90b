pub mod cycles;
pub mod demo;
pub mod employees;
pub mod leave;
pub mod mood;
pub mod performance;
pub mod pulse;
pub mod settings;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::appraisal_service::AppraisalService;
use crate::services::bsc_service::BscService;
use crate::services::cycle_service::CycleService;
use crate::services::demo_generator::DemoPulseGenerator;
use crate::services::employee_service::EmployeeService;
use crate::services::engagement_service::EngagementService;
use crate::services::kpi_service::KpiService;
use crate::services::leave_service::LeaveService;
use crate::services::mood_service::MoodService;
use crate::services::settings_service::SettingsService;
use crate::services::sync_service::SyncService;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    settings_service: Arc<SettingsService>,
    employee_service: Arc<EmployeeService>,
    engagement_service: Arc<EngagementService>,
    mood_service: Arc<MoodService>,
    kpi_service: Arc<KpiService>,
    appraisal_service: Arc<AppraisalService>,
    bsc_service: Arc<BscService>,
    cycle_service: Arc<CycleService>,
    leave_service: Arc<LeaveService>,
    sync_service: Arc<SyncService>,
    demo_generator: Option<Arc<DemoPulseGenerator>>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> AppResult<Self> {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        let employee_service = Arc::new(EmployeeService::new(db_pool.clone()));
        let engagement_service = Arc::new(EngagementService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let mood_service = Arc::new(MoodService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let kpi_service = Arc::new(KpiService::new(db_pool.clone()));
        let appraisal_service = Arc::new(AppraisalService::new(db_pool.clone()));
        let bsc_service = Arc::new(BscService::new(db_pool.clone()));
        let cycle_service = Arc::new(CycleService::new(
            db_pool.clone(),
            Arc::clone(&appraisal_service),
            Arc::clone(&bsc_service),
        ));
        let leave_service = Arc::new(LeaveService::new(db_pool.clone()));
        let sync_service = Arc::new(SyncService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        )?);

        Ok(Self {
            db_pool,
            settings_service,
            employee_service,
            engagement_service,
            mood_service,
            kpi_service,
            appraisal_service,
            bsc_service,
            cycle_service,
            leave_service,
            sync_service,
            demo_generator: None,
        })
    }

    /// Attaches a demo generator backed by its own store.
    pub fn with_demo(mut self, demo_pool: DbPool) -> Self {
        self.demo_generator = Some(Arc::new(DemoPulseGenerator::new(
            demo_pool,
            Arc::clone(&self.settings_service),
        )));
        self
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn employees(&self) -> Arc<EmployeeService> {
        Arc::clone(&self.employee_service)
    }

    pub fn engagement(&self) -> Arc<EngagementService> {
        Arc::clone(&self.engagement_service)
    }

    pub fn mood(&self) -> Arc<MoodService> {
        Arc::clone(&self.mood_service)
    }

    pub fn kpis(&self) -> Arc<KpiService> {
        Arc::clone(&self.kpi_service)
    }

    pub fn appraisals(&self) -> Arc<AppraisalService> {
        Arc::clone(&self.appraisal_service)
    }

    pub fn bsc(&self) -> Arc<BscService> {
        Arc::clone(&self.bsc_service)
    }

    pub fn cycles(&self) -> Arc<CycleService> {
        Arc::clone(&self.cycle_service)
    }

    pub fn leave(&self) -> Arc<LeaveService> {
        Arc::clone(&self.leave_service)
    }

    pub fn sync(&self) -> Arc<SyncService> {
        Arc::clone(&self.sync_service)
    }

    pub fn demo(&self) -> AppResult<Arc<DemoPulseGenerator>> {
        self.demo_generator
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| AppError::validation("demo store is not configured"))
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    /// Mirrors a freshly committed record; no-op when sync is off.
    pub(crate) fn mirror<T: Serialize>(&self, collection: &str, record: &T) {
        match serde_json::to_value(record) {
            Ok(value) => self.sync_service.spawn_upsert_record(collection, value),
            Err(err) => {
                warn!(target: "app::sync", collection, error = %err, "record not serialisable for sync")
            }
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "requested record does not exist", None)
            }
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Sync { message } => {
                warn!(target: "app::command", %message, "remote sync error in command");
                CommandError::new("SYNC_FAILED", message, None)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Runs store-bound work off the async executor.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("background task failed: {err}"), None))?
        .map_err(CommandError::from)
}
