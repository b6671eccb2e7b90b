use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::db::repositories::appraisal_repository::AppraisalRepository;
use crate::db::repositories::bsc_repository::BscRepository;
use crate::db::repositories::check_in_repository::CheckInRepository;
use crate::db::repositories::cycle_repository::CycleRepository;
use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::format_timestamp;
use crate::db::repositories::kpi_repository::KpiRepository;
use crate::db::repositories::leave_repository::LeaveRepository;
use crate::db::repositories::mood_repository::MoodRepository;
use crate::db::repositories::notification_repository::NotificationRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{RemoteSyncConfig, RemoteSyncMode};
use crate::services::settings_service::SettingsService;

const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const STATES_TABLE: &str = "states";

/// Remote collaborator that mirrors the record store. Nothing local depends on it.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn load_state(&self, key: &str) -> AppResult<Option<JsonValue>>;

    async fn save_state(&self, key: &str, payload: &JsonValue) -> AppResult<()>;

    async fn upsert(&self, collection: &str, record: &JsonValue) -> AppResult<()>;

    fn name(&self) -> &'static str;
}

fn build_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Some(StdDuration::from_secs(90)))
        .build()
        .map_err(|err| AppError::other(format!("failed to build sync http client: {err}")))
}

fn ensure_success(status: StatusCode, operation: &str) -> AppResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AppError::sync(format!(
            "{operation} returned HTTP {}",
            status.as_u16()
        )))
    }
}

/// Plain REST backend: `/api/state` for the blob and `/api/{collection}` per record.
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
}

impl RestBackend {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RemoteBackend for RestBackend {
    async fn load_state(&self, key: &str) -> AppResult<Option<JsonValue>> {
        let response = self
            .client
            .get(format!("{}/api/state", self.base_url))
            .query(&[("key", key)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        ensure_success(response.status(), "load state")?;

        let body: JsonValue = response.json().await?;
        Ok(body.get("payload").filter(|value| !value.is_null()).cloned())
    }

    async fn save_state(&self, key: &str, payload: &JsonValue) -> AppResult<()> {
        let response = self
            .client
            .put(format!("{}/api/state", self.base_url))
            .json(&json!({ "key": key, "payload": payload }))
            .send()
            .await?;
        ensure_success(response.status(), "save state")
    }

    async fn upsert(&self, collection: &str, record: &JsonValue) -> AppResult<()> {
        let response = self
            .client
            .post(format!("{}/api/{}", self.base_url, collection))
            .json(record)
            .send()
            .await?;
        ensure_success(response.status(), "upsert record")
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

/// PostgREST endpoints of a Supabase project.
pub struct SupabaseBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseBackend {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl RemoteBackend for SupabaseBackend {
    async fn load_state(&self, key: &str) -> AppResult<Option<JsonValue>> {
        let filter = format!("eq.{key}");
        let response = self
            .authorized(self.client.get(self.table_url(STATES_TABLE)))
            .query(&[("select", "key,payload"), ("key", filter.as_str()), ("limit", "1")])
            .send()
            .await?;
        ensure_success(response.status(), "load state")?;

        let rows: Vec<JsonValue> = response.json().await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.get("payload").cloned())
            .filter(|payload| !payload.is_null()))
    }

    async fn save_state(&self, key: &str, payload: &JsonValue) -> AppResult<()> {
        let response = self
            .authorized(self.client.post(self.table_url(STATES_TABLE)))
            .query(&[("on_conflict", "key")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&json!({ "key": key, "payload": payload }))
            .send()
            .await?;
        ensure_success(response.status(), "save state")
    }

    async fn upsert(&self, collection: &str, record: &JsonValue) -> AppResult<()> {
        let response = self
            .authorized(self.client.post(self.table_url(collection)))
            .header("Prefer", "resolution=merge-duplicates")
            .json(record)
            .send()
            .await?;
        ensure_success(response.status(), "upsert record")
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}

/// Best-effort mirroring of the record store. Failures are logged and dropped.
#[derive(Clone)]
pub struct SyncService {
    db: DbPool,
    settings: Arc<SettingsService>,
    client: reqwest::Client,
}

impl SyncService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> AppResult<Self> {
        Ok(Self {
            db,
            settings,
            client: build_client()?,
        })
    }

    /// Backend for the current settings, or `None` when sync is off.
    pub fn backend(&self) -> AppResult<Option<(Arc<dyn RemoteBackend>, RemoteSyncConfig)>> {
        let config = self.settings.remote_sync()?;
        let url = match config.url.as_deref() {
            Some(url) if config.mode != RemoteSyncMode::Off => url.to_string(),
            _ => return Ok(None),
        };

        let backend: Arc<dyn RemoteBackend> = match config.mode {
            RemoteSyncMode::Off => return Ok(None),
            RemoteSyncMode::Rest => Arc::new(RestBackend::new(self.client.clone(), &url)),
            RemoteSyncMode::Supabase => {
                let Some(key) = config.key.as_deref() else {
                    warn!(target: "app::sync", "supabase sync configured without an api key");
                    return Ok(None);
                };
                Arc::new(SupabaseBackend::new(self.client.clone(), &url, key))
            }
        };

        Ok(Some((backend, config)))
    }

    pub async fn load_state(&self) -> Option<JsonValue> {
        let (backend, config) = self.resolve_in_background().await?;
        match backend.load_state(&config.state_key).await {
            Ok(state) => {
                debug!(target: "app::sync", backend = backend.name(), found = state.is_some(), "remote state loaded");
                state
            }
            Err(err) => {
                warn!(target: "app::sync", backend = backend.name(), error = %err, "loading remote state failed");
                None
            }
        }
    }

    /// Returns whether the backend accepted the snapshot.
    pub async fn push_state(&self, snapshot: &JsonValue) -> bool {
        let Some((backend, config)) = self.resolve_in_background().await else {
            return false;
        };
        match backend.save_state(&config.state_key, snapshot).await {
            Ok(()) => {
                info!(target: "app::sync", backend = backend.name(), "remote state pushed");
                true
            }
            Err(err) => {
                warn!(target: "app::sync", backend = backend.name(), error = %err, "pushing remote state failed");
                false
            }
        }
    }

    pub async fn upsert_record(&self, collection: &str, record: &JsonValue) -> bool {
        let Some((backend, _)) = self.resolve_in_background().await else {
            return false;
        };
        match backend.upsert(collection, record).await {
            Ok(()) => {
                debug!(target: "app::sync", backend = backend.name(), collection, "record mirrored");
                true
            }
            Err(err) => {
                warn!(target: "app::sync", backend = backend.name(), collection, error = %err, "mirroring record failed");
                false
            }
        }
    }

    pub async fn push_snapshot(&self) -> bool {
        if self.resolve_in_background().await.is_none() {
            return false;
        }
        match self.export_in_background().await {
            Ok(snapshot) => self.push_state(&snapshot).await,
            Err(err) => {
                warn!(target: "app::sync", error = %err, "building snapshot failed");
                false
            }
        }
    }

    /// Fire-and-forget record upsert on the ambient tokio runtime.
    pub fn spawn_upsert_record(self: &Arc<Self>, collection: &str, record: JsonValue) {
        let Ok(handle) = Handle::try_current() else {
            debug!(target: "app::sync", collection, "no async runtime; record sync skipped");
            return;
        };

        let service = Arc::clone(self);
        let collection = collection.to_string();
        handle.spawn(async move {
            service.upsert_record(&collection, &record).await;
        });
    }

    pub fn spawn_push_snapshot(self: &Arc<Self>) {
        let Ok(handle) = Handle::try_current() else {
            debug!(target: "app::sync", "no async runtime; snapshot sync skipped");
            return;
        };

        let service = Arc::clone(self);
        handle.spawn(async move {
            service.push_snapshot().await;
        });
    }

    /// Every collection of the record store in one document.
    pub fn export_snapshot(&self) -> AppResult<JsonValue> {
        self.db.with_connection(|conn| {
            let allowances: Vec<JsonValue> = LeaveRepository::list_allowances(conn)?
                .into_iter()
                .map(|(user_id, leave_type, days)| {
                    json!({ "userId": user_id, "type": leave_type, "days": days })
                })
                .collect();

            Ok(json!({
                "exportedAt": format_timestamp(Utc::now()),
                "employees": EmployeeRepository::list(conn)?,
                "checkIns": CheckInRepository::list_all(conn)?,
                "moodEntries": MoodRepository::list_all(conn)?,
                "leaves": LeaveRepository::list_all(conn)?,
                "leaveAllowances": allowances,
                "kpis": KpiRepository::list_all(conn)?,
                "appraisals": AppraisalRepository::list_all(conn)?,
                "bscObjectives": BscRepository::list_objectives(conn)?,
                "bscReviews": BscRepository::list_reviews(conn)?,
                "cycles": CycleRepository::list(conn)?,
                "notifications": NotificationRepository::list(conn, None, None)?,
            }))
        })
    }

    /// Settings live in SQLite, so the lookup runs on the blocking pool.
    async fn resolve_in_background(&self) -> Option<(Arc<dyn RemoteBackend>, RemoteSyncConfig)> {
        let service = self.clone();
        match tokio::task::spawn_blocking(move || service.backend()).await {
            Ok(Ok(resolved)) => resolved,
            Ok(Err(err)) => {
                warn!(target: "app::sync", error = %err, "reading sync settings failed");
                None
            }
            Err(err) => {
                warn!(target: "app::sync", error = %err, "sync settings task failed");
                None
            }
        }
    }

    async fn export_in_background(&self) -> AppResult<JsonValue> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.export_snapshot())
            .await
            .map_err(|err| AppError::sync(format!("snapshot task failed: {err}")))?
    }
}
