pub mod appraisal_repository;
pub mod bsc_repository;
pub mod check_in_repository;
pub mod cycle_repository;
pub mod employee_repository;
pub mod kpi_repository;
pub mod leave_repository;
pub mod mood_repository;
pub mod notification_repository;
pub mod policy_repository;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AppError, AppResult};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn serialize_json<T: Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string(value).map_err(|e| AppError::Database {
        message: format!("JSON serialization error: {}", e),
    })
}

pub(crate) fn deserialize_json<T: DeserializeOwned>(raw: &str) -> AppResult<T> {
    serde_json::from_str(raw).map_err(|e| AppError::Database {
        message: format!("JSON deserialization error: {}", e),
    })
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|err| AppError::database(format!("invalid stored date '{raw}': {err}")))
}

/// Fixed-width UTC text so stored instants sort lexically.
pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| AppError::database(format!("invalid stored timestamp '{raw}': {err}")))
}
