pub mod appraisal;
pub mod bsc;
pub mod checkin;
pub mod cycle;
pub mod employee;
pub mod engagement;
pub mod kpi;
pub mod leave;
pub mod mood;
pub mod notification;
pub mod settings;

use serde::{Deserialize, Serialize};

/// Outcome of an explicit get-or-create call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Provisioned<T> {
    Existing(T),
    Created(T),
}

impl<T> Provisioned<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Provisioned::Created(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Provisioned::Existing(value) | Provisioned::Created(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Provisioned::Existing(value) | Provisioned::Created(value) => value,
        }
    }
}
