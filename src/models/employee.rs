use serde::{Deserialize, Serialize};

pub const DEFAULT_DEPARTMENT: &str = "Admin";
pub const DEFAULT_LOCATION: &str = "HQ";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Monthly base pay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub salary: Option<f64>,
}

/// People filter used by cohort aggregates. `None` fields match everyone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CohortFilter {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl CohortFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn department(name: impl Into<String>) -> Self {
        Self {
            department: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        let department_ok = self
            .department
            .as_deref()
            .map_or(true, |dept| employee.department == dept);
        let role_ok = self
            .role
            .as_deref()
            .map_or(true, |role| employee.role.as_deref() == Some(role));
        let location_ok = self
            .location
            .as_deref()
            .map_or(true, |location| employee.location == location);

        department_ok && role_ok && location_ok
    }
}
