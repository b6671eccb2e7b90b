use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiRecord {
    pub id: String,
    pub user_id: String,
    pub key: String,
    pub title: String,
    pub unit: String,
    /// Percent share; a user's set should sum to 100 but is not forced to.
    pub weight: f64,
    pub target: f64,
    pub actual: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kra: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiInput {
    #[serde(default)]
    pub id: Option<String>,
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub weight: f64,
    pub target: f64,
    #[serde(default)]
    pub actual: f64,
    #[serde(default)]
    pub kra: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiAggregate {
    pub score: i64,
    pub weight_sum: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateScope {
    Department,
    Role,
}

impl TemplateScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateScope::Department => "department",
            TemplateScope::Role => "role",
        }
    }
}

impl fmt::Display for TemplateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TemplateScope {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "department" => Ok(TemplateScope::Department),
            "role" => Ok(TemplateScope::Role),
            other => Err(format!("unsupported template scope: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiTemplate {
    pub scope: TemplateScope,
    pub scope_name: String,
    pub key: String,
    pub title: String,
    pub unit: String,
    pub weight: f64,
    pub target: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kra: Option<String>,
}

pub const FALLBACK_TEMPLATE_DEPARTMENT: &str = "Admin";

pub struct KpiTemplateSeed {
    pub scope: TemplateScope,
    pub scope_name: &'static str,
    pub key: &'static str,
    pub title: &'static str,
    pub unit: &'static str,
    pub weight: f64,
    pub target: f64,
    pub kra: &'static str,
}

const fn dept(
    scope_name: &'static str,
    key: &'static str,
    title: &'static str,
    unit: &'static str,
    weight: f64,
    target: f64,
    kra: &'static str,
) -> KpiTemplateSeed {
    KpiTemplateSeed { scope: TemplateScope::Department, scope_name, key, title, unit, weight, target, kra }
}

const fn role(
    scope_name: &'static str,
    key: &'static str,
    title: &'static str,
    unit: &'static str,
    weight: f64,
    target: f64,
    kra: &'static str,
) -> KpiTemplateSeed {
    KpiTemplateSeed { scope: TemplateScope::Role, scope_name, key, title, unit, weight, target, kra }
}

/// Templates installed on first launch.
pub const DEFAULT_KPI_TEMPLATES: &[KpiTemplateSeed] = &[
    dept("Engineering", "deploys", "Successful Deployments", "count", 30.0, 8.0, "Delivery"),
    dept("Engineering", "bugs", "Bugs Resolved", "count", 40.0, 25.0, "Quality"),
    dept("Engineering", "codeQuality", "Code Quality Score", "score", 30.0, 85.0, "Quality"),
    dept("Sales", "revenue", "Monthly Revenue Closed", "NGN", 50.0, 5_000_000.0, "Revenue"),
    dept("Sales", "leads", "Qualified Leads Generated", "count", 30.0, 40.0, "Pipeline"),
    dept("Sales", "conversion", "Lead Conversion Rate", "%", 20.0, 20.0, "Conversion"),
    dept("Admin", "sla", "Ticket SLA Compliance", "%", 40.0, 95.0, "Compliance"),
    dept("Admin", "attendance", "Attendance Compliance", "%", 30.0, 98.0, "Compliance"),
    dept("Admin", "requests", "Requests Processed", "count", 30.0, 120.0, "Throughput"),
    role("Software Engineer", "features", "Features Delivered", "count", 35.0, 6.0, "Delivery"),
    role("Software Engineer", "bugsFixed", "Bugs Resolved", "count", 25.0, 20.0, "Quality"),
    role("Software Engineer", "reviews", "Code Reviews", "count", 20.0, 15.0, "Quality"),
    role("Software Engineer", "velocity", "Sprint Velocity", "points", 20.0, 35.0, "Delivery"),
    role("DevOps Engineer", "uptime", "Service Uptime", "%", 40.0, 99.9, "Reliability"),
    role("DevOps Engineer", "mttr", "Mean Time To Recover", "mins", 30.0, 45.0, "Reliability"),
    role("DevOps Engineer", "deploys", "Automated Deployments", "count", 30.0, 25.0, "Delivery"),
    role("Backend Engineer", "apis", "API Endpoints Delivered", "count", 35.0, 10.0, "Delivery"),
    role("Backend Engineer", "latency", "Avg API Latency", "ms", 25.0, 200.0, "Performance"),
    role("Backend Engineer", "bugs", "Bugs Resolved", "count", 40.0, 25.0, "Quality"),
    role("Frontend Engineer", "uiTickets", "UI Tickets Closed", "count", 40.0, 30.0, "Delivery"),
    role("Frontend Engineer", "lighthouse", "Lighthouse Score", "score", 30.0, 90.0, "Quality"),
    role("Frontend Engineer", "bugs", "Front-end Bugs Resolved", "count", 30.0, 20.0, "Quality"),
    role("Product Manager", "roadmap", "Roadmap Delivery", "%", 40.0, 90.0, "Delivery"),
    role("Product Manager", "adoption", "Feature Adoption", "%", 30.0, 60.0, "Impact"),
    role("Product Manager", "stakeholder", "Stakeholder Satisfaction", "score", 30.0, 4.0, "Quality"),
    role("Sales Lead", "revenue", "Monthly Revenue", "NGN", 50.0, 8_000_000.0, "Revenue"),
    role("Sales Lead", "pipeline", "Qualified Pipeline", "NGN", 30.0, 15_000_000.0, "Pipeline"),
    role("Sales Lead", "winRate", "Win Rate", "%", 20.0, 30.0, "Conversion"),
    role("Account Exec", "revenue", "Deals Closed", "NGN", 55.0, 5_000_000.0, "Revenue"),
    role("Account Exec", "meetings", "Client Meetings", "count", 25.0, 20.0, "Pipeline"),
    role("Account Exec", "conversion", "Conversion Rate", "%", 20.0, 25.0, "Conversion"),
    role("HRBP", "hires", "Hires Delivered", "count", 35.0, 10.0, "Delivery"),
    role("HRBP", "timeToFill", "Time To Fill", "days", 35.0, 30.0, "Efficiency"),
    role("HRBP", "stakeholder", "Stakeholder Satisfaction", "score", 30.0, 4.0, "Quality"),
    role("Finance Manager", "closing", "Month-end Closing Timeliness", "days", 40.0, 7.0, "Efficiency"),
    role("Finance Manager", "accuracy", "Reporting Accuracy", "%", 35.0, 98.0, "Quality"),
    role("Finance Manager", "controls", "Controls Compliance", "%", 25.0, 95.0, "Compliance"),
    role("Recruiter", "hires", "Hires Per Quarter", "count", 40.0, 8.0, "Delivery"),
    role("Recruiter", "pipeline", "Qualified Candidates Pipeline", "count", 30.0, 60.0, "Pipeline"),
    role("Recruiter", "offerAccept", "Offer Acceptance Rate", "%", 30.0, 80.0, "Conversion"),
    role("Payroll Exec", "timeliness", "Payroll Timeliness", "%", 40.0, 98.0, "Efficiency"),
    role("Payroll Exec", "accuracy", "Accuracy", "%", 40.0, 99.0, "Quality"),
    role("Payroll Exec", "queries", "Resolved Payroll Queries", "count", 20.0, 30.0, "Support"),
    role("Social Manager", "content", "Content Posts", "count", 35.0, 40.0, "Delivery"),
    role("Social Manager", "engagement", "Engagement Rate", "%", 35.0, 5.0, "Impact"),
    role("Social Manager", "growth", "Follower Growth", "%", 30.0, 10.0, "Impact"),
];
