use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::employee::{
    CohortFilter, Employee, EmployeeInput, DEFAULT_DEPARTMENT, DEFAULT_LOCATION,
};

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Directory of people that every aggregate scopes over.
pub struct EmployeeService {
    db: DbPool,
}

impl EmployeeService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Creates or updates by id; a new id is generated when none is given.
    /// Emails are unique, compared case-insensitively.
    pub fn upsert(&self, input: EmployeeInput) -> AppResult<Employee> {
        let name = input.name.trim();
        let email = input.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(AppError::validation("employee name is required"));
        }
        if !email.contains('@') {
            return Err(AppError::validation(format!("invalid email address: {email}")));
        }
        if input
            .salary
            .is_some_and(|salary| !salary.is_finite() || salary < 0.0)
        {
            return Err(AppError::validation("salary must be a non-negative amount"));
        }

        let employee = Employee {
            id: non_blank(input.id).unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: name.to_string(),
            email,
            department: non_blank(input.department).unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
            role: non_blank(input.role),
            location: non_blank(input.location).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            gender: non_blank(input.gender),
            manager_id: non_blank(input.manager_id),
            start_date: non_blank(input.start_date)
                .or_else(|| Some(Utc::now().date_naive().format("%Y-%m-%d").to_string())),
            salary: input.salary,
        };

        if employee.manager_id.as_deref() == Some(employee.id.as_str()) {
            return Err(AppError::validation("an employee cannot manage themselves"));
        }

        self.db.with_transaction(|tx| {
            if let Some(existing) = EmployeeRepository::find_by_email(tx, &employee.email)? {
                if existing.id != employee.id {
                    return Err(AppError::conflict(format!(
                        "email already registered: {}",
                        employee.email
                    )));
                }
            }
            EmployeeRepository::upsert(tx, &employee)
        })?;

        info!(
            target: "app::db",
            employee_id = %employee.id,
            department = %employee.department,
            "employee saved"
        );

        Ok(employee)
    }

    pub fn find(&self, id: &str) -> AppResult<Employee> {
        self.db
            .with_connection(|conn| EmployeeRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)
    }

    pub fn find_by_email(&self, email: &str) -> AppResult<Option<Employee>> {
        let email = email.trim().to_lowercase();
        self.db
            .with_connection(|conn| EmployeeRepository::find_by_email(conn, &email))
    }

    pub fn list(&self, filter: &CohortFilter) -> AppResult<Vec<Employee>> {
        let employees = self.db.with_connection(|conn| match filter.department.as_deref() {
            Some(department) => EmployeeRepository::list_by_department(conn, department),
            None => EmployeeRepository::list(conn),
        })?;

        Ok(employees
            .into_iter()
            .filter(|employee| filter.matches(employee))
            .collect())
    }

    pub fn directs_of(&self, manager_id: &str) -> AppResult<Vec<Employee>> {
        self.db
            .with_connection(|conn| EmployeeRepository::directs_of(conn, manager_id))
    }

    pub fn remove(&self, id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| EmployeeRepository::delete(conn, id))
    }
}
