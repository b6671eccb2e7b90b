use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::employee::Employee;

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, email, department, role, location, gender, manager_id, start_date, salary
    FROM employees
"#;

#[derive(Debug, Clone)]
pub struct EmployeeRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub role: Option<String>,
    pub location: String,
    pub gender: Option<String>,
    pub manager_id: Option<String>,
    pub start_date: Option<String>,
    pub salary: Option<f64>,
}

impl EmployeeRow {
    pub fn into_record(self) -> Employee {
        Employee {
            id: self.id,
            name: self.name,
            email: self.email,
            department: self.department,
            role: self.role,
            location: self.location,
            gender: self.gender,
            manager_id: self.manager_id,
            start_date: self.start_date,
            salary: self.salary,
        }
    }
}

impl TryFrom<&Row<'_>> for EmployeeRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            department: row.get("department")?,
            role: row.get("role")?,
            location: row.get("location")?,
            gender: row.get("gender")?,
            manager_id: row.get("manager_id")?,
            start_date: row.get("start_date")?,
            salary: row.get("salary")?,
        })
    }
}

pub struct EmployeeRepository;

impl EmployeeRepository {
    pub fn upsert(conn: &Connection, employee: &Employee) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO employees (
                    id, name, email, department, role, location, gender, manager_id, start_date, salary
                ) VALUES (
                    :id, :name, :email, :department, :role, :location, :gender, :manager_id,
                    :start_date, :salary
                )
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    email = excluded.email,
                    department = excluded.department,
                    role = excluded.role,
                    location = excluded.location,
                    gender = excluded.gender,
                    manager_id = excluded.manager_id,
                    start_date = excluded.start_date,
                    salary = excluded.salary
            "#,
            named_params! {
                ":id": &employee.id,
                ":name": &employee.name,
                ":email": &employee.email,
                ":department": &employee.department,
                ":role": &employee.role,
                ":location": &employee.location,
                ":gender": &employee.gender,
                ":manager_id": &employee.manager_id,
                ":start_date": &employee.start_date,
                ":salary": &employee.salary,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<Employee>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = :id");
        let row = conn
            .query_row(&sql, named_params! {":id": id}, |row| EmployeeRow::try_from(row))
            .optional()?;

        Ok(row.map(EmployeeRow::into_record))
    }

    pub fn find_by_email(conn: &Connection, email: &str) -> AppResult<Option<Employee>> {
        let sql = format!("{SELECT_COLUMNS} WHERE lower(email) = lower(:email)");
        let row = conn
            .query_row(&sql, named_params! {":email": email}, |row| {
                EmployeeRow::try_from(row)
            })
            .optional()?;

        Ok(row.map(EmployeeRow::into_record))
    }

    pub fn list(conn: &Connection) -> AppResult<Vec<Employee>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY name ASC, id ASC");
        Self::collect(conn, &sql, named_params! {})
    }

    pub fn list_by_department(conn: &Connection, department: &str) -> AppResult<Vec<Employee>> {
        let sql = format!("{SELECT_COLUMNS} WHERE department = :department ORDER BY name ASC, id ASC");
        Self::collect(conn, &sql, named_params! {":department": department})
    }

    pub fn directs_of(conn: &Connection, manager_id: &str) -> AppResult<Vec<Employee>> {
        let sql = format!("{SELECT_COLUMNS} WHERE manager_id = :manager_id ORDER BY name ASC, id ASC");
        Self::collect(conn, &sql, named_params! {":manager_id": manager_id})
    }

    pub fn count(conn: &Connection) -> AppResult<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM employees WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    fn collect(
        conn: &Connection,
        sql: &str,
        params: &[(&str, &dyn rusqlite::ToSql)],
    ) -> AppResult<Vec<Employee>> {
        let mut stmt = conn.prepare(sql)?;
        let employees = stmt
            .query_map(params, |row| EmployeeRow::try_from(row))?
            .map(|row| row.map(EmployeeRow::into_record).map_err(AppError::from))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(employees)
    }
}
