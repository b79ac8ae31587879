use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Employee, EmployeeInput, EmployeeStatus},
    utils::sql,
};

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an employee record
    pub async fn create(
        &self,
        input: &EmployeeInput,
        now: DateTime<Utc>,
    ) -> Result<Employee, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&sql(r#"
            INSERT INTO
                employees (
                    id,
                    user_id,
                    employee_name,
                    department_id,
                    designation_id,
                    facility_id,
                    location_id,
                    reporting_manager_id,
                    visa_start_date,
                    status,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                *
        "#))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.employee_name.trim())
        .bind(input.department_id)
        .bind(input.designation_id)
        .bind(input.facility_id)
        .bind(input.location_id)
        .bind(input.reporting_manager_id)
        .bind(input.visa_start_date)
        .bind(EmployeeStatus::Active)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Find an employee by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&sql("SELECT * FROM employees WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Find the employee record belonging to a user
    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&sql("SELECT * FROM employees WHERE user_id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// All active employees, by name
    pub async fn list_active(&self) -> Result<Vec<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&sql(r#"
            SELECT
                *
            FROM
                employees
            WHERE
                status = ?
            ORDER BY
                employee_name
        "#))
        .bind(EmployeeStatus::Active)
        .fetch_all(&self.pool)
        .await
    }

    /// Active employees that have an accrual anchor
    pub async fn list_accruing(&self) -> Result<Vec<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&sql(r#"
            SELECT
                *
            FROM
                employees
            WHERE
                status = ?
                AND visa_start_date IS NOT NULL
            ORDER BY
                employee_name
        "#))
        .bind(EmployeeStatus::Active)
        .fetch_all(&self.pool)
        .await
    }

    /// Write the cached balance snapshot; returns whether anything changed
    pub async fn update_cached_balances(
        &self,
        id: Uuid,
        annual: &BigDecimal,
        medical: &BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        write_cached_balances(&self.pool, id, annual, medical, now).await
    }
}

/// Conditional snapshot write; unchanged rows are left untouched.
pub async fn write_cached_balances<'e, E>(
    executor: E,
    id: Uuid,
    annual: &BigDecimal,
    medical: &BigDecimal,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(&sql(r#"
        UPDATE
            employees
        SET
            annual_leave_balance = ?,
            medical_leave_balance = ?,
            updated_at = ?
        WHERE
            id = ?
            AND (
                annual_leave_balance IS DISTINCT FROM ?
                OR medical_leave_balance IS DISTINCT FROM ?
            )
    "#))
    .bind(annual)
    .bind(medical)
    .bind(now)
    .bind(id)
    .bind(annual)
    .bind(medical)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Lock the employee row for the rest of the transaction
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&sql("SELECT * FROM employees WHERE id = ? FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}
