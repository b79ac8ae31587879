use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::{
    models::{PayrollAmounts, PayrollLine, PayrollStatus},
    utils::sql,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollFilter {
    pub employee_id: Option<Uuid>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub status: Option<PayrollStatus>,
}

#[derive(Clone)]
pub struct PayrollRepository {
    pool: PgPool,
}

impl PayrollRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending payroll line
    pub async fn create(
        &self,
        employee_id: Uuid,
        amounts: &PayrollAmounts,
        month: i32,
        year: i32,
        now: DateTime<Utc>,
    ) -> Result<PayrollLine, sqlx::Error> {
        sqlx::query_as::<_, PayrollLine>(&sql(r#"
            INSERT INTO
                payroll (
                    id,
                    employee_id,
                    basic_salary,
                    accommodation,
                    allowances,
                    overtime_amount,
                    deductions,
                    gross_salary,
                    net_salary,
                    month,
                    year,
                    status,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                *
        "#))
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(&amounts.basic_salary)
        .bind(&amounts.accommodation)
        .bind(&amounts.allowances)
        .bind(&amounts.overtime_amount)
        .bind(&amounts.deductions)
        .bind(&amounts.gross_salary)
        .bind(&amounts.net_salary)
        .bind(month)
        .bind(year)
        .bind(PayrollStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Create a pending line unless one exists for the period; `None` when skipped
    pub async fn create_if_absent(
        &self,
        employee_id: Uuid,
        amounts: &PayrollAmounts,
        month: i32,
        year: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<PayrollLine>, sqlx::Error> {
        sqlx::query_as::<_, PayrollLine>(&sql(r#"
            INSERT INTO
                payroll (
                    id,
                    employee_id,
                    basic_salary,
                    accommodation,
                    allowances,
                    overtime_amount,
                    deductions,
                    gross_salary,
                    net_salary,
                    month,
                    year,
                    status,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT ON CONSTRAINT payroll_period_key DO NOTHING
            RETURNING
                *
        "#))
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(&amounts.basic_salary)
        .bind(&amounts.accommodation)
        .bind(&amounts.allowances)
        .bind(&amounts.overtime_amount)
        .bind(&amounts.deductions)
        .bind(&amounts.gross_salary)
        .bind(&amounts.net_salary)
        .bind(month)
        .bind(year)
        .bind(PayrollStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a payroll line by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PayrollLine>, sqlx::Error> {
        sqlx::query_as::<_, PayrollLine>(&sql("SELECT * FROM payroll WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List lines, newest period first
    pub async fn list(&self, filter: &PayrollFilter) -> Result<Vec<PayrollLine>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM payroll WHERE TRUE");

        if let Some(employee_id) = filter.employee_id {
            query.push(" AND employee_id = ").push_bind(employee_id);
        }
        if let Some(month) = filter.month {
            query.push(" AND month = ").push_bind(month);
        }
        if let Some(year) = filter.year {
            query.push(" AND year = ").push_bind(year);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }

        query.push(" ORDER BY year DESC, month DESC, created_at DESC");

        query
            .build_query_as::<PayrollLine>()
            .fetch_all(&self.pool)
            .await
    }

    /// Recompute a line while it is still pending
    pub async fn update_pending(
        &self,
        id: Uuid,
        employee_id: Uuid,
        amounts: &PayrollAmounts,
        month: i32,
        year: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<PayrollLine>, sqlx::Error> {
        sqlx::query_as::<_, PayrollLine>(&sql(r#"
            UPDATE
                payroll
            SET
                employee_id = ?,
                basic_salary = ?,
                accommodation = ?,
                allowances = ?,
                overtime_amount = ?,
                deductions = ?,
                gross_salary = ?,
                net_salary = ?,
                month = ?,
                year = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING
                *
        "#))
        .bind(employee_id)
        .bind(&amounts.basic_salary)
        .bind(&amounts.accommodation)
        .bind(&amounts.allowances)
        .bind(&amounts.overtime_amount)
        .bind(&amounts.deductions)
        .bind(&amounts.gross_salary)
        .bind(&amounts.net_salary)
        .bind(month)
        .bind(year)
        .bind(now)
        .bind(id)
        .bind(PayrollStatus::Pending)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a line unless it has been paid; returns whether a row was removed
    pub async fn delete_unpaid(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql("DELETE FROM payroll WHERE id = ? AND status <> ?"))
            .bind(id)
            .bind(PayrollStatus::Paid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a pending line to `status`; `None` when it was not pending
    pub async fn resolve_pending(
        &self,
        id: Uuid,
        status: PayrollStatus,
        payment_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Option<PayrollLine>, sqlx::Error> {
        sqlx::query_as::<_, PayrollLine>(&sql(r#"
            UPDATE
                payroll
            SET
                status = ?,
                payment_date = COALESCE(?, payment_date),
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING
                *
        "#))
        .bind(status)
        .bind(payment_date)
        .bind(now)
        .bind(id)
        .bind(PayrollStatus::Pending)
        .fetch_optional(&self.pool)
        .await
    }
}
