use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::{
    models::{
        ApprovalStatus, ApprovedLeave, LeaveRequest, LeaveRequestFilter, LeaveRequestInput,
        LeaveStages, LeaveTransition,
    },
    utils::sql,
};

/// Which requests a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveScope {
    Employee(Uuid),
    /// Requests of employees reporting to this manager user.
    Team(Uuid),
    All,
}

#[derive(Clone)]
pub struct LeaveRepository {
    pool: PgPool,
}

impl LeaveRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a leave request with its initial stage statuses
    pub async fn create(
        &self,
        employee_id: Uuid,
        input: &LeaveRequestInput,
        days_requested: i32,
        stages: LeaveStages,
        manager_approved_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequest>(&sql(r#"
            INSERT INTO
                leave_requests (
                    id,
                    employee_id,
                    leave_type,
                    start_date,
                    end_date,
                    days_requested,
                    reason,
                    manager_status,
                    manager_approved_at,
                    admin_status,
                    overall_status,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                *
        "#))
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(input.leave_type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(days_requested)
        .bind(input.reason.trim())
        .bind(stages.manager)
        .bind(manager_approved_at)
        .bind(stages.admin)
        .bind(stages.overall)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a leave request by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequest>(&sql("SELECT * FROM leave_requests WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List requests visible in `scope`, newest first
    pub async fn list(
        &self,
        scope: LeaveScope,
        filter: &LeaveRequestFilter,
    ) -> Result<Vec<LeaveRequest>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT lr.* FROM leave_requests lr JOIN employees e ON e.id = lr.employee_id WHERE TRUE",
        );

        match scope {
            LeaveScope::Employee(employee_id) => {
                query.push(" AND lr.employee_id = ").push_bind(employee_id);
            }
            LeaveScope::Team(manager_id) => {
                query
                    .push(" AND e.reporting_manager_id = ")
                    .push_bind(manager_id);
            }
            LeaveScope::All => {}
        }

        if let Some(status) = filter.manager_status {
            query.push(" AND lr.manager_status = ").push_bind(status);
        }
        if let Some(status) = filter.overall_status {
            query.push(" AND lr.overall_status = ").push_bind(status);
        }
        if let Some(leave_type) = filter.leave_type {
            query.push(" AND lr.leave_type = ").push_bind(leave_type);
        }
        if let Some(from) = filter.start_date {
            query.push(" AND lr.start_date >= ").push_bind(from);
        }
        if let Some(to) = filter.end_date {
            query.push(" AND lr.end_date <= ").push_bind(to);
        }

        query.push(" ORDER BY lr.created_at DESC");

        query
            .build_query_as::<LeaveRequest>()
            .fetch_all(&self.pool)
            .await
    }

    /// Approved history for an employee
    pub async fn approved_history(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<ApprovedLeave>, sqlx::Error> {
        approved_history(&self.pool, employee_id).await
    }

    /// Apply a transition outside of a transaction
    pub async fn apply_transition(
        &self,
        id: Uuid,
        transition: &LeaveTransition,
        now: DateTime<Utc>,
    ) -> Result<Option<LeaveRequest>, sqlx::Error> {
        apply_transition(&self.pool, id, transition, now).await
    }
}

pub async fn approved_history<'e, E>(
    executor: E,
    employee_id: Uuid,
) -> Result<Vec<ApprovedLeave>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ApprovedLeave>(&sql(r#"
        SELECT
            leave_type,
            start_date,
            days_requested
        FROM
            leave_requests
        WHERE
            employee_id = ?
            AND overall_status = ?
    "#))
    .bind(employee_id)
    .bind(ApprovalStatus::Approved)
    .fetch_all(executor)
    .await
}

/// Compare-and-swap on the stage columns. `None` means the row no longer
/// holds `transition.from`.
pub async fn apply_transition<'e, E>(
    executor: E,
    id: Uuid,
    transition: &LeaveTransition,
    now: DateTime<Utc>,
) -> Result<Option<LeaveRequest>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, LeaveRequest>(&sql(r#"
        UPDATE
            leave_requests
        SET
            manager_status = ?,
            admin_status = ?,
            overall_status = ?,
            manager_comments = COALESCE(?, manager_comments),
            manager_approved_at = COALESCE(?, manager_approved_at),
            admin_comments = COALESCE(?, admin_comments),
            admin_approved_at = COALESCE(?, admin_approved_at),
            updated_at = ?
        WHERE
            id = ?
            AND manager_status = ?
            AND admin_status = ?
            AND overall_status = ?
        RETURNING
            *
    "#))
    .bind(transition.to.manager)
    .bind(transition.to.admin)
    .bind(transition.to.overall)
    .bind(transition.manager_comments.as_deref())
    .bind(transition.manager_approved_at)
    .bind(transition.admin_comments.as_deref())
    .bind(transition.admin_approved_at)
    .bind(now)
    .bind(id)
    .bind(transition.from.manager)
    .bind(transition.from.admin)
    .bind(transition.from.overall)
    .fetch_optional(executor)
    .await
}
