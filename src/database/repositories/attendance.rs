use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::{
    models::{
        AttendanceListEntry, AttendanceRecord, AttendanceStatus, EmployeeStatus, GeoReading, Shift,
    },
    utils::sql,
};

/// Resolved admin listing criteria; every field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct AttendanceCriteria {
    pub employee_name: Option<String>,
    pub location_id: Option<Uuid>,
    pub status: Option<AttendanceStatus>,
    pub shift: Option<Shift>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn push_criteria(query: &mut QueryBuilder<'_, Postgres>, criteria: &AttendanceCriteria) {
    if let Some(name) = &criteria.employee_name {
        query
            .push(" AND e.employee_name ILIKE ")
            .push_bind(format!("%{}%", name));
    }
    if let Some(location_id) = criteria.location_id {
        query.push(" AND e.location_id = ").push_bind(location_id);
    }
    if let Some(status) = criteria.status {
        query.push(" AND a.status = ").push_bind(status);
    }
    if let Some(shift) = criteria.shift {
        query.push(" AND a.shift = ").push_bind(shift);
    }
    if let Some(from) = criteria.from {
        query.push(" AND a.date >= ").push_bind(from);
    }
    if let Some(to) = criteria.to {
        query.push(" AND a.date <= ").push_bind(to);
    }
}

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the record for an (employee, date, shift) key
    pub async fn find_for_key(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&sql(r#"
            SELECT
                *
            FROM
                attendance
            WHERE
                employee_id = ?
                AND date = ?
                AND shift = ?
        "#))
        .bind(employee_id)
        .bind(date)
        .bind(shift)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create or reuse the record for the key and stamp the check-in.
    ///
    /// Returns `None` when the key already carries a check-in.
    pub async fn check_in(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        shift: Shift,
        reading: &GeoReading,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&sql(r#"
            INSERT INTO
                attendance (
                    id,
                    employee_id,
                    date,
                    shift,
                    check_in_time,
                    check_in_latitude,
                    check_in_longitude,
                    check_in_address,
                    check_in_accuracy,
                    status,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT ON CONSTRAINT attendance_session_key DO UPDATE
            SET
                check_in_time = EXCLUDED.check_in_time,
                check_in_latitude = EXCLUDED.check_in_latitude,
                check_in_longitude = EXCLUDED.check_in_longitude,
                check_in_address = EXCLUDED.check_in_address,
                check_in_accuracy = EXCLUDED.check_in_accuracy,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            WHERE
                attendance.check_in_time IS NULL
            RETURNING
                *
        "#))
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(date)
        .bind(shift)
        .bind(now)
        .bind(reading.latitude)
        .bind(reading.longitude)
        .bind(&reading.address)
        .bind(reading.accuracy)
        .bind(AttendanceStatus::CheckedIn)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    /// Latest open session for the employee on the given date
    pub async fn find_open_for_date(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&sql(r#"
            SELECT
                *
            FROM
                attendance
            WHERE
                employee_id = ?
                AND date = ?
                AND status = ?
                AND check_in_time IS NOT NULL
                AND check_out_time IS NULL
            ORDER BY
                check_in_time DESC
            LIMIT 1
        "#))
        .bind(employee_id)
        .bind(date)
        .bind(AttendanceStatus::CheckedIn)
        .fetch_optional(&self.pool)
        .await
    }

    /// Close an open session. `note` is appended to existing notes.
    ///
    /// Returns `None` when the session was closed concurrently.
    pub async fn close_session(
        &self,
        id: Uuid,
        reading: &GeoReading,
        total_hours: &BigDecimal,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&sql(r#"
            UPDATE
                attendance
            SET
                check_out_time = ?,
                check_out_latitude = ?,
                check_out_longitude = ?,
                check_out_address = ?,
                check_out_accuracy = ?,
                total_hours = ?,
                notes = NULLIF(concat_ws(E'\n', notes, ?::text), ''),
                status = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
                AND check_out_time IS NULL
            RETURNING
                *
        "#))
        .bind(now)
        .bind(reading.latitude)
        .bind(reading.longitude)
        .bind(&reading.address)
        .bind(reading.accuracy)
        .bind(total_hours)
        .bind(note)
        .bind(AttendanceStatus::Present)
        .bind(now)
        .bind(id)
        .bind(AttendanceStatus::CheckedIn)
        .fetch_optional(&self.pool)
        .await
    }

    /// Open sessions whose check-in is at or before the cutoff
    pub async fn list_open_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&sql(r#"
            SELECT
                *
            FROM
                attendance
            WHERE
                status = ?
                AND check_out_time IS NULL
                AND check_in_time IS NOT NULL
                AND check_in_time <= ?
            ORDER BY
                check_in_time
        "#))
        .bind(AttendanceStatus::CheckedIn)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    /// Records for an employee within an inclusive date range
    pub async fn list_between(
        &self,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&sql(r#"
            SELECT
                *
            FROM
                attendance
            WHERE
                employee_id = ?
                AND date BETWEEN ? AND ?
            ORDER BY
                date DESC,
                check_in_time DESC
        "#))
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
    }

    /// One page of records across employees, newest first
    pub async fn list_filtered(
        &self,
        criteria: &AttendanceCriteria,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttendanceListEntry>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT a.*, e.employee_name, e.location_id AS location_id FROM attendance a \
             JOIN employees e ON e.id = a.employee_id WHERE TRUE",
        );
        push_criteria(&mut query, criteria);
        query
            .push(" ORDER BY a.date DESC, a.check_in_time DESC NULLS LAST LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query
            .build_query_as::<AttendanceListEntry>()
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count_filtered(&self, criteria: &AttendanceCriteria) -> Result<i64, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM attendance a JOIN employees e ON e.id = a.employee_id WHERE TRUE",
        );
        push_criteria(&mut query, criteria);

        query.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    /// Records of active employees within an inclusive date range
    pub async fn list_active_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&sql(r#"
            SELECT
                a.*
            FROM
                attendance a
                JOIN employees e ON e.id = a.employee_id
            WHERE
                e.status = ?
                AND a.date BETWEEN ? AND ?
            ORDER BY
                a.date
        "#))
        .bind(EmployeeStatus::Active)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
    }
}
