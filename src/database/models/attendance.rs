use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::db_enum;

db_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum Shift {
        #[default]
        Morning => "morning",
        Evening => "evening",
        FullTime => "full-time",
    }
}

db_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum AttendanceStatus {
        Absent => "absent",
        CheckedIn => "checked_in",
        Present => "present",
        Late => "late",
        HalfDay => "half_day",
    }
}

/// One row per (employee, date, shift).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub shift: Shift,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_in_latitude: Option<f64>,
    pub check_in_longitude: Option<f64>,
    pub check_in_address: Option<String>,
    pub check_in_accuracy: Option<f64>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub check_out_address: Option<String>,
    pub check_out_accuracy: Option<f64>,
    pub total_hours: Option<BigDecimal>,
    pub notes: Option<String>,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInInput {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub address: Option<String>,
    pub shift: Option<Shift>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutInput {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Validated position attached to a check-in or check-out.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReading {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAttendanceStats {
    pub total_days: i64,
    pub present_days: i64,
    pub absent_days: i64,
    pub late_days: i64,
    pub half_days: i64,
    pub total_hours: BigDecimal,
    /// Mean over records that carry hours; zero when none do.
    pub average_hours: BigDecimal,
}

/// Admin listing filters. `month` (`YYYY-MM`) narrows the date range further.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceFilter {
    pub employee: Option<String>,
    pub location_id: Option<Uuid>,
    pub status: Option<AttendanceStatus>,
    pub shift: Option<Shift>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub month: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub employee_name: String,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePage {
    pub records: Vec<AttendanceListEntry>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReportEntry {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub location_id: Option<Uuid>,
    #[serde(flatten)]
    pub stats: MonthlyAttendanceStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub employees: Vec<AttendanceReportEntry>,
}
