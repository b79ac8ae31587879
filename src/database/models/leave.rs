use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::db_enum;

db_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LeaveType {
        Annual => "annual",
        Medical => "medical",
        Emergency => "emergency",
    }
}

db_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_requested: i32,
    pub reason: String,
    pub manager_status: ApprovalStatus,
    pub manager_comments: Option<String>,
    pub manager_approved_at: Option<DateTime<Utc>>,
    pub admin_status: ApprovalStatus,
    pub admin_comments: Option<String>,
    pub admin_approved_at: Option<DateTime<Utc>>,
    pub overall_status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestInput {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveDecisionInput {
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestFilter {
    pub manager_status: Option<ApprovalStatus>,
    pub overall_status: Option<ApprovalStatus>,
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Approved days of one leave type; the input to balance recomputation.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ApprovedLeave {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub days_requested: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub months_worked: BigDecimal,
    pub annual_accrued: BigDecimal,
    pub annual_used: BigDecimal,
    pub annual_available: BigDecimal,
    pub medical_used: BigDecimal,
    pub medical_available: BigDecimal,
    pub can_apply_annual: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveReportEntry {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub visa_start_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub balance: LeaveBalance,
}

/// The three status columns of a request, read or written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveStages {
    pub manager: ApprovalStatus,
    pub admin: ApprovalStatus,
    pub overall: ApprovalStatus,
}

impl LeaveStages {
    pub fn of(request: &LeaveRequest) -> Self {
        Self {
            manager: request.manager_status,
            admin: request.admin_status,
            overall: request.overall_status,
        }
    }
}

/// A compare-and-swap step: applied only while the row still holds `from`.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveTransition {
    pub from: LeaveStages,
    pub to: LeaveStages,
    pub manager_comments: Option<String>,
    pub manager_approved_at: Option<DateTime<Utc>>,
    pub admin_comments: Option<String>,
    pub admin_approved_at: Option<DateTime<Utc>>,
}
