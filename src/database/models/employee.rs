use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::db_enum;

db_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum EmployeeStatus {
        Active => "active",
        Inactive => "inactive",
        Terminated => "terminated",
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub user_id: Uuid,
    pub employee_name: String,
    pub department_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    /// User id of the reporting manager.
    pub reporting_manager_id: Option<Uuid>,
    pub visa_start_date: Option<NaiveDate>,
    /// Cached snapshot; policy checks recompute from history.
    pub annual_leave_balance: BigDecimal,
    pub medical_leave_balance: BigDecimal,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    pub user_id: Uuid,
    pub employee_name: String,
    pub department_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub reporting_manager_id: Option<Uuid>,
    pub visa_start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalanceOverrideInput {
    pub annual_leave_balance: BigDecimal,
    pub medical_leave_balance: BigDecimal,
    pub reason: String,
}
