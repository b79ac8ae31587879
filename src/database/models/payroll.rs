use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::db_enum;

db_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PayrollStatus {
        Pending => "pending",
        Paid => "paid",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PayrollLine {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub basic_salary: BigDecimal,
    pub accommodation: BigDecimal,
    pub allowances: BigDecimal,
    pub overtime_amount: BigDecimal,
    pub deductions: BigDecimal,
    pub gross_salary: BigDecimal,
    pub net_salary: BigDecimal,
    pub month: i32,
    pub year: i32,
    pub payment_date: Option<NaiveDate>,
    pub status: PayrollStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollInput {
    pub employee_id: Uuid,
    pub basic_salary: BigDecimal,
    pub accommodation: Option<BigDecimal>,
    pub allowances: Option<BigDecimal>,
    pub overtime_amount: Option<BigDecimal>,
    pub deductions: Option<BigDecimal>,
    pub month: i32,
    pub year: i32,
}

/// Fully-defaulted salary components with derived totals.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollAmounts {
    pub basic_salary: BigDecimal,
    pub accommodation: BigDecimal,
    pub allowances: BigDecimal,
    pub overtime_amount: BigDecimal,
    pub deductions: BigDecimal,
    pub gross_salary: BigDecimal,
    pub net_salary: BigDecimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayrollInput {
    pub month: i32,
    pub year: i32,
    pub employee_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollGenerationSummary {
    pub generated: usize,
    pub skipped: usize,
}
