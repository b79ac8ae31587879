//! Payroll lines: aggregation and the pending -> paid / cancelled lifecycle.

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::database::models::{
    GeneratePayrollInput, PayrollAmounts, PayrollGenerationSummary, PayrollInput, PayrollLine,
    PayrollStatus,
};
use crate::database::repositories::{EmployeeRepository, PayrollFilter, PayrollRepository};
use crate::error::{AppError, ConflictKind};
use crate::services::auth::Claims;
use crate::services::leave_accrual::round2;

pub const MIN_PAYROLL_YEAR: i32 = 2020;
/// Per-component ceiling; four of them still fit a NUMERIC(12, 2) gross.
pub const MAX_COMPONENT_AMOUNT: i64 = 1_000_000_000;

/// Components used when generating lines in bulk.
pub fn default_amounts() -> PayrollAmounts {
    aggregate(
        BigDecimal::from(5000),
        BigDecimal::from(1000),
        BigDecimal::from(500),
        BigDecimal::zero(),
        BigDecimal::zero(),
    )
}

/// gross = basic + accommodation + allowances + overtime; net = gross - deductions.
pub fn aggregate(
    basic_salary: BigDecimal,
    accommodation: BigDecimal,
    allowances: BigDecimal,
    overtime_amount: BigDecimal,
    deductions: BigDecimal,
) -> PayrollAmounts {
    let gross_salary = round2(&(&basic_salary + &accommodation + &allowances + &overtime_amount));
    let net_salary = round2(&(&gross_salary - &deductions));

    PayrollAmounts {
        basic_salary: round2(&basic_salary),
        accommodation: round2(&accommodation),
        allowances: round2(&allowances),
        overtime_amount: round2(&overtime_amount),
        deductions: round2(&deductions),
        gross_salary,
        net_salary,
    }
}

fn non_negative(name: &str, value: Option<&BigDecimal>) -> Result<BigDecimal, AppError> {
    let value = value.cloned().unwrap_or_else(BigDecimal::zero);
    if value < BigDecimal::zero() {
        return Err(AppError::validation(format!("{} must not be negative", name)));
    }
    if value > BigDecimal::from(MAX_COMPONENT_AMOUNT) {
        return Err(AppError::validation(format!(
            "{} may not exceed {}",
            name, MAX_COMPONENT_AMOUNT
        )));
    }
    Ok(value)
}

/// Default missing components to zero and derive the totals.
pub fn amounts_from_input(input: &PayrollInput) -> Result<PayrollAmounts, AppError> {
    Ok(aggregate(
        non_negative("Basic salary", Some(&input.basic_salary))?,
        non_negative("Accommodation", input.accommodation.as_ref())?,
        non_negative("Allowances", input.allowances.as_ref())?,
        non_negative("Overtime amount", input.overtime_amount.as_ref())?,
        non_negative("Deductions", input.deductions.as_ref())?,
    ))
}

pub fn validate_period(month: i32, year: i32, current_year: i32) -> Result<(), AppError> {
    if !(1..=12).contains(&month) {
        return Err(AppError::validation("Month must be between 1 and 12"));
    }
    if year < MIN_PAYROLL_YEAR || year > current_year + 1 {
        return Err(AppError::validation(format!(
            "Year must be between {} and {}",
            MIN_PAYROLL_YEAR,
            current_year + 1
        )));
    }
    Ok(())
}

/// Why a line outside `pending` refused a mutation.
fn settled_conflict(line: &PayrollLine) -> AppError {
    match line.status {
        PayrollStatus::Paid => AppError::conflict(
            ConflictKind::AlreadyPaid,
            "Payroll has already been paid",
        ),
        PayrollStatus::Cancelled => AppError::conflict(
            ConflictKind::PayrollCancelled,
            "Payroll has been cancelled",
        ),
        PayrollStatus::Pending => AppError::conflict(
            ConflictKind::AlreadyResolved,
            "Payroll was modified concurrently",
        ),
    }
}

#[derive(Clone)]
pub struct PayrollService {
    payroll: PayrollRepository,
    employees: EmployeeRepository,
    timezone: Tz,
}

impl PayrollService {
    pub fn new(payroll: PayrollRepository, employees: EmployeeRepository, timezone: Tz) -> Self {
        Self {
            payroll,
            employees,
            timezone,
        }
    }

    fn current_year(&self, now: DateTime<Utc>) -> i32 {
        now.with_timezone(&self.timezone).year()
    }

    async fn line(&self, id: Uuid) -> Result<PayrollLine, AppError> {
        self.payroll
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payroll not found".to_string()))
    }

    async fn ensure_employee(&self, employee_id: Uuid) -> Result<(), AppError> {
        match self.employees.find_by_id(employee_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!(
                "Employee {} not found",
                employee_id
            ))),
        }
    }

    pub async fn create(
        &self,
        claims: &Claims,
        input: PayrollInput,
        now: DateTime<Utc>,
    ) -> Result<PayrollLine, AppError> {
        claims.require_admin()?;
        validate_period(input.month, input.year, self.current_year(now))?;
        let amounts = amounts_from_input(&input)?;
        self.ensure_employee(input.employee_id).await?;

        let line = self
            .payroll
            .create(input.employee_id, &amounts, input.month, input.year, now)
            .await?;

        log::info!(
            "Payroll {} created for employee {} ({:02}/{}): net {}",
            line.id,
            line.employee_id,
            line.month,
            line.year,
            line.net_salary
        );
        Ok(line)
    }

    pub async fn update(
        &self,
        claims: &Claims,
        id: Uuid,
        input: PayrollInput,
        now: DateTime<Utc>,
    ) -> Result<PayrollLine, AppError> {
        claims.require_admin()?;
        validate_period(input.month, input.year, self.current_year(now))?;
        let amounts = amounts_from_input(&input)?;
        self.ensure_employee(input.employee_id).await?;

        match self
            .payroll
            .update_pending(id, input.employee_id, &amounts, input.month, input.year, now)
            .await?
        {
            Some(line) => {
                log::info!("Payroll {} recomputed: net {}", line.id, line.net_salary);
                Ok(line)
            }
            None => Err(settled_conflict(&self.line(id).await?)),
        }
    }

    pub async fn delete(&self, claims: &Claims, id: Uuid) -> Result<(), AppError> {
        claims.require_admin()?;

        if self.payroll.delete_unpaid(id).await? {
            log::info!("Payroll {} deleted by admin {}", id, claims.user_id());
            return Ok(());
        }

        let line = self.line(id).await?;
        if line.status == PayrollStatus::Paid {
            return Err(AppError::conflict(
                ConflictKind::CannotDeletePaid,
                "Cannot delete paid payroll",
            ));
        }
        Err(settled_conflict(&line))
    }

    /// One-way pending -> paid. A line that is already paid is returned unchanged.
    pub async fn mark_as_paid(
        &self,
        claims: &Claims,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PayrollLine, AppError> {
        claims.require_admin()?;
        let payment_date = now.with_timezone(&self.timezone).date_naive();

        if let Some(line) = self
            .payroll
            .resolve_pending(id, PayrollStatus::Paid, Some(payment_date), now)
            .await?
        {
            log::info!("Payroll {} marked as paid on {}", line.id, payment_date);
            return Ok(line);
        }

        let line = self.line(id).await?;
        match line.status {
            PayrollStatus::Paid => Ok(line),
            _ => Err(settled_conflict(&line)),
        }
    }

    /// pending -> cancelled. Cancelling a cancelled line is a no-op.
    pub async fn cancel(
        &self,
        claims: &Claims,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PayrollLine, AppError> {
        claims.require_admin()?;

        if let Some(line) = self
            .payroll
            .resolve_pending(id, PayrollStatus::Cancelled, None, now)
            .await?
        {
            log::info!("Payroll {} cancelled", line.id);
            return Ok(line);
        }

        let line = self.line(id).await?;
        match line.status {
            PayrollStatus::Cancelled => Ok(line),
            _ => Err(settled_conflict(&line)),
        }
    }

    pub async fn generate(
        &self,
        claims: &Claims,
        input: GeneratePayrollInput,
        now: DateTime<Utc>,
    ) -> Result<PayrollGenerationSummary, AppError> {
        claims.require_admin()?;
        validate_period(input.month, input.year, self.current_year(now))?;
        if input.employee_ids.is_empty() {
            return Err(AppError::validation("At least one employee must be selected"));
        }
        for employee_id in &input.employee_ids {
            self.ensure_employee(*employee_id).await?;
        }

        let amounts = default_amounts();
        let mut summary = PayrollGenerationSummary {
            generated: 0,
            skipped: 0,
        };

        for employee_id in input.employee_ids {
            match self
                .payroll
                .create_if_absent(employee_id, &amounts, input.month, input.year, now)
                .await?
            {
                Some(_) => summary.generated += 1,
                None => summary.skipped += 1,
            }
        }

        log::info!(
            "Generated {} payroll line(s) for {:02}/{}, skipped {} existing",
            summary.generated,
            input.month,
            input.year,
            summary.skipped
        );
        Ok(summary)
    }

    pub async fn list(
        &self,
        claims: &Claims,
        mut filter: PayrollFilter,
    ) -> Result<Vec<PayrollLine>, AppError> {
        if !claims.is_admin() {
            filter.employee_id = Some(self.own_employee_id(claims).await?);
        }
        Ok(self.payroll.list(&filter).await?)
    }

    pub async fn get(&self, claims: &Claims, id: Uuid) -> Result<PayrollLine, AppError> {
        let line = self.line(id).await?;
        if !claims.is_admin() && line.employee_id != self.own_employee_id(claims).await? {
            return Err(AppError::PermissionDenied(
                "You can only view your own payroll".to_string(),
            ));
        }
        Ok(line)
    }

    async fn own_employee_id(&self, claims: &Claims) -> Result<Uuid, AppError> {
        self.employees
            .find_by_user_id(claims.user_id())
            .await?
            .map(|employee| employee.id)
            .ok_or_else(|| AppError::NotFound("Employee profile not found".to_string()))
    }
}
