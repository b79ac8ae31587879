//! Leave balances derived from the visa start date and approved history.
//!
//! Nothing here reads the cached balance columns on `employees`; those are a
//! snapshot written by [`snapshot`] for display only.

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::database::models::{ApprovedLeave, LeaveBalance, LeaveType};
use crate::error::{AppError, PolicyKind};

pub const MEDICAL_ENTITLEMENT_DAYS: i64 = 14;
pub const ANNUAL_ELIGIBILITY_DAYS: i64 = 30;
const DAYS_PER_PARTIAL_MONTH: u32 = 30;

/// 2.5 days per month worked.
fn annual_rate() -> BigDecimal {
    BigDecimal::from(5) / BigDecimal::from(2)
}

pub fn round2(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// Whole calendar months since `visa_start` plus the remaining days over 30.
pub fn months_worked(visa_start: NaiveDate, today: NaiveDate) -> BigDecimal {
    if visa_start >= today {
        return BigDecimal::zero();
    }

    let mut whole = (today.year() - visa_start.year()) * 12 + today.month() as i32
        - visa_start.month() as i32;
    let mut anniversary = add_months(visa_start, whole);
    if anniversary > today {
        whole -= 1;
        anniversary = add_months(visa_start, whole);
    }

    let remaining_days = (today - anniversary).num_days();

    BigDecimal::from(whole)
        + BigDecimal::from(remaining_days) / BigDecimal::from(DAYS_PER_PARTIAL_MONTH)
}

// Month arithmetic clamps to the last day of shorter months.
fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    date.checked_add_months(Months::new(months.max(0) as u32))
        .unwrap_or(date)
}

pub fn annual_accrued(visa_start: Option<NaiveDate>, today: NaiveDate) -> BigDecimal {
    match visa_start {
        Some(start) => round2(&(months_worked(start, today) * annual_rate())),
        None => round2(&BigDecimal::zero()),
    }
}

pub fn can_apply_annual(visa_start: Option<NaiveDate>, today: NaiveDate) -> bool {
    visa_start.is_some_and(|start| start + Duration::days(ANNUAL_ELIGIBILITY_DAYS) <= today)
}

/// Start of the current leave year: this year's visa anniversary when the visa
/// started in an earlier year, otherwise the visa start itself.
pub fn year_anchor(visa_start: NaiveDate, today: NaiveDate) -> NaiveDate {
    if visa_start.year() >= today.year() {
        return visa_start;
    }

    NaiveDate::from_ymd_opt(today.year(), visa_start.month(), visa_start.day())
        // Feb 29 anniversaries land on Mar 1 outside leap years.
        .or_else(|| NaiveDate::from_ymd_opt(today.year(), 3, 1))
        .unwrap_or(visa_start)
}

pub fn used_days(
    history: &[ApprovedLeave],
    leave_type: LeaveType,
    visa_start: Option<NaiveDate>,
    today: NaiveDate,
) -> BigDecimal {
    let Some(start) = visa_start else {
        return BigDecimal::zero();
    };
    let anchor = year_anchor(start, today);

    let total: i64 = history
        .iter()
        .filter(|leave| leave.leave_type == leave_type && leave.start_date >= anchor)
        .map(|leave| i64::from(leave.days_requested))
        .sum();

    BigDecimal::from(total)
}

fn non_negative(value: BigDecimal) -> BigDecimal {
    if value < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        value
    }
}

pub fn compute_balance(
    visa_start: Option<NaiveDate>,
    history: &[ApprovedLeave],
    today: NaiveDate,
) -> LeaveBalance {
    let months = visa_start
        .map(|start| months_worked(start, today))
        .unwrap_or_else(BigDecimal::zero);
    let annual_accrued = annual_accrued(visa_start, today);
    let annual_used = used_days(history, LeaveType::Annual, visa_start, today);
    let medical_used = used_days(history, LeaveType::Medical, visa_start, today);

    let annual_available = round2(&non_negative(&annual_accrued - &annual_used));
    let medical_available = round2(&non_negative(
        BigDecimal::from(MEDICAL_ENTITLEMENT_DAYS) - &medical_used,
    ));

    LeaveBalance {
        months_worked: round2(&months),
        annual_accrued,
        annual_used: round2(&annual_used),
        annual_available,
        medical_used: round2(&medical_used),
        medical_available,
        can_apply_annual: can_apply_annual(visa_start, today),
    }
}

/// Values written to the cached balance columns.
pub fn snapshot(balance: &LeaveBalance) -> (BigDecimal, BigDecimal) {
    (
        balance.annual_available.clone(),
        balance.medical_available.clone(),
    )
}

/// Gate applied when a request is submitted.
pub fn check_submission(
    leave_type: LeaveType,
    days_requested: i32,
    balance: &LeaveBalance,
) -> Result<(), AppError> {
    if leave_type == LeaveType::Annual && !balance.can_apply_annual {
        return Err(AppError::policy(
            PolicyKind::TooEarly,
            format!(
                "Annual leave can only be applied after {} days from the visa start date",
                ANNUAL_ELIGIBILITY_DAYS
            ),
        ));
    }

    check_available(leave_type, days_requested, balance)
}

/// Balance gate re-applied at approval time. Emergency leave is never balance-limited.
pub fn check_available(
    leave_type: LeaveType,
    days_requested: i32,
    balance: &LeaveBalance,
) -> Result<(), AppError> {
    let available = match leave_type {
        LeaveType::Annual => &balance.annual_available,
        LeaveType::Medical => &balance.medical_available,
        LeaveType::Emergency => return Ok(()),
    };

    if BigDecimal::from(days_requested) > *available {
        return Err(AppError::policy(
            PolicyKind::InsufficientBalance,
            format!(
                "Insufficient {} leave balance. Available: {} days, requested: {} days",
                leave_type, available, days_requested
            ),
        ));
    }

    Ok(())
}
