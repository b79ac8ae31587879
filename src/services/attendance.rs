//! Check-in / check-out sessions keyed by (employee, date, shift).

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use std::collections::HashMap;
use uuid::Uuid;

use crate::config::AttendanceSettings;
use crate::database::models::{
    AttendanceFilter, AttendancePage, AttendanceRecord, AttendanceReport, AttendanceReportEntry,
    AttendanceReportQuery, AttendanceStatus, CheckInInput, CheckOutInput, Employee, GeoReading,
    MonthlyAttendanceStats, Role,
};
use crate::database::repositories::{
    AttendanceCriteria, AttendanceRepository, EmployeeRepository, LocationRepository,
};
use crate::error::{AppError, ConflictKind};
use crate::services::auth::Claims;
use crate::services::geocoding::Geocoder;
use crate::services::geofence::{self, GeoPoint};
use crate::services::leave_accrual::round2;

pub const AUTO_CHECKOUT_ADDRESS: &str = "System Auto Checkout";
pub const MAX_ADDRESS_LEN: usize = 500;
pub const MAX_NOTES_LEN: usize = 1000;
pub const DEFAULT_PAGE_SIZE: i64 = 15;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInOutcome {
    pub record: AttendanceRecord,
    /// Local wall-clock time, `hh:mm AM/PM`.
    pub check_in_time: String,
    pub within_office_radius: bool,
    pub distance_meters: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutOutcome {
    pub record: AttendanceRecord,
    pub check_out_time: String,
    pub total_hours: BigDecimal,
    pub work_duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAttendance {
    pub month: String,
    pub records: Vec<AttendanceRecord>,
    pub stats: MonthlyAttendanceStats,
}

/// Validate a reported position and return it as a point.
pub fn validate_position(
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    address: Option<&str>,
) -> Result<GeoPoint, AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::validation("Latitude must be between -90 and 90"));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::validation("Longitude must be between -180 and 180"));
    }
    if let Some(accuracy) = accuracy {
        if !accuracy.is_finite() || accuracy < 0.0 {
            return Err(AppError::validation("Accuracy must be a non-negative number"));
        }
    }
    if address.is_some_and(|a| a.chars().count() > MAX_ADDRESS_LEN) {
        return Err(AppError::validation(format!(
            "Address may not exceed {} characters",
            MAX_ADDRESS_LEN
        )));
    }

    Ok(GeoPoint::new(latitude, longitude))
}

fn validate_notes(notes: Option<&str>) -> Result<Option<String>, AppError> {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(AppError::validation(format!(
            "Notes may not exceed {} characters",
            MAX_NOTES_LEN
        )));
    }
    Ok(notes.map(str::to_string))
}

/// Whole minutes between check-in and check-out, never negative.
pub fn worked_minutes(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i64 {
    (check_out - check_in).num_minutes().max(0)
}

/// Minutes as hours, rounded half-up to two decimals.
pub fn total_hours(minutes: i64) -> BigDecimal {
    round2(&(BigDecimal::from(minutes) / BigDecimal::from(60)))
}

pub fn auto_checkout_note(hours_after_checkin: i64) -> String {
    format!(
        "Automatically checked out by system {} hours after check-in",
        hours_after_checkin
    )
}

pub fn format_clock(time: DateTime<Utc>, timezone: Tz) -> String {
    time.with_timezone(&timezone).format("%I:%M %p").to_string()
}

/// First and last day of a `YYYY-MM` month.
pub fn month_bounds(month: &str) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| AppError::validation("Month must be formatted as YYYY-MM"))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| AppError::validation("Month is out of range"))?;

    Ok((first, last))
}

pub fn monthly_stats(records: &[AttendanceRecord]) -> MonthlyAttendanceStats {
    let count = |status: AttendanceStatus| {
        records.iter().filter(|r| r.status == status).count() as i64
    };
    let hours: Vec<&BigDecimal> = records.iter().filter_map(|r| r.total_hours.as_ref()).collect();
    let total_hours = hours
        .iter()
        .fold(BigDecimal::zero(), |sum, hours| sum + *hours);
    let average_hours = if hours.is_empty() {
        BigDecimal::zero()
    } else {
        &total_hours / BigDecimal::from(hours.len() as i64)
    };

    MonthlyAttendanceStats {
        total_days: records.len() as i64,
        present_days: count(AttendanceStatus::Present) + count(AttendanceStatus::Late),
        absent_days: count(AttendanceStatus::Absent),
        late_days: count(AttendanceStatus::Late),
        half_days: count(AttendanceStatus::HalfDay),
        total_hours: round2(&total_hours),
        average_hours: round2(&average_hours),
    }
}

/// Turn admin listing filters into repository criteria plus `(page, per_page)`.
pub fn listing_criteria(
    filter: &AttendanceFilter,
) -> Result<(AttendanceCriteria, i64, i64), AppError> {
    let (mut from, mut to) = (filter.date_from, filter.date_to);
    if let Some(month) = filter.month.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        let (first, last) = month_bounds(month)?;
        from = Some(from.map_or(first, |d| d.max(first)));
        to = Some(to.map_or(last, |d| d.min(last)));
    }
    if let (Some(start), Some(end)) = (from, to) {
        if start > end {
            return Err(AppError::validation("Start date must not be after end date"));
        }
    }

    let page = filter.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::validation("Page must be at least 1"));
    }
    let per_page = filter.per_page.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&per_page) {
        return Err(AppError::validation(format!(
            "Page size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    let criteria = AttendanceCriteria {
        employee_name: filter
            .employee
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        location_id: filter.location_id,
        status: filter.status,
        shift: filter.shift,
        from,
        to,
    };
    Ok((criteria, page, per_page))
}

/// Report window; defaults to the month containing `today`.
pub fn report_range(
    query: &AttendanceReportQuery,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let (month_start, month_end) = month_bounds(&format!("{:04}-{:02}", today.year(), today.month()))?;
    let from = query.start_date.unwrap_or(month_start);
    let to = query.end_date.unwrap_or(month_end);
    if from > to {
        return Err(AppError::validation("Start date must not be after end date"));
    }
    Ok((from, to))
}

/// Per-employee totals; employees without records still get a zeroed row.
pub fn build_report(
    employees: Vec<Employee>,
    records: Vec<AttendanceRecord>,
) -> Vec<AttendanceReportEntry> {
    let mut by_employee: HashMap<Uuid, Vec<AttendanceRecord>> = HashMap::new();
    for record in records {
        by_employee.entry(record.employee_id).or_default().push(record);
    }

    employees
        .into_iter()
        .map(|employee| {
            let own = by_employee.remove(&employee.id).unwrap_or_default();
            AttendanceReportEntry {
                employee_id: employee.id,
                employee_name: employee.employee_name,
                location_id: employee.location_id,
                stats: monthly_stats(&own),
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct AttendanceService {
    attendance: AttendanceRepository,
    employees: EmployeeRepository,
    locations: LocationRepository,
    geocoder: Geocoder,
    timezone: Tz,
}

impl AttendanceService {
    pub fn new(
        attendance: AttendanceRepository,
        employees: EmployeeRepository,
        locations: LocationRepository,
        geocoder: Geocoder,
        timezone: Tz,
    ) -> Self {
        Self {
            attendance,
            employees,
            locations,
            geocoder,
            timezone,
        }
    }

    fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    async fn employee_for(&self, claims: &Claims) -> Result<Employee, AppError> {
        self.employees
            .find_by_user_id(claims.user_id())
            .await?
            .ok_or_else(|| AppError::NotFound("Employee profile not found".to_string()))
    }

    pub async fn check_in(
        &self,
        claims: &Claims,
        input: CheckInInput,
        settings: &AttendanceSettings,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, AppError> {
        claims.require_any(&[Role::Employee, Role::Manager])?;
        let point = validate_position(
            input.latitude,
            input.longitude,
            input.accuracy,
            input.address.as_deref(),
        )?;

        let employee = self.employee_for(claims).await?;
        let date = self.local_date(now);
        let shift = input.shift.unwrap_or_default();

        if let Some(existing) = self.attendance.find_for_key(employee.id, date, shift).await? {
            if existing.check_in_time.is_some() {
                return Err(already_checked_in());
            }
        }

        let location = match employee.location_id {
            Some(location_id) => self.locations.find_by_id(location_id).await?,
            None => None,
        };
        let fence = geofence::enforce_check_in(point, location.as_ref())?;

        if let Some(accuracy) = input.accuracy {
            if accuracy > settings.min_location_accuracy {
                log::warn!(
                    "Imprecise check-in location for employee {}: accuracy {:.0} m exceeds {:.0} m",
                    employee.id,
                    accuracy,
                    settings.min_location_accuracy
                );
            }
        }

        let address = self
            .geocoder
            .resolve_address(point, input.address.as_deref())
            .await;
        let reading = GeoReading {
            latitude: point.latitude,
            longitude: point.longitude,
            address,
            accuracy: input.accuracy,
        };

        let record = self
            .attendance
            .check_in(employee.id, date, shift, &reading, now)
            .await?
            .ok_or_else(already_checked_in)?;

        log::info!(
            "Employee {} checked in for {} shift on {} ({})",
            employee.id,
            shift,
            date,
            match fence.distance_meters {
                Some(distance) => format!("{:.0} m from office", distance),
                None => "no geofence".to_string(),
            }
        );

        Ok(CheckInOutcome {
            check_in_time: format_clock(now, self.timezone),
            within_office_radius: fence.within_office_radius,
            distance_meters: fence.distance_meters,
            record,
        })
    }

    pub async fn check_out(
        &self,
        claims: &Claims,
        input: CheckOutInput,
        now: DateTime<Utc>,
    ) -> Result<CheckOutOutcome, AppError> {
        claims.require_any(&[Role::Employee, Role::Manager])?;
        let point = validate_position(
            input.latitude,
            input.longitude,
            input.accuracy,
            input.address.as_deref(),
        )?;
        let notes = validate_notes(input.notes.as_deref())?;

        let employee = self.employee_for(claims).await?;
        let date = self.local_date(now);

        let open = self
            .attendance
            .find_open_for_date(employee.id, date)
            .await?
            .ok_or_else(no_active_check_in)?;
        let check_in_time = open.check_in_time.ok_or_else(no_active_check_in)?;

        let minutes = worked_minutes(check_in_time, now);
        let hours = total_hours(minutes);

        let address = self
            .geocoder
            .resolve_address(point, input.address.as_deref())
            .await;
        let reading = GeoReading {
            latitude: point.latitude,
            longitude: point.longitude,
            address,
            accuracy: input.accuracy,
        };

        let record = self
            .attendance
            .close_session(open.id, &reading, &hours, notes.as_deref(), now)
            .await?
            .ok_or_else(no_active_check_in)?;

        log::info!(
            "Employee {} checked out of {} shift on {} after {} minutes",
            employee.id,
            record.shift,
            date,
            minutes
        );

        Ok(CheckOutOutcome {
            check_out_time: format_clock(now, self.timezone),
            total_hours: hours,
            work_duration_minutes: minutes,
            record,
        })
    }

    pub fn start_break(&self) -> Result<(), AppError> {
        Err(AppError::Unsupported(
            "Break tracking is disabled".to_string(),
        ))
    }

    pub fn end_break(&self) -> Result<(), AppError> {
        Err(AppError::Unsupported(
            "Break tracking is disabled".to_string(),
        ))
    }

    /// Close sessions left open longer than the configured cutoff. Returns how many were closed.
    pub async fn auto_checkout(
        &self,
        settings: &AttendanceSettings,
        as_of: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        if !settings.auto_checkout_enabled {
            log::debug!("Auto checkout is disabled; skipping sweep");
            return Ok(0);
        }

        let cutoff = Duration::try_hours(settings.hours_after_checkin)
            .filter(|window| *window > Duration::zero())
            .and_then(|window| as_of.checked_sub_signed(window))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Auto checkout cutoff of {} hours is out of range",
                    settings.hours_after_checkin
                ))
            })?;
        let overdue = self.attendance.list_open_before(cutoff).await?;
        let note = auto_checkout_note(settings.hours_after_checkin);
        let sentinel = GeoReading {
            latitude: 0.0,
            longitude: 0.0,
            address: AUTO_CHECKOUT_ADDRESS.to_string(),
            accuracy: Some(0.0),
        };

        let mut processed = 0;
        let mut failed = 0;
        for record in overdue {
            let Some(check_in_time) = record.check_in_time else {
                continue;
            };
            let hours = total_hours(worked_minutes(check_in_time, as_of));

            match self
                .attendance
                .close_session(record.id, &sentinel, &hours, Some(&note), as_of)
                .await
            {
                Ok(Some(_)) => processed += 1,
                Ok(None) => {
                    log::debug!("Session {} closed before auto checkout reached it", record.id)
                }
                Err(e) => {
                    failed += 1;
                    log::error!(
                        "Auto checkout failed for session {} (employee {}): {}",
                        record.id,
                        record.employee_id,
                        e
                    );
                }
            }
        }

        log::info!(
            "Auto checkout closed {} session(s) checked in before {}, {} failed",
            processed,
            cutoff,
            failed
        );

        Ok(processed)
    }

    pub async fn monthly(
        &self,
        claims: &Claims,
        month: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<MonthlyAttendance, AppError> {
        let month = match month {
            Some(month) => month.trim().to_string(),
            None => {
                let today = self.local_date(now);
                format!("{:04}-{:02}", today.year(), today.month())
            }
        };
        let (from, to) = month_bounds(&month)?;

        let employee = self.employee_for(claims).await?;
        let records = self.attendance.list_between(employee.id, from, to).await?;
        let stats = monthly_stats(&records);

        Ok(MonthlyAttendance {
            month,
            records,
            stats,
        })
    }

    /// Records across all employees, filtered and paginated.
    pub async fn list_all(
        &self,
        claims: &Claims,
        filter: &AttendanceFilter,
    ) -> Result<AttendancePage, AppError> {
        claims.require_admin()?;
        let (criteria, page, per_page) = listing_criteria(filter)?;

        let total = self.attendance.count_filtered(&criteria).await?;
        let records = self
            .attendance
            .list_filtered(&criteria, per_page, (page - 1) * per_page)
            .await?;

        Ok(AttendancePage {
            records,
            page,
            per_page,
            total,
        })
    }

    /// Per-employee attendance totals for active employees over a date range.
    pub async fn report(
        &self,
        claims: &Claims,
        query: &AttendanceReportQuery,
        now: DateTime<Utc>,
    ) -> Result<AttendanceReport, AppError> {
        claims.require_admin()?;
        let (start_date, end_date) = report_range(query, self.local_date(now))?;

        let employees = self.employees.list_active().await?;
        let records = self
            .attendance
            .list_active_between(start_date, end_date)
            .await?;

        Ok(AttendanceReport {
            start_date,
            end_date,
            employees: build_report(employees, records),
        })
    }

    pub async fn today(
        &self,
        claims: &Claims,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let employee = self.employee_for(claims).await?;
        let today = self.local_date(now);
        Ok(self.attendance.list_between(employee.id, today, today).await?)
    }
}

fn already_checked_in() -> AppError {
    AppError::conflict(
        ConflictKind::AlreadyCheckedIn,
        "Already checked in for this shift today",
    )
}

fn no_active_check_in() -> AppError {
    AppError::conflict(
        ConflictKind::NoActiveCheckIn,
        "No active check-in found for today",
    )
}
