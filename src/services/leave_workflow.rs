//! Two-stage (manager, then admin) leave approval.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{
    ApprovalStatus, Employee, LeaveBalance, LeaveBalanceOverrideInput, LeaveReportEntry,
    LeaveRequest, LeaveRequestFilter, LeaveRequestInput, LeaveStages, LeaveTransition,
    LeaveType, Role,
};
use crate::database::repositories::{
    EmployeeRepository, LeaveRepository, LeaveScope, employee, leave,
};
use crate::database::transaction;
use crate::error::{AppError, ConflictKind};
use crate::services::auth::Claims;
use crate::services::leave_accrual::{self, MEDICAL_ENTITLEMENT_DAYS};

pub const MAX_REASON_LEN: usize = 1000;
pub const MAX_COMMENTS_LEN: usize = 1000;
pub const MAX_OVERRIDE_REASON_LEN: usize = 500;
pub const MAX_ANNUAL_OVERRIDE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveAction {
    ManagerApprove,
    ManagerReject,
    AdminApprove,
    AdminReject,
}

impl LeaveAction {
    pub fn is_approval(&self) -> bool {
        matches!(self, LeaveAction::ManagerApprove | LeaveAction::AdminApprove)
    }
}

/// Overall status implied by the two stages.
pub fn overall_status(manager: ApprovalStatus, admin: ApprovalStatus) -> ApprovalStatus {
    use ApprovalStatus::*;
    match (manager, admin) {
        (Rejected, _) | (_, Rejected) => Rejected,
        (Approved, Approved) => Approved,
        _ => Pending,
    }
}

/// Stages a new request starts in. Managers approve their own requests at submit.
pub fn initial_stages(submitter: Role) -> LeaveStages {
    let manager = if submitter == Role::Manager {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Pending
    };
    LeaveStages {
        manager,
        admin: ApprovalStatus::Pending,
        overall: ApprovalStatus::Pending,
    }
}

/// Validate submission fields and return the inclusive day count.
pub fn validate_submission(input: &LeaveRequestInput, today: NaiveDate) -> Result<i32, AppError> {
    let reason = input.reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation("A reason is required"));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(AppError::validation(format!(
            "Reason may not exceed {} characters",
            MAX_REASON_LEN
        )));
    }
    if input.start_date < today {
        return Err(AppError::validation("Start date cannot be in the past"));
    }
    if input.end_date < input.start_date {
        return Err(AppError::validation(
            "End date must be on or after the start date",
        ));
    }

    let days = (input.end_date - input.start_date).num_days() + 1;
    i32::try_from(days).map_err(|_| AppError::validation("Leave period is too long"))
}

pub fn validate_comments(comments: Option<&str>, required: bool) -> Result<Option<String>, AppError> {
    let comments = comments.map(str::trim).filter(|c| !c.is_empty());
    match comments {
        None if required => Err(AppError::validation("Comments are required when rejecting")),
        Some(c) if c.chars().count() > MAX_COMMENTS_LEN => Err(AppError::validation(format!(
            "Comments may not exceed {} characters",
            MAX_COMMENTS_LEN
        ))),
        other => Ok(other.map(str::to_string)),
    }
}

/// Compute the next stage statuses for `action`, or the conflict that forbids it.
pub fn plan_transition(
    current: LeaveStages,
    action: LeaveAction,
    leave_type: LeaveType,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> Result<LeaveTransition, AppError> {
    if current.overall != ApprovalStatus::Pending {
        return Err(AppError::conflict(
            ConflictKind::AlreadyResolved,
            format!("Leave request has already been {}", current.overall),
        ));
    }

    let mut transition = LeaveTransition {
        from: current,
        to: current,
        manager_comments: None,
        manager_approved_at: None,
        admin_comments: None,
        admin_approved_at: None,
    };

    match action {
        LeaveAction::ManagerApprove | LeaveAction::ManagerReject => {
            if current.manager != ApprovalStatus::Pending {
                return Err(stage_not_pending("manager", current.manager));
            }
            transition.manager_comments = comments;

            if action == LeaveAction::ManagerReject {
                transition.to.manager = ApprovalStatus::Rejected;
            } else {
                transition.to.manager = ApprovalStatus::Approved;
                transition.manager_approved_at = Some(now);
                // Emergency leave skips the admin stage.
                if leave_type == LeaveType::Emergency {
                    transition.to.admin = ApprovalStatus::Approved;
                    transition.admin_approved_at = Some(now);
                }
            }
        }
        LeaveAction::AdminApprove | LeaveAction::AdminReject => {
            if current.admin != ApprovalStatus::Pending {
                return Err(stage_not_pending("admin", current.admin));
            }
            if action == LeaveAction::AdminApprove && current.manager != ApprovalStatus::Approved {
                return Err(AppError::conflict(
                    ConflictKind::AwaitingManagerApproval,
                    "Leave request is awaiting manager approval",
                ));
            }
            transition.admin_comments = comments;

            if action == LeaveAction::AdminReject {
                transition.to.admin = ApprovalStatus::Rejected;
            } else {
                transition.to.admin = ApprovalStatus::Approved;
                transition.admin_approved_at = Some(now);
            }
        }
    }

    transition.to.overall = overall_status(transition.to.manager, transition.to.admin);
    Ok(transition)
}

fn stage_not_pending(stage: &str, status: ApprovalStatus) -> AppError {
    AppError::conflict(
        ConflictKind::StageNotPending,
        format!("The {} stage has already been {}", stage, status),
    )
}

fn validate_override(input: &LeaveBalanceOverrideInput) -> Result<String, AppError> {
    use bigdecimal::{BigDecimal, Zero};

    if input.annual_leave_balance < BigDecimal::zero()
        || input.annual_leave_balance > BigDecimal::from(MAX_ANNUAL_OVERRIDE)
    {
        return Err(AppError::validation(format!(
            "Annual leave balance must be between 0 and {}",
            MAX_ANNUAL_OVERRIDE
        )));
    }
    if input.medical_leave_balance < BigDecimal::zero()
        || input.medical_leave_balance > BigDecimal::from(MEDICAL_ENTITLEMENT_DAYS)
    {
        return Err(AppError::validation(format!(
            "Medical leave balance must be between 0 and {}",
            MEDICAL_ENTITLEMENT_DAYS
        )));
    }

    let reason = input.reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation("A reason is required"));
    }
    if reason.chars().count() > MAX_OVERRIDE_REASON_LEN {
        return Err(AppError::validation(format!(
            "Reason may not exceed {} characters",
            MAX_OVERRIDE_REASON_LEN
        )));
    }
    Ok(reason.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSyncSummary {
    pub processed: usize,
    pub updated: usize,
}

#[derive(Clone)]
pub struct LeaveService {
    pool: PgPool,
    leave: LeaveRepository,
    employees: EmployeeRepository,
    timezone: Tz,
}

impl LeaveService {
    pub fn new(
        pool: PgPool,
        leave: LeaveRepository,
        employees: EmployeeRepository,
        timezone: Tz,
    ) -> Self {
        Self {
            pool,
            leave,
            employees,
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

    async fn request(&self, id: Uuid) -> Result<LeaveRequest, AppError> {
        self.leave
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))
    }

    async fn balance_for(
        &self,
        employee: &Employee,
        now: DateTime<Utc>,
    ) -> Result<LeaveBalance, AppError> {
        let history = self.leave.approved_history(employee.id).await?;
        Ok(leave_accrual::compute_balance(
            employee.visa_start_date,
            &history,
            self.local_date(now),
        ))
    }

    pub async fn submit(
        &self,
        claims: &Claims,
        input: LeaveRequestInput,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, AppError> {
        claims.require_any(&[Role::Employee, Role::Manager])?;
        let today = self.local_date(now);
        let days = validate_submission(&input, today)?;

        let employee = self.employee_for(claims).await?;
        let balance = self.balance_for(&employee, now).await?;
        leave_accrual::check_submission(input.leave_type, days, &balance)?;

        let stages = initial_stages(claims.role);
        let manager_approved_at = (stages.manager == ApprovalStatus::Approved).then_some(now);

        let request = self
            .leave
            .create(employee.id, &input, days, stages, manager_approved_at, now)
            .await?;

        log::info!(
            "Leave request {} submitted by employee {}: {} leave, {} day(s) from {}",
            request.id,
            employee.id,
            request.leave_type,
            days,
            request.start_date
        );

        Ok(request)
    }

    pub async fn manager_decide(
        &self,
        claims: &Claims,
        id: Uuid,
        approve: bool,
        comments: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, AppError> {
        let comments = validate_comments(comments, !approve)?;
        let request = self.request(id).await?;
        let employee = self
            .employees
            .find_by_id(request.employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;

        if employee.reporting_manager_id != Some(claims.user_id()) {
            return Err(AppError::PermissionDenied(
                "Only the employee's reporting manager can act on this request".to_string(),
            ));
        }

        let action = if approve {
            LeaveAction::ManagerApprove
        } else {
            LeaveAction::ManagerReject
        };
        self.decide(claims, request, action, comments, now).await
    }

    pub async fn admin_decide(
        &self,
        claims: &Claims,
        id: Uuid,
        approve: bool,
        comments: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, AppError> {
        claims.require_admin()?;
        let comments = validate_comments(comments, !approve)?;
        let request = self.request(id).await?;

        let action = if approve {
            LeaveAction::AdminApprove
        } else {
            LeaveAction::AdminReject
        };
        self.decide(claims, request, action, comments, now).await
    }

    async fn decide(
        &self,
        claims: &Claims,
        request: LeaveRequest,
        action: LeaveAction,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, AppError> {
        let transition = plan_transition(
            LeaveStages::of(&request),
            action,
            request.leave_type,
            comments,
            now,
        )?;

        let updated = if action.is_approval() {
            self.approve_with_balance_check(&request, &transition, now)
                .await?
        } else {
            self.leave
                .apply_transition(request.id, &transition, now)
                .await?
                .ok_or_else(lost_race)?
        };

        log::info!(
            "Leave request {} {:?} by user {}: manager={}, admin={}, overall={}",
            updated.id,
            action,
            claims.user_id(),
            updated.manager_status,
            updated.admin_status,
            updated.overall_status
        );

        Ok(updated)
    }

    /// Re-check the balance under a row lock on the employee, then apply.
    async fn approve_with_balance_check(
        &self,
        request: &LeaveRequest,
        transition: &LeaveTransition,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, AppError> {
        let today = self.local_date(now);
        let mut tx = transaction::begin(&self.pool).await?;

        let outcome = async {
            let employee = employee::lock_for_update(&mut tx, request.employee_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;

            let history = leave::approved_history(&mut *tx, employee.id).await?;
            let balance =
                leave_accrual::compute_balance(employee.visa_start_date, &history, today);
            leave_accrual::check_available(request.leave_type, request.days_requested, &balance)?;

            leave::apply_transition(&mut *tx, request.id, transition, now)
                .await?
                .ok_or_else(lost_race)
        }
        .await;

        transaction::finish(tx, outcome).await
    }

    pub async fn get(&self, claims: &Claims, id: Uuid) -> Result<LeaveRequest, AppError> {
        let request = self.request(id).await?;

        let visible = match claims.role {
            Role::Admin => true,
            Role::Manager | Role::Employee => {
                let owner = self.employees.find_by_id(request.employee_id).await?;
                owner.is_some_and(|e| {
                    e.user_id == claims.user_id()
                        || e.reporting_manager_id == Some(claims.user_id())
                })
            }
        };

        if !visible {
            return Err(AppError::PermissionDenied(
                "You cannot view this leave request".to_string(),
            ));
        }
        Ok(request)
    }

    pub async fn list(
        &self,
        claims: &Claims,
        filter: &LeaveRequestFilter,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        let scope = match claims.role {
            Role::Admin => LeaveScope::All,
            Role::Manager => LeaveScope::Team(claims.user_id()),
            Role::Employee => LeaveScope::Employee(self.employee_for(claims).await?.id),
        };
        Ok(self.leave.list(scope, filter).await?)
    }

    /// Own requests, regardless of role.
    pub async fn list_own(
        &self,
        claims: &Claims,
        filter: &LeaveRequestFilter,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        let employee = self.employee_for(claims).await?;
        Ok(self
            .leave
            .list(LeaveScope::Employee(employee.id), filter)
            .await?)
    }

    pub async fn balance(&self, claims: &Claims, now: DateTime<Utc>) -> Result<LeaveBalance, AppError> {
        let employee = self.employee_for(claims).await?;
        self.balance_for(&employee, now).await
    }

    pub async fn report(
        &self,
        claims: &Claims,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaveReportEntry>, AppError> {
        claims.require_admin()?;

        let mut entries = Vec::new();
        for employee in self.employees.list_active().await? {
            let balance = self.balance_for(&employee, now).await?;
            entries.push(LeaveReportEntry {
                employee_id: employee.id,
                employee_name: employee.employee_name,
                visa_start_date: employee.visa_start_date,
                balance,
            });
        }
        Ok(entries)
    }

    /// Recompute and store the cached balances of every accruing employee.
    pub async fn sync_balances(&self, now: DateTime<Utc>) -> Result<BalanceSyncSummary, AppError> {
        let mut summary = BalanceSyncSummary {
            processed: 0,
            updated: 0,
        };

        for employee in self.employees.list_accruing().await? {
            let balance = self.balance_for(&employee, now).await?;
            let (annual, medical) = leave_accrual::snapshot(&balance);

            summary.processed += 1;
            if self
                .employees
                .update_cached_balances(employee.id, &annual, &medical, now)
                .await?
            {
                summary.updated += 1;
                log::info!(
                    "Updated balances for {}: annual {} -> {}, medical {} -> {}",
                    employee.employee_name,
                    employee.annual_leave_balance,
                    annual,
                    employee.medical_leave_balance,
                    medical
                );
            }
        }

        log::info!(
            "Leave balance sync processed {} employee(s), {} updated",
            summary.processed,
            summary.updated
        );
        Ok(summary)
    }

    pub async fn override_balance(
        &self,
        claims: &Claims,
        employee_id: Uuid,
        input: LeaveBalanceOverrideInput,
        now: DateTime<Utc>,
    ) -> Result<Employee, AppError> {
        claims.require_admin()?;
        let reason = validate_override(&input)?;

        let employee = self
            .employees
            .find_by_id(employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;

        self.employees
            .update_cached_balances(
                employee.id,
                &input.annual_leave_balance,
                &input.medical_leave_balance,
                now,
            )
            .await?;

        log::info!(
            "Admin {} set cached balances for employee {}: annual {} -> {}, medical {} -> {} ({})",
            claims.user_id(),
            employee.id,
            employee.annual_leave_balance,
            input.annual_leave_balance,
            employee.medical_leave_balance,
            input.medical_leave_balance,
            reason
        );

        self.employees
            .find_by_id(employee.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))
    }
}

fn lost_race() -> AppError {
    AppError::conflict(
        ConflictKind::AlreadyResolved,
        "Leave request was modified by another approver",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    use ApprovalStatus::*;

    fn stages(manager: ApprovalStatus, admin: ApprovalStatus) -> LeaveStages {
        LeaveStages {
            manager,
            admin,
            overall: overall_status(manager, admin),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn submission(start: &str, end: &str, reason: &str) -> LeaveRequestInput {
        LeaveRequestInput {
            leave_type: LeaveType::Annual,
            start_date: date(start),
            end_date: date(end),
            reason: reason.to_string(),
        }
    }

    fn plan(current: LeaveStages, action: LeaveAction, leave_type: LeaveType) -> Result<LeaveTransition, AppError> {
        plan_transition(current, action, leave_type, None, Utc::now())
    }

    #[test]
    fn overall_follows_both_stages() {
        assert_eq!(overall_status(Pending, Pending), Pending);
        assert_eq!(overall_status(Approved, Pending), Pending);
        assert_eq!(overall_status(Approved, Approved), Approved);
        assert_eq!(overall_status(Rejected, Pending), Rejected);
        assert_eq!(overall_status(Approved, Rejected), Rejected);
    }

    #[test]
    fn manager_self_submission_skips_manager_stage() {
        assert_eq!(initial_stages(Role::Manager), stages(Approved, Pending));
        assert_eq!(initial_stages(Role::Employee), stages(Pending, Pending));
    }

    #[test]
    fn annual_manager_approval_waits_for_admin() {
        let t = plan(stages(Pending, Pending), LeaveAction::ManagerApprove, LeaveType::Annual).unwrap();

        assert_eq!(t.to, stages(Approved, Pending));
        assert!(t.manager_approved_at.is_some());
        assert!(t.admin_approved_at.is_none());
    }

    #[test]
    fn emergency_manager_approval_is_final() {
        let t = plan(stages(Pending, Pending), LeaveAction::ManagerApprove, LeaveType::Emergency).unwrap();

        assert_eq!(t.to, stages(Approved, Approved));
        assert_eq!(t.to.overall, Approved);
        assert!(t.admin_approved_at.is_some());
    }

    #[test]
    fn admin_approval_completes_request() {
        let t = plan(stages(Approved, Pending), LeaveAction::AdminApprove, LeaveType::Medical).unwrap();
        assert_eq!(t.to, stages(Approved, Approved));
        assert_eq!(t.from, stages(Approved, Pending));
    }

    #[test]
    fn admin_cannot_approve_before_manager() {
        let err = plan(stages(Pending, Pending), LeaveAction::AdminApprove, LeaveType::Annual).unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::AwaitingManagerApproval));
    }

    #[test]
    fn admin_may_reject_at_any_pending_point() {
        let t = plan(stages(Pending, Pending), LeaveAction::AdminReject, LeaveType::Annual).unwrap();
        assert_eq!(t.to, stages(Pending, Rejected));
        assert_eq!(t.to.overall, Rejected);
    }

    #[test]
    fn manager_cannot_act_twice() {
        let err = plan(stages(Approved, Pending), LeaveAction::ManagerReject, LeaveType::Annual).unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::StageNotPending));
    }

    #[test]
    fn rejection_is_terminal_at_either_stage() {
        let after_manager = stages(Rejected, Pending);
        let after_admin = stages(Approved, Rejected);

        for current in [after_manager, after_admin] {
            for action in [
                LeaveAction::ManagerApprove,
                LeaveAction::ManagerReject,
                LeaveAction::AdminApprove,
                LeaveAction::AdminReject,
            ] {
                let err = plan(current, action, LeaveType::Annual).unwrap_err();
                assert_eq!(err.conflict_kind(), Some(ConflictKind::AlreadyResolved));
            }
        }
    }

    #[test]
    fn approved_requests_cannot_be_reopened() {
        let err = plan(stages(Approved, Approved), LeaveAction::AdminReject, LeaveType::Annual).unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::AlreadyResolved));
    }

    #[test]
    fn comments_are_carried_to_the_acting_stage() {
        let t = plan_transition(
            stages(Approved, Pending),
            LeaveAction::AdminReject,
            LeaveType::Annual,
            Some("Team is short-staffed".to_string()),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(t.admin_comments.as_deref(), Some("Team is short-staffed"));
        assert_eq!(t.manager_comments, None);
    }

    #[test]
    fn rejection_requires_comments() {
        assert!(validate_comments(None, true).is_err());
        assert!(validate_comments(Some("  "), true).is_err());
        assert_eq!(validate_comments(None, false).unwrap(), None);
        assert!(validate_comments(Some(&"c".repeat(MAX_COMMENTS_LEN + 1)), false).is_err());
    }

    #[test]
    fn submission_counts_days_inclusively() {
        let today = date("2026-10-14");

        assert_eq!(validate_submission(&submission("2026-10-14", "2026-10-14", "Family"), today).unwrap(), 1);
        assert_eq!(validate_submission(&submission("2026-10-20", "2026-10-24", "Trip"), today).unwrap(), 5);
    }

    #[test]
    fn submission_rejects_bad_input() {
        let today = date("2026-10-14");

        assert!(validate_submission(&submission("2026-10-13", "2026-10-15", "Backdated"), today).is_err());
        assert!(validate_submission(&submission("2026-10-20", "2026-10-19", "Reversed"), today).is_err());
        assert!(validate_submission(&submission("2026-10-20", "2026-10-21", "   "), today).is_err());
        assert!(validate_submission(
            &submission("2026-10-20", "2026-10-21", &"r".repeat(MAX_REASON_LEN + 1)),
            today
        )
        .is_err());
    }

    #[test]
    fn override_bounds() {
        let input = |annual: &str, medical: &str, reason: &str| LeaveBalanceOverrideInput {
            annual_leave_balance: BigDecimal::from_str(annual).unwrap(),
            medical_leave_balance: BigDecimal::from_str(medical).unwrap(),
            reason: reason.to_string(),
        };

        assert!(validate_override(&input("50", "14", "Migration from old system")).is_ok());
        assert!(validate_override(&input("50.01", "14", "Too much")).is_err());
        assert!(validate_override(&input("10", "14.5", "Too much")).is_err());
        assert!(validate_override(&input("-1", "0", "Negative")).is_err());
        assert!(validate_override(&input("10", "10", " ")).is_err());
    }
}
