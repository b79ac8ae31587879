use chrono::{DateTime, Utc};

use crate::database::models::{Employee, EmployeeInput, Role};
use crate::database::repositories::{EmployeeRepository, LocationRepository, UserRepository};
use crate::error::AppError;
use crate::services::auth::Claims;

#[derive(Clone)]
pub struct EmployeeService {
    employees: EmployeeRepository,
    users: UserRepository,
    locations: LocationRepository,
}

impl EmployeeService {
    pub fn new(
        employees: EmployeeRepository,
        users: UserRepository,
        locations: LocationRepository,
    ) -> Self {
        Self {
            employees,
            users,
            locations,
        }
    }

    /// Create the employee record for an existing user.
    ///
    /// Managers sit at the top of their reporting line and never get a reporting manager.
    pub async fn create(
        &self,
        claims: &Claims,
        input: EmployeeInput,
        now: DateTime<Utc>,
    ) -> Result<Employee, AppError> {
        claims.require_admin()?;

        if input.employee_name.trim().is_empty() {
            return Err(AppError::validation("Employee name is required"));
        }

        let user = self
            .users
            .find_by_id(input.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if self.employees.find_by_user_id(user.id).await?.is_some() {
            return Err(AppError::validation(
                "This user already has an employee record",
            ));
        }

        if let Some(manager_id) = input.reporting_manager_id {
            if user.role == Role::Manager {
                return Err(AppError::validation(
                    "Managers cannot have a reporting manager",
                ));
            }
            if manager_id == user.id {
                return Err(AppError::validation(
                    "An employee cannot report to themselves",
                ));
            }
            let manager = self
                .users
                .find_by_id(manager_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Reporting manager not found".to_string()))?;
            if manager.role != Role::Manager {
                return Err(AppError::validation(
                    "Reporting manager must have the manager role",
                ));
            }
        }

        if let Some(location_id) = input.location_id {
            if self.locations.find_by_id(location_id).await?.is_none() {
                return Err(AppError::NotFound("Location not found".to_string()));
            }
        }

        let employee = self.employees.create(&input, now).await?;
        log::info!(
            "Employee {} created for user {} by admin {}",
            employee.id,
            user.id,
            claims.user_id()
        );
        Ok(employee)
    }
}
