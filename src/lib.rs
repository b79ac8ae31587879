use actix_web::web;
use sqlx::PgPool;

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::AppError;

use database::repositories::{
    AttendanceRepository, EmployeeRepository, LeaveRepository, LocationRepository,
    PayrollRepository, UserRepository,
};
use services::{AttendanceService, EmployeeService, Geocoder, LeaveService, PayrollService};

/// Services shared by every worker, wired from one pool.
#[derive(Clone)]
pub struct AppState {
    pub config: web::Data<Config>,
    pub attendance: web::Data<AttendanceService>,
    pub leave: web::Data<LeaveService>,
    pub payroll: web::Data<PayrollService>,
    pub employees: web::Data<EmployeeService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let user_repository = UserRepository::new(pool.clone());
        let employee_repository = EmployeeRepository::new(pool.clone());
        let location_repository = LocationRepository::new(pool.clone());
        let attendance_repository = AttendanceRepository::new(pool.clone());
        let leave_repository = LeaveRepository::new(pool.clone());
        let payroll_repository = PayrollRepository::new(pool.clone());

        let attendance = AttendanceService::new(
            attendance_repository,
            employee_repository.clone(),
            location_repository.clone(),
            Geocoder::new(config.geocoder_url.clone()),
            config.timezone,
        );
        let leave = LeaveService::new(
            pool,
            leave_repository,
            employee_repository.clone(),
            config.timezone,
        );
        let payroll = PayrollService::new(
            payroll_repository,
            employee_repository.clone(),
            config.timezone,
        );
        let employees =
            EmployeeService::new(employee_repository, user_repository, location_repository);

        Self {
            config: web::Data::new(config),
            attendance: web::Data::new(attendance),
            leave: web::Data::new(leave),
            payroll: web::Data::new(payroll),
            employees: web::Data::new(employees),
        }
    }

    /// Register app data and all `/api/v1` routes.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.config.clone())
            .app_data(self.attendance.clone())
            .app_data(self.leave.clone())
            .app_data(self.payroll.clone())
            .app_data(self.employees.clone())
            .configure(routes::configure);
    }
}
