pub mod attendance;
pub mod auth;
pub mod employees;
pub mod geocoding;
pub mod geofence;
pub mod leave_accrual;
pub mod leave_workflow;
pub mod payroll;

pub use attendance::AttendanceService;
pub use auth::Claims;
pub use employees::EmployeeService;
pub use geocoding::Geocoder;
pub use leave_workflow::LeaveService;
pub use payroll::PayrollService;
