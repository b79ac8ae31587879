pub mod attendance;
pub mod employee;
pub mod leave;
pub mod location;
pub mod payroll;
pub mod user;

pub use attendance::{AttendanceCriteria, AttendanceRepository};
pub use employee::EmployeeRepository;
pub use leave::{LeaveRepository, LeaveScope};
pub use location::LocationRepository;
pub use payroll::{PayrollFilter, PayrollRepository};
pub use user::UserRepository;
