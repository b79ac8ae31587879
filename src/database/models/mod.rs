pub mod attendance;
pub mod employee;
pub mod leave;
pub mod location;
pub(crate) mod macros;
pub mod payroll;
pub mod user;

// Re-export all models for easy importing
pub use attendance::*;
pub use employee::*;
pub use leave::*;
pub use location::*;
pub use payroll::*;
pub use user::*;
