pub mod leave;
pub mod loan;
pub mod new_employee;
pub mod user;
