pub mod attendance;
pub mod catalogue;
pub mod dashboard;
pub mod extract;
pub mod health;
pub mod students;
