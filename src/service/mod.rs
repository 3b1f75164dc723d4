//! Use cases. Each function takes the store as `&dyn SchoolStore` and the
//! acting principal, and returns materialized results.

pub mod catalogue;
pub mod dashboard;
pub mod listing;
pub mod pagination;
pub mod records;
pub mod recorder;
pub mod roster;
pub mod students;
pub mod validation;
