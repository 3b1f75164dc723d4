use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;

/// A staff account. Provisioned outside this service; read for names and counts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub employee_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}
