use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A teacher assigned to teach a subject to a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TeacherSubject {
    pub id: u64,
    pub user_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
}
