use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 5,
        "name": "Grade 10",
        "section": "A",
        "grade_level": 10,
        "description": null
    })
)]
pub struct SchoolClass {
    #[schema(example = 5)]
    pub id: u64,

    #[schema(example = "Grade 10")]
    pub name: String,

    #[schema(example = "A", nullable = true)]
    pub section: Option<String>,

    #[schema(example = 10)]
    pub grade_level: i32,

    #[schema(nullable = true)]
    pub description: Option<String>,
}

/// Today's present/absent counts for one class, next to its enrolment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
pub struct ClassAttendanceSummary {
    pub id: u64,
    pub name: String,
    pub section: Option<String>,
    pub present_count: i64,
    pub absent_count: i64,
    pub total_students: i64,
}
