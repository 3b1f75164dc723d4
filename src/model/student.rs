use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
}

super::mysql_text_enum!(StudentStatus);

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "student_id": "STU-0001",
        "first_name": "Amina",
        "last_name": "Rahman",
        "email": "amina@school.test",
        "phone": null,
        "date_of_birth": "2010-04-02",
        "address": null,
        "class_id": 5,
        "status": "active"
    })
)]
pub struct Student {
    #[schema(example = 1)]
    pub id: u64,

    /// External identification code, unique across the school.
    #[schema(example = "STU-0001")]
    pub student_id: String,

    #[schema(example = "Amina")]
    pub first_name: String,

    #[schema(example = "Rahman")]
    pub last_name: String,

    #[schema(example = "amina@school.test", nullable = true)]
    pub email: Option<String>,

    #[schema(nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "2010-04-02", nullable = true)]
    pub date_of_birth: Option<NaiveDate>,

    #[schema(nullable = true)]
    pub address: Option<String>,

    #[schema(example = 5)]
    pub class_id: u64,

    pub status: StudentStatus,
}

/// A student joined with the name of its class.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct StudentWithClass {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub student: Student,
    pub class_name: String,
}

/// Writable student fields, shared by create and update.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StudentInput {
    #[schema(example = "STU-0001")]
    pub student_id: String,
    #[schema(example = "Amina")]
    pub first_name: String,
    #[schema(example = "Rahman")]
    pub last_name: String,
    #[schema(example = "amina@school.test", nullable = true)]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "2010-04-02", nullable = true)]
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    #[schema(example = 5)]
    pub class_id: u64,
    #[serde(default)]
    pub status: StudentStatus,
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub search: Option<String>,
    pub class_id: Option<u64>,
    pub status: Option<StudentStatus>,
}
