use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
    Excused,
}

super::mysql_text_enum!(AttendanceStatus);

/// One stored attendance fact. Unique on (student_id, subject_id, class_id, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub student_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
    pub teacher_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attendance {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey {
            student_id: self.student_id,
            subject_id: self.subject_id,
            class_id: self.class_id,
            date: self.date,
        }
    }
}

/// The natural key of an attendance fact.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttendanceKey {
    pub student_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
    pub date: NaiveDate,
}

/// A row to upsert. On key conflict status, notes and teacher_id are overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendance {
    pub student_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
    pub teacher_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

impl NewAttendance {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey {
            student_id: self.student_id,
            subject_id: self.subject_id,
            class_id: self.class_id,
            date: self.date,
        }
    }
}

/// An attendance fact with its student, subject, class and teacher resolved.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 41,
    "date": "2024-03-01",
    "status": "late",
    "notes": null,
    "student_id": 1,
    "student_code": "STU-0001",
    "student_first_name": "Amina",
    "student_last_name": "Rahman",
    "subject_id": 2,
    "subject_name": "Mathematics",
    "subject_code": "MATH101",
    "class_id": 5,
    "class_name": "Grade 10",
    "class_section": "A",
    "teacher_id": 3,
    "teacher_name": "T. Hossain",
    "created_at": "2024-03-01T08:05:00Z",
    "updated_at": "2024-03-01T09:10:00Z"
}))]
pub struct AttendanceEntry {
    pub id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub student_id: u64,
    pub student_code: String,
    pub student_first_name: String,
    pub student_last_name: String,
    pub subject_id: u64,
    pub subject_name: String,
    pub subject_code: String,
    pub class_id: u64,
    pub class_name: String,
    pub class_section: Option<String>,
    pub teacher_id: u64,
    pub teacher_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conditions for attendance scans. `None` means unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub date: Option<NaiveDate>,
    pub class_id: Option<u64>,
    pub subject_id: Option<u64>,
    pub teacher_id: Option<u64>,
    pub student_id: Option<u64>,
}

impl AttendanceFilter {
    pub fn matches(&self, row: &Attendance) -> bool {
        self.date.is_none_or(|d| row.date == d)
            && self.class_id.is_none_or(|c| row.class_id == c)
            && self.subject_id.is_none_or(|s| row.subject_id == s)
            && self.teacher_id.is_none_or(|t| row.teacher_id == t)
            && self.student_id.is_none_or(|s| row.student_id == s)
    }
}

/// Attendance counts for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct DayCounts {
    pub total: i64,
    pub present: i64,
    pub absent: i64,
}
