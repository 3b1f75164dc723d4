//! Repository seam between the services and the relational store.
//!
//! Every method returns fully materialized rows; nothing is loaded lazily
//! once it has crossed this boundary.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::model::{
    attendance::{AttendanceEntry, AttendanceFilter, AttendanceStatus, DayCounts, NewAttendance},
    school_class::{ClassAttendanceSummary, SchoolClass},
    student::{Student, StudentFilter, StudentInput, StudentWithClass},
    subject::Subject,
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// School-wide headcounts for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct SchoolTotals {
    pub total_students: i64,
    pub active_students: i64,
    pub total_teachers: i64,
    pub total_classes: i64,
    pub total_subjects: i64,
}

/// A teacher-subject assignment with its class and subject resolved.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Assignment {
    #[sqlx(rename = "assignment_id")]
    pub id: u64,
    pub user_id: u64,
    #[sqlx(flatten)]
    pub class: SchoolClass,
    #[sqlx(flatten)]
    pub subject: SubjectRef,
}

/// Subject columns aliased so they can sit next to class columns in one row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct SubjectRef {
    #[sqlx(rename = "subject_id")]
    pub id: u64,
    #[sqlx(rename = "subject_name")]
    pub name: String,
    #[sqlx(rename = "subject_code")]
    pub code: String,
    #[sqlx(rename = "subject_description")]
    pub description: Option<String>,
}

impl From<SubjectRef> for Subject {
    fn from(s: SubjectRef) -> Self {
        Subject {
            id: s.id,
            name: s.name,
            code: s.code,
            description: s.description,
        }
    }
}

#[async_trait]
pub trait SchoolStore: Send + Sync {
    // ---------- keyed lookups ----------
    async fn find_class(&self, id: u64) -> AppResult<Option<SchoolClass>>;
    async fn find_subject(&self, id: u64) -> AppResult<Option<Subject>>;
    async fn find_student(&self, id: u64) -> AppResult<Option<StudentWithClass>>;

    /// Returns the subset of `ids` that exist in `students`.
    async fn existing_student_ids(&self, ids: &[u64]) -> AppResult<Vec<u64>>;

    async fn has_assignment(&self, teacher_id: u64, class_id: u64, subject_id: u64) -> AppResult<bool>;

    // ---------- catalogue ----------
    /// All classes ordered by name.
    async fn list_classes(&self) -> AppResult<Vec<SchoolClass>>;
    /// All subjects ordered by name.
    async fn list_subjects(&self) -> AppResult<Vec<Subject>>;
    /// Assignments ordered by id, optionally for one teacher.
    async fn list_assignments(&self, teacher_id: Option<u64>) -> AppResult<Vec<Assignment>>;

    // ---------- roster ----------
    /// Active students of a class ordered by first name, then id.
    async fn active_students_in_class(&self, class_id: u64) -> AppResult<Vec<Student>>;

    // ---------- attendance ----------
    /// Inserts or overwrites every row keyed on (student, subject, class, date)
    /// as one atomic unit. Returns the number of rows submitted.
    async fn upsert_attendance(&self, rows: &[NewAttendance]) -> AppResult<u64>;

    /// Rows matching `filter` ordered by date, newest first, then most
    /// recently created first. Also returns the total match count.
    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<AttendanceEntry>, u64)>;

    /// Most recently created rows, optionally only those marked by one teacher.
    async fn recent_attendance(&self, teacher_id: Option<u64>, limit: u64) -> AppResult<Vec<AttendanceEntry>>;

    async fn find_attendance(&self, id: u64) -> AppResult<Option<AttendanceEntry>>;

    /// Returns false when no row has that id.
    async fn update_attendance(&self, id: u64, status: AttendanceStatus, notes: Option<String>) -> AppResult<bool>;

    /// Returns false when no row has that id.
    async fn delete_attendance(&self, id: u64) -> AppResult<bool>;

    // ---------- aggregation ----------
    async fn school_totals(&self) -> AppResult<SchoolTotals>;

    /// Counts for one date, optionally only rows marked by one teacher.
    async fn day_counts(&self, date: NaiveDate, teacher_id: Option<u64>) -> AppResult<DayCounts>;

    /// Present/absent counts per class for `date`.
    ///
    /// With a teacher: that teacher's distinct assigned classes, counting only
    /// rows the teacher marked. Without: the first `limit` classes by id.
    async fn class_rollup(
        &self,
        date: NaiveDate,
        teacher_id: Option<u64>,
        limit: u64,
    ) -> AppResult<Vec<ClassAttendanceSummary>>;

    // ---------- students ----------
    /// Students matching `filter`, newest first, with the total match count.
    async fn list_students(
        &self,
        filter: &StudentFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<StudentWithClass>, u64)>;

    async fn student_code_taken(&self, code: &str, except_id: Option<u64>) -> AppResult<bool>;
    async fn student_email_taken(&self, email: &str, except_id: Option<u64>) -> AppResult<bool>;
    async fn insert_student(&self, input: &StudentInput) -> AppResult<u64>;
    /// Returns false when no row has that id.
    async fn update_student(&self, id: u64, input: &StudentInput) -> AppResult<bool>;
    /// Removes the student and its attendance. Returns false when no row has that id.
    async fn delete_student(&self, id: u64) -> AppResult<bool>;
}
