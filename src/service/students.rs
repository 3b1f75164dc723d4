use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::{
    pagination::{Page, PageRequest, STUDENT_PAGE_SIZE, StudentPage},
    validation::{check_email, max_chars, non_empty, required},
};
use crate::error::{AppError, AppResult};
use crate::model::{
    attendance::{AttendanceEntry, AttendanceFilter},
    role::Principal,
    school_class::SchoolClass,
    student::{StudentFilter, StudentInput, StudentStatus, StudentWithClass},
};
use crate::store::SchoolStore;

const RECENT_FOR_STUDENT: u64 = 10;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct StudentQuery {
    /// Substring of first name, last name, student code or email
    pub search: Option<String>,
    pub class_id: Option<u64>,
    /// active, inactive or graduated
    pub status: Option<String>,
    /// Page number, starting at 1
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentIndex {
    #[schema(value_type = StudentPage)]
    pub students: Page<StudentWithClass>,
    pub classes: Vec<SchoolClass>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentDetail {
    pub student: StudentWithClass,
    pub recent_attendances: Vec<AttendanceEntry>,
}

pub async fn list_students(store: &dyn SchoolStore, query: StudentQuery) -> AppResult<StudentIndex> {
    let status = match non_empty(query.status) {
        None => None,
        Some(raw) => Some(
            raw.parse::<StudentStatus>()
                .map_err(|_| AppError::validation("status", "invalid status"))?,
        ),
    };
    let filter = StudentFilter {
        search: non_empty(query.search).map(|s| s.trim().to_string()),
        class_id: query.class_id,
        status,
    };

    let request = PageRequest::new(query.page, STUDENT_PAGE_SIZE);
    let (rows, total) = store
        .list_students(&filter, request.limit(), request.offset())
        .await?;

    Ok(StudentIndex {
        students: Page::new(rows, request, total),
        classes: store.list_classes().await?,
    })
}

pub async fn show_student(store: &dyn SchoolStore, id: u64) -> AppResult<StudentDetail> {
    let student = store
        .find_student(id)
        .await?
        .ok_or_else(|| AppError::not_found("Student"))?;

    let filter = AttendanceFilter {
        student_id: Some(id),
        ..AttendanceFilter::default()
    };
    let (recent_attendances, _) = store.list_attendance(&filter, RECENT_FOR_STUDENT, 0).await?;

    Ok(StudentDetail {
        student,
        recent_attendances,
    })
}

/// Trims optional fields to `None` and checks every field limit and reference.
async fn validated(
    store: &dyn SchoolStore,
    mut input: StudentInput,
    except_id: Option<u64>,
    today: NaiveDate,
) -> AppResult<StudentInput> {
    input.student_id = input.student_id.trim().to_string();
    input.email = non_empty(input.email).map(|e| e.trim().to_string());
    input.phone = non_empty(input.phone);
    input.address = non_empty(input.address);

    required("student_id", &input.student_id, 20)?;
    required("first_name", &input.first_name, 100)?;
    required("last_name", &input.last_name, 100)?;
    max_chars("phone", input.phone.as_deref(), 20)?;
    max_chars("address", input.address.as_deref(), 500)?;

    if let Some(email) = input.email.as_deref() {
        max_chars("email", Some(email), 255)?;
        check_email("email", email)?;
        if store.student_email_taken(email, except_id).await? {
            return Err(AppError::validation("email", "email has already been taken"));
        }
    }

    if input.date_of_birth.is_some_and(|dob| dob >= today) {
        return Err(AppError::validation(
            "date_of_birth",
            "date_of_birth must be a date before today",
        ));
    }

    if store.find_class(input.class_id).await?.is_none() {
        return Err(AppError::referential("class_id"));
    }
    if store.student_code_taken(&input.student_id, except_id).await? {
        return Err(AppError::validation("student_id", "student_id has already been taken"));
    }

    Ok(input)
}

pub async fn create_student(
    store: &dyn SchoolStore,
    principal: &Principal,
    input: StudentInput,
    today: NaiveDate,
) -> AppResult<StudentWithClass> {
    principal.require_admin()?;
    let input = validated(store, input, None, today).await?;

    let id = store.insert_student(&input).await?;
    info!(student_id = id, code = %input.student_id, actor = principal.id, "Student created");

    store
        .find_student(id)
        .await?
        .ok_or_else(|| AppError::not_found("Student"))
}

pub async fn update_student(
    store: &dyn SchoolStore,
    principal: &Principal,
    id: u64,
    input: StudentInput,
    today: NaiveDate,
) -> AppResult<StudentWithClass> {
    principal.require_admin()?;
    if store.find_student(id).await?.is_none() {
        return Err(AppError::not_found("Student"));
    }
    let input = validated(store, input, Some(id), today).await?;

    if !store.update_student(id, &input).await? {
        return Err(AppError::not_found("Student"));
    }
    info!(student_id = id, actor = principal.id, "Student updated");

    store
        .find_student(id)
        .await?
        .ok_or_else(|| AppError::not_found("Student"))
}

/// Removes the student together with its attendance history.
pub async fn destroy_student(store: &dyn SchoolStore, principal: &Principal, id: u64) -> AppResult<()> {
    principal.require_admin()?;
    if !store.delete_student(id).await? {
        return Err(AppError::not_found("Student"));
    }
    info!(student_id = id, actor = principal.id, "Student deleted");
    Ok(())
}
