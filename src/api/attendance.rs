use actix_web::{HttpResponse, Responder, web};
use chrono::Local;
use serde_json::json;

use super::extract::{FieldJson, FieldQuery};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::AppError;
use crate::model::attendance::AttendanceEntry;
use crate::service::{
    catalogue::{self, SessionForm, SessionFormQuery},
    listing::{self, AttendanceIndex, AttendanceQuery},
    recorder::{self, AssignmentPolicy, RecordOutcome, RecordSession},
    records::{self, UpdateAttendance},
};
use crate::store::SchoolStore;

/// Attendance listing with filter options
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "One page of attendance, newest date first", body = AttendanceIndex),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn index(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    query: FieldQuery<AttendanceQuery>,
) -> Result<impl Responder, AppError> {
    let index = listing::attendance_index(store.get_ref(), &auth.principal(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(index))
}

/// Options and roster for the recording form
#[utoipa::path(
    get,
    path = "/api/attendance/session",
    params(SessionFormQuery),
    responses(
        (status = 200, description = "Form options; roster when class and subject are given", body = SessionForm),
        (status = 400, description = "Unknown class or subject", body = Object, example = json!({
            "message": "referential integrity violation",
            "field": "class_id"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn session_form(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    query: FieldQuery<SessionFormQuery>,
) -> Result<impl Responder, AppError> {
    let today = Local::now().date_naive();
    let form = catalogue::session_form(store.get_ref(), &auth.principal(), query.into_inner(), today).await?;
    Ok(HttpResponse::Ok().json(form))
}

/// Record a class session
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = RecordSession,
    responses(
        (status = 200, description = "All rows stored", body = RecordOutcome),
        (status = 400, description = "Validation failed, nothing stored", body = Object, example = json!({
            "message": "invalid status",
            "field": "students.0.status"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teacher is not assigned to this class and subject"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn record(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    config: web::Data<Config>,
    payload: FieldJson<RecordSession>,
) -> Result<impl Responder, AppError> {
    let policy = AssignmentPolicy::enforced(config.enforce_teacher_assignment);
    let outcome = recorder::record_session(store.get_ref(), &auth.principal(), payload.into_inner(), policy).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Single attendance record
#[utoipa::path(
    get,
    path = "/api/attendance/{id}",
    params(("id", description = "Attendance ID")),
    responses(
        (status = 200, body = AttendanceEntry),
        (status = 403, description = "Marked by another teacher"),
        (status = 404, description = "Attendance record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn show(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    let entry = records::show_attendance(store.get_ref(), &auth.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entry))
}

/// Change status and notes of one record
#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    request_body = UpdateAttendance,
    params(("id", description = "Attendance ID")),
    responses(
        (status = 200, body = AttendanceEntry),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Marked by another teacher"),
        (status = 404, description = "Attendance record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    path: web::Path<u64>,
    payload: FieldJson<UpdateAttendance>,
) -> Result<impl Responder, AppError> {
    let entry =
        records::update_attendance(store.get_ref(), &auth.principal(), path.into_inner(), payload.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(entry))
}

/// Delete one record (admin)
#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(("id", description = "Attendance ID")),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({
            "message": "Attendance record deleted successfully."
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Attendance record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn destroy(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    records::destroy_attendance(store.get_ref(), &auth.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance record deleted successfully."
    })))
}
