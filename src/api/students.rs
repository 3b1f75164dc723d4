use actix_web::{HttpResponse, Responder, web};
use chrono::Local;
use serde_json::json;

use super::extract::{FieldJson, FieldQuery};
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::student::{StudentInput, StudentWithClass};
use crate::service::students::{self, StudentDetail, StudentIndex, StudentQuery};
use crate::store::SchoolStore;

/// Student listing
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQuery),
    responses(
        (status = 200, body = StudentIndex),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn index(
    _auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    query: FieldQuery<StudentQuery>,
) -> Result<impl Responder, AppError> {
    let index = students::list_students(store.get_ref(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(index))
}

/// Create student (admin)
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = StudentInput,
    responses(
        (status = 201, description = "Student created", body = StudentWithClass),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "message": "student_id has already been taken",
            "field": "student_id"
        })),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn create(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    payload: FieldJson<StudentInput>,
) -> Result<impl Responder, AppError> {
    let today = Local::now().date_naive();
    let student = students::create_student(store.get_ref(), &auth.principal(), payload.into_inner(), today).await?;
    Ok(HttpResponse::Created().json(student))
}

/// Student with recent attendance
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id", description = "Student row ID")),
    responses(
        (status = 200, body = StudentDetail),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn show(
    _auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    let detail = students::show_student(store.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Update student (admin)
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    request_body = StudentInput,
    params(("id", description = "Student row ID")),
    responses(
        (status = 200, body = StudentWithClass),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn update(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    path: web::Path<u64>,
    payload: FieldJson<StudentInput>,
) -> Result<impl Responder, AppError> {
    let today = Local::now().date_naive();
    let student = students::update_student(
        store.get_ref(),
        &auth.principal(),
        path.into_inner(),
        payload.into_inner(),
        today,
    )
    .await?;
    Ok(HttpResponse::Ok().json(student))
}

/// Delete student and its attendance (admin)
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id", description = "Student row ID")),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({
            "message": "Student deleted successfully."
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn destroy(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    students::destroy_student(store.get_ref(), &auth.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Student deleted successfully."
    })))
}
