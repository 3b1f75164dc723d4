use actix_web::{HttpResponse, Responder, web};
use chrono::Local;

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::service::dashboard;
use crate::store::SchoolStore;

/// Role-specific dashboard for today
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "AdminDashboard or TeacherDashboard, plus a `role` field naming which", body = Object),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn show(auth: AuthUser, store: web::Data<dyn SchoolStore>) -> Result<impl Responder, AppError> {
    let today = Local::now().date_naive();
    let dashboard = dashboard::dashboard(store.get_ref(), &auth.principal(), today).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
