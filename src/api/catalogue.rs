use actix_web::{HttpResponse, Responder, web};

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::service::catalogue::{self, CatalogueOptions};
use crate::store::SchoolStore;

/// Classes and subjects available to the caller
#[utoipa::path(
    get,
    path = "/api/catalogue",
    responses(
        (status = 200, description = "All for admins, assigned ones for teachers", body = CatalogueOptions),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalogue"
)]
pub async fn options(auth: AuthUser, store: web::Data<dyn SchoolStore>) -> Result<impl Responder, AppError> {
    let options = catalogue::options(store.get_ref(), &auth.principal()).await?;
    Ok(HttpResponse::Ok().json(options))
}
