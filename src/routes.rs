use crate::{
    api::{attendance, catalogue, dashboard, health, students},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware};
use actix_web::{middleware::from_fn, web};
use tracing::warn;

/// Per-IP limiter allowing `requests_per_min` with an equal burst.
/// Returns `None` when the numbers cannot form a valid quota.
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

/// Public routes plus the authenticated API under `config.api_prefix`.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.route("/health", web::get().to(health::health));

    let api = web::scope(&config.api_prefix)
        .wrap(from_fn(auth_middleware))
        .configure(protected);

    match build_limiter(config.rate_protected_per_min) {
        Some(limiter) => {
            cfg.service(api.wrap(limiter));
        }
        None => {
            warn!(rate = config.rate_protected_per_min, "Invalid rate limit, protected routes are unthrottled");
            cfg.service(api);
        }
    }
}

/// Routes behind authentication, relative to the API prefix.
pub fn protected(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/dashboard").route(web::get().to(dashboard::show)))
        .service(web::resource("/catalogue").route(web::get().to(catalogue::options)))
        .service(
            web::scope("/attendance")
                // /attendance
                .service(
                    web::resource("")
                        .route(web::get().to(attendance::index))
                        .route(web::post().to(attendance::record)),
                )
                // /attendance/session, registered before /{id}
                .service(web::resource("/session").route(web::get().to(attendance::session_form)))
                // /attendance/{id}
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(attendance::show))
                        .route(web::put().to(attendance::update))
                        .route(web::delete().to(attendance::destroy)),
                ),
        )
        .service(
            web::scope("/students")
                // /students
                .service(
                    web::resource("")
                        .route(web::get().to(students::index))
                        .route(web::post().to(students::create)),
                )
                // /students/{id}
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(students::show))
                        .route(web::put().to(students::update))
                        .route(web::delete().to(students::destroy)),
                ),
        );
}
