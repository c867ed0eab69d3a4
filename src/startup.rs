use actix_web::dev::Server;
use actix_web::{
    middleware::{Compress, Logger},
    web, App, HttpResponse, HttpServer,
};
use std::net::TcpListener;

use crate::auth::SessionService;
use crate::configuration::Settings;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::routes::{self, health_check, index};
use crate::security::{cors, default_headers, RateLimit, RateLimiterManager};
use crate::store::Stores;

const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Malformed bodies, queries and path ids all surface as `ValidationError`
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            AppError::from(ValidationError::Rejected(format!("Invalid request body: {}", err)))
                .into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::from(ValidationError::Rejected(format!("Invalid query string: {}", err))).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err, _req| {
        AppError::from(ValidationError::Rejected("Invalid resource id".to_string())).into()
    })
}

pub fn run(listener: TcpListener, stores: Stores, settings: Settings) -> Result<Server, std::io::Error> {
    let sessions = SessionService::new(
        &settings.jwt,
        settings.auth.clone(),
        stores.users.clone(),
        stores.tokens.clone(),
    );
    let issuer = sessions.issuer().clone();
    // One limiter shared by every worker
    let limiter = RateLimiterManager::new(settings.security.rate_limit_per_minute);

    let sessions = web::Data::new(sessions);
    let stores = web::Data::new(stores);
    let settings = web::Data::new(settings);

    let server = HttpServer::new(move || {
        let issuer = issuer.clone();

        // Registered innermost first; the access log wraps everything
        App::new()
            .wrap(RateLimit::new(limiter.clone()))
            .wrap(LoggerMiddleware)
            .wrap(default_headers(settings.application.environment))
            .wrap(Compress::default())
            .wrap(cors(&settings))
            .wrap(Logger::default())
            // Shared state
            .app_data(sessions.clone())
            .app_data(stores.clone())
            .app_data(settings.clone())
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .route("/", web::get().to(index))
            .route("/health_check", web::get().to(health_check))
            .service(web::scope("/api/v1").configure(move |cfg| routes::configure(cfg, &issuer)))
            .default_service(web::to(|| async {
                Err::<HttpResponse, _>(AppError::NotFound("Route not found".to_string()))
            }))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
