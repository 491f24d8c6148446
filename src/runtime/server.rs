//! Server mode
//!
//! Builds the actix-web application and runs it until Ctrl+C.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use tracing::{info, warn};

use crate::api::middleware::{ADVERTISER_HEADER, RequestIdMiddleware, TENANT_SCOPE_HEADER};
use crate::api::services::{api_v1_routes, health_routes, redirect_routes};
use crate::config::{CorsConfig, get_config};
use crate::runtime::startup::{AppServices, prepare_services};

/// Validate CORS configuration at startup (runs once)
fn validate_cors_config(cors_config: &CorsConfig) {
    if cors_config.enabled && cors_config.allowed_origins.is_empty() {
        warn!(
            "CORS enabled but allowed_origins is empty. \
            No cross-origin requests will be allowed. \
            Set allowed_origins explicitly or use '[\"*\"]' for any origin."
        );
    }
}

/// Build CORS middleware from configuration
///
/// dashboard 只读 stats，允许 GET 和租户身份头
pub fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    if !cors_config.enabled {
        return Cors::default();
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_header(actix_web::http::header::CONTENT_TYPE)
        .allowed_header(ADVERTISER_HEADER)
        .allowed_header(TENANT_SCOPE_HEADER)
        .expose_headers(vec!["Content-Disposition", "X-Request-ID"])
        .max_age(3600);

    if cors_config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// 注册全部路由和共享状态，server 与集成测试共用
pub fn configure_app(services: AppServices) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let config = get_config();
        cfg.app_data(web::Data::new(services.storage.clone()))
            .app_data(web::Data::new(services.ingestion.clone()))
            .app_data(web::Data::new(services.stats.clone()))
            .app_data(web::Data::new(services.redirects.clone()))
            .service(health_routes())
            .service(api_v1_routes(&config.server.api_prefix))
            .service(redirect_routes(&config.server.redirect_prefix));
    }
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let services = prepare_services().await.map_err(|e| {
        tracing::error!("Server startup failed: {}", e);
        e
    })?;

    let config = get_config();
    let cors_config = config.cors.clone();
    validate_cors_config(&cors_config);

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&cors_config);

        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(cors)
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(configure_app(services.clone()))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(&bind_address)?.run();
    let handle = server.handle();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping server...");
            handle.stop(true).await;
        }
    }

    info!("Server stopped");
    Ok(())
}
