use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use crate::storage::SeaOrmStorage;

use super::error_code::ErrorCode;
use super::helpers::json_response;
use super::types::HealthResponse;

/// Health Service
///
/// 直接 ping 存储，不经过业务服务（探针要求快速响应）
pub struct HealthService;

impl HealthService {
    pub async fn health_check(storage: web::Data<Arc<SeaOrmStorage>>) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let (healthy, error) =
            match tokio::time::timeout(Duration::from_secs(5), storage.ping()).await {
                Ok(Ok(())) => (true, None),
                Ok(Err(e)) => {
                    error!("Storage health check failed: {}", e);
                    (false, Some(e.message().to_string()))
                }
                Err(_) => {
                    error!("Storage health check timeout");
                    (false, Some("timeout".to_string()))
                }
            };

        let status = if healthy { "healthy" } else { "unhealthy" };
        let health_data = HealthResponse {
            status: status.to_string(),
            storage: status.to_string(),
            backend: storage.get_backend_name().to_string(),
            response_time_ms: start_time.elapsed().as_millis() as u64,
            error,
        };

        info!(
            "Health check completed in {:?}, status: {}",
            start_time.elapsed(),
            status
        );

        if healthy {
            json_response(
                actix_web::http::StatusCode::OK,
                ErrorCode::Success,
                "OK",
                Some(health_data),
            )
        } else {
            json_response(
                actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ServiceUnavailable,
                "Service Unavailable",
                Some(health_data),
            )
        }
    }

    // 活跃性检查，不触达存储
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
}
