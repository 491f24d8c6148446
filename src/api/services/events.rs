//! 事件写入接口

use actix_web::{HttpResponse, web};
use std::sync::Arc;
use tracing::{error, info};

use crate::api::middleware::TenantContext;
use crate::errors::AttributorError;
use crate::services::{EventInput, IngestionCoordinator};

use super::error_code::ErrorCode;
use super::helpers::{created_response, error_from_attributor, error_response};

/// POST /events
///
/// 成功返回 201；写入失败返回 500，调用方可整体重试（无幂等，重试会产生新行）
pub async fn ingest_event(
    tenant: TenantContext,
    body: web::Json<EventInput>,
    coordinator: web::Data<Arc<IngestionCoordinator>>,
) -> HttpResponse {
    let advertiser_id = match tenant.require_advertiser() {
        Ok(id) => id,
        Err(e) => {
            return error_response(
                e.http_status(),
                ErrorCode::TenantRequired,
                e.message(),
            );
        }
    };

    let input = body.into_inner();
    info!(
        "API: ingest {} event for advertiser {}",
        input.action, advertiser_id
    );

    match coordinator.ingest(input, advertiser_id).await {
        Ok(event) => created_response(event),
        Err(e) => {
            if matches!(e, AttributorError::DatabaseOperation(_)) {
                error!("Event ingestion failed for advertiser {}: {}", advertiser_id, e);
            }
            error_from_attributor(&e)
        }
    }
}
