//! API 路由配置
//!
//! 挂在 `server.api_prefix`（默认 `/v1`）下。

use actix_web::web;

use super::events::ingest_event;
use super::export::export_events;
use super::helpers::{json_error_handler, query_error_handler};
use super::stats::{
    get_breakdown, get_chart, get_journey, get_overview, get_top_campaigns, get_top_coupons,
    get_top_influencers, get_top_links,
};

/// 单个事件请求体上限
const MAX_EVENT_BODY_BYTES: usize = 256 * 1024;

/// 事件路由 `/events`
pub fn events_routes() -> actix_web::Scope {
    web::scope("/events")
        .app_data(
            web::JsonConfig::default()
                .limit(MAX_EVENT_BODY_BYTES)
                .error_handler(json_error_handler),
        )
        .route("", web::post().to(ingest_event))
}

/// 统计路由 `/stats`
///
/// 包含：
/// - GET /stats/overview - 点击、转化、收入、分成
/// - GET /stats/chart - 按天曲线
/// - GET /stats/breakdown - 事件类型分布
/// - GET /stats/{campaigns,influencers,coupons,links} - Top-N
/// - GET /stats/journey - 归因路径
/// - GET /stats/export - CSV 流式导出
pub fn stats_routes() -> actix_web::Scope {
    web::scope("/stats")
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .route("/overview", web::get().to(get_overview))
        .route("/chart", web::get().to(get_chart))
        .route("/breakdown", web::get().to(get_breakdown))
        .route("/campaigns", web::get().to(get_top_campaigns))
        .route("/influencers", web::get().to(get_top_influencers))
        .route("/coupons", web::get().to(get_top_coupons))
        .route("/links", web::get().to(get_top_links))
        .route("/journey", web::get().to(get_journey))
        .route("/export", web::get().to(export_events))
}

/// `/v1` 下的全部路由
pub fn api_v1_routes(api_prefix: &str) -> actix_web::Scope {
    web::scope(api_prefix)
        .service(events_routes())
        .service(stats_routes())
}
