//! Dashboard 统计接口
//!
//! 所有接口共享 [`StatsQuery`]；advertiser 范围由 [`TenantContext`] 决定。

use actix_web::{HttpResponse, web};
use std::sync::Arc;
use tracing::debug;

use crate::api::middleware::TenantContext;
use crate::errors::Result;
use crate::services::StatsService;
use crate::storage::StatsScope;

use super::helpers::{api_result, error_from_attributor};
use super::types::StatsQuery;

/// 把查询参数和租户身份合成统计范围
pub fn build_scope(tenant: &TenantContext, query: &StatsQuery) -> Result<StatsScope> {
    let advertiser_id = tenant.scoped_advertiser(query.advertiser_id)?;
    let (from, to) = StatsService::parse_range(query.from.as_deref(), query.to.as_deref())?;

    let scope = StatsScope {
        advertiser_id,
        campaign_id: query.campaign_id,
        influencer_id: query.influencer_id,
        from,
        to,
    };
    debug!("Stats scope resolved: {:?}", scope);
    Ok(scope)
}

/// 解析 scope，失败时直接返回错误响应
macro_rules! scope_or_respond {
    ($tenant:expr, $query:expr) => {
        match build_scope(&$tenant, &$query) {
            Ok(scope) => scope,
            Err(e) => return error_from_attributor(&e),
        }
    };
}

pub async fn get_overview(
    tenant: TenantContext,
    query: web::Query<StatsQuery>,
    stats: web::Data<Arc<StatsService>>,
) -> HttpResponse {
    let scope = scope_or_respond!(tenant, query);
    api_result(stats.overview(&scope).await)
}

pub async fn get_chart(
    tenant: TenantContext,
    query: web::Query<StatsQuery>,
    stats: web::Data<Arc<StatsService>>,
) -> HttpResponse {
    let scope = scope_or_respond!(tenant, query);
    api_result(stats.chart(&scope).await)
}

pub async fn get_breakdown(
    tenant: TenantContext,
    query: web::Query<StatsQuery>,
    stats: web::Data<Arc<StatsService>>,
) -> HttpResponse {
    let scope = scope_or_respond!(tenant, query);
    api_result(stats.breakdown(&scope).await)
}

pub async fn get_top_campaigns(
    tenant: TenantContext,
    query: web::Query<StatsQuery>,
    stats: web::Data<Arc<StatsService>>,
) -> HttpResponse {
    let scope = scope_or_respond!(tenant, query);
    api_result(stats.top_campaigns(&scope, query.limit).await)
}

pub async fn get_top_influencers(
    tenant: TenantContext,
    query: web::Query<StatsQuery>,
    stats: web::Data<Arc<StatsService>>,
) -> HttpResponse {
    let scope = scope_or_respond!(tenant, query);
    api_result(stats.top_influencers(&scope, query.limit).await)
}

pub async fn get_top_coupons(
    tenant: TenantContext,
    query: web::Query<StatsQuery>,
    stats: web::Data<Arc<StatsService>>,
) -> HttpResponse {
    let scope = scope_or_respond!(tenant, query);
    api_result(stats.top_coupons(&scope, query.limit).await)
}

pub async fn get_top_links(
    tenant: TenantContext,
    query: web::Query<StatsQuery>,
    stats: web::Data<Arc<StatsService>>,
) -> HttpResponse {
    let scope = scope_or_respond!(tenant, query);
    api_result(stats.top_links(&scope, query.limit).await)
}

pub async fn get_journey(
    tenant: TenantContext,
    query: web::Query<StatsQuery>,
    stats: web::Data<Arc<StatsService>>,
) -> HttpResponse {
    let scope = scope_or_respond!(tenant, query);
    api_result(stats.journey(&scope).await)
}
