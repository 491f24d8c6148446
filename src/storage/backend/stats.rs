//! 统计相关的数据库查询
//!
//! 所有查询只读，经 `retry::with_retry` 执行，供 StatsService 调用。
//! 客户事件按自身列过滤；点击按 ClickEvent ⨝ TrackingLink ⨝ Campaign 过滤。

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select, sea_query::Expr,
};
use tracing::debug;

use super::{SeaOrmStorage, StatsScope, retry};
use crate::errors::{AttributorError, Result};

use migration::entities::{campaign, click_event, customer_event, tracking_link};

const PURCHASE_COUNT_SQL: &str =
    "COUNT(CASE WHEN customer_events.event_type = 'purchase' THEN 1 END)";
const ADD_TO_CART_COUNT_SQL: &str =
    "COUNT(CASE WHEN customer_events.event_type = 'add_to_cart' THEN 1 END)";
const EVENT_COUNT_SQL: &str = "COUNT(customer_events.id)";
const PURCHASE_REVENUE_SQL: &str = "SUM(CASE WHEN customer_events.event_type = 'purchase' \
     THEN COALESCE(customer_events.revenue, 0.0) ELSE 0.0 END)";
const JOURNEY_SOURCE_SQL: &str = "CASE WHEN customer_events.tracking_link_id IS NOT NULL \
     THEN 'Tracking Link' ELSE 'Direct/Organic' END";
const JOURNEY_METHOD_SQL: &str = "CASE \
     WHEN customer_events.coupon_code IS NOT NULL AND customer_events.coupon_code <> '' THEN 'Coupon Code' \
     WHEN customer_events.ref_code IS NOT NULL AND customer_events.ref_code <> '' THEN 'Ref Code' \
     ELSE 'Unattributed' END";

// ============ 查询结果类型 ============

/// 购买事件汇总（overview）
#[derive(Debug, FromQueryResult)]
pub struct PurchaseTotalsRow {
    pub purchase_count: i64,
    pub total_revenue: Option<f64>,
}

/// 每日点击数
#[derive(Debug, FromQueryResult)]
pub struct DailyClickRow {
    pub day: String,
    pub clicks: i64,
}

/// 每日事件汇总
#[derive(Debug, FromQueryResult)]
pub struct DailyEventRow {
    pub day: String,
    pub purchase_count: i64,
    pub add_to_cart_count: i64,
    pub total_revenue: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
pub struct BreakdownRow {
    pub event_type: String,
    pub event_count: i64,
}

/// 每个 (campaign, influencer) 的购买汇总，用于分成计算
#[derive(Debug, Clone, FromQueryResult)]
pub struct PurchaseGroupRow {
    pub campaign_id: i64,
    pub influencer_id: i64,
    pub purchase_count: i64,
    pub total_revenue: Option<f64>,
}

/// 按维度（campaign / influencer / link）聚合
#[derive(Debug, FromQueryResult)]
pub struct DimensionAggRow {
    pub dimension_id: i64,
    pub event_count: i64,
    pub purchase_count: i64,
    pub total_revenue: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
pub struct CouponAggRow {
    pub coupon_code: String,
    pub event_count: i64,
    pub purchase_count: i64,
    pub total_revenue: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
pub struct JourneyRow {
    pub source: String,
    pub method: String,
    pub event_type: String,
    pub event_count: i64,
}

#[derive(Debug, FromQueryResult)]
struct LinkClickRow {
    tracking_link_id: i64,
    clicks: i64,
}

/// 统计维度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsDimension {
    Campaign,
    Influencer,
    TrackingLink,
}

impl StatsDimension {
    fn column(self) -> customer_event::Column {
        match self {
            StatsDimension::Campaign => customer_event::Column::CampaignId,
            StatsDimension::Influencer => customer_event::Column::InfluencerId,
            StatsDimension::TrackingLink => customer_event::Column::TrackingLinkId,
        }
    }
}

fn event_condition(scope: &StatsScope) -> Condition {
    let mut condition = Condition::all();
    if let Some(advertiser_id) = scope.advertiser_id {
        condition = condition.add(customer_event::Column::AdvertiserId.eq(advertiser_id));
    }
    if let Some(campaign_id) = scope.campaign_id {
        condition = condition.add(customer_event::Column::CampaignId.eq(campaign_id));
    }
    if let Some(influencer_id) = scope.influencer_id {
        condition = condition.add(customer_event::Column::InfluencerId.eq(influencer_id));
    }
    if let Some(from) = scope.from {
        condition = condition.add(customer_event::Column::OccurredAt.gte(from));
    }
    if let Some(to) = scope.to {
        condition = condition.add(customer_event::Column::OccurredAt.lte(to));
    }
    condition
}

fn click_condition(scope: &StatsScope) -> Condition {
    let mut condition = Condition::all();
    if let Some(advertiser_id) = scope.advertiser_id {
        condition = condition.add(campaign::Column::AdvertiserId.eq(advertiser_id));
    }
    if let Some(campaign_id) = scope.campaign_id {
        condition = condition.add(tracking_link::Column::CampaignId.eq(campaign_id));
    }
    if let Some(influencer_id) = scope.influencer_id {
        condition = condition.add(tracking_link::Column::InfluencerId.eq(influencer_id));
    }
    if let Some(from) = scope.from {
        condition = condition.add(click_event::Column::ClickedAt.gte(from));
    }
    if let Some(to) = scope.to {
        condition = condition.add(click_event::Column::ClickedAt.lte(to));
    }
    condition
}

fn query_failed(what: &str, e: sea_orm::DbErr) -> AttributorError {
    AttributorError::stats_query_failed(format!("{} query failed: {}", what, e))
}

fn with_event_aggregates<E: EntityTrait>(select: Select<E>) -> Select<E> {
    select
        .column_as(Expr::cust(EVENT_COUNT_SQL), "event_count")
        .column_as(Expr::cust(PURCHASE_COUNT_SQL), "purchase_count")
        .column_as(Expr::cust(PURCHASE_REVENUE_SQL), "total_revenue")
}

/// 活动维度：从 campaigns 出发左连接事件，范围内无事件的活动计数为 0
///
/// 事件过滤放在 ON 子句里，放进 WHERE 会把左连接退化成内连接
fn campaign_rollup(scope: &StatsScope) -> Select<campaign::Entity> {
    let on = event_condition(scope);
    let mut owned = Condition::all();
    if let Some(advertiser_id) = scope.advertiser_id {
        owned = owned.add(campaign::Column::AdvertiserId.eq(advertiser_id));
    }
    if let Some(campaign_id) = scope.campaign_id {
        owned = owned.add(campaign::Column::Id.eq(campaign_id));
    }

    let events = customer_event::Relation::Campaign
        .def()
        .rev()
        .on_condition(move |_, _| on.clone());

    with_event_aggregates(
        campaign::Entity::find()
            .select_only()
            .column_as(campaign::Column::Id, "dimension_id"),
    )
    .join(JoinType::LeftJoin, events)
    .filter(owned)
    .group_by(campaign::Column::Id)
    .order_by_desc(Expr::cust("total_revenue"))
    .order_by_asc(campaign::Column::Id)
}

/// 链接维度：tracking_links ⨝ campaigns 定范围，再左连接事件
fn link_rollup(scope: &StatsScope) -> Select<tracking_link::Entity> {
    let on = event_condition(scope);
    let mut owned = Condition::all();
    if let Some(advertiser_id) = scope.advertiser_id {
        owned = owned.add(campaign::Column::AdvertiserId.eq(advertiser_id));
    }
    if let Some(campaign_id) = scope.campaign_id {
        owned = owned.add(tracking_link::Column::CampaignId.eq(campaign_id));
    }
    if let Some(influencer_id) = scope.influencer_id {
        owned = owned.add(tracking_link::Column::InfluencerId.eq(influencer_id));
    }

    let events = customer_event::Relation::TrackingLink
        .def()
        .rev()
        .on_condition(move |_, _| on.clone());

    with_event_aggregates(
        tracking_link::Entity::find()
            .select_only()
            .column_as(tracking_link::Column::Id, "dimension_id"),
    )
    .join(JoinType::InnerJoin, tracking_link::Relation::Campaign.def())
    .join(JoinType::LeftJoin, events)
    .filter(owned)
    .group_by(tracking_link::Column::Id)
    .order_by_desc(Expr::cust("total_revenue"))
    .order_by_asc(tracking_link::Column::Id)
}

/// 达人维度：达人不属于广告主，只统计范围内有事件的达人
fn influencer_rollup(scope: &StatsScope) -> Select<customer_event::Entity> {
    let column = customer_event::Column::InfluencerId;
    with_event_aggregates(
        customer_event::Entity::find()
            .select_only()
            .column_as(column, "dimension_id"),
    )
    .filter(event_condition(scope).add(column.is_not_null()))
    .group_by(column)
    .order_by_desc(Expr::cust("total_revenue"))
    .order_by_asc(column)
}

impl SeaOrmStorage {
    /// 范围内的点击数
    pub async fn count_clicks(&self, scope: &StatsScope) -> Result<u64> {
        let db = &self.db;
        let condition = click_condition(scope);

        retry::with_retry("count_clicks", self.retry_config, || async {
            click_event::Entity::find()
                .join(JoinType::InnerJoin, click_event::Relation::TrackingLink.def())
                .join(JoinType::InnerJoin, tracking_link::Relation::Campaign.def())
                .filter(condition.clone())
                .count(db)
                .await
        })
        .await
        .map_err(|e| query_failed("Click count", e))
    }

    /// 购买数与收入汇总
    pub async fn purchase_totals(&self, scope: &StatsScope) -> Result<PurchaseTotalsRow> {
        let db = &self.db;
        let condition = event_condition(scope);

        let row = retry::with_retry("purchase_totals", self.retry_config, || async {
            customer_event::Entity::find()
                .select_only()
                .column_as(Expr::cust(PURCHASE_COUNT_SQL), "purchase_count")
                .column_as(Expr::cust(PURCHASE_REVENUE_SQL), "total_revenue")
                .filter(condition.clone())
                .into_model::<PurchaseTotalsRow>()
                .one(db)
                .await
        })
        .await
        .map_err(|e| query_failed("Purchase totals", e))?;

        Ok(row.unwrap_or(PurchaseTotalsRow {
            purchase_count: 0,
            total_revenue: None,
        }))
    }

    /// 每日点击（date_expr 由调用方按后端生成）
    pub async fn daily_clicks(
        &self,
        scope: &StatsScope,
        date_expr: Expr,
    ) -> Result<Vec<DailyClickRow>> {
        let db = &self.db;
        let condition = click_condition(scope);

        retry::with_retry("daily_clicks", self.retry_config, || async {
            click_event::Entity::find()
                .select_only()
                .column_as(date_expr.clone(), "day")
                .column_as(click_event::Column::Id.count(), "clicks")
                .join(JoinType::InnerJoin, click_event::Relation::TrackingLink.def())
                .join(JoinType::InnerJoin, tracking_link::Relation::Campaign.def())
                .filter(condition.clone())
                .group_by(date_expr.clone())
                .order_by_asc(Expr::cust("day"))
                .into_model::<DailyClickRow>()
                .all(db)
                .await
        })
        .await
        .map_err(|e| query_failed("Daily clicks", e))
    }

    /// 每日购买 / 加购 / 收入
    pub async fn daily_events(
        &self,
        scope: &StatsScope,
        date_expr: Expr,
    ) -> Result<Vec<DailyEventRow>> {
        let db = &self.db;
        let condition = event_condition(scope);

        retry::with_retry("daily_events", self.retry_config, || async {
            customer_event::Entity::find()
                .select_only()
                .column_as(date_expr.clone(), "day")
                .column_as(Expr::cust(PURCHASE_COUNT_SQL), "purchase_count")
                .column_as(Expr::cust(ADD_TO_CART_COUNT_SQL), "add_to_cart_count")
                .column_as(Expr::cust(PURCHASE_REVENUE_SQL), "total_revenue")
                .filter(condition.clone())
                .group_by(date_expr.clone())
                .order_by_asc(Expr::cust("day"))
                .into_model::<DailyEventRow>()
                .all(db)
                .await
        })
        .await
        .map_err(|e| query_failed("Daily events", e))
    }

    /// 按事件类型计数
    pub async fn event_breakdown(&self, scope: &StatsScope) -> Result<Vec<BreakdownRow>> {
        let db = &self.db;
        let condition = event_condition(scope);

        retry::with_retry("event_breakdown", self.retry_config, || async {
            customer_event::Entity::find()
                .select_only()
                .column(customer_event::Column::EventType)
                .column_as(customer_event::Column::Id.count(), "event_count")
                .filter(condition.clone())
                .group_by(customer_event::Column::EventType)
                .order_by_desc(Expr::cust("event_count"))
                .order_by_asc(customer_event::Column::EventType)
                .into_model::<BreakdownRow>()
                .all(db)
                .await
        })
        .await
        .map_err(|e| query_failed("Breakdown", e))
    }

    /// 已归因购买按 (campaign, influencer) 分组
    ///
    /// `restrict` 为空时不限定维度；否则只返回该维度 ID 在列表中的分组
    pub async fn purchase_groups(
        &self,
        scope: &StatsScope,
        restrict: Option<(StatsDimension, &[i64])>,
    ) -> Result<Vec<PurchaseGroupRow>> {
        let db = &self.db;
        let mut condition = event_condition(scope)
            .add(customer_event::Column::EventType.eq("purchase"))
            .add(customer_event::Column::CampaignId.is_not_null())
            .add(customer_event::Column::InfluencerId.is_not_null());

        if let Some((dimension, ids)) = restrict {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            condition = condition.add(dimension.column().is_in(ids.iter().copied()));
        }

        let rows = retry::with_retry("purchase_groups", self.retry_config, || async {
            customer_event::Entity::find()
                .select_only()
                .column(customer_event::Column::CampaignId)
                .column(customer_event::Column::InfluencerId)
                .column_as(customer_event::Column::Id.count(), "purchase_count")
                .column_as(
                    Expr::cust("SUM(COALESCE(customer_events.revenue, 0.0))"),
                    "total_revenue",
                )
                .filter(condition.clone())
                .group_by(customer_event::Column::CampaignId)
                .group_by(customer_event::Column::InfluencerId)
                .into_model::<PurchaseGroupRow>()
                .all(db)
                .await
        })
        .await
        .map_err(|e| query_failed("Purchase groups", e))?;

        debug!("Loaded {} purchase groups", rows.len());
        Ok(rows)
    }

    /// 按维度聚合的 Top-N，收入降序，维度 ID 升序
    ///
    /// 活动和链接包含范围内没有事件的行；达人只含有事件的行
    pub async fn top_by_dimension(
        &self,
        scope: &StatsScope,
        dimension: StatsDimension,
        limit: u64,
    ) -> Result<Vec<DimensionAggRow>> {
        let db = &self.db;

        retry::with_retry("top_by_dimension", self.retry_config, || async {
            match dimension {
                StatsDimension::Campaign => {
                    campaign_rollup(scope)
                        .limit(limit)
                        .into_model::<DimensionAggRow>()
                        .all(db)
                        .await
                }
                StatsDimension::TrackingLink => {
                    link_rollup(scope)
                        .limit(limit)
                        .into_model::<DimensionAggRow>()
                        .all(db)
                        .await
                }
                StatsDimension::Influencer => {
                    influencer_rollup(scope)
                        .limit(limit)
                        .into_model::<DimensionAggRow>()
                        .all(db)
                        .await
                }
            }
        })
        .await
        .map_err(|e| query_failed("Top dimension", e))
    }

    /// 按原始优惠码聚合的 Top-N（忽略空值）
    pub async fn top_coupons(&self, scope: &StatsScope, limit: u64) -> Result<Vec<CouponAggRow>> {
        let db = &self.db;
        let condition = event_condition(scope)
            .add(customer_event::Column::CouponCode.is_not_null())
            .add(customer_event::Column::CouponCode.ne(""));

        retry::with_retry("top_coupons", self.retry_config, || async {
            customer_event::Entity::find()
                .select_only()
                .column(customer_event::Column::CouponCode)
                .column_as(customer_event::Column::Id.count(), "event_count")
                .column_as(Expr::cust(PURCHASE_COUNT_SQL), "purchase_count")
                .column_as(Expr::cust(PURCHASE_REVENUE_SQL), "total_revenue")
                .filter(condition.clone())
                .group_by(customer_event::Column::CouponCode)
                .order_by_desc(Expr::cust("total_revenue"))
                .order_by_asc(customer_event::Column::CouponCode)
                .limit(limit)
                .into_model::<CouponAggRow>()
                .all(db)
                .await
        })
        .await
        .map_err(|e| query_failed("Top coupons", e))
    }

    /// 指定链接在时间范围内的点击数
    pub async fn link_click_counts(
        &self,
        scope: &StatsScope,
        link_ids: &[i64],
    ) -> Result<HashMap<i64, i64>> {
        if link_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let db = &self.db;
        let mut condition =
            Condition::all().add(click_event::Column::TrackingLinkId.is_in(link_ids.iter().copied()));
        if let Some(from) = scope.from {
            condition = condition.add(click_event::Column::ClickedAt.gte(from));
        }
        if let Some(to) = scope.to {
            condition = condition.add(click_event::Column::ClickedAt.lte(to));
        }

        let rows = retry::with_retry("link_click_counts", self.retry_config, || async {
            click_event::Entity::find()
                .select_only()
                .column(click_event::Column::TrackingLinkId)
                .column_as(click_event::Column::Id.count(), "clicks")
                .filter(condition.clone())
                .group_by(click_event::Column::TrackingLinkId)
                .into_model::<LinkClickRow>()
                .all(db)
                .await
        })
        .await
        .map_err(|e| query_failed("Link clicks", e))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.tracking_link_id, r.clicks))
            .collect())
    }

    /// 来源 × 方式 × 事件类型
    pub async fn journey(&self, scope: &StatsScope) -> Result<Vec<JourneyRow>> {
        let db = &self.db;
        let condition = event_condition(scope);

        retry::with_retry("journey", self.retry_config, || async {
            customer_event::Entity::find()
                .select_only()
                .column_as(Expr::cust(JOURNEY_SOURCE_SQL), "source")
                .column_as(Expr::cust(JOURNEY_METHOD_SQL), "method")
                .column(customer_event::Column::EventType)
                .column_as(customer_event::Column::Id.count(), "event_count")
                .filter(condition.clone())
                .group_by(Expr::cust(JOURNEY_SOURCE_SQL))
                .group_by(Expr::cust(JOURNEY_METHOD_SQL))
                .group_by(customer_event::Column::EventType)
                .order_by_desc(Expr::cust("event_count"))
                .order_by_asc(Expr::cust("source"))
                .order_by_asc(Expr::cust("method"))
                .order_by_asc(customer_event::Column::EventType)
                .into_model::<JourneyRow>()
                .all(db)
                .await
        })
        .await
        .map_err(|e| query_failed("Journey", e))
    }
}
