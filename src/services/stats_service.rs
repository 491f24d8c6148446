//! Stats aggregation service
//!
//! Read-only dashboard views over clicks and customer events: overview,
//! daily chart, event breakdown, top-N tables, attribution journey and the
//! streamed CSV export. Every view takes a [`StatsScope`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures_util::stream::{Stream, StreamExt};
use sea_orm::{DbBackend, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, info};
use ts_rs::TS;

use super::revenue_share::RevenueShareCalculator;
use crate::config::{StatsConfig, get_config};
use crate::errors::{AttributorError, Result};
use crate::storage::models::TS_EXPORT_PATH;
use crate::storage::{CustomerEvent, SeaOrmStorage, StatsDimension, StatsScope};

// ============ 公共类型定义 ============

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct StatsOverview {
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: f64,
    pub payout: f64,
    /// Percent, rounded to 2 decimals
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ChartPoint {
    /// UTC calendar day, `YYYY-MM-DD`
    pub date: String,
    pub clicks: u64,
    pub purchases: u64,
    pub add_to_cart: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct BreakdownItem {
    pub event_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct TopCampaign {
    pub campaign_id: i64,
    pub name: String,
    pub status: String,
    pub events: u64,
    pub purchases: u64,
    pub revenue: f64,
    pub payout: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct TopInfluencer {
    pub influencer_id: i64,
    pub name: String,
    pub social_handle: Option<String>,
    pub events: u64,
    pub purchases: u64,
    pub revenue: f64,
    pub payout: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct TopCoupon {
    pub code: String,
    pub events: u64,
    pub purchases: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct TopLink {
    pub tracking_link_id: i64,
    pub short_code: String,
    pub url: String,
    pub events: u64,
    pub purchases: u64,
    pub revenue: f64,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct JourneyStep {
    pub source: String,
    pub method: String,
    pub event_type: String,
    pub count: u64,
}

/// One CSV export line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Event ID")]
    pub event_id: i64,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Type")]
    pub event_type: String,
    #[serde(rename = "Ref Code")]
    pub ref_code: String,
    #[serde(rename = "Coupon")]
    pub coupon: String,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    #[serde(rename = "Influencer")]
    pub influencer: String,
    #[serde(rename = "Campaign")]
    pub campaign: String,
}

pub type ExportRowStream = Pin<Box<dyn Stream<Item = Result<Vec<ExportRow>>> + Send>>;

const UNKNOWN_NAME: &str = "Unknown";
const UNATTRIBUTED: &str = "Unattributed";

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// conversions / clicks × 100, 0 when there are no clicks
pub fn conversion_rate(conversions: u64, clicks: u64) -> f64 {
    if clicks == 0 {
        return 0.0;
    }
    round2(conversions as f64 / clicks as f64 * 100.0)
}

fn count(value: i64) -> u64 {
    value.max(0) as u64
}

// ============ StatsService ============

pub struct StatsService {
    storage: Arc<SeaOrmStorage>,
    calculator: RevenueShareCalculator,
    config: StatsConfig,
}

impl StatsService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self::with_config(storage, get_config().stats.clone())
    }

    pub fn with_config(storage: Arc<SeaOrmStorage>, config: StatsConfig) -> Self {
        let calculator = RevenueShareCalculator::new(storage.clone());
        Self {
            storage,
            calculator,
            config,
        }
    }

    /// 解析日期，支持 RFC3339 和 YYYY-MM-DD 格式
    ///
    /// 纯日期作为上界时取当天最后一刻，保证 `to` 闭区间包含整天
    pub fn parse_date(s: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
                let time = if end_of_day {
                    NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?
                } else {
                    NaiveTime::MIN
                };
                Some(date.and_time(time).and_utc())
            })
    }

    /// 严格解析时间范围，解析失败或 from > to 时返回错误
    pub fn parse_range(
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let parse = |value: Option<&str>, name: &str, end_of_day: bool| {
            value
                .filter(|s| !s.is_empty())
                .map(|s| {
                    Self::parse_date(s, end_of_day).ok_or_else(|| {
                        AttributorError::date_parse(format!(
                            "Invalid {} date: '{}'. Supported formats: RFC3339 or YYYY-MM-DD",
                            name, s
                        ))
                    })
                })
                .transpose()
        };

        let from = parse(from, "from", false)?;
        let to = parse(to, "to", true)?;
        if let (Some(f), Some(t)) = (from, to)
            && f > t
        {
            return Err(AttributorError::validation(
                "'from' must not be later than 'to'",
            ));
        }
        Ok((from, to))
    }

    /// Top-N 数量：默认值，限制在 [1, max_top_limit]
    pub fn clamp_limit(&self, limit: Option<u64>) -> u64 {
        let max = self.config.max_top_limit.max(1);
        limit
            .unwrap_or(self.config.default_top_limit)
            .clamp(1, max)
    }

    /// 按后端生成 UTC 日期表达式（`YYYY-MM-DD`）
    pub fn date_format_expr(backend: DbBackend, column: &str) -> Expr {
        match backend {
            DbBackend::Sqlite => Expr::cust(format!("strftime('%Y-%m-%d', {})", column)),
            DbBackend::MySql => Expr::cust(format!("DATE_FORMAT({}, '%Y-%m-%d')", column)),
            DbBackend::Postgres | _ => Expr::cust(format!(
                "TO_CHAR({} AT TIME ZONE 'UTC', 'YYYY-MM-DD')",
                column
            )),
        }
    }

    pub async fn overview(&self, scope: &StatsScope) -> Result<StatsOverview> {
        info!("Stats: overview for {:?}", scope);

        let (clicks, totals, groups) = tokio::try_join!(
            self.storage.count_clicks(scope),
            self.storage.purchase_totals(scope),
            self.storage.purchase_groups(scope, None),
        )?;
        let payout = self.calculator.total_payout(&groups).await?;

        let conversions = count(totals.purchase_count);
        Ok(StatsOverview {
            clicks,
            conversions,
            revenue: totals.total_revenue.unwrap_or(0.0),
            payout,
            conversion_rate: conversion_rate(conversions, clicks),
        })
    }

    pub async fn chart(&self, scope: &StatsScope) -> Result<Vec<ChartPoint>> {
        info!("Stats: chart for {:?}", scope);

        let backend = self.storage.db_backend();
        let click_day = Self::date_format_expr(backend, "click_events.clicked_at");
        let event_day = Self::date_format_expr(backend, "customer_events.occurred_at");

        let (click_rows, event_rows) = tokio::try_join!(
            self.storage.daily_clicks(scope, click_day),
            self.storage.daily_events(scope, event_day),
        )?;

        let mut merged: BTreeMap<String, ChartPoint> = BTreeMap::new();
        let blank = |date: &str| ChartPoint {
            date: date.to_string(),
            clicks: 0,
            purchases: 0,
            add_to_cart: 0,
            revenue: 0.0,
        };

        for row in click_rows {
            merged
                .entry(row.day.clone())
                .or_insert_with(|| blank(&row.day))
                .clicks = count(row.clicks);
        }
        for row in event_rows {
            let point = merged
                .entry(row.day.clone())
                .or_insert_with(|| blank(&row.day));
            point.purchases = count(row.purchase_count);
            point.add_to_cart = count(row.add_to_cart_count);
            point.revenue = row.total_revenue.unwrap_or(0.0);
        }

        debug!("Stats: chart returned {} days", merged.len());
        Ok(merged.into_values().collect())
    }

    pub async fn breakdown(&self, scope: &StatsScope) -> Result<Vec<BreakdownItem>> {
        info!("Stats: breakdown for {:?}", scope);

        let rows = self.storage.event_breakdown(scope).await?;
        Ok(rows
            .into_iter()
            .map(|r| BreakdownItem {
                event_type: r.event_type,
                count: count(r.event_count),
            })
            .collect())
    }

    pub async fn top_campaigns(
        &self,
        scope: &StatsScope,
        limit: Option<u64>,
    ) -> Result<Vec<TopCampaign>> {
        let limit = self.clamp_limit(limit);
        info!("Stats: top campaigns for {:?}, limit={}", scope, limit);

        let rows = self
            .storage
            .top_by_dimension(scope, StatsDimension::Campaign, limit)
            .await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.dimension_id).collect();

        let (campaigns, groups) = tokio::try_join!(
            self.storage.campaigns_by_ids(&ids),
            self.storage
                .purchase_groups(scope, Some((StatsDimension::Campaign, &ids))),
        )?;
        let payouts = self.calculator.payouts_for_groups(&groups).await?;
        let payout_by_campaign = sum_payouts_by(&payouts, |(campaign_id, _)| campaign_id);

        Ok(rows
            .into_iter()
            .map(|r| {
                let campaign = campaigns.get(&r.dimension_id);
                TopCampaign {
                    campaign_id: r.dimension_id,
                    name: campaign
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                    status: campaign
                        .map(|c| c.status.clone())
                        .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                    events: count(r.event_count),
                    purchases: count(r.purchase_count),
                    revenue: r.total_revenue.unwrap_or(0.0),
                    payout: payout_by_campaign
                        .get(&r.dimension_id)
                        .copied()
                        .unwrap_or(0.0),
                }
            })
            .collect())
    }

    pub async fn top_influencers(
        &self,
        scope: &StatsScope,
        limit: Option<u64>,
    ) -> Result<Vec<TopInfluencer>> {
        let limit = self.clamp_limit(limit);
        info!("Stats: top influencers for {:?}, limit={}", scope, limit);

        let rows = self
            .storage
            .top_by_dimension(scope, StatsDimension::Influencer, limit)
            .await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.dimension_id).collect();

        let (influencers, groups) = tokio::try_join!(
            self.storage.influencers_by_ids(&ids),
            self.storage
                .purchase_groups(scope, Some((StatsDimension::Influencer, &ids))),
        )?;
        let payouts = self.calculator.payouts_for_groups(&groups).await?;
        let payout_by_influencer = sum_payouts_by(&payouts, |(_, influencer_id)| influencer_id);

        Ok(rows
            .into_iter()
            .map(|r| {
                let influencer = influencers.get(&r.dimension_id);
                TopInfluencer {
                    influencer_id: r.dimension_id,
                    name: influencer
                        .map(|i| i.name.clone())
                        .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                    social_handle: influencer.and_then(|i| i.social_handle.clone()),
                    events: count(r.event_count),
                    purchases: count(r.purchase_count),
                    revenue: r.total_revenue.unwrap_or(0.0),
                    payout: payout_by_influencer
                        .get(&r.dimension_id)
                        .copied()
                        .unwrap_or(0.0),
                }
            })
            .collect())
    }

    pub async fn top_coupons(
        &self,
        scope: &StatsScope,
        limit: Option<u64>,
    ) -> Result<Vec<TopCoupon>> {
        let limit = self.clamp_limit(limit);
        info!("Stats: top coupons for {:?}, limit={}", scope, limit);

        let rows = self.storage.top_coupons(scope, limit).await?;
        Ok(rows
            .into_iter()
            .map(|r| TopCoupon {
                code: r.coupon_code,
                events: count(r.event_count),
                purchases: count(r.purchase_count),
                revenue: r.total_revenue.unwrap_or(0.0),
            })
            .collect())
    }

    pub async fn top_links(&self, scope: &StatsScope, limit: Option<u64>) -> Result<Vec<TopLink>> {
        let limit = self.clamp_limit(limit);
        info!("Stats: top links for {:?}, limit={}", scope, limit);

        let rows = self
            .storage
            .top_by_dimension(scope, StatsDimension::TrackingLink, limit)
            .await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.dimension_id).collect();

        let (links, clicks) = tokio::try_join!(
            self.storage.links_by_ids(&ids),
            self.storage.link_click_counts(scope, &ids),
        )?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let link = links.get(&r.dimension_id);
                TopLink {
                    tracking_link_id: r.dimension_id,
                    short_code: link
                        .map(|l| l.short_code.clone())
                        .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                    url: link.map(|l| l.destination_url.clone()).unwrap_or_default(),
                    events: count(r.event_count),
                    purchases: count(r.purchase_count),
                    revenue: r.total_revenue.unwrap_or(0.0),
                    clicks: count(clicks.get(&r.dimension_id).copied().unwrap_or(0)),
                }
            })
            .collect())
    }

    pub async fn journey(&self, scope: &StatsScope) -> Result<Vec<JourneyStep>> {
        info!("Stats: journey for {:?}", scope);

        let rows = self.storage.journey(scope).await?;
        Ok(rows
            .into_iter()
            .map(|r| JourneyStep {
                source: r.source,
                method: r.method,
                event_type: r.event_type,
                count: count(r.event_count),
            })
            .collect())
    }

    /// 分批导出行流；丢弃流即停止后续查询
    pub fn export(&self, scope: StatsScope) -> ExportRowStream {
        info!("Stats: export for {:?}", scope);

        let storage = Arc::clone(&self.storage);
        let batches = self
            .storage
            .stream_events_desc(scope, self.config.export_batch_size);

        Box::pin(batches.then(move |batch| {
            let storage = Arc::clone(&storage);
            async move {
                let events = batch?;
                resolve_export_rows(&storage, events).await
            }
        }))
    }
}

/// 按 key 投影汇总分成
fn sum_payouts_by<F>(payouts: &HashMap<(i64, i64), f64>, key: F) -> HashMap<i64, f64>
where
    F: Fn((i64, i64)) -> i64,
{
    let mut sums: HashMap<i64, f64> = HashMap::new();
    for (pair, payout) in payouts {
        *sums.entry(key(*pair)).or_insert(0.0) += payout;
    }
    sums
}

/// 每批两次名称查询（达人、活动）
async fn resolve_export_rows(
    storage: &SeaOrmStorage,
    events: Vec<CustomerEvent>,
) -> Result<Vec<ExportRow>> {
    let influencer_ids: Vec<i64> = events
        .iter()
        .filter_map(|e| e.attribution.influencer_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let campaign_ids: Vec<i64> = events
        .iter()
        .filter_map(|e| e.attribution.campaign_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let (influencers, campaigns) = tokio::try_join!(
        storage.influencers_by_ids(&influencer_ids),
        storage.campaigns_by_ids(&campaign_ids),
    )?;

    Ok(events
        .into_iter()
        .map(|e| ExportRow {
            event_id: e.id,
            date: e.occurred_at.to_rfc3339(),
            event_type: e.event_type,
            ref_code: e.ref_code.unwrap_or_default(),
            coupon: e.coupon_code.unwrap_or_default(),
            revenue: e.revenue.unwrap_or(0.0),
            influencer: e
                .attribution
                .influencer_id
                .and_then(|id| influencers.get(&id))
                .map(|i| i.name.clone())
                .unwrap_or_else(|| UNATTRIBUTED.to_string()),
            campaign: e
                .attribution
                .campaign_id
                .and_then(|id| campaigns.get(&id))
                .map(|c| c.name.clone())
                .unwrap_or_default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_round2_and_conversion_rate() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(66.666666), 66.67);
        assert_eq!(conversion_rate(3, 10), 30.0);
        assert_eq!(conversion_rate(1, 3), 33.33);
        assert_eq!(conversion_rate(5, 0), 0.0);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            StatsService::parse_date("2026-03-01T10:00:00Z", false),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            StatsService::parse_date("2026-03-01", false),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
        );
        let end = StatsService::parse_date("2026-03-01", true).unwrap();
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert!(end > Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap());
        assert_eq!(StatsService::parse_date("03/01/2026", false), None);
    }

    #[test]
    fn test_parse_range_validation() {
        let (from, to) = StatsService::parse_range(Some("2026-03-01"), Some("2026-03-31")).unwrap();
        assert!(from.unwrap() < to.unwrap());

        assert!(matches!(
            StatsService::parse_range(Some("yesterday"), None),
            Err(AttributorError::DateParse(_))
        ));
        assert!(matches!(
            StatsService::parse_range(Some("2026-04-01"), Some("2026-03-01")),
            Err(AttributorError::Validation(_))
        ));
        assert_eq!(StatsService::parse_range(None, None).unwrap(), (None, None));
        assert_eq!(StatsService::parse_range(Some(""), None).unwrap(), (None, None));
    }

    #[test]
    fn test_date_format_expr_per_backend() {
        use sea_orm::sea_query::{Query, SqliteQueryBuilder};

        let expr = StatsService::date_format_expr(DbBackend::Sqlite, "click_events.clicked_at");
        let sql = Query::select().expr(expr).to_string(SqliteQueryBuilder);
        assert!(sql.contains("strftime('%Y-%m-%d', click_events.clicked_at)"));
    }

    #[test]
    fn test_sum_payouts_by_projection() {
        let payouts: HashMap<(i64, i64), f64> =
            [((1, 7), 10.0), ((1, 8), 5.0), ((2, 7), 2.5)].into_iter().collect();

        let by_campaign = sum_payouts_by(&payouts, |(c, _)| c);
        assert_eq!(by_campaign[&1], 15.0);
        assert_eq!(by_campaign[&2], 2.5);

        let by_influencer = sum_payouts_by(&payouts, |(_, i)| i);
        assert_eq!(by_influencer[&7], 12.5);
        assert_eq!(by_influencer[&8], 5.0);
    }
}
