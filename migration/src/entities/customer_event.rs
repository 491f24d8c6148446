//! Customer event entity
//!
//! Raw attribution inputs are kept next to the resolved triple
//! (tracking_link_id / influencer_id / campaign_id), which is written once at
//! ingestion and never recomputed.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "customer_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub advertiser_id: i64,
    pub event_type: String,
    pub occurred_at: DateTimeUtc,
    pub revenue: Option<f64>,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub ref_code: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub landing_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub referrer: Option<String>,
    pub tracking_link_id: Option<i64>,
    pub influencer_id: Option<i64>,
    pub campaign_id: Option<i64>,
    /// payload.properties as JSON text
    #[sea_orm(column_type = "Text", nullable)]
    pub properties: Option<String>,
    /// Full inbound payload as JSON text (audit trail)
    #[sea_orm(column_type = "Text")]
    pub raw_payload: String,
}

/// 归因列可为空且无外键约束，关系只用于统计查询的 join
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id"
    )]
    Campaign,
    #[sea_orm(
        belongs_to = "super::tracking_link::Entity",
        from = "Column::TrackingLinkId",
        to = "super::tracking_link::Column::Id"
    )]
    TrackingLink,
}

impl ActiveModelBehavior for ActiveModel {}
