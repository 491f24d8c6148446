//! 仓储接口
//!
//! 核心逻辑（归因、分成、入库、发码）只通过这些 trait 访问存储，
//! `SeaOrmStorage` 为生产实现，测试中使用内存实现。

use std::collections::HashMap;

use async_trait::async_trait;

use super::models::{
    Coupon, InsertOutcome, NewCoupon, NewCustomerEvent, NewTrackingLink, RevenueShare,
    TrackingLink,
};
use crate::errors::Result;

/// 归因查询（只读）
#[async_trait]
pub trait AttributionLookup: Send + Sync {
    /// 按完整 code 精确查找优惠码
    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>>;

    /// 按 short_code 精确查找追踪链接
    async fn find_link_by_short_code(&self, short_code: &str) -> Result<Option<TrackingLink>>;
}

/// 分成合约查询
#[async_trait]
pub trait RevenueShareStore: Send + Sync {
    async fn find_revenue_share(
        &self,
        campaign_id: i64,
        influencer_id: i64,
    ) -> Result<Option<RevenueShare>>;

    /// 批量查询，键为 (campaign_id, influencer_id)
    async fn find_revenue_shares(
        &self,
        pairs: &[(i64, i64)],
    ) -> Result<HashMap<(i64, i64), RevenueShare>>;
}

/// 客户事件写入
#[async_trait]
pub trait EventWriter: Send + Sync {
    /// 单次插入，返回新事件 ID
    async fn insert_customer_event(&self, event: NewCustomerEvent) -> Result<i64>;
}

/// 发码注册表：依赖存储层唯一索引
#[async_trait]
pub trait CodeRegistry: Send + Sync {
    async fn campaign_exists(&self, campaign_id: i64) -> Result<bool>;

    async fn influencer_exists(&self, influencer_id: i64) -> Result<bool>;

    async fn try_insert_coupon(&self, coupon: NewCoupon) -> Result<InsertOutcome<Coupon>>;

    async fn try_insert_tracking_link(
        &self,
        link: NewTrackingLink,
    ) -> Result<InsertOutcome<TrackingLink>>;
}
