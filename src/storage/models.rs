use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use ts_rs::TS;

/// 输出目录常量（dashboard 前端类型）
pub const TS_EXPORT_PATH: &str = "../dashboard/src/services/types.generated.ts";

/// 客户事件类型
///
/// 只有 `Purchase` 计入收入与分成。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    Purchase,
    AddToCart,
    Signup,
    Custom,
    DropOff,
}

impl EventType {
    pub fn is_purchase(self) -> bool {
        matches!(self, EventType::Purchase)
    }
}

/// 分成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShareType {
    /// revenue × value / 100
    Percentage,
    /// 每个合格事件固定 value
    Flat,
}

/// Campaign-Influencer 合约条款
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevenueShare {
    pub share_type: ShareType,
    pub value: f64,
}

/// 归因结果：三者都可能为空（自然流量）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Attribution {
    pub influencer_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub tracking_link_id: Option<i64>,
}

impl Attribution {
    pub fn unattributed() -> Self {
        Self::default()
    }

    pub fn is_attributed(&self) -> bool {
        self.influencer_id.is_some() || self.campaign_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: i64,
    pub advertiser_id: i64,
    pub name: String,
    pub status: String,
    pub budget: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Influencer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub social_handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub campaign_id: i64,
    pub influencer_id: Option<i64>,
    pub is_active: bool,
    pub settings: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingLink {
    pub id: i64,
    pub short_code: String,
    pub destination_url: String,
    pub campaign_id: i64,
    pub influencer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// 待写入的客户事件（入库时一次性写入，之后不再修改）
#[derive(Debug, Clone)]
pub struct NewCustomerEvent {
    pub advertiser_id: i64,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub revenue: Option<f64>,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub ref_code: Option<String>,
    pub landing_url: Option<String>,
    pub referrer: Option<String>,
    pub attribution: Attribution,
    pub properties: Option<String>,
    pub raw_payload: String,
}

/// 已持久化的客户事件（导出用）
#[derive(Debug, Clone)]
pub struct CustomerEvent {
    pub id: i64,
    pub advertiser_id: i64,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub revenue: Option<f64>,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub ref_code: Option<String>,
    pub attribution: Attribution,
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub campaign_id: i64,
    pub influencer_id: Option<i64>,
    pub settings: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTrackingLink {
    pub short_code: String,
    pub destination_url: String,
    pub campaign_id: i64,
    pub influencer_id: Option<i64>,
}

/// 唯一约束插入结果
#[derive(Debug)]
pub enum InsertOutcome<T> {
    Inserted(T),
    /// 唯一索引冲突（发码重试的唯一触发条件）
    Duplicate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(EventType::AddToCart.as_ref(), "add_to_cart");
        assert_eq!(EventType::DropOff.to_string(), "drop_off");
        assert_eq!(EventType::from_str("purchase").unwrap(), EventType::Purchase);
        assert!(EventType::from_str("refund").is_err());

        let parsed: EventType = serde_json::from_str("\"signup\"").unwrap();
        assert_eq!(parsed, EventType::Signup);
    }

    #[test]
    fn test_share_type_parse() {
        assert_eq!(ShareType::from_str("percentage").unwrap(), ShareType::Percentage);
        assert_eq!(ShareType::from_str("flat").unwrap(), ShareType::Flat);
        assert!(ShareType::from_str("tiered").is_err());
    }

    #[test]
    fn test_unattributed_is_all_absent() {
        let a = Attribution::unattributed();
        assert_eq!(a.influencer_id, None);
        assert_eq!(a.campaign_id, None);
        assert_eq!(a.tracking_link_id, None);
        assert!(!a.is_attributed());
    }
}
