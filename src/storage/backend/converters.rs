use std::str::FromStr;

use sea_orm::ActiveValue::{NotSet, Set};
use tracing::warn;

use crate::storage::models::{
    Attribution, Campaign, Coupon, CustomerEvent, Influencer, NewCoupon, NewCustomerEvent,
    NewTrackingLink, RevenueShare, ShareType, TrackingLink,
};
use migration::entities::{
    campaign, campaign_influencer, coupon, customer_event, influencer, tracking_link,
};

pub fn model_to_campaign(model: campaign::Model) -> Campaign {
    Campaign {
        id: model.id,
        advertiser_id: model.advertiser_id,
        name: model.name,
        status: model.status,
        budget: model.budget,
    }
}

pub fn model_to_influencer(model: influencer::Model) -> Influencer {
    Influencer {
        id: model.id,
        name: model.name,
        email: model.email,
        social_handle: model.social_handle,
    }
}

pub fn model_to_coupon(model: coupon::Model) -> Coupon {
    Coupon {
        id: model.id,
        code: model.code,
        campaign_id: model.campaign_id,
        influencer_id: model.influencer_id,
        is_active: model.is_active,
        settings: model.settings,
        created_at: model.created_at,
    }
}

pub fn model_to_tracking_link(model: tracking_link::Model) -> TrackingLink {
    TrackingLink {
        id: model.id,
        short_code: model.short_code,
        destination_url: model.destination_url,
        campaign_id: model.campaign_id,
        influencer_id: model.influencer_id,
        created_at: model.created_at,
    }
}

/// 合约行转换；未知的分成类型视为无合约
pub fn model_to_revenue_share(model: &campaign_influencer::Model) -> Option<RevenueShare> {
    match ShareType::from_str(&model.revenue_share_type) {
        Ok(share_type) => Some(RevenueShare {
            share_type,
            value: model.revenue_share_value,
        }),
        Err(_) => {
            warn!(
                "Unknown revenue_share_type '{}' for campaign {} / influencer {}, treating as no contract",
                model.revenue_share_type, model.campaign_id, model.influencer_id
            );
            None
        }
    }
}

pub fn model_to_customer_event(model: customer_event::Model) -> CustomerEvent {
    CustomerEvent {
        id: model.id,
        advertiser_id: model.advertiser_id,
        event_type: model.event_type,
        occurred_at: model.occurred_at,
        revenue: model.revenue,
        currency: model.currency,
        coupon_code: model.coupon_code,
        ref_code: model.ref_code,
        attribution: Attribution {
            influencer_id: model.influencer_id,
            campaign_id: model.campaign_id,
            tracking_link_id: model.tracking_link_id,
        },
    }
}

pub fn new_event_to_active_model(event: NewCustomerEvent) -> customer_event::ActiveModel {
    customer_event::ActiveModel {
        id: NotSet,
        advertiser_id: Set(event.advertiser_id),
        event_type: Set(event.event_type.as_ref().to_string()),
        occurred_at: Set(event.occurred_at),
        revenue: Set(event.revenue),
        currency: Set(event.currency),
        coupon_code: Set(event.coupon_code),
        ref_code: Set(event.ref_code),
        landing_url: Set(event.landing_url),
        referrer: Set(event.referrer),
        tracking_link_id: Set(event.attribution.tracking_link_id),
        influencer_id: Set(event.attribution.influencer_id),
        campaign_id: Set(event.attribution.campaign_id),
        properties: Set(event.properties),
        raw_payload: Set(event.raw_payload),
    }
}

pub fn new_coupon_to_active_model(
    coupon: NewCoupon,
    created_at: chrono::DateTime<chrono::Utc>,
) -> coupon::ActiveModel {
    coupon::ActiveModel {
        id: NotSet,
        code: Set(coupon.code),
        campaign_id: Set(coupon.campaign_id),
        influencer_id: Set(coupon.influencer_id),
        is_active: Set(true),
        settings: Set(coupon.settings),
        created_at: Set(created_at),
    }
}

pub fn new_link_to_active_model(
    link: NewTrackingLink,
    created_at: chrono::DateTime<chrono::Utc>,
) -> tracking_link::ActiveModel {
    tracking_link::ActiveModel {
        id: NotSet,
        short_code: Set(link.short_code),
        destination_url: Set(link.destination_url),
        campaign_id: Set(link.campaign_id),
        influencer_id: Set(link.influencer_id),
        created_at: Set(created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::EventType;
    use chrono::Utc;
    use sea_orm::ActiveValue;

    fn contract(share_type: &str, value: f64) -> campaign_influencer::Model {
        campaign_influencer::Model {
            campaign_id: 3,
            influencer_id: 7,
            revenue_share_type: share_type.to_string(),
            revenue_share_value: value,
        }
    }

    #[test]
    fn test_revenue_share_known_types() {
        let pct = model_to_revenue_share(&contract("percentage", 15.0)).unwrap();
        assert_eq!(pct.share_type, ShareType::Percentage);
        assert_eq!(pct.value, 15.0);

        let flat = model_to_revenue_share(&contract("flat", 5.0)).unwrap();
        assert_eq!(flat.share_type, ShareType::Flat);
    }

    #[test]
    fn test_revenue_share_unknown_type_is_none() {
        assert!(model_to_revenue_share(&contract("tiered", 5.0)).is_none());
    }

    #[test]
    fn test_new_event_active_model_carries_attribution() {
        let event = NewCustomerEvent {
            advertiser_id: 1,
            event_type: EventType::AddToCart,
            occurred_at: Utc::now(),
            revenue: None,
            currency: "USD".to_string(),
            coupon_code: None,
            ref_code: Some("abc123".to_string()),
            landing_url: None,
            referrer: None,
            attribution: Attribution {
                influencer_id: Some(9),
                campaign_id: Some(2),
                tracking_link_id: Some(11),
            },
            properties: None,
            raw_payload: "{}".to_string(),
        };

        let am = new_event_to_active_model(event);
        assert_eq!(am.id, ActiveValue::NotSet);
        assert_eq!(am.event_type, ActiveValue::Set("add_to_cart".to_string()));
        assert_eq!(am.influencer_id, ActiveValue::Set(Some(9)));
        assert_eq!(am.tracking_link_id, ActiveValue::Set(Some(11)));
    }
}
