pub mod campaign;
pub mod campaign_influencer;
pub mod click_event;
pub mod coupon;
pub mod customer_event;
pub mod influencer;
pub mod tracking_link;

pub use campaign::Entity as CampaignEntity;
pub use campaign_influencer::Entity as CampaignInfluencerEntity;
pub use click_event::Entity as ClickEventEntity;
pub use coupon::Entity as CouponEntity;
pub use customer_event::Entity as CustomerEventEntity;
pub use influencer::Entity as InfluencerEntity;
pub use tracking_link::Entity as TrackingLinkEntity;
