//! 写操作：客户事件入库、发码注册

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DbErr, EntityTrait, PaginatorTrait, QueryFilter, ColumnTrait, SqlErr};
use tracing::{debug, info};

use super::converters::{
    new_coupon_to_active_model, new_event_to_active_model, new_link_to_active_model,
};
use super::{SeaOrmStorage, retry};
use crate::errors::{AttributorError, Result};
use crate::storage::models::{
    Coupon, InsertOutcome, NewCoupon, NewCustomerEvent, NewTrackingLink, TrackingLink,
};
use crate::storage::traits::{CodeRegistry, EventWriter};

use migration::entities::{campaign, coupon, customer_event, influencer, tracking_link};

/// 唯一索引冲突判断（各后端统一走 sql_err 映射）
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl EventWriter for SeaOrmStorage {
    async fn insert_customer_event(&self, event: NewCustomerEvent) -> Result<i64> {
        let advertiser_id = event.advertiser_id;
        let active_model = new_event_to_active_model(event);

        // 单次写入，不重试：失败时由调用方决定是否整体重放
        let result = customer_event::Entity::insert(active_model)
            .exec(&self.db)
            .await
            .map_err(|e| {
                AttributorError::database_operation(format!("写入客户事件失败: {}", e))
            })?;

        debug!(
            "Customer event {} stored for advertiser {}",
            result.last_insert_id, advertiser_id
        );
        Ok(result.last_insert_id)
    }
}

#[async_trait]
impl CodeRegistry for SeaOrmStorage {
    async fn campaign_exists(&self, campaign_id: i64) -> Result<bool> {
        let db = &self.db;
        let count = retry::with_retry(
            &format!("campaign_exists({})", campaign_id),
            self.retry_config,
            || async {
                campaign::Entity::find()
                    .filter(campaign::Column::Id.eq(campaign_id))
                    .count(db)
                    .await
            },
        )
        .await
        .map_err(|e| AttributorError::database_operation(format!("查询活动失败: {}", e)))?;

        Ok(count > 0)
    }

    async fn influencer_exists(&self, influencer_id: i64) -> Result<bool> {
        let db = &self.db;
        let count = retry::with_retry(
            &format!("influencer_exists({})", influencer_id),
            self.retry_config,
            || async {
                influencer::Entity::find()
                    .filter(influencer::Column::Id.eq(influencer_id))
                    .count(db)
                    .await
            },
        )
        .await
        .map_err(|e| AttributorError::database_operation(format!("查询达人失败: {}", e)))?;

        Ok(count > 0)
    }

    async fn try_insert_coupon(&self, new_coupon: NewCoupon) -> Result<InsertOutcome<Coupon>> {
        let created_at = Utc::now();
        let active_model = new_coupon_to_active_model(new_coupon.clone(), created_at);

        match coupon::Entity::insert(active_model).exec(&self.db).await {
            Ok(result) => {
                info!(
                    "Coupon {} issued for campaign {}",
                    new_coupon.code, new_coupon.campaign_id
                );
                Ok(InsertOutcome::Inserted(Coupon {
                    id: result.last_insert_id,
                    code: new_coupon.code,
                    campaign_id: new_coupon.campaign_id,
                    influencer_id: new_coupon.influencer_id,
                    is_active: true,
                    settings: new_coupon.settings,
                    created_at,
                }))
            }
            Err(e) if is_unique_violation(&e) => {
                debug!("Coupon code {} already taken", new_coupon.code);
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(AttributorError::database_operation(format!(
                "写入优惠码失败: {}",
                e
            ))),
        }
    }

    async fn try_insert_tracking_link(
        &self,
        link: NewTrackingLink,
    ) -> Result<InsertOutcome<TrackingLink>> {
        let created_at = Utc::now();
        let active_model = new_link_to_active_model(link.clone(), created_at);

        match tracking_link::Entity::insert(active_model)
            .exec(&self.db)
            .await
        {
            Ok(result) => {
                info!(
                    "Tracking link {} issued for campaign {}",
                    link.short_code, link.campaign_id
                );
                Ok(InsertOutcome::Inserted(TrackingLink {
                    id: result.last_insert_id,
                    short_code: link.short_code,
                    destination_url: link.destination_url,
                    campaign_id: link.campaign_id,
                    influencer_id: link.influencer_id,
                    created_at,
                }))
            }
            Err(e) if is_unique_violation(&e) => {
                debug!("Short code {} already taken", link.short_code);
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(AttributorError::database_operation(format!(
                "写入追踪链接失败: {}",
                e
            ))),
        }
    }
}
