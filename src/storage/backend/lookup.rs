//! 只读查找：归因查询、分成合约、名称映射

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};
use tracing::{debug, error};

use super::converters::{
    model_to_campaign, model_to_coupon, model_to_influencer, model_to_revenue_share,
    model_to_tracking_link,
};
use super::{SeaOrmStorage, retry};
use crate::errors::{AttributorError, Result};
use crate::storage::models::{Campaign, Coupon, Influencer, RevenueShare, TrackingLink};
use crate::storage::traits::{AttributionLookup, RevenueShareStore};

use migration::entities::{campaign, campaign_influencer, coupon, influencer, tracking_link};

/// 单条合约批量查询最多携带的 (campaign, influencer) 对数
const PAIR_LOOKUP_CHUNK: usize = 200;

#[async_trait]
impl AttributionLookup for SeaOrmStorage {
    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let db = &self.db;
        let code_owned = code.to_string();

        let model = retry::with_retry(
            &format!("find_coupon_by_code({})", code),
            self.retry_config,
            || async {
                coupon::Entity::find()
                    .filter(coupon::Column::Code.eq(code_owned.as_str()))
                    .one(db)
                    .await
            },
        )
        .await
        .map_err(|e| AttributorError::database_operation(format!("查询优惠码失败: {}", e)))?;

        Ok(model.map(model_to_coupon))
    }

    async fn find_link_by_short_code(&self, short_code: &str) -> Result<Option<TrackingLink>> {
        let db = &self.db;
        let code_owned = short_code.to_string();

        let model = retry::with_retry(
            &format!("find_link_by_short_code({})", short_code),
            self.retry_config,
            || async {
                tracking_link::Entity::find()
                    .filter(tracking_link::Column::ShortCode.eq(code_owned.as_str()))
                    .one(db)
                    .await
            },
        )
        .await
        .map_err(|e| AttributorError::database_operation(format!("查询追踪链接失败: {}", e)))?;

        Ok(model.map(model_to_tracking_link))
    }
}

#[async_trait]
impl RevenueShareStore for SeaOrmStorage {
    async fn find_revenue_share(
        &self,
        campaign_id: i64,
        influencer_id: i64,
    ) -> Result<Option<RevenueShare>> {
        let db = &self.db;

        let model = retry::with_retry(
            &format!("find_revenue_share({}, {})", campaign_id, influencer_id),
            self.retry_config,
            || async {
                campaign_influencer::Entity::find_by_id((campaign_id, influencer_id))
                    .one(db)
                    .await
            },
        )
        .await
        .map_err(|e| AttributorError::database_operation(format!("查询分成合约失败: {}", e)))?;

        Ok(model.as_ref().and_then(model_to_revenue_share))
    }

    async fn find_revenue_shares(
        &self,
        pairs: &[(i64, i64)],
    ) -> Result<HashMap<(i64, i64), RevenueShare>> {
        if pairs.is_empty() {
            return Ok(HashMap::new());
        }

        let db = &self.db;
        let mut shares = HashMap::with_capacity(pairs.len());

        // 每批一条 OR 查询，SQLite 表达式深度上限 1000
        for chunk in pairs.chunks(PAIR_LOOKUP_CHUNK) {
            let condition = chunk.iter().fold(Condition::any(), |acc, (c, i)| {
                acc.add(
                    Condition::all()
                        .add(campaign_influencer::Column::CampaignId.eq(*c))
                        .add(campaign_influencer::Column::InfluencerId.eq(*i)),
                )
            });

            let models = retry::with_retry("find_revenue_shares", self.retry_config, || async {
                campaign_influencer::Entity::find()
                    .filter(condition.clone())
                    .all(db)
                    .await
            })
            .await
            .map_err(|e| {
                AttributorError::database_operation(format!("批量查询分成合约失败: {}", e))
            })?;

            shares.extend(models.iter().filter_map(|m| {
                model_to_revenue_share(m).map(|share| ((m.campaign_id, m.influencer_id), share))
            }));
        }

        debug!(
            "Loaded {} revenue share contracts for {} pairs",
            shares.len(),
            pairs.len()
        );
        Ok(shares)
    }
}

impl SeaOrmStorage {
    /// 重定向热路径：先查缓存，未命中再查库
    ///
    /// 查询失败返回 None（按 404 处理），错误只记日志
    pub async fn find_link_cached(&self, short_code: &str) -> Option<TrackingLink> {
        if let Some(link) = self.link_cache.get(short_code) {
            return Some(link);
        }

        match self.find_link_by_short_code(short_code).await {
            Ok(Some(link)) => {
                self.link_cache
                    .insert(short_code.to_string(), link.clone());
                Some(link)
            }
            Ok(None) => None,
            Err(e) => {
                error!("重定向查询追踪链接失败: {}", e);
                None
            }
        }
    }

    /// 按 ID 批量查询活动
    pub async fn campaigns_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, Campaign>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let db = &self.db;
        let models = retry::with_retry("campaigns_by_ids", self.retry_config, || async {
            campaign::Entity::find()
                .filter(campaign::Column::Id.is_in(ids.iter().copied()))
                .all(db)
                .await
        })
        .await
        .map_err(|e| AttributorError::database_operation(format!("查询活动失败: {}", e)))?;

        Ok(models
            .into_iter()
            .map(|m| (m.id, model_to_campaign(m)))
            .collect())
    }

    /// 按 ID 批量查询达人
    pub async fn influencers_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, Influencer>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let db = &self.db;
        let models = retry::with_retry("influencers_by_ids", self.retry_config, || async {
            influencer::Entity::find()
                .filter(influencer::Column::Id.is_in(ids.iter().copied()))
                .all(db)
                .await
        })
        .await
        .map_err(|e| AttributorError::database_operation(format!("查询达人失败: {}", e)))?;

        Ok(models
            .into_iter()
            .map(|m| (m.id, model_to_influencer(m)))
            .collect())
    }

    /// 按 ID 批量查询追踪链接
    pub async fn links_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, TrackingLink>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let db = &self.db;
        let models = retry::with_retry("links_by_ids", self.retry_config, || async {
            tracking_link::Entity::find()
                .filter(tracking_link::Column::Id.is_in(ids.iter().copied()))
                .all(db)
                .await
        })
        .await
        .map_err(|e| AttributorError::database_operation(format!("查询追踪链接失败: {}", e)))?;

        Ok(models
            .into_iter()
            .map(|m| (m.id, model_to_tracking_link(m)))
            .collect())
    }
}
