//! 客户事件导出：按 (occurred_at, id) 降序的游标分页流

use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::debug;

use super::converters::model_to_customer_event;
use super::{SeaOrmStorage, StatsScope, retry};
use crate::errors::{AttributorError, Result};
use crate::storage::models::CustomerEvent;

use migration::entities::customer_event;

/// 导出批次流
pub type EventBatchStream =
    Pin<Box<dyn Stream<Item = std::result::Result<Vec<CustomerEvent>, AttributorError>> + Send>>;

/// 游标：上一批最后一行的 (occurred_at, id)
type Cursor = (DateTime<Utc>, i64);

impl SeaOrmStorage {
    /// 获取一页事件（最新在前）
    pub async fn fetch_events_page(
        &self,
        scope: &StatsScope,
        cursor: Option<Cursor>,
        batch_size: u64,
    ) -> Result<Vec<CustomerEvent>> {
        let db = &self.db;

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
        if let Some((last_at, last_id)) = cursor {
            condition = condition.add(
                Condition::any()
                    .add(customer_event::Column::OccurredAt.lt(last_at))
                    .add(
                        Condition::all()
                            .add(customer_event::Column::OccurredAt.eq(last_at))
                            .add(customer_event::Column::Id.lt(last_id)),
                    ),
            );
        }

        let models = retry::with_retry("fetch_events_page", self.retry_config, || async {
            customer_event::Entity::find()
                .filter(condition.clone())
                .order_by_desc(customer_event::Column::OccurredAt)
                .order_by_desc(customer_event::Column::Id)
                .limit(batch_size)
                .all(db)
                .await
        })
        .await
        .map_err(|e| AttributorError::stats_query_failed(format!("Export page query failed: {}", e)))?;

        Ok(models.into_iter().map(model_to_customer_event).collect())
    }

    /// 游标分页流：每次 poll 拉取一页，流被丢弃后不再发起查询
    pub fn stream_events_desc(&self, scope: StatsScope, batch_size: u64) -> EventBatchStream {
        let storage = self.clone();
        let batch_size = batch_size.max(1);

        Box::pin(stream::unfold(
            (storage, scope, None::<Cursor>, false),
            move |(storage, scope, cursor, done)| async move {
                if done {
                    return None;
                }

                match storage.fetch_events_page(&scope, cursor, batch_size).await {
                    Ok(batch) if batch.is_empty() => None,
                    Ok(batch) => {
                        let next_cursor = batch.last().map(|e| (e.occurred_at, e.id));
                        let exhausted = (batch.len() as u64) < batch_size;
                        debug!(
                            "Export page fetched: {} events (last page: {})",
                            batch.len(),
                            exhausted
                        );
                        Some((Ok(batch), (storage, scope, next_cursor, exhausted)))
                    }
                    // 出错后结束流
                    Err(e) => Some((Err(e), (storage, scope, cursor, true))),
                }
            },
        ))
    }
}
