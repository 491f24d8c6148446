//! ClickSink implementation for SeaOrmStorage

use async_trait::async_trait;
use sea_orm::{ActiveValue::{NotSet, Set}, EntityTrait};
use tracing::debug;

use super::SeaOrmStorage;
use crate::analytics::{ClickDetail, ClickSink};

use migration::entities::click_event;

#[async_trait]
impl ClickSink for SeaOrmStorage {
    async fn log_click(&self, detail: ClickDetail) -> anyhow::Result<()> {
        let link_id = detail.tracking_link_id;
        let model = click_event::ActiveModel {
            id: NotSet,
            tracking_link_id: Set(detail.tracking_link_id),
            clicked_at: Set(detail.clicked_at),
            ip_address: Set(detail.ip_address),
            user_agent: Set(detail.user_agent),
            referer: Set(detail.referer),
        };

        click_event::Entity::insert(model)
            .exec(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to insert click event: {}", e))?;

        debug!("Click event stored for tracking link {}", link_id);
        Ok(())
    }
}
