//! 统计查询索引
//!
//! 覆盖 dashboard 的主要过滤维度：advertiser + 时间、campaign、influencer、
//! tracking link、event_type，以及点击的 link + 时间。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 索引：advertiser_id + occurred_at（租户时间范围查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_customer_events_adv_time")
                    .table(CustomerEvents::Table)
                    .col(CustomerEvents::AdvertiserId)
                    .col(CustomerEvents::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // 索引：campaign_id（Top Campaigns / campaign 过滤）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_customer_events_campaign")
                    .table(CustomerEvents::Table)
                    .col(CustomerEvents::CampaignId)
                    .to_owned(),
            )
            .await?;

        // 索引：influencer_id（Top Influencers / influencer 过滤）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_customer_events_influencer")
                    .table(CustomerEvents::Table)
                    .col(CustomerEvents::InfluencerId)
                    .to_owned(),
            )
            .await?;

        // 索引：tracking_link_id（Top Links）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_customer_events_link")
                    .table(CustomerEvents::Table)
                    .col(CustomerEvents::TrackingLinkId)
                    .to_owned(),
            )
            .await?;

        // 索引：event_type（breakdown / journey）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_customer_events_type")
                    .table(CustomerEvents::Table)
                    .col(CustomerEvents::EventType)
                    .to_owned(),
            )
            .await?;

        // 索引：tracking_link_id + clicked_at（单链接点击计数）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_events_link_time")
                    .table(ClickEvents::Table)
                    .col(ClickEvents::TrackingLinkId)
                    .col(ClickEvents::ClickedAt)
                    .to_owned(),
            )
            .await?;

        // 索引：clicked_at（每日点击趋势）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_events_clicked_at")
                    .table(ClickEvents::Table)
                    .col(ClickEvents::ClickedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_click_events_clicked_at")
                    .table(ClickEvents::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_click_events_link_time")
                    .table(ClickEvents::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_customer_events_type")
                    .table(CustomerEvents::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_customer_events_link")
                    .table(CustomerEvents::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_customer_events_influencer")
                    .table(CustomerEvents::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_customer_events_campaign")
                    .table(CustomerEvents::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_customer_events_adv_time")
                    .table(CustomerEvents::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum CustomerEvents {
    #[sea_orm(iden = "customer_events")]
    Table,
    AdvertiserId,
    OccurredAt,
    CampaignId,
    InfluencerId,
    TrackingLinkId,
    EventType,
}

#[derive(DeriveIden)]
enum ClickEvents {
    #[sea_orm(iden = "click_events")]
    Table,
    TrackingLinkId,
    ClickedAt,
}
