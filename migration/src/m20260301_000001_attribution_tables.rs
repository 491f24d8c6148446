//! 归因基础表
//!
//! campaigns / influencers / campaign_influencers / coupons / tracking_links。
//! coupons.code 与 tracking_links.short_code 的唯一索引是发码重试的唯一依据。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Campaigns::AdvertiserId).big_integer().not_null())
                    .col(ColumnDef::new(Campaigns::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Campaigns::Status)
                            .string_len(50)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Campaigns::Budget)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Campaigns::StartDate).date().null())
                    .col(ColumnDef::new(Campaigns::EndDate).date().null())
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaigns_advertiser")
                    .table(Campaigns::Table)
                    .col(Campaigns::AdvertiserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Influencers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Influencers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Influencers::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Influencers::Email)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Influencers::SocialHandle).string_len(100).null())
                    .col(
                        ColumnDef::new(Influencers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // (campaign_id, influencer_id) 复合主键：保证分成 join 最多一对一
        manager
            .create_table(
                Table::create()
                    .table(CampaignInfluencers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CampaignInfluencers::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignInfluencers::InfluencerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignInfluencers::RevenueShareType)
                            .string_len(20)
                            .not_null()
                            .default("percentage"),
                    )
                    .col(
                        ColumnDef::new(CampaignInfluencers::RevenueShareValue)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_campaign_influencers")
                            .col(CampaignInfluencers::CampaignId)
                            .col(CampaignInfluencers::InfluencerId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Coupons::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Coupons::Code).string_len(50).not_null())
                    .col(ColumnDef::new(Coupons::CampaignId).big_integer().not_null())
                    .col(ColumnDef::new(Coupons::InfluencerId).big_integer().null())
                    .col(
                        ColumnDef::new(Coupons::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Coupons::Settings).text().null())
                    .col(
                        ColumnDef::new(Coupons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_coupons_code")
                    .table(Coupons::Table)
                    .col(Coupons::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TrackingLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackingLinks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TrackingLinks::ShortCode)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrackingLinks::DestinationUrl).text().not_null())
                    .col(
                        ColumnDef::new(TrackingLinks::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrackingLinks::InfluencerId).big_integer().null())
                    .col(
                        ColumnDef::new(TrackingLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_tracking_links_short_code")
                    .table(TrackingLinks::Table)
                    .col(TrackingLinks::ShortCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrackingLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Coupons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CampaignInfluencers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Influencers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Campaigns {
    #[sea_orm(iden = "campaigns")]
    Table,
    Id,
    AdvertiserId,
    Name,
    Status,
    Budget,
    StartDate,
    EndDate,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Influencers {
    #[sea_orm(iden = "influencers")]
    Table,
    Id,
    Name,
    Email,
    SocialHandle,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CampaignInfluencers {
    #[sea_orm(iden = "campaign_influencers")]
    Table,
    CampaignId,
    InfluencerId,
    RevenueShareType,
    RevenueShareValue,
}

#[derive(DeriveIden)]
enum Coupons {
    #[sea_orm(iden = "coupons")]
    Table,
    Id,
    Code,
    CampaignId,
    InfluencerId,
    IsActive,
    Settings,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TrackingLinks {
    #[sea_orm(iden = "tracking_links")]
    Table,
    Id,
    ShortCode,
    DestinationUrl,
    CampaignId,
    InfluencerId,
    CreatedAt,
}
