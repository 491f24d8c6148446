//! 事件表迁移
//!
//! click_events：每次重定向一行，只追加
//! customer_events：转化事件 + 入库时解析出的归因快照

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClickEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClickEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::TrackingLinkId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::ClickedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClickEvents::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(ClickEvents::UserAgent).text().null())
                    .col(ColumnDef::new(ClickEvents::Referer).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomerEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CustomerEvents::AdvertiserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerEvents::EventType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerEvents::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CustomerEvents::Revenue).double().null())
                    .col(
                        ColumnDef::new(CustomerEvents::Currency)
                            .string_len(3)
                            .not_null()
                            .default("USD"),
                    )
                    .col(ColumnDef::new(CustomerEvents::CouponCode).string_len(50).null())
                    .col(ColumnDef::new(CustomerEvents::RefCode).string_len(50).null())
                    .col(ColumnDef::new(CustomerEvents::LandingUrl).text().null())
                    .col(ColumnDef::new(CustomerEvents::Referrer).text().null())
                    .col(
                        ColumnDef::new(CustomerEvents::TrackingLinkId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CustomerEvents::InfluencerId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(CustomerEvents::CampaignId).big_integer().null())
                    .col(ColumnDef::new(CustomerEvents::Properties).text().null())
                    .col(ColumnDef::new(CustomerEvents::RawPayload).text().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomerEvents::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ClickEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClickEvents {
    #[sea_orm(iden = "click_events")]
    Table,
    Id,
    TrackingLinkId,
    ClickedAt,
    IpAddress,
    UserAgent,
    Referer,
}

#[derive(DeriveIden)]
enum CustomerEvents {
    #[sea_orm(iden = "customer_events")]
    Table,
    Id,
    AdvertiserId,
    EventType,
    OccurredAt,
    Revenue,
    Currency,
    CouponCode,
    RefCode,
    LandingUrl,
    Referrer,
    TrackingLinkId,
    InfluencerId,
    CampaignId,
    Properties,
    RawPayload,
}
