//! Click event entity, one row per redirect hit (append-only)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "click_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tracking_link_id: i64,
    pub clicked_at: DateTimeUtc,
    pub ip_address: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub referer: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tracking_link::Entity",
        from = "Column::TrackingLinkId",
        to = "super::tracking_link::Column::Id"
    )]
    TrackingLink,
}

impl Related<super::tracking_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackingLink.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
