use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub campaign_id: i64,
    /// NULL for generic coupons (credit the campaign only)
    pub influencer_id: Option<i64>,
    pub is_active: bool,
    /// Generation params as JSON text, e.g. {"prefix":"SUMMER","length":8}
    #[sea_orm(column_type = "Text", nullable)]
    pub settings: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
