use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MovementType {
    #[sea_orm(string_value = "inbound")]
    Inbound,
    #[sea_orm(string_value = "outbound")]
    Outbound,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

impl MovementType {
    /// Stored quantity for a requested one: inbound is always positive,
    /// outbound always negative, adjustments keep their sign.
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        match self {
            MovementType::Inbound => quantity.abs(),
            MovementType::Outbound => -quantity.abs(),
            MovementType::Adjustment => quantity,
        }
    }
}

/// Append-only stock movement. Rows are never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub site_id: Option<Uuid>,
    pub user_id: Uuid,
    pub note: Option<String>,
    pub request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse_item::Entity",
        from = "Column::ItemId",
        to = "super::warehouse_item::Column::Id"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id"
    )]
    Site,
    #[sea_orm(
        belongs_to = "super::warehouse_request::Entity",
        from = "Column::RequestId",
        to = "super::warehouse_request::Column::Id"
    )]
    Request,
}

impl Related<super::warehouse_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sign_follows_movement_type() {
        assert_eq!(MovementType::Inbound.signed(dec!(-3)), dec!(3));
        assert_eq!(MovementType::Outbound.signed(dec!(45)), dec!(-45));
        assert_eq!(MovementType::Outbound.signed(dec!(-45)), dec!(-45));
        assert_eq!(MovementType::Adjustment.signed(dec!(-2.5)), dec!(-2.5));
    }
}
