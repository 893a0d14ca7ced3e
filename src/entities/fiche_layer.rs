use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stratigraphy layer between two depths, in metres.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fiche_layers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub fiche_id: Uuid,
    pub position: i32,
    pub from_m: Decimal,
    pub to_m: Decimal,
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::fiche::Entity",
        from = "Column::FicheId",
        to = "super::fiche::Column::Id",
        on_delete = "Cascade"
    )]
    Fiche,
}

impl Related<super::fiche::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fiche.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
