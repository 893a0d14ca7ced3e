use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum FicheType {
    #[sea_orm(string_value = "produzione")]
    Produzione,
    #[sea_orm(string_value = "fermo_macchina")]
    FermoMacchina,
    #[sea_orm(string_value = "controllo")]
    Controllo,
    #[sea_orm(string_value = "altro")]
    Altro,
}

/// Drilling / stratigraphy record for a site.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fiches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub date: NaiveDate,
    pub site_id: Uuid,
    pub machine_id: Option<Uuid>,
    pub fiche_type: FicheType,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub operator: Option<String>,
    pub hours: Option<Decimal>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub excavation_type: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub stratigraphy: Option<String>,
    pub material: Option<String>,
    pub total_depth_m: Option<Decimal>,
    pub pile_diameter_mm: Option<Decimal>,
    pub panel_width_m: Option<Decimal>,
    pub panel_height_m: Option<Decimal>,
    pub casting_date: Option<NaiveDate>,
    pub cubic_metres_cast: Option<Decimal>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id"
    )]
    Site,
    #[sea_orm(
        belongs_to = "super::machine::Entity",
        from = "Column::MachineId",
        to = "super::machine::Column::Id"
    )]
    Machine,
    #[sea_orm(has_many = "super::fiche_layer::Entity")]
    Layers,
}

impl Related<super::site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl Related<super::machine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Machine.def()
    }
}

impl Related<super::fiche_layer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Layers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
