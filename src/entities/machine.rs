use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    #[sea_orm(string_value = "escavatore")]
    Escavatore,
    #[sea_orm(string_value = "autocarro")]
    Autocarro,
    #[sea_orm(string_value = "furgone")]
    Furgone,
    #[sea_orm(string_value = "altro")]
    Altro,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    #[sea_orm(string_value = "attivo")]
    Attivo,
    #[sea_orm(string_value = "manutenzione")]
    Manutenzione,
    #[sea_orm(string_value = "fuori_servizio")]
    FuoriServizio,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "machines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub code: Option<String>,
    pub machine_type: Option<MachineType>,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub plate: Option<String>,
    pub status: MachineStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub site_id: Option<Uuid>,
    pub is_active: bool,
    pub has_issue: bool,
    pub current_issue: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id"
    )]
    Site,
}

impl Related<super::site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}
