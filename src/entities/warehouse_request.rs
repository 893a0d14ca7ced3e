use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
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
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    #[sea_orm(string_value = "in_attesa")]
    InAttesa,
    #[sea_orm(string_value = "approvata")]
    Approvata,
    #[sea_orm(string_value = "evasa")]
    Evasa,
    #[sea_orm(string_value = "rifiutata")]
    Rifiutata,
}

impl RequestStatus {
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (InAttesa, Approvata)
                | (Approvata, Evasa)
                | (InAttesa, Rifiutata)
                | (Approvata, Rifiutata)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Evasa | RequestStatus::Rifiutata)
    }
}

/// Withdrawal request (richiesta) raised from a site.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub requester_id: Uuid,
    pub site_id: Option<Uuid>,
    pub status: RequestStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub manager_reply: Option<String>,
    pub handled_by: Option<Uuid>,
    pub handled_at: Option<DateTime<Utc>>,
    pub read_by_requester: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::warehouse_request_line::Entity")]
    Lines,
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id"
    )]
    Site,
}

impl Related<super::warehouse_request_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
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

#[cfg(test)]
mod tests {
    use super::RequestStatus::*;

    #[test]
    fn request_lifecycle_transitions() {
        assert!(InAttesa.can_transition_to(Approvata));
        assert!(InAttesa.can_transition_to(Rifiutata));
        assert!(Approvata.can_transition_to(Evasa));
        assert!(Approvata.can_transition_to(Rifiutata));
        assert!(!InAttesa.can_transition_to(Evasa));
        assert!(!Evasa.can_transition_to(Rifiutata));
        assert!(!Rifiutata.can_transition_to(Approvata));
        assert!(Evasa.is_terminal() && Rifiutata.is_terminal());
    }
}
