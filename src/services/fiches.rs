use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{
        fiche::{self, FicheType},
        fiche_layer, machine,
    },
    errors::{map_txn_error, ServiceError},
    services::{
        audit::{self, actions},
        sites::{accessible_site, assigned_site_ids},
    },
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct NewLayer {
    pub from_m: Decimal,
    pub to_m: Decimal,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewFiche {
    pub date: Option<NaiveDate>,
    pub site_id: Uuid,
    pub machine_id: Option<Uuid>,
    pub fiche_type: FicheType,
    pub description: String,
    pub operator: Option<String>,
    pub hours: Option<Decimal>,
    pub notes: Option<String>,
    pub excavation_type: Option<String>,
    pub stratigraphy: Option<String>,
    pub material: Option<String>,
    pub total_depth_m: Option<Decimal>,
    pub pile_diameter_mm: Option<Decimal>,
    pub panel_width_m: Option<Decimal>,
    pub panel_height_m: Option<Decimal>,
    pub casting_date: Option<NaiveDate>,
    pub cubic_metres_cast: Option<Decimal>,
    pub layers: Vec<NewLayer>,
}

#[derive(Debug, Clone, Default)]
pub struct FicheFilter {
    pub site_id: Option<Uuid>,
    pub fiche_type: Option<FicheType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct FicheDetail {
    pub fiche: fiche::Model,
    pub layers: Vec<fiche_layer::Model>,
}

/// Sort layers by depth and check `0 <= from_m < to_m` with no overlaps.
/// Touching layers (one ends where the next starts) are fine.
pub fn validate_layers(mut layers: Vec<NewLayer>) -> Result<Vec<NewLayer>, ServiceError> {
    for layer in &layers {
        if layer.from_m < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "layer depth must not be negative (from {} m)",
                layer.from_m
            )));
        }
        if layer.to_m <= layer.from_m {
            return Err(ServiceError::ValidationError(format!(
                "layer must end below its start ({} m - {} m)",
                layer.from_m, layer.to_m
            )));
        }
    }
    layers.sort_by(|a, b| a.from_m.cmp(&b.from_m));
    for pair in layers.windows(2) {
        if pair[1].from_m < pair[0].to_m {
            return Err(ServiceError::ValidationError(format!(
                "layers overlap: {}-{} m and {}-{} m",
                pair[0].from_m, pair[0].to_m, pair[1].from_m, pair[1].to_m
            )));
        }
    }
    Ok(layers)
}

fn non_negative(value: Option<Decimal>, field: &str) -> Result<(), ServiceError> {
    if matches!(value, Some(v) if v < Decimal::ZERO) {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be negative",
            field
        )));
    }
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Production and stratigraphy records (fiches)
#[derive(Clone)]
pub struct FicheService {
    db_pool: Arc<DbPool>,
}

impl FicheService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(
        skip(self, user, input),
        fields(user_id = %user.user_id, site_id = %input.site_id)
    )]
    pub async fn create(
        &self,
        user: &AuthUser,
        input: NewFiche,
    ) -> Result<FicheDetail, ServiceError> {
        non_negative(input.hours, "hours")?;
        non_negative(input.total_depth_m, "total_depth_m")?;
        non_negative(input.pile_diameter_mm, "pile_diameter_mm")?;
        non_negative(input.panel_width_m, "panel_width_m")?;
        non_negative(input.panel_height_m, "panel_height_m")?;
        non_negative(input.cubic_metres_cast, "cubic_metres_cast")?;
        if input.description.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "description must not be empty".to_string(),
            ));
        }
        let layers = validate_layers(input.layers.clone())?;
        let author = user.clone();

        let detail = self
            .db_pool
            .transaction::<_, FicheDetail, ServiceError>(|txn| {
                Box::pin(async move {
                    let site = accessible_site(txn, &author, input.site_id).await?;
                    if let Some(machine_id) = input.machine_id {
                        machine::Entity::find_by_id(machine_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| ServiceError::not_found("machine", machine_id))?;
                    }

                    let fiche = fiche::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        date: Set(input.date.unwrap_or_else(|| Utc::now().date_naive())),
                        site_id: Set(site.id),
                        machine_id: Set(input.machine_id),
                        fiche_type: Set(input.fiche_type),
                        description: Set(input.description.trim().to_string()),
                        operator: Set(trimmed(input.operator)),
                        hours: Set(input.hours),
                        notes: Set(trimmed(input.notes)),
                        excavation_type: Set(trimmed(input.excavation_type)),
                        stratigraphy: Set(trimmed(input.stratigraphy)),
                        material: Set(trimmed(input.material)),
                        total_depth_m: Set(input.total_depth_m),
                        pile_diameter_mm: Set(input.pile_diameter_mm),
                        panel_width_m: Set(input.panel_width_m),
                        panel_height_m: Set(input.panel_height_m),
                        casting_date: Set(input.casting_date),
                        cubic_metres_cast: Set(input.cubic_metres_cast),
                        created_by: Set(author.user_id),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let mut saved = Vec::with_capacity(layers.len());
                    for (position, layer) in layers.into_iter().enumerate() {
                        let row = fiche_layer::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            fiche_id: Set(fiche.id),
                            position: Set(position as i32),
                            from_m: Set(layer.from_m),
                            to_m: Set(layer.to_m),
                            description: Set(layer.description.trim().to_string()),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                        saved.push(row);
                    }

                    Ok(FicheDetail {
                        fiche,
                        layers: saved,
                    })
                })
            })
            .await
            .map_err(map_txn_error)?;

        info!(fiche_id = %detail.fiche.id, layers = detail.layers.len(), "fiche created");
        Ok(detail)
    }

    /// Newest date first, then newest created.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(
        &self,
        user: &AuthUser,
        filter: FicheFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<fiche::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = fiche::Entity::find();
        if user.is_caposquadra() {
            if let Some(site_id) = filter.site_id {
                accessible_site(db, user, site_id).await?;
            }
            let sites = assigned_site_ids(db, user.user_id).await?;
            query = query.filter(fiche::Column::SiteId.is_in(sites));
        }
        if let Some(site_id) = filter.site_id {
            query = query.filter(fiche::Column::SiteId.eq(site_id));
        }
        if let Some(fiche_type) = filter.fiche_type {
            query = query.filter(fiche::Column::FicheType.eq(fiche_type));
        }
        if let Some(from) = filter.from {
            query = query.filter(fiche::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(fiche::Column::Date.lte(to));
        }

        let paginator = query
            .order_by_desc(fiche::Column::Date)
            .order_by_desc(fiche::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let fiches = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((fiches, total))
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<FicheDetail, ServiceError> {
        let db = &*self.db_pool;
        let fiche = fiche::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("fiche", id))?;
        if user.is_caposquadra() {
            accessible_site(db, user, fiche.site_id).await?;
        }
        let layers = fiche
            .find_related(fiche_layer::Entity)
            .order_by_asc(fiche_layer::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(FicheDetail { fiche, layers })
    }

    /// Hard delete, layers included.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        let actor_id = actor.user_id;
        self.db_pool
            .transaction::<_, (), ServiceError>(|txn| {
                Box::pin(async move {
                    let fiche = fiche::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("fiche", id))?;
                    fiche_layer::Entity::delete_many()
                        .filter(fiche_layer::Column::FicheId.eq(id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    fiche::Entity::delete_by_id(id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    audit::record(
                        txn,
                        Some(actor_id),
                        actions::FICHE_DELETE,
                        "fiche",
                        Some(id.to_string()),
                        Some(json!({ "site_id": fiche.site_id, "date": fiche.date })),
                    )
                    .await?;
                    Ok(())
                })
            })
            .await
            .map_err(map_txn_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn layer(from: Decimal, to: Decimal) -> NewLayer {
        NewLayer {
            from_m: from,
            to_m: to,
            description: "argilla".into(),
        }
    }

    #[test]
    fn layers_are_sorted_by_depth() {
        let sorted = validate_layers(vec![
            layer(dec!(2.5), dec!(6)),
            layer(dec!(0), dec!(2.5)),
        ])
        .unwrap();
        assert_eq!(sorted[0].from_m, dec!(0));
        assert_eq!(sorted[1].from_m, dec!(2.5));
    }

    #[test]
    fn inverted_or_negative_layers_are_rejected() {
        assert_matches!(
            validate_layers(vec![layer(dec!(3), dec!(3))]),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            validate_layers(vec![layer(dec!(-1), dec!(2))]),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn overlapping_layers_are_rejected() {
        assert_matches!(
            validate_layers(vec![layer(dec!(0), dec!(3)), layer(dec!(2), dec!(5))]),
            Err(ServiceError::ValidationError(_))
        );
        assert!(validate_layers(Vec::new()).unwrap().is_empty());
    }
}
