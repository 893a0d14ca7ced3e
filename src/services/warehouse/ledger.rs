//! Stock ledger: append-only movements and the balances derived from them.

use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{
        site, warehouse_item,
        warehouse_movement::{self, MovementType},
    },
    errors::{map_txn_error, ServiceError},
};
use chrono::{Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const INITIAL_LOAD_NOTE: &str = "Carico iniziale";
pub const STOCKTAKE_NOTE: &str = "Rettifica inventario";

#[derive(Debug, Clone)]
pub struct NewMovement {
    pub item_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub site_id: Option<Uuid>,
    pub note: Option<String>,
    pub request_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub item_id: Option<Uuid>,
    pub site_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Quantity shipped out to a site, summed over the filtered movements.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteOutboundTotal {
    pub site_id: Option<Uuid>,
    pub site_name: Option<String>,
    pub quantity: Decimal,
}

/// Quantity of one item shipped out, optionally for a single site.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OutboundTotal {
    pub item_id: Uuid,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub quantity: Decimal,
}

#[derive(Debug, Serialize)]
pub struct MovementPage {
    pub movements: Vec<warehouse_movement::Model>,
    pub total: u64,
    pub outbound_by_site: Vec<SiteOutboundTotal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemBalance {
    pub item_id: Uuid,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub balance: Decimal,
    pub min_threshold: Decimal,
    pub under_threshold: bool,
}

impl ItemBalance {
    pub fn new(item: &warehouse_item::Model, balance: Decimal) -> Self {
        Self {
            item_id: item.id,
            code: item.code.clone(),
            name: item.name.clone(),
            unit: item.unit.clone(),
            balance,
            min_threshold: item.min_threshold,
            under_threshold: item.is_under_threshold(balance),
        }
    }
}

/// Signed sum of every movement of `item_id`.
pub async fn balance<C: ConnectionTrait>(db: &C, item_id: Uuid) -> Result<Decimal, ServiceError> {
    let quantities = warehouse_movement::Entity::find()
        .select_only()
        .column(warehouse_movement::Column::Quantity)
        .filter(warehouse_movement::Column::ItemId.eq(item_id))
        .into_tuple::<Decimal>()
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(quantities.into_iter().sum())
}

/// Balances for many items at once. Items without movements map to zero.
pub async fn balances<C: ConnectionTrait>(
    db: &C,
    item_ids: &[Uuid],
) -> Result<HashMap<Uuid, Decimal>, ServiceError> {
    let mut totals: HashMap<Uuid, Decimal> =
        item_ids.iter().map(|id| (*id, Decimal::ZERO)).collect();
    if item_ids.is_empty() {
        return Ok(totals);
    }

    let rows = warehouse_movement::Entity::find()
        .select_only()
        .column(warehouse_movement::Column::ItemId)
        .column(warehouse_movement::Column::Quantity)
        .filter(warehouse_movement::Column::ItemId.is_in(item_ids.iter().copied()))
        .into_tuple::<(Uuid, Decimal)>()
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    for (item_id, quantity) in rows {
        *totals.entry(item_id).or_insert(Decimal::ZERO) += quantity;
    }
    Ok(totals)
}

/// Load an item, taking a row lock on backends that support one.
async fn lock_item<C: ConnectionTrait>(
    db: &C,
    item_id: Uuid,
) -> Result<warehouse_item::Model, ServiceError> {
    let mut query = warehouse_item::Entity::find_by_id(item_id);
    if db.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("warehouse item", item_id))
}

/// Append one movement. Must run inside a transaction so the balance check
/// and the insert are atomic.
pub async fn record_movement<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    input: NewMovement,
) -> Result<warehouse_movement::Model, ServiceError> {
    if input.quantity.is_zero() {
        return Err(ServiceError::ValidationError(
            "quantity must not be zero".to_string(),
        ));
    }

    let item = lock_item(db, input.item_id).await?;
    if let Some(site_id) = input.site_id {
        site::Entity::find_by_id(site_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("site", site_id))?;
    }

    let quantity = input.movement_type.signed(input.quantity);
    let current = balance(db, item.id).await?;
    if current + quantity < Decimal::ZERO {
        warn!(item_id = %item.id, %current, %quantity, "movement rejected");
        return Err(ServiceError::InsufficientStock(format!(
            "{}: available {} {}, requested {}",
            item.code,
            current,
            item.unit,
            quantity.abs()
        )));
    }

    warehouse_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        item_id: Set(item.id),
        movement_type: Set(input.movement_type),
        quantity: Set(quantity),
        site_id: Set(input.site_id),
        user_id: Set(user_id),
        note: Set(input.note.filter(|n| !n.trim().is_empty())),
        request_id: Set(input.request_id),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(ServiceError::db_error)
}

/// Outbound quantities per item, as positive numbers, ordered by item code.
pub async fn outbound_totals<C: ConnectionTrait>(
    db: &C,
    site_id: Option<Uuid>,
) -> Result<Vec<OutboundTotal>, ServiceError> {
    let mut query = warehouse_movement::Entity::find()
        .select_only()
        .column(warehouse_movement::Column::ItemId)
        .column(warehouse_movement::Column::Quantity)
        .filter(warehouse_movement::Column::MovementType.eq(MovementType::Outbound));
    if let Some(site_id) = site_id {
        query = query.filter(warehouse_movement::Column::SiteId.eq(site_id));
    }
    let rows = query
        .into_tuple::<(Uuid, Decimal)>()
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;

    let mut per_item: HashMap<Uuid, Decimal> = HashMap::new();
    for (item_id, quantity) in rows {
        *per_item.entry(item_id).or_insert(Decimal::ZERO) += quantity.abs();
    }
    if per_item.is_empty() {
        return Ok(Vec::new());
    }

    let items = warehouse_item::Entity::find()
        .filter(warehouse_item::Column::Id.is_in(per_item.keys().copied()))
        .order_by_asc(warehouse_item::Column::Code)
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(items
        .into_iter()
        .map(|item| OutboundTotal {
            quantity: per_item.get(&item.id).copied().unwrap_or_default(),
            item_id: item.id,
            code: item.code,
            name: item.name,
            unit: item.unit,
        })
        .collect())
}

fn movement_condition(filter: &MovementFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(item_id) = filter.item_id {
        cond = cond.add(warehouse_movement::Column::ItemId.eq(item_id));
    }
    if let Some(site_id) = filter.site_id {
        cond = cond.add(warehouse_movement::Column::SiteId.eq(site_id));
    }
    if let Some(kind) = filter.movement_type {
        cond = cond.add(warehouse_movement::Column::MovementType.eq(kind));
    }
    if let Some(from) = filter.from {
        let start = from.and_time(NaiveTime::MIN).and_utc();
        cond = cond.add(warehouse_movement::Column::CreatedAt.gte(start));
    }
    if let Some(to) = filter.to.and_then(|d| d.checked_add_days(Days::new(1))) {
        let end = to.and_time(NaiveTime::MIN).and_utc();
        cond = cond.add(warehouse_movement::Column::CreatedAt.lt(end));
    }
    cond
}

/// Warehouse stock ledger
#[derive(Clone)]
pub struct LedgerService {
    db_pool: Arc<DbPool>,
}

impl LedgerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn record(
        &self,
        user: &AuthUser,
        input: NewMovement,
    ) -> Result<warehouse_movement::Model, ServiceError> {
        let user_id = user.user_id;
        let movement = self
            .db_pool
            .transaction::<_, warehouse_movement::Model, ServiceError>(|txn| {
                Box::pin(async move { record_movement(txn, user_id, input).await })
            })
            .await
            .map_err(map_txn_error)?;

        info!(
            movement_id = %movement.id,
            item_id = %movement.item_id,
            kind = %movement.movement_type,
            quantity = %movement.quantity,
            "stock movement recorded"
        );
        Ok(movement)
    }

    #[instrument(skip(self))]
    pub async fn item_balance(&self, item_id: Uuid) -> Result<ItemBalance, ServiceError> {
        let db = &*self.db_pool;
        let item = warehouse_item::Entity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("warehouse item", item_id))?;
        let balance = balance(db, item_id).await?;
        Ok(ItemBalance::new(&item, balance))
    }

    /// Active items at or below their minimum threshold, by code.
    #[instrument(skip(self))]
    pub async fn under_threshold(&self) -> Result<Vec<ItemBalance>, ServiceError> {
        let db = &*self.db_pool;
        let items = warehouse_item::Entity::find()
            .filter(warehouse_item::Column::IsActive.eq(true))
            .order_by_asc(warehouse_item::Column::Code)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let totals = balances(db, &ids).await?;

        Ok(items
            .iter()
            .map(|item| ItemBalance::new(item, totals.get(&item.id).copied().unwrap_or_default()))
            .filter(|b| b.under_threshold)
            .collect())
    }

    /// Newest first, with per-site outbound totals over the whole filtered set.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        page: u64,
        limit: u64,
    ) -> Result<MovementPage, ServiceError> {
        let db = &*self.db_pool;
        let cond = movement_condition(&filter);

        let paginator = warehouse_movement::Entity::find()
            .filter(cond.clone())
            .order_by_desc(warehouse_movement::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let movements = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        let outbound = warehouse_movement::Entity::find()
            .select_only()
            .column(warehouse_movement::Column::SiteId)
            .column(warehouse_movement::Column::Quantity)
            .filter(cond)
            .filter(warehouse_movement::Column::MovementType.eq(MovementType::Outbound))
            .into_tuple::<(Option<Uuid>, Decimal)>()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let mut per_site: BTreeMap<Option<Uuid>, Decimal> = BTreeMap::new();
        for (site_id, quantity) in outbound {
            *per_site.entry(site_id).or_insert(Decimal::ZERO) += quantity.abs();
        }

        let site_ids: Vec<Uuid> = per_site.keys().filter_map(|id| *id).collect();
        let names: HashMap<Uuid, String> = if site_ids.is_empty() {
            HashMap::new()
        } else {
            site::Entity::find()
                .filter(site::Column::Id.is_in(site_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|s| (s.id, s.name))
                .collect()
        };
        let outbound_by_site = per_site
            .into_iter()
            .map(|(site_id, quantity)| SiteOutboundTotal {
                site_name: site_id.and_then(|id| names.get(&id).cloned()),
                site_id,
                quantity,
            })
            .collect();

        Ok(MovementPage {
            movements,
            total,
            outbound_by_site,
        })
    }

    /// Record an adjustment that brings the balance to `counted`.
    /// Returns `None` when the count already matches.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn stocktake(
        &self,
        user: &AuthUser,
        item_id: Uuid,
        counted: Decimal,
        note: Option<String>,
    ) -> Result<Option<warehouse_movement::Model>, ServiceError> {
        if counted < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "counted quantity must not be negative".to_string(),
            ));
        }
        let user_id = user.user_id;

        self.db_pool
            .transaction::<_, Option<warehouse_movement::Model>, ServiceError>(|txn| {
                Box::pin(async move {
                    let item = lock_item(txn, item_id).await?;
                    let current = balance(txn, item.id).await?;
                    let delta = counted - current;
                    if delta.is_zero() {
                        return Ok(None);
                    }
                    let movement = record_movement(
                        txn,
                        user_id,
                        NewMovement {
                            item_id,
                            movement_type: MovementType::Adjustment,
                            quantity: delta,
                            site_id: None,
                            note: note.or_else(|| Some(STOCKTAKE_NOTE.to_string())),
                            request_id: None,
                        },
                    )
                    .await?;
                    Ok(Some(movement))
                })
            })
            .await
            .map_err(map_txn_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_is_inclusive_of_the_end_day() {
        let filter = MovementFilter {
            from: NaiveDate::from_ymd_opt(2025, 3, 1),
            to: NaiveDate::from_ymd_opt(2025, 3, 31),
            ..Default::default()
        };
        // Both bounds plus nothing else.
        assert_eq!(movement_condition(&filter).len(), 2);
        assert!(movement_condition(&MovementFilter::default()).is_empty());
    }

    #[test]
    fn item_balance_flags_threshold() {
        let item = warehouse_item::Model {
            id: Uuid::new_v4(),
            code: "bolt-001".into(),
            name: "Bullone".into(),
            description: None,
            unit: "pz".into(),
            category_id: None,
            min_threshold: Decimal::from(10),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(ItemBalance::new(&item, Decimal::from(5)).under_threshold);
        assert!(ItemBalance::new(&item, Decimal::from(10)).under_threshold);
        assert!(!ItemBalance::new(&item, Decimal::from(11)).under_threshold);
    }
}
