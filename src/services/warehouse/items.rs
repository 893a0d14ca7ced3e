use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{
        warehouse_category, warehouse_item, warehouse_movement::MovementType,
    },
    errors::{map_txn_error, ServiceError},
    services::{
        audit::{self, actions},
        warehouse::ledger::{self, NewMovement, INITIAL_LOAD_NOTE},
    },
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ItemWithBalance {
    pub item: warehouse_item::Model,
    pub balance: Decimal,
}

impl ItemWithBalance {
    pub fn under_threshold(&self) -> bool {
        self.item.is_under_threshold(self.balance)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub category_id: Option<Uuid>,
    pub active: Option<bool>,
    pub search: Option<String>,
    pub under_threshold: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_threshold: Decimal,
    pub initial_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    /// `Some(None)` removes the category.
    pub category_id: Option<Option<Uuid>>,
    pub min_threshold: Option<Decimal>,
    pub is_active: Option<bool>,
}

pub const DEFAULT_UNIT: &str = "pz";

async fn ensure_category<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), ServiceError> {
    warehouse_category::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("category", id))?;
    Ok(())
}

async fn ensure_code_free<C: ConnectionTrait>(
    db: &C,
    code: &str,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = warehouse_item::Entity::find().filter(warehouse_item::Column::Code.eq(code));
    if let Some(id) = exclude {
        query = query.filter(warehouse_item::Column::Id.ne(id));
    }
    if query.count(db).await.map_err(ServiceError::db_error)? > 0 {
        return Err(ServiceError::Duplicate(format!(
            "item code {} already exists",
            code
        )));
    }
    Ok(())
}

fn required(value: &str, field: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(value.to_string())
}

fn check_threshold(threshold: Decimal) -> Result<(), ServiceError> {
    if threshold < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "min_threshold must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// Warehouse items and their derived balances
#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DbPool>,
}

impl ItemService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Items by code, each with its balance. The `under_threshold` filter
    /// needs every balance, so it is applied before paginating in memory.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ItemFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ItemWithBalance>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut cond = Condition::all();
        if let Some(category_id) = filter.category_id {
            cond = cond.add(warehouse_item::Column::CategoryId.eq(category_id));
        }
        if let Some(active) = filter.active {
            cond = cond.add(warehouse_item::Column::IsActive.eq(active));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            cond = cond.add(
                Condition::any()
                    .add(warehouse_item::Column::Code.contains(search))
                    .add(warehouse_item::Column::Name.contains(search)),
            );
        }
        let query = warehouse_item::Entity::find()
            .filter(cond)
            .order_by_asc(warehouse_item::Column::Code);

        let offset = usize::try_from(page.saturating_sub(1).saturating_mul(limit))
            .unwrap_or(usize::MAX);
        match filter.under_threshold {
            Some(wanted) => {
                let items = query.all(db).await.map_err(ServiceError::db_error)?;
                let rows: Vec<ItemWithBalance> = self
                    .with_balances(items)
                    .await?
                    .into_iter()
                    .filter(|row| row.under_threshold() == wanted)
                    .collect();
                let total = rows.len() as u64;
                let rows = rows.into_iter().skip(offset).take(limit as usize).collect();
                Ok((rows, total))
            }
            None => {
                let paginator = query.paginate(db, limit);
                let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
                let items = paginator
                    .fetch_page(page.saturating_sub(1))
                    .await
                    .map_err(ServiceError::db_error)?;
                Ok((self.with_balances(items).await?, total))
            }
        }
    }

    async fn with_balances(
        &self,
        items: Vec<warehouse_item::Model>,
    ) -> Result<Vec<ItemWithBalance>, ServiceError> {
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let totals = ledger::balances(&*self.db_pool, &ids).await?;
        Ok(items
            .into_iter()
            .map(|item| ItemWithBalance {
                balance: totals.get(&item.id).copied().unwrap_or_default(),
                item,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ItemWithBalance, ServiceError> {
        let db = &*self.db_pool;
        let item = warehouse_item::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("warehouse item", id))?;
        let balance = ledger::balance(db, id).await?;
        Ok(ItemWithBalance { item, balance })
    }

    /// Create an item. A positive initial quantity is booked as an inbound
    /// movement in the same transaction.
    #[instrument(skip(self, actor, input), fields(code = %input.code))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        input: NewItem,
    ) -> Result<ItemWithBalance, ServiceError> {
        let code = required(&input.code, "code")?;
        let name = required(&input.name, "name")?;
        check_threshold(input.min_threshold)?;
        if matches!(input.initial_quantity, Some(q) if q < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "initial_quantity must not be negative".to_string(),
            ));
        }
        let actor_id = actor.user_id;

        let created = self
            .db_pool
            .transaction::<_, ItemWithBalance, ServiceError>(|txn| {
                Box::pin(async move {
                    ensure_code_free(txn, &code, None).await?;
                    if let Some(category_id) = input.category_id {
                        ensure_category(txn, category_id).await?;
                    }

                    let item = warehouse_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        code: Set(code),
                        name: Set(name),
                        description: Set(input
                            .description
                            .map(|d| d.trim().to_string())
                            .filter(|d| !d.is_empty())),
                        unit: Set(input
                            .unit
                            .map(|u| u.trim().to_string())
                            .filter(|u| !u.is_empty())
                            .unwrap_or_else(|| DEFAULT_UNIT.to_string())),
                        category_id: Set(input.category_id),
                        min_threshold: Set(input.min_threshold),
                        is_active: Set(true),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let mut balance = Decimal::ZERO;
                    if let Some(quantity) = input.initial_quantity.filter(|q| *q > Decimal::ZERO) {
                        let movement = ledger::record_movement(
                            txn,
                            actor_id,
                            NewMovement {
                                item_id: item.id,
                                movement_type: MovementType::Inbound,
                                quantity,
                                site_id: None,
                                note: Some(INITIAL_LOAD_NOTE.to_string()),
                                request_id: None,
                            },
                        )
                        .await?;
                        balance = movement.quantity;
                    }
                    Ok(ItemWithBalance { item, balance })
                })
            })
            .await
            .map_err(map_txn_error)?;

        info!(item_id = %created.item.id, balance = %created.balance, "warehouse item created");
        Ok(created)
    }

    /// Metadata only; stock changes go through the ledger.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: Uuid,
        changes: ItemChanges,
    ) -> Result<ItemWithBalance, ServiceError> {
        if let Some(threshold) = changes.min_threshold {
            check_threshold(threshold)?;
        }

        let item = self
            .db_pool
            .transaction::<_, warehouse_item::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let existing = warehouse_item::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("warehouse item", id))?;

                    let mut active: warehouse_item::ActiveModel = existing.into();
                    if let Some(code) = changes.code.as_deref() {
                        let code = required(code, "code")?;
                        ensure_code_free(txn, &code, Some(id)).await?;
                        active.code = Set(code);
                    }
                    if let Some(name) = changes.name.as_deref() {
                        active.name = Set(required(name, "name")?);
                    }
                    if let Some(description) = changes.description {
                        let description = description.trim().to_string();
                        active.description = Set(Some(description).filter(|d| !d.is_empty()));
                    }
                    if let Some(unit) = changes.unit.as_deref() {
                        active.unit = Set(required(unit, "unit")?);
                    }
                    if let Some(category_id) = changes.category_id {
                        if let Some(category_id) = category_id {
                            ensure_category(txn, category_id).await?;
                        }
                        active.category_id = Set(category_id);
                    }
                    if let Some(threshold) = changes.min_threshold {
                        active.min_threshold = Set(threshold);
                    }
                    if let Some(is_active) = changes.is_active {
                        active.is_active = Set(is_active);
                    }
                    active.update(txn).await.map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(map_txn_error)?;

        let balance = ledger::balance(&*self.db_pool, id).await?;
        Ok(ItemWithBalance { item, balance })
    }

    /// Items are never removed, since movements reference them.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn deactivate(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<warehouse_item::Model, ServiceError> {
        let actor_id = actor.user_id;
        self.db_pool
            .transaction::<_, warehouse_item::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let existing = warehouse_item::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("warehouse item", id))?;
                    let mut active: warehouse_item::ActiveModel = existing.into();
                    active.is_active = Set(false);
                    let item = active.update(txn).await.map_err(ServiceError::db_error)?;
                    audit::record(
                        txn,
                        Some(actor_id),
                        actions::ITEM_DEACTIVATE,
                        "warehouse_item",
                        Some(id.to_string()),
                        Some(serde_json::json!({ "code": item.code })),
                    )
                    .await?;
                    Ok(item)
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

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("  bolt-001 ", "code").unwrap(), "bolt-001");
        assert_matches!(required("   ", "code"), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        assert!(check_threshold(dec!(-1)).is_err());
        assert!(check_threshold(dec!(0)).is_ok());
    }
}
