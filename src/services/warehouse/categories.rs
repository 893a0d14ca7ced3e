use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{warehouse_category, warehouse_item},
    errors::{map_txn_error, ServiceError},
    services::audit::{self, actions},
};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

pub const FALLBACK_SLUG: &str = "categoria";

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{Alphabetic}\p{N}]+").expect("static regex"));

/// Lowercased name with letters and digits of any script kept; every run of
/// other characters becomes one `-`.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let slug = NON_ALNUM.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// First free slug among `base`, `base-2`, `base-3`, …
async fn unique_slug<C: ConnectionTrait>(
    db: &C,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<String, ServiceError> {
    let mut candidate = base.to_string();
    let mut suffix = 2;
    loop {
        let mut query = warehouse_category::Entity::find()
            .filter(warehouse_category::Column::Slug.eq(&candidate));
        if let Some(id) = exclude {
            query = query.filter(warehouse_category::Column::Id.ne(id));
        }
        let taken = query.count(db).await.map_err(ServiceError::db_error)?;
        if taken == 0 {
            return Ok(candidate);
        }
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
}

async fn ensure_name_free<C: ConnectionTrait>(
    db: &C,
    name: &str,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = warehouse_category::Entity::find().filter(
        Expr::expr(Func::lower(Expr::col(warehouse_category::Column::Name)))
            .eq(name.to_lowercase()),
    );
    if let Some(id) = exclude {
        query = query.filter(warehouse_category::Column::Id.ne(id));
    }
    let taken = query.count(db).await.map_err(ServiceError::db_error)?;
    if taken > 0 {
        return Err(ServiceError::Duplicate(format!(
            "category '{}' already exists",
            name
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub ordering: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub ordering: Option<i32>,
}

fn clean_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::ValidationError(
            "category name must not be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Warehouse categories
#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// All categories in display order.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        active: Option<bool>,
    ) -> Result<Vec<warehouse_category::Model>, ServiceError> {
        let mut query = warehouse_category::Entity::find();
        if let Some(active) = active {
            query = query.filter(warehouse_category::Column::IsActive.eq(active));
        }
        query
            .order_by_asc(warehouse_category::Column::Ordering)
            .order_by_asc(warehouse_category::Column::Name)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<warehouse_category::Model, ServiceError> {
        warehouse_category::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    /// New categories go last unless an explicit ordering is given.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: NewCategory,
    ) -> Result<warehouse_category::Model, ServiceError> {
        let name = clean_name(&input.name)?;

        let category = self
            .db_pool
            .transaction::<_, warehouse_category::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    ensure_name_free(txn, &name, None).await?;
                    let slug = unique_slug(txn, &slugify(&name), None).await?;
                    let ordering = match input.ordering {
                        Some(ordering) => ordering,
                        None => {
                            let max = warehouse_category::Entity::find()
                                .select_only()
                                .column(warehouse_category::Column::Ordering)
                                .order_by_desc(warehouse_category::Column::Ordering)
                                .into_tuple::<i32>()
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?;
                            max.map_or(0, |m| m + 1)
                        }
                    };

                    warehouse_category::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(name),
                        slug: Set(slug),
                        description: Set(optional(input.description)),
                        icon: Set(optional(input.icon)),
                        color: Set(optional(input.color)),
                        ordering: Set(ordering),
                        is_active: Set(true),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(map_txn_error)?;

        info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    /// A rename re-derives the slug; the category keeps its own slug when
    /// the derived one is unchanged.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> Result<warehouse_category::Model, ServiceError> {
        self.db_pool
            .transaction::<_, warehouse_category::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let existing = warehouse_category::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("category", id))?;

                    let mut active: warehouse_category::ActiveModel = existing.into();
                    if let Some(name) = changes.name.as_deref() {
                        let name = clean_name(name)?;
                        ensure_name_free(txn, &name, Some(id)).await?;
                        active.slug = Set(unique_slug(txn, &slugify(&name), Some(id)).await?);
                        active.name = Set(name);
                    }
                    if let Some(description) = changes.description {
                        active.description = Set(optional(Some(description)));
                    }
                    if let Some(icon) = changes.icon {
                        active.icon = Set(optional(Some(icon)));
                    }
                    if let Some(color) = changes.color {
                        active.color = Set(optional(Some(color)));
                    }
                    if let Some(ordering) = changes.ordering {
                        active.ordering = Set(ordering);
                    }
                    active.update(txn).await.map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(map_txn_error)
    }

    #[instrument(skip(self))]
    pub async fn toggle_active(&self, id: Uuid) -> Result<warehouse_category::Model, ServiceError> {
        let existing = self.get(id).await?;
        let flipped = !existing.is_active;
        let mut active: warehouse_category::ActiveModel = existing.into();
        active.is_active = Set(flipped);
        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Swap ordering with the previous or next active category, ordered by
    /// (ordering, name). At either end, or for an inactive category, nothing moves.
    #[instrument(skip(self))]
    pub async fn move_category(
        &self,
        id: Uuid,
        direction: MoveDirection,
    ) -> Result<Vec<warehouse_category::Model>, ServiceError> {
        self.db_pool
            .transaction::<_, (), ServiceError>(|txn| {
                Box::pin(async move {
                    let mut siblings = warehouse_category::Entity::find()
                        .filter(warehouse_category::Column::IsActive.eq(true))
                        .order_by_asc(warehouse_category::Column::Ordering)
                        .order_by_asc(warehouse_category::Column::Name)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let index = match siblings.iter().position(|c| c.id == id) {
                        Some(index) => index,
                        None => {
                            warehouse_category::Entity::find_by_id(id)
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?
                                .ok_or_else(|| ServiceError::not_found("category", id))?;
                            return Ok(());
                        }
                    };
                    let neighbour = match direction {
                        MoveDirection::Up if index > 0 => index - 1,
                        MoveDirection::Down if index + 1 < siblings.len() => index + 1,
                        _ => return Ok(()),
                    };

                    let original: Vec<i32> = siblings.iter().map(|c| c.ordering).collect();
                    let before: HashMap<Uuid, i32> =
                        siblings.iter().map(|c| (c.id, c.ordering)).collect();
                    if original[index] != original[neighbour] {
                        siblings[index].ordering = original[neighbour];
                        siblings[neighbour].ordering = original[index];
                    } else {
                        // Tied orderings cannot be swapped; renumber the active list instead.
                        siblings.swap(index, neighbour);
                        for (position, category) in siblings.iter_mut().enumerate() {
                            category.ordering = position as i32;
                        }
                    }

                    for category in siblings {
                        if before.get(&category.id) == Some(&category.ordering) {
                            continue;
                        }
                        let ordering = category.ordering;
                        let mut active: warehouse_category::ActiveModel = category.into();
                        active.ordering = Set(ordering);
                        active.update(txn).await.map_err(ServiceError::db_error)?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(map_txn_error)?;

        self.list(None).await
    }

    /// Refused while any item references the category.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        let actor_id = actor.user_id;
        self.db_pool
            .transaction::<_, (), ServiceError>(|txn| {
                Box::pin(async move {
                    let category = warehouse_category::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("category", id))?;

                    let items = warehouse_item::Entity::find()
                        .filter(warehouse_item::Column::CategoryId.eq(id))
                        .count(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if items > 0 {
                        return Err(ServiceError::Conflict(format!(
                            "category '{}' still has {} item(s); deactivate it instead",
                            category.name, items
                        )));
                    }

                    warehouse_category::Entity::delete_by_id(id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    audit::record(
                        txn,
                        Some(actor_id),
                        actions::CATEGORY_DELETE,
                        "warehouse_category",
                        Some(id.to_string()),
                        Some(json!({ "name": category.name, "slug": category.slug })),
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

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Ferramenta & Bulloni"), "ferramenta-bulloni");
        assert_eq!(slugify("  DPI -- Sicurezza  "), "dpi-sicurezza");
        assert_eq!(slugify("Tubi 110mm"), "tubi-110mm");
    }

    #[test]
    fn slugify_keeps_accented_letters() {
        assert_eq!(slugify("Città"), "città");
        assert_eq!(slugify("Attrezzatura élettrica"), "attrezzatura-élettrica");
        assert_eq!(slugify("Éé"), "éé");
        assert_eq!(slugify("Béton № 2"), "béton-2");
        assert_eq!(slugify("!!!"), FALLBACK_SLUG);
        assert_eq!(slugify(""), FALLBACK_SLUG);
    }
}
