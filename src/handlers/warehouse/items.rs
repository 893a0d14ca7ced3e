use crate::{
    auth::AuthUser,
    handlers::common::{
        created_response, double_option, page_and_limit, paginate, validate_input, Created,
    },
    services::warehouse::{
        items::{ItemChanges, ItemFilter, ItemWithBalance, NewItem},
        ledger::ItemBalance,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category_id: Option<Uuid>,
    pub active: Option<bool>,
    /// Matches code or name
    pub search: Option<String>,
    pub under_threshold: Option<bool>,
}

/// Item with its balance derived from the movement ledger
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "1a2b3c4d-5e6f-4708-9a1b-2c3d4e5f6a7b",
    "code": "bolt-001",
    "name": "Bullone M16x80",
    "description": null,
    "unit": "pz",
    "category_id": "9f8e7d6c-5b4a-4392-8170-6f5e4d3c2b1a",
    "min_threshold": "10",
    "is_active": true,
    "balance": "5",
    "under_threshold": true,
    "created_at": "2025-01-08T10:05:00Z",
    "updated_at": "2025-01-08T10:05:00Z"
}))]
pub struct ItemView {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub category_id: Option<Uuid>,
    pub min_threshold: Decimal,
    pub is_active: bool,
    pub balance: Decimal,
    pub under_threshold: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ItemWithBalance> for ItemView {
    fn from(row: ItemWithBalance) -> Self {
        let under_threshold = row.under_threshold();
        let item = row.item;
        Self {
            id: item.id,
            code: item.code,
            name: item.name,
            description: item.description,
            unit: item.unit,
            category_id: item.category_id,
            min_threshold: item.min_threshold,
            is_active: item.is_active,
            balance: row.balance,
            under_threshold,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "code": "bolt-001",
    "name": "Bullone M16x80",
    "unit": "pz",
    "min_threshold": "10",
    "initial_quantity": "50"
}))]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    /// Defaults to `pz`
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub min_threshold: Decimal,
    /// Recorded as an inbound movement when positive
    pub initial_quantity: Option<Decimal>,
}

/// Metadata only; stock changes go through movements.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    /// `null` removes the category
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    pub min_threshold: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/items",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Items with balances", body = ApiResponse<PaginatedResponse<ItemView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> ApiResult<PaginatedResponse<ItemView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let filter = ItemFilter {
        category_id: query.category_id,
        active: query.active,
        search: query.search,
        under_threshold: query.under_threshold,
    };
    let (rows, total) = state.services.items.list(filter, page, limit).await?;
    let items = rows.into_iter().map(ItemView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item with balance", body = ApiResponse<ItemView>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ItemView> {
    let row = state.services.items.get(id).await?;
    Ok(Json(ApiResponse::success(row.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<ItemView>),
        (status = 400, description = "Invalid request or duplicate code", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> Created<ItemView> {
    validate_input(&payload)?;
    let input = NewItem {
        code: payload.code,
        name: payload.name,
        description: payload.description,
        unit: payload.unit,
        category_id: payload.category_id,
        min_threshold: payload.min_threshold,
        initial_quantity: payload.initial_quantity,
    };
    let row = state.services.items.create(&auth, input).await?;
    created_response(row.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/warehouse/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<ItemView>),
        (status = 400, description = "Duplicate code", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item or category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> ApiResult<ItemView> {
    validate_input(&payload)?;
    let changes = ItemChanges {
        code: payload.code,
        name: payload.name,
        description: payload.description,
        unit: payload.unit,
        category_id: payload.category_id,
        min_threshold: payload.min_threshold,
        is_active: payload.is_active,
    };
    let row = state.services.items.update(id, changes).await?;
    Ok(Json(ApiResponse::success(row.into())))
}

/// Items are deactivated, never removed, so their movements stay attributable.
#[utoipa::path(
    delete,
    path = "/api/v1/warehouse/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deactivated", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let item = state.services.items.deactivate(&auth, id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": item.id,
        "is_active": item.is_active
    }))))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/items/{id}/balance",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Current balance", body = ApiResponse<ItemBalance>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn item_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ItemBalance> {
    let balance = state.services.ledger.item_balance(id).await?;
    Ok(Json(ApiResponse::success(balance)))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/items/under-threshold",
    responses(
        (status = 200, description = "Active items at or below their threshold", body = ApiResponse<Vec<ItemBalance>>)
    ),
    tag = "warehouse"
)]
pub async fn under_threshold(State(state): State<AppState>) -> ApiResult<Vec<ItemBalance>> {
    let items = state.services.ledger.under_threshold().await?;
    Ok(Json(ApiResponse::success(items)))
}
