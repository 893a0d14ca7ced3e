use crate::{
    auth::AuthUser,
    entities::warehouse_movement::{self, MovementType},
    handlers::common::{created_response, page_and_limit, paginate, validate_input, Created},
    services::warehouse::ledger::{MovementFilter, NewMovement, SiteOutboundTotal},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub item_id: Option<Uuid>,
    pub site_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    /// Inclusive lower bound on the movement date
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the movement date
    pub to: Option<NaiveDate>,
}

/// Signed ledger entry: positive adds stock, negative removes it
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "c1d2e3f4-a5b6-4c7d-8e9f-0a1b2c3d4e5f",
    "item_id": "1a2b3c4d-5e6f-4708-9a1b-2c3d4e5f6a7b",
    "movement_type": "outbound",
    "quantity": "-45",
    "site_id": "5d4c3b2a-1f0e-4d9c-8b7a-6f5e4d3c2b1a",
    "user_id": "0e9d8c7b-6a5f-4e4d-3c2b-1a0f9e8d7c6b",
    "note": null,
    "request_id": null,
    "created_at": "2025-03-12T07:40:00Z"
}))]
pub struct MovementView {
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

impl From<warehouse_movement::Model> for MovementView {
    fn from(model: warehouse_movement::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            movement_type: model.movement_type,
            quantity: model.quantity,
            site_id: model.site_id,
            user_id: model.user_id,
            note: model.note,
            request_id: model.request_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementListView {
    pub movements: PaginatedResponse<MovementView>,
    /// Outbound quantities per site across the whole filtered set
    pub outbound_by_site: Vec<SiteOutboundTotal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "item_id": "1a2b3c4d-5e6f-4708-9a1b-2c3d4e5f6a7b",
    "movement_type": "outbound",
    "quantity": "45",
    "site_id": "5d4c3b2a-1f0e-4d9c-8b7a-6f5e4d3c2b1a"
}))]
pub struct CreateMovementRequest {
    pub item_id: Uuid,
    pub movement_type: MovementType,
    /// Magnitude for inbound and outbound; adjustments keep their sign
    pub quantity: Decimal,
    pub site_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "counted": "12", "note": "Inventario trimestrale" }))]
pub struct StocktakeRequest {
    /// Physically counted quantity
    pub counted: Decimal,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/movements",
    params(MovementListQuery),
    responses(
        (status = 200, description = "Movements, newest first", body = ApiResponse<MovementListView>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementListQuery>,
) -> ApiResult<MovementListView> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let filter = MovementFilter {
        item_id: query.item_id,
        site_id: query.site_id,
        movement_type: query.movement_type,
        from: query.from,
        to: query.to,
    };
    let result = state
        .services
        .ledger
        .list_movements(filter, page, limit)
        .await?;
    let items = result.movements.into_iter().map(MovementView::from).collect();
    Ok(Json(ApiResponse::success(MovementListView {
        movements: paginate(items, result.total, page, limit),
        outbound_by_site: result.outbound_by_site,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/movements",
    request_body = CreateMovementRequest,
    responses(
        (status = 201, description = "Movement recorded", body = ApiResponse<MovementView>),
        (status = 400, description = "Invalid quantity, inactive item or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item or site not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn create_movement(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateMovementRequest>,
) -> Created<MovementView> {
    validate_input(&payload)?;
    let input = NewMovement {
        item_id: payload.item_id,
        movement_type: payload.movement_type,
        quantity: payload.quantity,
        site_id: payload.site_id,
        note: payload.note,
        request_id: None,
    };
    let movement = state.services.ledger.record(&auth, input).await?;
    created_response(movement.into())
}

/// Book the difference between the counted and the recorded balance as an
/// adjustment. `data` is `null` when nothing had to change.
#[utoipa::path(
    post,
    path = "/api/v1/warehouse/items/{id}/stocktake",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = StocktakeRequest,
    responses(
        (status = 200, description = "Adjustment recorded, or none needed", body = ApiResponse<Option<MovementView>>),
        (status = 400, description = "Negative count", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn stocktake(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StocktakeRequest>,
) -> ApiResult<Option<MovementView>> {
    validate_input(&payload)?;
    let movement = state
        .services
        .ledger
        .stocktake(&auth, id, payload.counted, payload.note)
        .await?;
    Ok(Json(ApiResponse::success(movement.map(MovementView::from))))
}
