use crate::{
    auth::AuthUser,
    entities::warehouse_category,
    handlers::common::{created_response, validate_input, Created},
    services::warehouse::categories::{CategoryChanges, MoveDirection, NewCategory},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryListQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "9f8e7d6c-5b4a-4392-8170-6f5e4d3c2b1a",
    "name": "Bulloneria e fissaggi",
    "slug": "bulloneria-e-fissaggi",
    "description": null,
    "icon": "bolt",
    "color": "#6b7280",
    "ordering": 2,
    "is_active": true,
    "created_at": "2025-01-08T10:00:00Z",
    "updated_at": "2025-01-08T10:00:00Z"
}))]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub ordering: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<warehouse_category::Model> for CategoryView {
    fn from(model: warehouse_category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            icon: model.icon,
            color: model.color,
            ordering: model.ordering,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub icon: Option<String>,
    #[validate(length(max = 20))]
    pub color: Option<String>,
    /// Appended after the last category when omitted
    pub ordering: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub icon: Option<String>,
    #[validate(length(max = 20))]
    pub color: Option<String>,
    pub ordering: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({ "direction": "up" }))]
pub struct MoveCategoryRequest {
    pub direction: MoveDirection,
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/categories",
    params(CategoryListQuery),
    responses(
        (status = 200, description = "Categories by display order", body = ApiResponse<Vec<CategoryView>>)
    ),
    tag = "warehouse"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> ApiResult<Vec<CategoryView>> {
    let categories = state.services.categories.list(query.active).await?;
    Ok(Json(ApiResponse::success(
        categories.into_iter().map(CategoryView::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category fetched", body = ApiResponse<CategoryView>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CategoryView> {
    let category = state.services.categories.get(id).await?;
    Ok(Json(ApiResponse::success(category.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryView>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Created<CategoryView> {
    validate_input(&payload)?;
    let input = NewCategory {
        name: payload.name,
        description: payload.description,
        icon: payload.icon,
        color: payload.color,
        ordering: payload.ordering,
    };
    let category = state.services.categories.create(input).await?;
    created_response(category.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/warehouse/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryView>),
        (status = 400, description = "Duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> ApiResult<CategoryView> {
    validate_input(&payload)?;
    let changes = CategoryChanges {
        name: payload.name,
        description: payload.description,
        icon: payload.icon,
        color: payload.color,
        ordering: payload.ordering,
    };
    let category = state.services.categories.update(id, changes).await?;
    Ok(Json(ApiResponse::success(category.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/categories/{id}/toggle",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Active flag flipped", body = ApiResponse<CategoryView>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn toggle_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CategoryView> {
    let category = state.services.categories.toggle_active(id).await?;
    Ok(Json(ApiResponse::success(category.into())))
}

/// Swap the category with its active neighbour and return every category in display order.
#[utoipa::path(
    post,
    path = "/api/v1/warehouse/categories/{id}/move",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = MoveCategoryRequest,
    responses(
        (status = 200, description = "Categories in their new order", body = ApiResponse<Vec<CategoryView>>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn move_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MoveCategoryRequest>,
) -> ApiResult<Vec<CategoryView>> {
    let categories = state
        .services
        .categories
        .move_category(id, payload.direction)
        .await?;
    Ok(Json(ApiResponse::success(
        categories.into_iter().map(CategoryView::from).collect(),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/warehouse/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Items still reference the category", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.categories.delete(&auth, id).await?;
    Ok(Json(ApiResponse::success(json!({ "id": id, "deleted": true }))))
}
