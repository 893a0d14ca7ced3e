use crate::{
    auth::{AuthUser, Role},
    entities::user,
    handlers::common::{created_response, page_and_limit, paginate, validate_input, Created},
    services::users::{NewUser, UserChanges, UserFilter},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
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
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    /// Matches email or full name
    pub search: Option<String>,
}

/// Account without its password hash
#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "0b8f2a52-6f0c-4a53-9a4e-3f9b8d0e7c11",
    "email": "marco.rossi@lenta.fr",
    "full_name": "Marco Rossi",
    "role": "caposquadra",
    "language": "it",
    "is_active": true,
    "is_warehouse_manager": false,
    "created_at": "2025-03-02T08:15:00Z",
    "updated_at": "2025-03-02T08:15:00Z"
}))]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    /// `it` or `fr`
    pub language: String,
    pub is_active: bool,
    pub is_warehouse_manager: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserSummary {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            language: model.language,
            is_active: model.is_active,
            is_warehouse_manager: model.is_warehouse_manager,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "marco.rossi@lenta.fr",
    "password": "cantiere-2025",
    "full_name": "Marco Rossi",
    "role": "caposquadra",
    "language": "it"
}))]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 4))]
    pub password: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub language: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_warehouse_manager: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 4))]
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub language: Option<String>,
    pub is_active: Option<bool>,
    pub is_warehouse_manager: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserSummary>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn current_user(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<UserSummary> {
    let user = state.services.users.get(auth.user_id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users listed", body = ApiResponse<PaginatedResponse<UserSummary>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<PaginatedResponse<UserSummary>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let filter = UserFilter {
        role: query.role,
        active: query.active,
        search: query.search,
    };
    let (users, total) = state.services.users.list(filter, page, limit).await?;
    let items = users.into_iter().map(UserSummary::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User fetched", body = ApiResponse<UserSummary>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<UserSummary> {
    let user = state.services.users.get(id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserSummary>),
        (status = 400, description = "Invalid request or duplicate email", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> Created<UserSummary> {
    validate_input(&payload)?;
    let input = NewUser {
        email: payload.email,
        password: payload.password,
        full_name: payload.full_name,
        role: payload.role,
        language: payload.language,
        is_active: payload.is_active,
        is_warehouse_manager: payload.is_warehouse_manager,
    };
    let user = state.services.users.create(Some(&auth), input).await?;
    created_response(user.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<UserSummary> {
    validate_input(&payload)?;
    let changes = UserChanges {
        email: payload.email,
        password: payload.password,
        full_name: payload.full_name,
        role: payload.role,
        language: payload.language,
        is_active: payload.is_active,
        is_warehouse_manager: payload.is_warehouse_manager,
    };
    let user = state.services.users.update(&auth, id, changes).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// Deactivates the account; users are never removed.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Own account", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let user = state.services.users.deactivate(&auth, id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": user.id,
        "is_active": user.is_active
    }))))
}
