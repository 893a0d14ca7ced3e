use crate::{
    auth::AuthUser,
    entities::machine::{self, MachineStatus, MachineType},
    handlers::common::{
        created_response, double_option, page_and_limit, paginate, validate_input, Created,
    },
    services::machines::{MachineChanges, MachineFilter, NewMachine},
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
pub struct MachineListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub site_id: Option<Uuid>,
    pub status: Option<MachineStatus>,
    pub has_issue: Option<bool>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "5c1d6a8e-0f43-4b6b-8a2e-4b7f2f6a9d10",
    "name": "Escavatore CAT 320",
    "code": "ESC-03",
    "machine_type": "escavatore",
    "brand": "Caterpillar",
    "model_name": "320 GC",
    "plate": null,
    "status": "attivo",
    "site_id": "0d3c8a4b-2f1e-4c6a-9b8d-7e6f5a4b3c2d",
    "is_active": true,
    "has_issue": true,
    "current_issue": "Perdita olio idraulico",
    "created_at": "2025-02-11T07:30:00Z",
    "updated_at": "2025-03-04T16:02:00Z"
}))]
pub struct MachineView {
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub machine_type: Option<MachineType>,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub plate: Option<String>,
    pub status: MachineStatus,
    pub notes: Option<String>,
    pub site_id: Option<Uuid>,
    pub is_active: bool,
    pub has_issue: bool,
    pub current_issue: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<machine::Model> for MachineView {
    fn from(model: machine::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            machine_type: model.machine_type,
            brand: model.brand,
            model_name: model.model_name,
            plate: model.plate,
            status: model.status,
            notes: model.notes,
            site_id: model.site_id,
            is_active: model.is_active,
            has_issue: model.has_issue,
            current_issue: model.current_issue,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMachineRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub code: Option<String>,
    pub machine_type: Option<MachineType>,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub plate: Option<String>,
    pub status: Option<MachineStatus>,
    pub notes: Option<String>,
    pub site_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMachineRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub code: Option<String>,
    pub machine_type: Option<MachineType>,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub plate: Option<String>,
    pub status: Option<MachineStatus>,
    pub notes: Option<String>,
    /// `null` detaches the machine from its site
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub site_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "message": "Perdita olio idraulico" }))]
pub struct ReportIssueRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/machines",
    params(MachineListQuery),
    responses(
        (status = 200, description = "Machines listed, open issues first", body = ApiResponse<PaginatedResponse<MachineView>>)
    ),
    tag = "machines"
)]
pub async fn list_machines(
    State(state): State<AppState>,
    Query(query): Query<MachineListQuery>,
) -> ApiResult<PaginatedResponse<MachineView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let filter = MachineFilter {
        site_id: query.site_id,
        status: query.status,
        has_issue: query.has_issue,
        active: query.active,
    };
    let (machines, total) = state.services.machines.list(filter, page, limit).await?;
    let items = machines.into_iter().map(MachineView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/machines/{id}",
    params(("id" = Uuid, Path, description = "Machine ID")),
    responses(
        (status = 200, description = "Machine fetched", body = ApiResponse<MachineView>),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    tag = "machines"
)]
pub async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MachineView> {
    let machine = state.services.machines.get(id).await?;
    Ok(Json(ApiResponse::success(machine.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/machines",
    request_body = CreateMachineRequest,
    responses(
        (status = 201, description = "Machine created", body = ApiResponse<MachineView>),
        (status = 400, description = "Invalid request or duplicate code", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    tag = "machines"
)]
pub async fn create_machine(
    State(state): State<AppState>,
    Json(payload): Json<CreateMachineRequest>,
) -> Created<MachineView> {
    validate_input(&payload)?;
    let input = NewMachine {
        name: payload.name,
        code: payload.code,
        machine_type: payload.machine_type,
        brand: payload.brand,
        model_name: payload.model_name,
        plate: payload.plate,
        status: payload.status,
        notes: payload.notes,
        site_id: payload.site_id,
    };
    let machine = state.services.machines.create(input).await?;
    created_response(machine.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/machines/{id}",
    params(("id" = Uuid, Path, description = "Machine ID")),
    request_body = UpdateMachineRequest,
    responses(
        (status = 200, description = "Machine updated", body = ApiResponse<MachineView>),
        (status = 404, description = "Machine or site not found", body = crate::errors::ErrorResponse)
    ),
    tag = "machines"
)]
pub async fn update_machine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMachineRequest>,
) -> ApiResult<MachineView> {
    validate_input(&payload)?;
    let changes = MachineChanges {
        name: payload.name,
        code: payload.code,
        machine_type: payload.machine_type,
        brand: payload.brand,
        model_name: payload.model_name,
        plate: payload.plate,
        status: payload.status,
        notes: payload.notes,
        site_id: payload.site_id,
        is_active: payload.is_active,
    };
    let machine = state.services.machines.update(id, changes).await?;
    Ok(Json(ApiResponse::success(machine.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/machines/{id}",
    params(("id" = Uuid, Path, description = "Machine ID")),
    responses(
        (status = 200, description = "Machine deactivated", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    tag = "machines"
)]
pub async fn delete_machine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let machine = state.services.machines.deactivate(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": machine.id,
        "is_active": machine.is_active
    }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/machines/{id}/issue",
    params(("id" = Uuid, Path, description = "Machine ID")),
    request_body = ReportIssueRequest,
    responses(
        (status = 200, description = "Issue recorded", body = ApiResponse<MachineView>),
        (status = 400, description = "Empty message", body = crate::errors::ErrorResponse),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    tag = "machines"
)]
pub async fn report_issue(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportIssueRequest>,
) -> ApiResult<MachineView> {
    validate_input(&payload)?;
    let machine = state
        .services
        .machines
        .report_issue(&auth, id, &payload.message)
        .await?;
    Ok(Json(ApiResponse::success(machine.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/machines/{id}/resolve",
    params(("id" = Uuid, Path, description = "Machine ID")),
    responses(
        (status = 200, description = "Issue cleared", body = ApiResponse<MachineView>),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    tag = "machines"
)]
pub async fn resolve_issue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MachineView> {
    let machine = state.services.machines.resolve_issue(id).await?;
    Ok(Json(ApiResponse::success(machine.into())))
}
