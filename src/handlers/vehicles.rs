use crate::{
    entities::vehicle,
    handlers::common::{
        created_response, double_option, page_and_limit, paginate, validate_input, Created,
    },
    services::vehicles::{NewVehicle, VehicleChanges},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VehicleListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Only vehicles whose insurance or inspection expires within this many days
    pub expiring_within_days: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "3e2d1c0b-9a8f-4e7d-6c5b-4a3f2e1d0c9b",
    "brand": "Renault",
    "model": "Master",
    "plate": "GH123JK",
    "year": 2021,
    "mileage_km": 84210,
    "fuel": "diesel",
    "insurance_expiry": "2025-06-30",
    "inspection_expiry": "2026-01-15",
    "next_expiry": "2025-06-30",
    "assigned_to": null,
    "notes": null,
    "created_at": "2024-09-01T08:00:00Z",
    "updated_at": "2025-02-10T11:20:00Z"
}))]
pub struct VehicleView {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub plate: String,
    pub year: Option<i32>,
    pub mileage_km: Option<i64>,
    pub fuel: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub inspection_expiry: Option<NaiveDate>,
    /// Earliest of the two deadlines
    pub next_expiry: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<vehicle::Model> for VehicleView {
    fn from(model: vehicle::Model) -> Self {
        let next_expiry = model.next_expiry();
        Self {
            id: model.id,
            brand: model.brand,
            model: model.model,
            plate: model.plate,
            year: model.year,
            mileage_km: model.mileage_km,
            fuel: model.fuel,
            insurance_expiry: model.insurance_expiry,
            inspection_expiry: model.inspection_expiry,
            next_expiry,
            assigned_to: model.assigned_to,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 100))]
    pub brand: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(length(min = 1, max = 20))]
    pub plate: String,
    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,
    pub mileage_km: Option<i64>,
    pub fuel: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub inspection_expiry: Option<NaiveDate>,
    /// Personnel ID
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 100))]
    pub brand: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub plate: Option<String>,
    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,
    pub mileage_km: Option<i64>,
    pub fuel: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub inspection_expiry: Option<NaiveDate>,
    /// `null` unassigns the vehicle
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to: Option<Option<Uuid>>,
    pub notes: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles",
    params(VehicleListQuery),
    responses(
        (status = 200, description = "Vehicles listed", body = ApiResponse<PaginatedResponse<VehicleView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehicleListQuery>,
) -> ApiResult<PaginatedResponse<VehicleView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let (vehicles, total) = state
        .services
        .vehicles
        .list(query.expiring_within_days, page, limit)
        .await?;
    let items = vehicles.into_iter().map(VehicleView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle fetched", body = ApiResponse<VehicleView>),
        (status = 404, description = "Vehicle not found", body = crate::errors::ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<VehicleView> {
    let vehicle = state.services.vehicles.get(id).await?;
    Ok(Json(ApiResponse::success(vehicle.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/vehicles",
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Vehicle registered", body = ApiResponse<VehicleView>),
        (status = 400, description = "Invalid request or duplicate plate", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assigned person not found", body = crate::errors::ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn create_vehicle(
    State(state): State<AppState>,
    Json(payload): Json<CreateVehicleRequest>,
) -> Created<VehicleView> {
    validate_input(&payload)?;
    let input = NewVehicle {
        brand: payload.brand,
        model: payload.model,
        plate: payload.plate,
        year: payload.year,
        mileage_km: payload.mileage_km,
        fuel: payload.fuel,
        insurance_expiry: payload.insurance_expiry,
        inspection_expiry: payload.inspection_expiry,
        assigned_to: payload.assigned_to,
        notes: payload.notes,
    };
    let vehicle = state.services.vehicles.create(input).await?;
    created_response(vehicle.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = UpdateVehicleRequest,
    responses(
        (status = 200, description = "Vehicle updated", body = ApiResponse<VehicleView>),
        (status = 404, description = "Vehicle or person not found", body = crate::errors::ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVehicleRequest>,
) -> ApiResult<VehicleView> {
    validate_input(&payload)?;
    let changes = VehicleChanges {
        brand: payload.brand,
        model: payload.model,
        plate: payload.plate,
        year: payload.year,
        mileage_km: payload.mileage_km,
        fuel: payload.fuel,
        insurance_expiry: payload.insurance_expiry,
        inspection_expiry: payload.inspection_expiry,
        assigned_to: payload.assigned_to,
        notes: payload.notes,
    };
    let vehicle = state.services.vehicles.update(id, changes).await?;
    Ok(Json(ApiResponse::success(vehicle.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Vehicle not found", body = crate::errors::ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.vehicles.delete(id).await?;
    Ok(Json(ApiResponse::success(json!({ "id": id, "deleted": true }))))
}
