use crate::{
    auth::AuthUser,
    entities::{
        fiche::{self, FicheType},
        fiche_layer,
    },
    handlers::common::{created_response, page_and_limit, paginate, validate_input, Created},
    services::fiches::{FicheDetail, FicheFilter, NewFiche, NewLayer},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FicheListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub site_id: Option<Uuid>,
    pub fiche_type: Option<FicheType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LayerView {
    pub id: Uuid,
    pub position: i32,
    pub from_m: Decimal,
    pub to_m: Decimal,
    pub description: String,
}

impl From<fiche_layer::Model> for LayerView {
    fn from(model: fiche_layer::Model) -> Self {
        Self {
            id: model.id,
            position: model.position,
            from_m: model.from_m,
            to_m: model.to_m,
            description: model.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FicheView {
    pub id: Uuid,
    pub date: NaiveDate,
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
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Only filled in on single-fiche responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<LayerView>>,
}

impl From<fiche::Model> for FicheView {
    fn from(model: fiche::Model) -> Self {
        Self {
            id: model.id,
            date: model.date,
            site_id: model.site_id,
            machine_id: model.machine_id,
            fiche_type: model.fiche_type,
            description: model.description,
            operator: model.operator,
            hours: model.hours,
            notes: model.notes,
            excavation_type: model.excavation_type,
            stratigraphy: model.stratigraphy,
            material: model.material,
            total_depth_m: model.total_depth_m,
            pile_diameter_mm: model.pile_diameter_mm,
            panel_width_m: model.panel_width_m,
            panel_height_m: model.panel_height_m,
            casting_date: model.casting_date,
            cubic_metres_cast: model.cubic_metres_cast,
            created_by: model.created_by,
            created_at: model.created_at,
            layers: None,
        }
    }
}

impl From<FicheDetail> for FicheView {
    fn from(detail: FicheDetail) -> Self {
        let mut view = FicheView::from(detail.fiche);
        view.layers = Some(detail.layers.into_iter().map(LayerView::from).collect());
        view
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LayerRequest {
    pub from_m: Decimal,
    pub to_m: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "site_id": "0d3c8a4b-2f1e-4c6a-9b8d-7e6f5a4b3c2d",
    "machine_id": "5c1d6a8e-0f43-4b6b-8a2e-4b7f2f6a9d10",
    "fiche_type": "produzione",
    "description": "Micropalo B12",
    "operator": "Luca B.",
    "hours": "6",
    "total_depth_m": "14.5",
    "pile_diameter_mm": "220",
    "layers": [
        { "from_m": "0", "to_m": "2.5", "description": "riporto" },
        { "from_m": "2.5", "to_m": "14.5", "description": "argilla limosa" }
    ]
}))]
pub struct CreateFicheRequest {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub site_id: Uuid,
    pub machine_id: Option<Uuid>,
    pub fiche_type: FicheType,
    #[validate(length(min = 1))]
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
    #[serde(default)]
    #[validate]
    pub layers: Vec<LayerRequest>,
}

#[utoipa::path(
    get,
    path = "/api/v1/fiches",
    params(FicheListQuery),
    responses(
        (status = 200, description = "Fiches listed, newest first", body = ApiResponse<PaginatedResponse<FicheView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "fiches"
)]
pub async fn list_fiches(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FicheListQuery>,
) -> ApiResult<PaginatedResponse<FicheView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let filter = FicheFilter {
        site_id: query.site_id,
        fiche_type: query.fiche_type,
        from: query.from,
        to: query.to,
    };
    let (fiches, total) = state
        .services
        .fiches
        .list(&auth, filter, page, limit)
        .await?;
    let items = fiches.into_iter().map(FicheView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/fiches/{id}",
    params(("id" = Uuid, Path, description = "Fiche ID")),
    responses(
        (status = 200, description = "Fiche with its layers", body = ApiResponse<FicheView>),
        (status = 403, description = "Site not assigned", body = crate::errors::ErrorResponse),
        (status = 404, description = "Fiche not found", body = crate::errors::ErrorResponse)
    ),
    tag = "fiches"
)]
pub async fn get_fiche(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<FicheView> {
    let detail = state.services.fiches.get(&auth, id).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/fiches",
    request_body = CreateFicheRequest,
    responses(
        (status = 201, description = "Fiche created with its layers", body = ApiResponse<FicheView>),
        (status = 400, description = "Invalid values or overlapping layers", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site or machine not found", body = crate::errors::ErrorResponse)
    ),
    tag = "fiches"
)]
pub async fn create_fiche(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateFicheRequest>,
) -> Created<FicheView> {
    validate_input(&payload)?;
    let input = NewFiche {
        date: payload.date,
        site_id: payload.site_id,
        machine_id: payload.machine_id,
        fiche_type: payload.fiche_type,
        description: payload.description,
        operator: payload.operator,
        hours: payload.hours,
        notes: payload.notes,
        excavation_type: payload.excavation_type,
        stratigraphy: payload.stratigraphy,
        material: payload.material,
        total_depth_m: payload.total_depth_m,
        pile_diameter_mm: payload.pile_diameter_mm,
        panel_width_m: payload.panel_width_m,
        panel_height_m: payload.panel_height_m,
        casting_date: payload.casting_date,
        cubic_metres_cast: payload.cubic_metres_cast,
        layers: payload
            .layers
            .into_iter()
            .map(|layer| NewLayer {
                from_m: layer.from_m,
                to_m: layer.to_m,
                description: layer.description,
            })
            .collect(),
    };
    let detail = state.services.fiches.create(&auth, input).await?;
    created_response(detail.into())
}

#[utoipa::path(
    delete,
    path = "/api/v1/fiches/{id}",
    params(("id" = Uuid, Path, description = "Fiche ID")),
    responses(
        (status = 200, description = "Fiche and layers removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Fiche not found", body = crate::errors::ErrorResponse)
    ),
    tag = "fiches"
)]
pub async fn delete_fiche(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.fiches.delete(&auth, id).await?;
    Ok(Json(ApiResponse::success(json!({ "id": id, "deleted": true }))))
}
