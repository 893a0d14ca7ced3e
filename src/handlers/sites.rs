use crate::{
    auth::AuthUser,
    entities::site::{self, SiteStatus},
    handlers::{
        common::{
            created_response, double_option, page_and_limit, paginate, validate_input, Created,
        },
        machines::MachineView,
    },
    services::{
        sites::{NewSite, SiteChanges, SiteFilter, SiteSummary},
        warehouse::ledger::OutboundTotal,
    },
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
pub struct SiteListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<SiteStatus>,
    pub active: Option<bool>,
    /// Matches name or code
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "0d3c8a4b-2f1e-4c6a-9b8d-7e6f5a4b3c2d",
    "name": "Résidence Les Tilleuls",
    "code": "LT-2025",
    "address": "12 rue des Tilleuls",
    "city": "Lyon",
    "country": "France",
    "start_date": "2025-02-03",
    "end_date": null,
    "status": "aperto",
    "is_active": true,
    "caposquadra_id": "0b8f2a52-6f0c-4a53-9a4e-3f9b8d0e7c11",
    "progress": 35,
    "description": "Micropali e paratia berlinese",
    "created_at": "2025-01-20T09:00:00Z",
    "updated_at": "2025-03-01T17:45:00Z"
}))]
pub struct SiteView {
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: SiteStatus,
    pub is_active: bool,
    pub caposquadra_id: Option<Uuid>,
    /// Completion percentage, 0 to 100
    pub progress: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<site::Model> for SiteView {
    fn from(model: site::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            address: model.address,
            city: model.city,
            country: model.country,
            start_date: model.start_date,
            end_date: model.end_date,
            status: model.status,
            is_active: model.is_active,
            caposquadra_id: model.caposquadra_id,
            progress: model.progress,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Activity on one site: reports, fiches, machines and material sent out
#[derive(Debug, Serialize, ToSchema)]
pub struct SiteSummaryView {
    pub site: SiteView,
    pub report_count: u64,
    pub total_hours: Decimal,
    pub fiche_count: u64,
    pub machines: Vec<MachineView>,
    pub outbound_totals: Vec<OutboundTotal>,
}

impl From<SiteSummary> for SiteSummaryView {
    fn from(summary: SiteSummary) -> Self {
        Self {
            site: summary.site.into(),
            report_count: summary.report_count,
            total_hours: summary.total_hours,
            fiche_count: summary.fiche_count,
            machines: summary.machines.into_iter().map(MachineView::from).collect(),
            outbound_totals: summary.outbound_totals,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Résidence Les Tilleuls",
    "code": "LT-2025",
    "city": "Lyon",
    "start_date": "2025-02-03",
    "status": "pianificato",
    "caposquadra_id": "0b8f2a52-6f0c-4a53-9a4e-3f9b8d0e7c11"
}))]
pub struct CreateSiteRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    /// Defaults to France
    pub country: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<SiteStatus>,
    pub caposquadra_id: Option<Uuid>,
    #[validate(range(min = 0, max = 100))]
    pub progress: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSiteRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<SiteStatus>,
    pub is_active: Option<bool>,
    /// `null` unassigns the crew leader
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub caposquadra_id: Option<Option<Uuid>>,
    #[validate(range(min = 0, max = 100))]
    pub progress: Option<i32>,
    pub description: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/sites",
    params(SiteListQuery),
    responses(
        (status = 200, description = "Sites listed; crew leaders only see their own", body = ApiResponse<PaginatedResponse<SiteView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "sites"
)]
pub async fn list_sites(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SiteListQuery>,
) -> ApiResult<PaginatedResponse<SiteView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let filter = SiteFilter {
        status: query.status,
        active: query.active,
        search: query.search,
    };
    let (sites, total) = state.services.sites.list(&auth, filter, page, limit).await?;
    let items = sites.into_iter().map(SiteView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/sites/{id}",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site fetched", body = ApiResponse<SiteView>),
        (status = 403, description = "Site not assigned", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sites"
)]
pub async fn get_site(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SiteView> {
    let site = state.services.sites.get(&auth, id).await?;
    Ok(Json(ApiResponse::success(site.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/sites/{id}/summary",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site activity summary", body = ApiResponse<SiteSummaryView>),
        (status = 403, description = "Site not assigned", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sites"
)]
pub async fn site_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SiteSummaryView> {
    let summary = state.services.sites.summary(&auth, id).await?;
    Ok(Json(ApiResponse::success(summary.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/sites",
    request_body = CreateSiteRequest,
    responses(
        (status = 201, description = "Site created", body = ApiResponse<SiteView>),
        (status = 400, description = "Invalid request or duplicate code", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "sites"
)]
pub async fn create_site(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateSiteRequest>,
) -> Created<SiteView> {
    validate_input(&payload)?;
    let input = NewSite {
        name: payload.name,
        code: payload.code,
        address: payload.address,
        city: payload.city,
        country: payload.country,
        start_date: payload.start_date,
        end_date: payload.end_date,
        status: payload.status,
        caposquadra_id: payload.caposquadra_id,
        progress: payload.progress,
        description: payload.description,
    };
    let site = state.services.sites.create(&auth, input).await?;
    created_response(site.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/sites/{id}",
    params(("id" = Uuid, Path, description = "Site ID")),
    request_body = UpdateSiteRequest,
    responses(
        (status = 200, description = "Site updated", body = ApiResponse<SiteView>),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sites"
)]
pub async fn update_site(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSiteRequest>,
) -> ApiResult<SiteView> {
    validate_input(&payload)?;
    let changes = SiteChanges {
        name: payload.name,
        code: payload.code,
        address: payload.address,
        city: payload.city,
        country: payload.country,
        start_date: payload.start_date,
        end_date: payload.end_date,
        status: payload.status,
        is_active: payload.is_active,
        caposquadra_id: payload.caposquadra_id,
        progress: payload.progress,
        description: payload.description,
    };
    let site = state.services.sites.update(&auth, id, changes).await?;
    Ok(Json(ApiResponse::success(site.into())))
}

/// Soft delete: the site is marked inactive.
#[utoipa::path(
    delete,
    path = "/api/v1/sites/{id}",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site deactivated", body = ApiResponse<SiteView>),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sites"
)]
pub async fn delete_site(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SiteView> {
    let site = state.services.sites.delete(&auth, id).await?;
    Ok(Json(ApiResponse::success(site.into())))
}
