use crate::{
    auth::AuthUser,
    entities::daily_report,
    handlers::common::{created_response, page_and_limit, paginate, validate_input, Created},
    services::reports::{NewReport, ReportFilter},
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
pub struct ReportListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub site_id: Option<Uuid>,
    /// First day included
    pub from: Option<NaiveDate>,
    /// Last day included
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "7a9e3c51-8d2b-4f6e-a1c0-2b3d4e5f6a7b",
    "date": "2025-03-04",
    "site_id": "0d3c8a4b-2f1e-4c6a-9b8d-7e6f5a4b3c2d",
    "total_hours": "32.5",
    "workers_count": 4,
    "machines_used": "ESC-03, Autocarro 2",
    "activities": "Perforazione micropali fila B",
    "notes": null,
    "weather": "sereno",
    "created_by": "0b8f2a52-6f0c-4a53-9a4e-3f9b8d0e7c11",
    "created_at": "2025-03-04T17:10:00Z",
    "updated_at": "2025-03-04T17:10:00Z"
}))]
pub struct DailyReportView {
    pub id: Uuid,
    pub date: NaiveDate,
    pub site_id: Uuid,
    pub total_hours: Decimal,
    pub workers_count: i32,
    pub machines_used: Option<String>,
    pub activities: Option<String>,
    pub notes: Option<String>,
    pub weather: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<daily_report::Model> for DailyReportView {
    fn from(model: daily_report::Model) -> Self {
        Self {
            id: model.id,
            date: model.date,
            site_id: model.site_id,
            total_hours: model.total_hours,
            workers_count: model.workers_count,
            machines_used: model.machines_used,
            activities: model.activities,
            notes: model.notes,
            weather: model.weather,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "site_id": "0d3c8a4b-2f1e-4c6a-9b8d-7e6f5a4b3c2d",
    "total_hours": "32.5",
    "workers_count": 4,
    "activities": "Perforazione micropali fila B",
    "weather": "sereno"
}))]
pub struct CreateReportRequest {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub site_id: Uuid,
    pub total_hours: Decimal,
    #[validate(range(min = 0))]
    pub workers_count: i32,
    pub machines_used: Option<String>,
    pub activities: Option<String>,
    pub notes: Option<String>,
    pub weather: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/reports",
    params(ReportListQuery),
    responses(
        (status = 200, description = "Reports listed, newest first", body = ApiResponse<PaginatedResponse<DailyReportView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn list_reports(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ReportListQuery>,
) -> ApiResult<PaginatedResponse<DailyReportView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let filter = ReportFilter {
        site_id: query.site_id,
        from: query.from,
        to: query.to,
    };
    let (reports, total) = state
        .services
        .reports
        .list(&auth, filter, page, limit)
        .await?;
    let items = reports.into_iter().map(DailyReportView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report fetched", body = ApiResponse<DailyReportView>),
        (status = 403, description = "Site not assigned", body = crate::errors::ErrorResponse),
        (status = 404, description = "Report not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DailyReportView> {
    let report = state.services.reports.get(&auth, id).await?;
    Ok(Json(ApiResponse::success(report.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report filed", body = ApiResponse<DailyReportView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn create_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateReportRequest>,
) -> Created<DailyReportView> {
    validate_input(&payload)?;
    let input = NewReport {
        date: payload.date,
        site_id: payload.site_id,
        total_hours: payload.total_hours,
        workers_count: payload.workers_count,
        machines_used: payload.machines_used,
        activities: payload.activities,
        notes: payload.notes,
        weather: payload.weather,
    };
    let report = state.services.reports.create(&auth, input).await?;
    created_response(report.into())
}
