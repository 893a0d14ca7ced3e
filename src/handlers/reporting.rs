use crate::{
    errors::ServiceError,
    services::reporting::{
        resolve_period, CrewLeaderReportRow, MachineReportRow, ReportKind, ReportPeriod,
        ReportPreset, SiteReportRow,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Used only when neither date is given
    pub preset: Option<ReportPreset>,
}

impl ReportQuery {
    fn period(&self) -> ReportPeriod {
        resolve_period(self.from, self.to, self.preset, Utc::now().date_naive())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PeriodReport<T> {
    pub period: ReportPeriod,
    pub rows: Vec<T>,
}

#[utoipa::path(
    get,
    path = "/api/v1/reporting/sites",
    params(ReportQuery),
    responses(
        (status = 200, description = "Hours per active site", body = ApiResponse<PeriodReport<SiteReportRow>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "reporting"
)]
pub async fn sites_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<PeriodReport<SiteReportRow>> {
    let period = query.period();
    let rows = state.services.reporting.sites(&period).await?;
    Ok(Json(ApiResponse::success(PeriodReport { period, rows })))
}

#[utoipa::path(
    get,
    path = "/api/v1/reporting/crew-leaders",
    params(ReportQuery),
    responses(
        (status = 200, description = "Sites and hours per crew leader", body = ApiResponse<PeriodReport<CrewLeaderReportRow>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "reporting"
)]
pub async fn crew_leaders_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<PeriodReport<CrewLeaderReportRow>> {
    let period = query.period();
    let rows = state.services.reporting.crew_leaders(&period).await?;
    Ok(Json(ApiResponse::success(PeriodReport { period, rows })))
}

#[utoipa::path(
    get,
    path = "/api/v1/reporting/machines",
    params(ReportQuery),
    responses(
        (status = 200, description = "Usage days and downtime per active machine", body = ApiResponse<PeriodReport<MachineReportRow>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "reporting"
)]
pub async fn machines_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<PeriodReport<MachineReportRow>> {
    let period = query.period();
    let rows = state.services.reporting.machines(&period).await?;
    Ok(Json(ApiResponse::success(PeriodReport { period, rows })))
}

/// Same rows as the JSON reports, as a CSV attachment.
#[utoipa::path(
    get,
    path = "/api/v1/reporting/{kind}/export",
    params(
        ("kind" = ReportKind, Path, description = "sites, crew-leaders or machines"),
        ReportQuery
    ),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 400, description = "Unknown report kind", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "reporting"
)]
pub async fn export_report(
    State(state): State<AppState>,
    Path(kind): Path<ReportKind>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ServiceError> {
    let period = query.period();
    let export = state.services.reporting.export_csv(kind, &period).await?;
    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}
