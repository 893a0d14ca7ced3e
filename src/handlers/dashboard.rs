use crate::{
    auth::AuthUser, services::dashboard::DashboardSummary, ApiResponse, ApiResult, AppState,
};
use axum::{extract::State, response::Json};

/// Counters for the landing page, scoped to the caller's role.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<DashboardSummary>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<DashboardSummary> {
    let summary = state.services.dashboard.summary(&auth).await?;
    Ok(Json(ApiResponse::success(summary)))
}
