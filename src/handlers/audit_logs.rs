use crate::{
    entities::audit_log,
    handlers::common::{page_and_limit, paginate},
    services::audit::AuditLogFilter,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub user_id: Option<Uuid>,
    /// e.g. `site_delete`, `request_fulfil`
    pub action: Option<String>,
    pub target_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogView {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub extra_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<audit_log::Model> for AuditLogView {
    fn from(model: audit_log::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            target_type: model.target_type,
            target_id: model.target_id,
            extra_data: model.extra_data,
            created_at: model.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Audit trail, newest first", body = ApiResponse<PaginatedResponse<AuditLogView>>),
        (status = 403, description = "Admin only", body = crate::errors::ErrorResponse)
    ),
    tag = "audit"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<PaginatedResponse<AuditLogView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let filter = AuditLogFilter {
        user_id: query.user_id,
        action: query.action,
        target_type: query.target_type,
    };
    let (rows, total) = state.services.audit.list(filter, page, limit).await?;
    let items = rows.into_iter().map(AuditLogView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}
