use crate::{
    auth::AuthUser,
    entities::warehouse_request::{self, RequestStatus},
    handlers::common::{created_response, page_and_limit, paginate, validate_input, Created},
    services::warehouse::requests::{
        parse_status_filter, NewRequest, NewRequestLine, RequestDetail, RequestLineView,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MyRequestsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// `in_attesa` (default), `approvata`, `evasa`, `rifiutata` or `tutte`
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestView {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub site_id: Option<Uuid>,
    pub status: RequestStatus,
    pub note: Option<String>,
    pub manager_reply: Option<String>,
    pub handled_by: Option<Uuid>,
    pub handled_at: Option<DateTime<Utc>>,
    pub read_by_requester: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present on single-request responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<RequestLineView>>,
}

impl From<warehouse_request::Model> for RequestView {
    fn from(model: warehouse_request::Model) -> Self {
        Self {
            id: model.id,
            requester_id: model.requester_id,
            site_id: model.site_id,
            status: model.status,
            note: model.note,
            manager_reply: model.manager_reply,
            handled_by: model.handled_by,
            handled_at: model.handled_at,
            read_by_requester: model.read_by_requester,
            created_at: model.created_at,
            updated_at: model.updated_at,
            lines: None,
        }
    }
}

impl From<RequestDetail> for RequestView {
    fn from(detail: RequestDetail) -> Self {
        Self {
            lines: Some(detail.lines),
            ..RequestView::from(detail.request)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RequestLineInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "site_id": "5d4c3b2a-1f0e-4d9c-8b7a-6f5e4d3c2b1a",
    "note": "Per il getto di venerdì",
    "lines": [{ "item_id": "1a2b3c4d-5e6f-4708-9a1b-2c3d4e5f6a7b", "quantity": "20" }]
}))]
pub struct CreateRequestRequest {
    pub site_id: Option<Uuid>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub lines: Vec<RequestLineInput>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct ReplyRequest {
    #[validate(length(max = 1000))]
    pub reply: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/requests",
    request_body = CreateRequestRequest,
    responses(
        (status = 201, description = "Request submitted", body = ApiResponse<RequestView>),
        (status = 400, description = "No lines, bad quantity or inactive item", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site not assigned to the caller", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateRequestRequest>,
) -> Created<RequestView> {
    validate_input(&payload)?;
    let input = NewRequest {
        site_id: payload.site_id,
        note: payload.note,
        lines: payload
            .lines
            .into_iter()
            .map(|line| NewRequestLine {
                item_id: line.item_id,
                quantity: line.quantity,
            })
            .collect(),
    };
    let detail = state.services.requests.create(&auth, input).await?;
    created_response(detail.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/requests/mine",
    params(MyRequestsQuery),
    responses(
        (status = 200, description = "Caller's requests, newest first", body = ApiResponse<PaginatedResponse<RequestView>>)
    ),
    tag = "warehouse"
)]
pub async fn list_my_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<MyRequestsQuery>,
) -> ApiResult<PaginatedResponse<RequestView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let (rows, total) = state.services.requests.list_mine(&auth, page, limit).await?;
    let items = rows.into_iter().map(RequestView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/requests",
    params(RequestListQuery),
    responses(
        (status = 200, description = "Requests in the selected state", body = ApiResponse<PaginatedResponse<RequestView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestListQuery>,
) -> ApiResult<PaginatedResponse<RequestView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let status = parse_status_filter(query.status.as_deref());
    let (rows, total) = state.services.requests.list_all(status, page, limit).await?;
    let items = rows.into_iter().map(RequestView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/requests/{id}",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request with lines", body = ApiResponse<RequestView>),
        (status = 403, description = "Request belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn get_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<RequestView> {
    let detail = state.services.requests.get(&auth, id).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/requests/{id}/approve",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = ReplyRequest,
    responses(
        (status = 200, description = "Request approved", body = ApiResponse<RequestView>),
        (status = 409, description = "Request is not pending", body = crate::errors::ErrorResponse),
        (status = 422, description = "Stock does not cover every line", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn approve_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReplyRequest>>,
) -> ApiResult<RequestView> {
    let reply = reply_text(payload)?;
    let detail = state.services.requests.approve(&auth, id, reply).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

/// Ships every line out of stock in one transaction.
#[utoipa::path(
    post,
    path = "/api/v1/warehouse/requests/{id}/fulfil",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = ReplyRequest,
    responses(
        (status = 200, description = "Request fulfilled", body = ApiResponse<RequestView>),
        (status = 400, description = "Insufficient stock or inactive item", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request is not approved", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn fulfil_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReplyRequest>>,
) -> ApiResult<RequestView> {
    let reply = reply_text(payload)?;
    let detail = state.services.requests.fulfil(&auth, id, reply).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/requests/{id}/reject",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = ReplyRequest,
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<RequestView>),
        (status = 409, description = "Request already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn reject_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReplyRequest>>,
) -> ApiResult<RequestView> {
    let reply = reply_text(payload)?;
    let detail = state.services.requests.reject(&auth, id, reply).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/requests/{id}/read",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Marked as read", body = ApiResponse<RequestView>),
        (status = 403, description = "Only the requester can mark it read", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse"
)]
pub async fn mark_request_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<RequestView> {
    let request = state.services.requests.mark_read(&auth, id).await?;
    Ok(Json(ApiResponse::success(request.into())))
}

/// The reply body is optional; blank replies are dropped.
fn reply_text(
    payload: Option<Json<ReplyRequest>>,
) -> Result<Option<String>, crate::errors::ServiceError> {
    let Some(Json(payload)) = payload else {
        return Ok(None);
    };
    validate_input(&payload)?;
    Ok(payload
        .reply
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(lines: Vec<RequestLineInput>) -> CreateRequestRequest {
        CreateRequestRequest {
            site_id: None,
            note: None,
            lines,
        }
    }

    #[test]
    fn request_needs_at_least_one_line() {
        assert!(request(vec![]).validate().is_err());
        let line = RequestLineInput {
            item_id: Uuid::new_v4(),
            quantity: dec!(2),
        };
        assert!(request(vec![line]).validate().is_ok());
    }
}
