use crate::{
    auth::AuthUser,
    entities::{notification, Role},
    handlers::common::{created_response, validate_input, Created},
    services::notifications::{CreateNotification, NotificationFeed},
    ApiResponse, ApiResult, AppState,
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
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    /// 1..=50, default 20
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationView {
    pub id: Uuid,
    pub recipient_user_id: Option<Uuid>,
    pub recipient_role: Option<Role>,
    pub notification_type: String,
    pub message: String,
    pub target_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<notification::Model> for NotificationView {
    fn from(model: notification::Model) -> Self {
        Self {
            id: model.id,
            recipient_user_id: model.recipient_user_id,
            recipient_role: model.recipient_role,
            notification_type: model.notification_type,
            message: model.message,
            target_url: model.target_url,
            is_read: model.is_read,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "items": [{
        "id": "7b6a5f4e-3d2c-4b1a-9f8e-7d6c5b4a3f2e",
        "recipient_user_id": null,
        "recipient_role": "manager",
        "notification_type": "report_created",
        "message": "Nuovo rapportino per Cantiere Lione Nord (2025-03-12)",
        "target_url": "/reports/4c3b2a1f-0e9d-4c8b-7a6f-5e4d3c2b1a0f",
        "is_read": false,
        "created_at": "2025-03-12T16:02:11Z"
    }],
    "unread_count": 1
}))]
pub struct NotificationFeedView {
    pub items: Vec<NotificationView>,
    pub unread_count: u64,
}

impl From<NotificationFeed> for NotificationFeedView {
    fn from(feed: NotificationFeed) -> Self {
        Self {
            items: feed.items.into_iter().map(NotificationView::from).collect(),
            unread_count: feed.unread_count,
        }
    }
}

/// Exactly one of `recipient_user_id` and `recipient_role` must be set.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "recipient_role": "caposquadra",
    "message": "Consegna calcestruzzo anticipata alle 7:00",
    "target_url": "/sites"
}))]
pub struct CreateNotificationRequest {
    pub recipient_user_id: Option<Uuid>,
    pub recipient_role: Option<Role>,
    #[validate(length(max = 50))]
    pub notification_type: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub message: String,
    #[validate(length(max = 500))]
    pub target_url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = ApiResponse<NotificationFeedView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<NotificationFeedView> {
    let feed = state
        .services
        .notifications
        .list(&auth, query.unread_only, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(feed.into())))
}

/// Lightweight endpoint for periodic polling: unread count and the latest five.
#[utoipa::path(
    get,
    path = "/api/v1/notifications/poll",
    responses(
        (status = 200, description = "Unread count and latest notifications", body = ApiResponse<NotificationFeedView>)
    ),
    tag = "notifications"
)]
pub async fn poll_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<NotificationFeedView> {
    let feed = state.services.notifications.poll(&auth).await?;
    Ok(Json(ApiResponse::success(feed.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read", body = ApiResponse<NotificationView>),
        (status = 404, description = "Not found in the caller's feed", body = crate::errors::ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<NotificationView> {
    let row = state.services.notifications.mark_read(&auth, id).await?;
    Ok(Json(ApiResponse::success(row.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    responses(
        (status = 200, description = "Number of notifications marked", body = ApiResponse<serde_json::Value>)
    ),
    tag = "notifications"
)]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<serde_json::Value> {
    let updated = state.services.notifications.mark_all_read(&auth).await?;
    Ok(Json(ApiResponse::success(json!({ "updated": updated }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = ApiResponse<NotificationView>),
        (status = 400, description = "Both or neither recipient given", body = crate::errors::ErrorResponse),
        (status = 404, description = "Recipient user not found", body = crate::errors::ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn create_notification(
    State(state): State<AppState>,
    Json(payload): Json<CreateNotificationRequest>,
) -> Created<NotificationView> {
    validate_input(&payload)?;
    let input = CreateNotification {
        recipient_user_id: payload.recipient_user_id,
        recipient_role: payload.recipient_role,
        notification_type: payload.notification_type,
        message: payload.message,
        target_url: payload.target_url,
    };
    let row = state.services.notifications.create(input).await?;
    created_response(row.into())
}

/// Remind crew leaders about today's missing daily reports.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/missing-reports",
    responses(
        (status = 200, description = "Number of reminders created", body = ApiResponse<serde_json::Value>)
    ),
    tag = "notifications"
)]
pub async fn send_missing_report_reminders(
    State(state): State<AppState>,
) -> ApiResult<serde_json::Value> {
    let today = Utc::now().date_naive();
    let created = state
        .services
        .notifications
        .send_missing_report_reminders(today)
        .await?;
    Ok(Json(ApiResponse::success(json!({
        "date": today,
        "created": created
    }))))
}
