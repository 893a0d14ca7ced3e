//! Lenta Gestionale API Library
//!
//! Construction-site management: sites, machines, daily reports, fiches,
//! personnel and attendance, vehicles, the warehouse ledger, management reports
//! and in-app notifications.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod telemetry;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::role_sets;
use crate::auth::{AuthRouterExt, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: telemetry::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api/v1` route with its role or permission gate. Gates run before
/// extractors, so an unauthorised caller gets 403 without the body being read.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::warehouse::{categories, items, movements, requests};
    use handlers::{
        audit_logs, dashboard, fiches, machines, notifications, personnel, reporting, reports,
        sites, users, vehicles,
    };

    // Sites
    let sites_read = Router::new()
        .route("/sites", get(sites::list_sites))
        .route("/sites/{id}", get(sites::get_site))
        .route("/sites/{id}/summary", get(sites::site_summary))
        .with_auth();
    let sites_create = Router::new()
        .route("/sites", post(sites::create_site))
        .with_permission(perm::SITES_CREATE);
    let sites_update = Router::new()
        .route("/sites/{id}", put(sites::update_site))
        .with_permission(perm::SITES_UPDATE);
    let sites_delete = Router::new()
        .route("/sites/{id}", delete(sites::delete_site))
        .with_permission(perm::SITES_DELETE);

    // Machines
    let machines_read = Router::new()
        .route("/machines", get(machines::list_machines))
        .route("/machines/{id}", get(machines::get_machine))
        .with_auth();
    let machines_write = Router::new()
        .route("/machines", post(machines::create_machine))
        .route(
            "/machines/{id}",
            put(machines::update_machine).delete(machines::delete_machine),
        )
        .route("/machines/{id}/resolve", post(machines::resolve_issue))
        .with_roles(role_sets::MANAGEMENT);
    let machines_issue = Router::new()
        .route("/machines/{id}/issue", post(machines::report_issue))
        .with_roles(role_sets::FIELD_AND_MANAGEMENT);

    // Daily reports
    let reports_read = Router::new()
        .route("/reports", get(reports::list_reports))
        .route("/reports/{id}", get(reports::get_report))
        .with_roles(role_sets::REPORT_READERS);
    let reports_create = Router::new()
        .route("/reports", post(reports::create_report))
        .with_roles(role_sets::FIELD_AND_MANAGEMENT);

    // Fiches
    let fiches_rw = Router::new()
        .route("/fiches", get(fiches::list_fiches).post(fiches::create_fiche))
        .route("/fiches/{id}", get(fiches::get_fiche))
        .with_roles(role_sets::FIELD_AND_MANAGEMENT);
    let fiches_delete = Router::new()
        .route("/fiches/{id}", delete(fiches::delete_fiche))
        .with_permission(perm::RECORDS_DELETE);

    // Personnel and vehicles
    let personnel_read = Router::new()
        .route("/personnel", get(personnel::list_personnel))
        .route("/personnel/attendance", get(personnel::attendance_week))
        .route("/personnel/{id}", get(personnel::get_person))
        .with_roles(role_sets::PERSONNEL_READERS);
    let personnel_write = Router::new()
        .route("/personnel", post(personnel::create_person))
        .route(
            "/personnel/{id}",
            put(personnel::update_person).delete(personnel::delete_person),
        )
        .route(
            "/personnel/{id}/attendance/{date}",
            put(personnel::put_attendance),
        )
        .with_roles(role_sets::MANAGEMENT);
    let vehicles = Router::new()
        .route(
            "/vehicles",
            get(vehicles::list_vehicles).post(vehicles::create_vehicle),
        )
        .route(
            "/vehicles/{id}",
            get(vehicles::get_vehicle)
                .put(vehicles::update_vehicle)
                .delete(vehicles::delete_vehicle),
        )
        .with_roles(role_sets::MANAGEMENT);

    // Warehouse
    let warehouse_read = Router::new()
        .route("/warehouse/categories", get(categories::list_categories))
        .route("/warehouse/categories/{id}", get(categories::get_category))
        .route("/warehouse/items", get(items::list_items))
        .route("/warehouse/items/under-threshold", get(items::under_threshold))
        .route("/warehouse/items/{id}", get(items::get_item))
        .route("/warehouse/items/{id}/balance", get(items::item_balance))
        .route("/warehouse/movements", get(movements::list_movements))
        .with_permission(perm::INVENTORY_READ);
    let warehouse_manage = Router::new()
        .route("/warehouse/categories", post(categories::create_category))
        .route(
            "/warehouse/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route(
            "/warehouse/categories/{id}/toggle",
            post(categories::toggle_category),
        )
        .route(
            "/warehouse/categories/{id}/move",
            post(categories::move_category),
        )
        .route("/warehouse/items", post(items::create_item))
        .route(
            "/warehouse/items/{id}",
            put(items::update_item).delete(items::delete_item),
        )
        .route("/warehouse/items/{id}/stocktake", post(movements::stocktake))
        .route("/warehouse/movements", post(movements::create_movement))
        .route("/warehouse/requests", get(requests::list_requests))
        .route(
            "/warehouse/requests/{id}/approve",
            post(requests::approve_request),
        )
        .route(
            "/warehouse/requests/{id}/fulfil",
            post(requests::fulfil_request),
        )
        .route(
            "/warehouse/requests/{id}/reject",
            post(requests::reject_request),
        )
        .with_permission(perm::INVENTORY_MANAGE);
    let warehouse_request_create = Router::new()
        .route("/warehouse/requests", post(requests::create_request))
        .with_roles(role_sets::FIELD_AND_MANAGEMENT);
    let warehouse_requester = Router::new()
        .route("/warehouse/requests/mine", get(requests::list_my_requests))
        .route("/warehouse/requests/{id}", get(requests::get_request))
        .route(
            "/warehouse/requests/{id}/read",
            post(requests::mark_request_read),
        )
        .with_auth();

    // Notifications
    let notifications_feed = Router::new()
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/poll", get(notifications::poll_notifications))
        .route(
            "/notifications/read-all",
            post(notifications::mark_all_notifications_read),
        )
        .route(
            "/notifications/{id}/read",
            post(notifications::mark_notification_read),
        )
        .with_auth();
    let notifications_send = Router::new()
        .route("/notifications", post(notifications::create_notification))
        .route(
            "/notifications/missing-reports",
            post(notifications::send_missing_report_reminders),
        )
        .with_roles(role_sets::MANAGEMENT);

    // Users
    let users_self = Router::new()
        .route("/users/me", get(users::current_user))
        .with_auth();
    let users_read = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .with_permission(perm::USERS_READ);
    let users_manage = Router::new()
        .route("/users", post(users::create_user))
        .route(
            "/users/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        .with_permission(perm::USERS_MANAGE);

    let audit = Router::new()
        .route("/audit-logs", get(audit_logs::list_audit_logs))
        .with_roles(role_sets::ADMIN_ONLY);
    let dashboard = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .with_auth();

    // Management reports
    let reporting = Router::new()
        .route("/reporting/sites", get(reporting::sites_report))
        .route("/reporting/crew-leaders", get(reporting::crew_leaders_report))
        .route("/reporting/machines", get(reporting::machines_report))
        .route("/reporting/{kind}/export", get(reporting::export_report))
        .with_roles(role_sets::MANAGEMENT);

    Router::new()
        .route("/status", get(api_status))
        .merge(sites_read)
        .merge(sites_create)
        .merge(sites_update)
        .merge(sites_delete)
        .merge(machines_read)
        .merge(machines_write)
        .merge(machines_issue)
        .merge(reports_read)
        .merge(reports_create)
        .merge(fiches_rw)
        .merge(fiches_delete)
        .merge(personnel_read)
        .merge(personnel_write)
        .merge(vehicles)
        .merge(warehouse_read)
        .merge(warehouse_manage)
        .merge(warehouse_request_create)
        .merge(warehouse_requester)
        .merge(notifications_feed)
        .merge(notifications_send)
        .merge(users_self)
        .merge(users_read)
        .merge(users_manage)
        .merge(audit)
        .merge(dashboard)
        .merge(reporting)
}

/// Full application router: API, login, health probes and Swagger UI, with
/// request ids, security headers and HTTP tracing. Deployment layers (CORS,
/// compression, timeouts) are added by the server binary.
pub fn build_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    let health = health::health_routes(state.db.clone());

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .nest("/auth", auth::auth_routes().with_state(auth_service.clone()))
        .nest("/health", health)
        .merge(openapi::swagger_ui())
        .layer(telemetry::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            inject_auth_service,
        ))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

/// Make the auth service reachable from `auth_middleware` in every route group.
async fn inject_auth_service(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(auth_service);
    next.run(request).await
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses(
        (status = 200, description = "Service status", body = ApiResponse<serde_json::Value>)
    ),
    tag = "status"
)]
pub async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(Json(ApiResponse::success(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}
