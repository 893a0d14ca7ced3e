use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Registers the bearer scheme and applies it to every operation.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lenta Gestionale API",
        version = "0.3.0",
        description = r#"
# Lenta France Gestionale

Back office for construction sites (cantieri): site registry, machines,
daily reports (rapportini), stratigraphy fiches, personnel, vehicles, the
warehouse (magazzino) ledger and withdrawal requests, and in-app
notifications.

## Authentication

Obtain a token from `POST /auth/login` and send it on every request:

```
Authorization: Bearer <access_token>
```

Access is role based (admin, manager, caposquadra, magazzino, contabilita,
hr). Crew leaders only see the sites assigned to them.

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, max 100)
and answer with `items`, `total`, `page`, `limit` and `total_pages`.

## Stock

Item quantities are never stored. The balance of an item is the sum of its
signed movements; movements are append-only.
        "#,
        license(name = "Proprietary")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&BearerAuth),
    security(("bearer_auth" = [])),
    tags(
        (name = "auth", description = "Login"),
        (name = "status", description = "Service status"),
        (name = "sites", description = "Construction sites"),
        (name = "machines", description = "Machines and issue reports"),
        (name = "reports", description = "Daily site reports"),
        (name = "fiches", description = "Stratigraphy fiches"),
        (name = "personnel", description = "Personnel registry"),
        (name = "vehicles", description = "Company vehicles"),
        (name = "warehouse", description = "Categories, items, stock ledger and requests"),
        (name = "notifications", description = "In-app notifications"),
        (name = "users", description = "User accounts"),
        (name = "audit", description = "Audit trail"),
        (name = "dashboard", description = "Landing page counters"),
        (name = "reporting", description = "Management reports and CSV exports")
    ),
    paths(
        crate::auth::login_handler,
        crate::api_status,

        crate::handlers::sites::list_sites,
        crate::handlers::sites::get_site,
        crate::handlers::sites::site_summary,
        crate::handlers::sites::create_site,
        crate::handlers::sites::update_site,
        crate::handlers::sites::delete_site,

        crate::handlers::machines::list_machines,
        crate::handlers::machines::get_machine,
        crate::handlers::machines::create_machine,
        crate::handlers::machines::update_machine,
        crate::handlers::machines::delete_machine,
        crate::handlers::machines::report_issue,
        crate::handlers::machines::resolve_issue,

        crate::handlers::reports::list_reports,
        crate::handlers::reports::get_report,
        crate::handlers::reports::create_report,

        crate::handlers::fiches::list_fiches,
        crate::handlers::fiches::get_fiche,
        crate::handlers::fiches::create_fiche,
        crate::handlers::fiches::delete_fiche,

        crate::handlers::personnel::list_personnel,
        crate::handlers::personnel::get_person,
        crate::handlers::personnel::create_person,
        crate::handlers::personnel::update_person,
        crate::handlers::personnel::delete_person,
        crate::handlers::personnel::attendance_week,
        crate::handlers::personnel::put_attendance,

        crate::handlers::vehicles::list_vehicles,
        crate::handlers::vehicles::get_vehicle,
        crate::handlers::vehicles::create_vehicle,
        crate::handlers::vehicles::update_vehicle,
        crate::handlers::vehicles::delete_vehicle,

        crate::handlers::warehouse::categories::list_categories,
        crate::handlers::warehouse::categories::get_category,
        crate::handlers::warehouse::categories::create_category,
        crate::handlers::warehouse::categories::update_category,
        crate::handlers::warehouse::categories::toggle_category,
        crate::handlers::warehouse::categories::move_category,
        crate::handlers::warehouse::categories::delete_category,
        crate::handlers::warehouse::items::list_items,
        crate::handlers::warehouse::items::get_item,
        crate::handlers::warehouse::items::create_item,
        crate::handlers::warehouse::items::update_item,
        crate::handlers::warehouse::items::delete_item,
        crate::handlers::warehouse::items::item_balance,
        crate::handlers::warehouse::items::under_threshold,
        crate::handlers::warehouse::movements::list_movements,
        crate::handlers::warehouse::movements::create_movement,
        crate::handlers::warehouse::movements::stocktake,
        crate::handlers::warehouse::requests::create_request,
        crate::handlers::warehouse::requests::list_my_requests,
        crate::handlers::warehouse::requests::list_requests,
        crate::handlers::warehouse::requests::get_request,
        crate::handlers::warehouse::requests::approve_request,
        crate::handlers::warehouse::requests::fulfil_request,
        crate::handlers::warehouse::requests::reject_request,
        crate::handlers::warehouse::requests::mark_request_read,

        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::poll_notifications,
        crate::handlers::notifications::mark_notification_read,
        crate::handlers::notifications::mark_all_notifications_read,
        crate::handlers::notifications::create_notification,
        crate::handlers::notifications::send_missing_report_reminders,

        crate::handlers::users::current_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,

        crate::handlers::audit_logs::list_audit_logs,
        crate::handlers::dashboard::dashboard,

        crate::handlers::reporting::sites_report,
        crate::handlers::reporting::crew_leaders_report,
        crate::handlers::reporting::machines_report,
        crate::handlers::reporting::export_report,
    ),
    components(
        schemas(
            crate::auth::LoginCredentials,
            crate::auth::TokenResponse,
            crate::entities::Role,
            crate::entities::site::SiteStatus,
            crate::entities::machine::MachineType,
            crate::entities::machine::MachineStatus,
            crate::entities::fiche::FicheType,
            crate::entities::personnel_attendance::AttendanceStatus,
            crate::entities::warehouse_movement::MovementType,
            crate::entities::warehouse_request::RequestStatus,
            crate::services::warehouse::categories::MoveDirection,
            crate::services::warehouse::ledger::ItemBalance,
            crate::services::warehouse::ledger::SiteOutboundTotal,
            crate::services::warehouse::ledger::OutboundTotal,
            crate::services::warehouse::requests::RequestLineView,
            crate::services::dashboard::DashboardSummary,
            crate::services::reporting::ReportKind,
            crate::services::reporting::ReportPreset,
            crate::services::reporting::ReportPeriod,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_resource() {
        let json = ApiDocV1::openapi().to_json().unwrap();
        assert!(json.contains("Lenta Gestionale API"));
        assert!(json.contains("bearer_auth"));
        for path in [
            "/auth/login",
            "/api/v1/sites/{id}/summary",
            "/api/v1/machines/{id}/issue",
            "/api/v1/warehouse/items/under-threshold",
            "/api/v1/warehouse/requests/{id}/fulfil",
            "/api/v1/notifications/poll",
            "/api/v1/audit-logs",
            "/api/v1/reporting/{kind}/export",
            "/api/v1/personnel/{id}/attendance/{date}",
        ] {
            assert!(json.contains(path), "missing {path}");
        }
    }
}
