//! Role gates on every route group: who may read, who may write, and what
//! an anonymous caller gets.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use lenta_gestionale::entities::Role;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case::sites_admin(Role::Admin, "/api/v1/sites", StatusCode::OK)]
#[case::sites_caposquadra(Role::Caposquadra, "/api/v1/sites", StatusCode::OK)]
#[case::sites_hr(Role::Hr, "/api/v1/sites", StatusCode::OK)]
#[case::items_manager(Role::Manager, "/api/v1/warehouse/items", StatusCode::OK)]
#[case::items_magazzino(Role::Magazzino, "/api/v1/warehouse/items", StatusCode::OK)]
#[case::items_caposquadra(Role::Caposquadra, "/api/v1/warehouse/items", StatusCode::FORBIDDEN)]
#[case::items_contabilita(Role::Contabilita, "/api/v1/warehouse/items", StatusCode::FORBIDDEN)]
#[case::reports_contabilita(Role::Contabilita, "/api/v1/reports", StatusCode::OK)]
#[case::reports_caposquadra(Role::Caposquadra, "/api/v1/reports", StatusCode::OK)]
#[case::reports_magazzino(Role::Magazzino, "/api/v1/reports", StatusCode::FORBIDDEN)]
#[case::personnel_hr(Role::Hr, "/api/v1/personnel", StatusCode::OK)]
#[case::personnel_caposquadra(Role::Caposquadra, "/api/v1/personnel", StatusCode::FORBIDDEN)]
#[case::vehicles_manager(Role::Manager, "/api/v1/vehicles", StatusCode::OK)]
#[case::vehicles_hr(Role::Hr, "/api/v1/vehicles", StatusCode::FORBIDDEN)]
#[case::users_hr(Role::Hr, "/api/v1/users", StatusCode::OK)]
#[case::users_caposquadra(Role::Caposquadra, "/api/v1/users", StatusCode::FORBIDDEN)]
#[case::audit_admin(Role::Admin, "/api/v1/audit-logs", StatusCode::OK)]
#[case::audit_manager(Role::Manager, "/api/v1/audit-logs", StatusCode::FORBIDDEN)]
#[case::requests_magazzino(Role::Magazzino, "/api/v1/warehouse/requests", StatusCode::OK)]
#[case::requests_manager(Role::Manager, "/api/v1/warehouse/requests", StatusCode::FORBIDDEN)]
#[case::my_requests(Role::Caposquadra, "/api/v1/warehouse/requests/mine", StatusCode::OK)]
#[case::dashboard_caposquadra(Role::Caposquadra, "/api/v1/dashboard", StatusCode::OK)]
#[tokio::test]
async fn read_access_by_role(#[case] role: Role, #[case] uri: &str, #[case] expected: StatusCode) {
    let app = TestApp::new().await;
    let (status, body) = app.call(role, Method::GET, uri, None).await;
    assert_eq!(status, expected, "{role} GET {uri}: {body}");
}

#[rstest]
#[case("/api/v1/sites")]
#[case("/api/v1/warehouse/items")]
#[case("/api/v1/notifications")]
#[case("/api/v1/users/me")]
#[tokio::test]
async fn missing_token_is_unauthorized(#[case] uri: &str) {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, uri, None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_MISSING");
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/v1/sites", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_endpoint_is_public() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn only_admin_deletes_sites() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Annecy").await;
    let uri = format!("/api/v1/sites/{site_id}");

    let (status, _) = app.call(Role::Manager, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(Role::Admin, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn crew_leader_cannot_create_sites_or_machines() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/sites",
            Some(json!({ "name": "Cantiere abusivo" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/machines",
            Some(json!({ "name": "Escavatore", "machine_type": "escavatore" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn crew_leader_is_refused_before_the_movement_body_is_read() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(json!({ "garbage": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, _) = app
        .call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(json!({ "garbage": true })),
        )
        .await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn warehouse_manager_flag_grants_stock_movements() {
    let app = TestApp::new().await;
    let item_id = app.seed_item("sabbia-fine", 0, None).await;
    let movement = json!({ "item_id": item_id, "movement_type": "inbound", "quantity": 12 });

    let (status, _) = app
        .call(
            Role::Manager,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(movement.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let keeper = app
        .add_user("capomagazzino@lenta-france.fr", Role::Manager, true)
        .await;
    let (status, body) = app
        .call_as(
            &keeper.token,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(movement),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn audit_log_records_site_creation() {
    let app = TestApp::new().await;
    app.seed_site("Cantiere Chambéry").await;

    let (status, body) = app
        .call(Role::Admin, Method::GET, "/api/v1/audit-logs", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"]["items"].as_array().expect("paginated items");
    let admin_id = json!(app.user(Role::Admin).id());
    assert!(entries
        .iter()
        .any(|entry| entry["target_type"] == "site" && entry["user_id"] == admin_id));
}
