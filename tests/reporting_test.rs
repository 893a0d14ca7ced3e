//! Management reports over a date range and their CSV exports.

mod common;

use axum::{
    body,
    http::{header, Method, StatusCode},
};
use common::{data_id, decimal, TestApp};
use lenta_gestionale::entities::Role;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

const JUNE: &str = "from=2025-06-01&to=2025-06-30";

async fn file_report(app: &TestApp, site_id: Uuid, date: &str, hours: &str) {
    let (status, body) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/reports",
            Some(json!({
                "site_id": site_id,
                "date": date,
                "total_hours": hours,
                "workers_count": 3,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

async fn file_fiche(app: &TestApp, site_id: Uuid, machine_id: Uuid, date: &str, kind: &str) {
    let (status, body) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/fiches",
            Some(json!({
                "site_id": site_id,
                "machine_id": machine_id,
                "date": date,
                "fiche_type": kind,
                "description": "Lavorazione",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

async fn create_machine(app: &TestApp, payload: Value) -> Uuid {
    let (status, body) = app
        .call(Role::Manager, Method::POST, "/api/v1/machines", Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    data_id(&body)
}

fn row_for<'a>(body: &'a Value, key: &str, id: Uuid) -> &'a Value {
    body["data"]["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .find(|row| row[key] == json!(id))
        .unwrap_or_else(|| panic!("no row for {id}: {body}"))
}

#[tokio::test]
async fn site_report_sums_hours_inside_the_period() {
    let app = TestApp::new().await;
    let busy = app.seed_site("Cantiere Arles").await;
    let idle = app.seed_site("Cantiere Béziers").await;

    file_report(&app, busy, "2025-06-02", "8").await;
    file_report(&app, busy, "2025-06-03", "7.5").await;
    file_report(&app, busy, "2025-05-30", "10").await;

    let (status, body) = app
        .call(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/reporting/sites?{JUNE}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["period"]["from"], "2025-06-01");
    assert_eq!(body["data"]["period"]["to"], "2025-06-30");

    let rows = body["data"]["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["site_name"], "Cantiere Arles");

    let busy_row = row_for(&body, "site_id", busy);
    assert_eq!(decimal(&busy_row["total_hours"]), dec!(15.5));
    assert_eq!(busy_row["reports_count"], 2);
    let idle_row = row_for(&body, "site_id", idle);
    assert_eq!(decimal(&idle_row["total_hours"]), dec!(0));
    assert_eq!(idle_row["reports_count"], 0);
}

#[tokio::test]
async fn reversed_dates_are_swapped() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Sète").await;
    file_report(&app, site_id, "2025-06-10", "6").await;

    let (status, body) = app
        .call(
            Role::Admin,
            Method::GET,
            "/api/v1/reporting/sites?from=2025-06-30&to=2025-06-01",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["period"]["from"], "2025-06-01");
    assert_eq!(decimal(&row_for(&body, "site_id", site_id)["total_hours"]), dec!(6));
}

#[tokio::test]
async fn crew_leader_report_counts_sites_and_own_reports() {
    let app = TestApp::new().await;
    let leader = app.user(Role::Caposquadra).id();
    let site_id = app.seed_site("Cantiere Alès").await;
    app.seed_site("Cantiere Uzès").await;
    let spare = app.add_user("capo2@lenta-france.fr", Role::Caposquadra, false).await;

    file_report(&app, site_id, "2025-06-12", "9").await;

    let (status, body) = app
        .call(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/reporting/crew-leaders?{JUNE}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["rows"].as_array().expect("rows").len(), 2);

    let row = row_for(&body, "user_id", leader);
    assert_eq!(row["active_sites"], 2);
    assert_eq!(row["reports_count"], 1);
    assert_eq!(decimal(&row["total_hours"]), dec!(9));

    let idle = row_for(&body, "user_id", spare.id());
    assert_eq!(idle["active_sites"], 0);
    assert_eq!(idle["reports_count"], 0);
}

#[tokio::test]
async fn machine_report_counts_distinct_days_and_downtime() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Orange").await;
    let drill = create_machine(
        &app,
        json!({ "name": "Trivella SR-45", "code": "TR45", "site_id": site_id }),
    )
    .await;
    let unused = create_machine(&app, json!({ "name": "Autogru" })).await;

    file_fiche(&app, site_id, drill, "2025-06-04", "produzione").await;
    file_fiche(&app, site_id, drill, "2025-06-04", "controllo").await;
    file_fiche(&app, site_id, drill, "2025-06-05", "fermo_macchina").await;
    file_fiche(&app, site_id, drill, "2025-07-01", "fermo_macchina").await;

    let (status, body) = app
        .call(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/reporting/machines?{JUNE}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let row = row_for(&body, "machine_id", drill);
    assert_eq!(row["machine_code"], "TR45");
    assert_eq!(row["usage_days"], 2);
    assert_eq!(row["downtime_count"], 2);

    let idle = row_for(&body, "machine_id", unused);
    assert_eq!(idle["usage_days"], 0);
    assert_eq!(idle["downtime_count"], 0);
}

#[tokio::test]
async fn csv_export_is_an_attachment() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Nîmes, lotto 2").await;
    file_report(&app, site_id, "2025-06-02", "8").await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/reporting/sites/export?{JUNE}"),
            None,
            Some(app.token(Role::Manager)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .expect("content type")
        .starts_with("text/csv"));
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report_cantieri_20250601_20250630.csv\""
    );

    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("csv body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf-8 csv");
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("site_name,site_code,site_status,total_hours,reports_count")
    );
    assert_eq!(lines.next(), Some("\"Cantiere Nîmes, lotto 2\",,aperto,8,1"));
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn crew_leader_export_uses_its_own_file_name() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            "/api/v1/reporting/crew-leaders/export?from=2025-01-01&to=2025-01-31",
            None,
            Some(app.token(Role::Admin)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report_caposquadra_20250101_20250131.csv\""
    );
}

#[tokio::test]
async fn unknown_kind_or_preset_is_a_bad_request() {
    let app = TestApp::new().await;
    let (status, _) = app
        .call(Role::Manager, Method::GET, "/api/v1/reporting/vehicles/export", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Role::Manager,
            Method::GET,
            "/api/v1/reporting/sites?preset=last_year",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reports_are_limited_to_management() {
    let app = TestApp::new().await;
    for role in [Role::Caposquadra, Role::Magazzino, Role::Contabilita, Role::Hr] {
        for uri in [
            "/api/v1/reporting/sites",
            "/api/v1/reporting/crew-leaders",
            "/api/v1/reporting/machines/export",
        ] {
            let (status, _) = app.call(role, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{role} on {uri}");
        }
    }
    let (status, _) = app
        .call(Role::Manager, Method::GET, "/api/v1/reporting/machines", None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
