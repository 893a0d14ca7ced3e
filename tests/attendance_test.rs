//! Weekly attendance sheet: one entry per person and day.

mod common;

use axum::http::{Method, StatusCode};
use common::{data_id, decimal, TestApp};
use lenta_gestionale::entities::Role;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

async fn hire(app: &TestApp, first: &str, last: &str) -> Uuid {
    let (status, body) = app
        .call(
            Role::Manager,
            Method::POST,
            "/api/v1/personnel",
            Some(json!({ "first_name": first, "last_name": last })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    data_id(&body)
}

#[tokio::test]
async fn second_write_for_the_same_day_replaces_the_first() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Lunel").await;
    let person = hire(&app, "Marco", "Bianchi").await;
    let uri = format!("/api/v1/personnel/{person}/attendance/2025-06-04");

    let (status, body) = app
        .call(
            Role::Manager,
            Method::PUT,
            &uri,
            Some(json!({ "status": "presente", "site_id": site_id, "hours": "8" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let first_id = data_id(&body);

    let (status, body) = app
        .call(
            Role::Manager,
            Method::PUT,
            &uri,
            Some(json!({ "status": "malattia", "note": "  certificato  " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(data_id(&body), first_id);
    assert_eq!(body["data"]["status"], "malattia");
    assert_eq!(body["data"]["site_id"], json!(null));
    assert_eq!(body["data"]["note"], "certificato");

    let (status, body) = app
        .call(
            Role::Hr,
            Method::GET,
            "/api/v1/personnel/attendance?week_of=2025-06-04",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["entries"].as_array().expect("entries").len(), 1);
}

#[tokio::test]
async fn week_runs_monday_to_sunday_and_filters_by_person() {
    let app = TestApp::new().await;
    let anna = hire(&app, "Anna", "Rossi").await;
    let paolo = hire(&app, "Paolo", "Verdi").await;

    for (person, day, hours) in [
        (anna, "2025-06-01", "8"),
        (anna, "2025-06-02", "8"),
        (anna, "2025-06-08", "4"),
        (paolo, "2025-06-03", "7.5"),
        (anna, "2025-06-09", "8"),
    ] {
        let (status, body) = app
            .call(
                Role::Admin,
                Method::PUT,
                &format!("/api/v1/personnel/{person}/attendance/{day}"),
                Some(json!({ "status": "presente", "hours": hours })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, body) = app
        .call(
            Role::Manager,
            Method::GET,
            "/api/v1/personnel/attendance?week_of=2025-06-05",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["week_start"], "2025-06-02");
    assert_eq!(body["data"]["week_end"], "2025-06-08");
    let entries = body["data"]["entries"].as_array().expect("entries");
    let dates: Vec<&str> = entries.iter().filter_map(|e| e["date"].as_str()).collect();
    assert_eq!(dates, ["2025-06-02", "2025-06-03", "2025-06-08"]);

    let (_, body) = app
        .call(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/personnel/attendance?week_of=2025-06-05&personnel_id={paolo}"),
            None,
        )
        .await;
    let entries = body["data"]["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(decimal(&entries[0]["hours"]), dec!(7.5));
}

#[tokio::test]
async fn unknown_person_site_or_bad_hours_are_rejected() {
    let app = TestApp::new().await;
    let person = hire(&app, "Giulia", "Neri").await;

    let (status, _) = app
        .call(
            Role::Manager,
            Method::PUT,
            &format!("/api/v1/personnel/{}/attendance/2025-06-04", Uuid::new_v4()),
            Some(json!({ "status": "presente" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/personnel/{person}/attendance/2025-06-04");
    let (status, _) = app
        .call(
            Role::Manager,
            Method::PUT,
            &uri,
            Some(json!({ "status": "presente", "site_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Role::Manager,
            Method::PUT,
            &uri,
            Some(json!({ "status": "presente", "hours": "25" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .call(
            Role::Manager,
            Method::GET,
            "/api/v1/personnel/attendance?week_of=2025-06-04",
            None,
        )
        .await;
    assert!(body["data"]["entries"].as_array().expect("entries").is_empty());
}

#[tokio::test]
async fn hr_reads_but_does_not_write_attendance() {
    let app = TestApp::new().await;
    let person = hire(&app, "Elena", "Galli").await;

    let (status, _) = app
        .call(
            Role::Hr,
            Method::PUT,
            &format!("/api/v1/personnel/{person}/attendance/2025-06-04"),
            Some(json!({ "status": "ferie" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Role::Caposquadra, Method::GET, "/api/v1/personnel/attendance", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .call(Role::Hr, Method::GET, "/api/v1/personnel/attendance", None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
