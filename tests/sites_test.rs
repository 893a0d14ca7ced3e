//! Site registry: crew-leader scoping, validation and the per-site summary.

mod common;

use axum::http::{Method, StatusCode};
use common::{data_id, decimal, TestApp};
use lenta_gestionale::entities::Role;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn crew_leader_only_sees_assigned_sites() {
    let app = TestApp::new().await;
    let own = app.seed_site("Cantiere Lione Nord").await;

    let (status, body) = app
        .call(
            Role::Manager,
            Method::POST,
            "/api/v1/sites",
            Some(json!({ "name": "Cantiere Marsiglia", "code": "MRS-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let foreign = data_id(&body);

    let (status, body) = app
        .call(Role::Caposquadra, Method::GET, "/api/v1/sites", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], json!(own));

    let (_, body) = app.call(Role::Manager, Method::GET, "/api/v1/sites", None).await;
    assert_eq!(body["data"]["total"], 2);

    let (status, _) = app
        .call(
            Role::Caposquadra,
            Method::GET,
            &format!("/api/v1/sites/{foreign}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Role::Caposquadra,
            Method::GET,
            &format!("/api/v1/sites/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/reports",
            Some(json!({ "site_id": foreign, "total_hours": 8, "workers_count": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn new_site_defaults() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Role::Admin,
            Method::POST,
            "/api/v1/sites",
            Some(json!({ "name": "  Cantiere Tolone  ", "address": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["name"], "Cantiere Tolone");
    assert_eq!(body["data"]["country"], "France");
    assert_eq!(body["data"]["status"], "aperto");
    assert_eq!(body["data"]["progress"], 0);
    assert!(body["data"]["address"].is_null());
}

#[tokio::test]
async fn site_validation_errors() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            Role::Admin,
            Method::POST,
            "/api/v1/sites",
            Some(json!({ "name": "Cantiere A", "code": "DUP-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let cases = [
        json!({ "name": "Cantiere B", "code": "DUP-1" }),
        json!({ "name": "Cantiere C", "start_date": "2026-05-10", "end_date": "2026-05-01" }),
        json!({ "name": "Cantiere D", "caposquadra_id": app.user(Role::Manager).id() }),
        json!({ "name": "Cantiere E", "progress": 140 }),
        json!({ "name": "" }),
    ];
    for payload in cases {
        let (status, body) = app
            .call(Role::Admin, Method::POST, "/api/v1/sites", Some(payload.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}: {body}");
    }
}

#[tokio::test]
async fn unassigning_the_crew_leader_with_null() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Metz").await;

    let (status, body) = app
        .call(
            Role::Manager,
            Method::PUT,
            &format!("/api/v1/sites/{site_id}"),
            Some(json!({ "caposquadra_id": null, "progress": 35 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["caposquadra_id"].is_null());
    assert_eq!(body["data"]["progress"], 35);

    let (_, body) = app
        .call(Role::Caposquadra, Method::GET, "/api/v1/sites", None)
        .await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn summary_aggregates_reports_machines_and_stock() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Nancy").await;
    let item_id = app.seed_item("ghiaia", 0, Some(40)).await;

    for hours in ["7.5", "8"] {
        let (status, body) = app
            .call(
                Role::Caposquadra,
                Method::POST,
                "/api/v1/reports",
                Some(json!({ "site_id": site_id, "total_hours": hours, "workers_count": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = app
        .call(
            Role::Manager,
            Method::POST,
            "/api/v1/machines",
            Some(json!({
                "name": "Escavatore CAT 320",
                "machine_type": "escavatore",
                "site_id": site_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let machine_id = data_id(&body);

    let (status, _) = app
        .call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(json!({
                "item_id": item_id,
                "movement_type": "outbound",
                "quantity": 15,
                "site_id": site_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call(
            Role::Caposquadra,
            Method::GET,
            &format!("/api/v1/sites/{site_id}/summary"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let summary = &body["data"];
    assert_eq!(summary["report_count"], 2);
    assert_eq!(decimal(&summary["total_hours"]), dec!(15.5));
    assert_eq!(summary["fiche_count"], 0);
    assert_eq!(summary["machines"][0]["id"], json!(machine_id));
    assert_eq!(summary["outbound_totals"][0]["code"], "ghiaia");
    assert_eq!(decimal(&summary["outbound_totals"][0]["quantity"]), dec!(15));
}

#[tokio::test]
async fn machine_issue_is_raised_by_field_and_cleared_by_management() {
    let app = TestApp::new().await;
    let (_, body) = app
        .call(
            Role::Admin,
            Method::POST,
            "/api/v1/machines",
            Some(json!({ "name": "Autocarro Iveco", "machine_type": "autocarro" })),
        )
        .await;
    let machine_id = data_id(&body);

    let (status, body) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            &format!("/api/v1/machines/{machine_id}/issue"),
            Some(json!({ "message": "Perdita olio idraulico" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["has_issue"], true);

    let (status, _) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            &format!("/api/v1/machines/{machine_id}/resolve"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Role::Manager,
            Method::POST,
            &format!("/api/v1/machines/{machine_id}/resolve"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_issue"], false);
}

#[tokio::test]
async fn huge_page_number_is_clamped() {
    let app = TestApp::new().await;
    app.seed_site("Cantiere Valence").await;

    let (status, body) = app
        .call(
            Role::Admin,
            Method::GET,
            "/api/v1/sites?page=18446744073709551615",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["page"], 100_000);
    assert_eq!(body["data"]["total"], 1);
    assert!(body["data"]["items"].as_array().expect("items").is_empty());
}
