//! Fiches with stratigraphy layers, personnel and the vehicle fleet.

mod common;

use axum::http::{Method, StatusCode};
use common::{data_id, decimal, TestApp};
use lenta_gestionale::entities::Role;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn fiche_layers_are_stored_by_depth() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Avignone").await;

    let (status, body) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/fiches",
            Some(json!({
                "site_id": site_id,
                "fiche_type": "produzione",
                "description": "Micropalo B12",
                "total_depth_m": "12",
                "layers": [
                    { "from_m": "4", "to_m": "12", "description": "Argilla compatta" },
                    { "from_m": "0", "to_m": "4", "description": "Riporto" },
                ],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let fiche_id = data_id(&body);

    let (status, body) = app
        .call(
            Role::Manager,
            Method::GET,
            &format!("/api/v1/fiches/{fiche_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let layers = body["data"]["layers"].as_array().expect("layers");
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0]["description"], "Riporto");
    assert_eq!(decimal(&layers[1]["from_m"]), dec!(4));
}

#[tokio::test]
async fn overlapping_layers_are_rejected() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Montpellier").await;

    let (status, body) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/fiches",
            Some(json!({
                "site_id": site_id,
                "fiche_type": "controllo",
                "description": "Sondaggio S1",
                "layers": [
                    { "from_m": "0", "to_m": "5", "description": "Sabbia" },
                    { "from_m": "3", "to_m": "8", "description": "Limo" },
                ],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (_, body) = app
        .call(Role::Caposquadra, Method::GET, "/api/v1/fiches", None)
        .await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn only_admin_deletes_fiches() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Perpignan").await;
    let (_, body) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/fiches",
            Some(json!({
                "site_id": site_id,
                "fiche_type": "altro",
                "description": "Pulizia area",
            })),
        )
        .await;
    let uri = format!("/api/v1/fiches/{}", data_id(&body));

    let (status, _) = app.call(Role::Manager, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.call(Role::Admin, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);
    let (status, _) = app.call(Role::Admin, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn person_with_a_vehicle_cannot_be_deactivated() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Role::Manager,
            Method::POST,
            "/api/v1/personnel",
            Some(json!({ "first_name": "Luca", "last_name": "Ferri", "role": "Gruista" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let person_id = data_id(&body);

    let (status, body) = app
        .call(
            Role::Manager,
            Method::POST,
            "/api/v1/vehicles",
            Some(json!({
                "brand": "Fiat",
                "model": "Ducato",
                "plate": "GH-123-KL",
                "assigned_to": person_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let vehicle_id = data_id(&body);

    let person_uri = format!("/api/v1/personnel/{person_id}");
    let (status, _) = app.call(Role::Admin, Method::DELETE, &person_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(
            Role::Manager,
            Method::POST,
            "/api/v1/vehicles",
            Some(json!({ "brand": "Iveco", "model": "Daily", "plate": "GH-123-KL" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = app
        .call(
            Role::Manager,
            Method::DELETE,
            &format!("/api/v1/vehicles/{vehicle_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.call(Role::Admin, Method::DELETE, &person_uri, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["active"], false);

    let (status, body) = app
        .call(Role::Hr, Method::GET, &person_uri, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["last_name"], "Ferri");
}
