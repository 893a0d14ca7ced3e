//! Warehouse category management: slugs, ordering moves, toggling and
//! the delete guard.

mod common;

use axum::http::{Method, StatusCode};
use common::{data_id, TestApp};
use lenta_gestionale::entities::Role;
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_category(app: &TestApp, name: &str) -> Value {
    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/categories",
            Some(json!({ "name": name })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn category_names(app: &TestApp) -> Vec<String> {
    let (status, body) = app
        .call(Role::Magazzino, Method::GET, "/api/v1/warehouse/categories", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|c| c["name"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn slugs_are_derived_and_deduplicated() {
    let app = TestApp::new().await;

    let first = create_category(&app, "Ferramenta & Bulloni").await;
    assert_eq!(first["data"]["slug"], "ferramenta-bulloni");

    let second = create_category(&app, "Ferramenta Bulloni").await;
    assert_eq!(second["data"]["slug"], "ferramenta-bulloni-2");

    let (status, _) = app
        .call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/categories",
            Some(json!({ "name": "ferramenta & bulloni" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn accented_names_keep_their_letters() {
    let app = TestApp::new().await;

    let body = create_category(&app, "Città").await;
    assert_eq!(body["data"]["slug"], "città");

    let body = create_category(&app, "Attrezzatura élettrica").await;
    assert_eq!(body["data"]["slug"], "attrezzatura-élettrica");

    let body = create_category(&app, "Éé").await;
    assert_eq!(body["data"]["slug"], "éé");
}

#[tokio::test]
async fn rename_rederives_the_slug() {
    let app = TestApp::new().await;
    let id = data_id(&create_category(&app, "DPI").await);

    let (status, body) = app
        .call(
            Role::Admin,
            Method::PUT,
            &format!("/api/v1/warehouse/categories/{id}"),
            Some(json!({ "name": "DPI e Sicurezza" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["slug"], "dpi-e-sicurezza");
}

#[tokio::test]
async fn move_swaps_with_the_neighbour() {
    let app = TestApp::new().await;
    create_category(&app, "Cementi").await;
    create_category(&app, "Ferri").await;
    let third = data_id(&create_category(&app, "Tubi").await);
    assert_eq!(category_names(&app).await, ["Cementi", "Ferri", "Tubi"]);

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::POST,
            &format!("/api/v1/warehouse/categories/{third}/move"),
            Some(json!({ "direction": "up" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(category_names(&app).await, ["Cementi", "Tubi", "Ferri"]);

    // moving past the end leaves the order untouched
    for _ in 0..3 {
        let (status, _) = app
            .call(
                Role::Magazzino,
                Method::POST,
                &format!("/api/v1/warehouse/categories/{third}/move"),
                Some(json!({ "direction": "down" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(category_names(&app).await, ["Cementi", "Ferri", "Tubi"]);
}

#[tokio::test]
async fn toggle_hides_category_from_active_filter() {
    let app = TestApp::new().await;
    let id = data_id(&create_category(&app, "Legname").await);

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::POST,
            &format!("/api/v1/warehouse/categories/{id}/toggle"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (_, body) = app
        .call(
            Role::Magazzino,
            Method::GET,
            "/api/v1/warehouse/categories?active=true",
            None,
        )
        .await;
    assert!(body["data"].as_array().expect("array").is_empty());
}

#[tokio::test]
async fn delete_is_refused_while_items_reference_the_category() {
    let app = TestApp::new().await;
    let id = data_id(&create_category(&app, "Bulloneria").await);

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/items",
            Some(json!({ "code": "dado-m10", "name": "Dado M10", "category_id": id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let uri = format!("/api/v1/warehouse/categories/{id}");
    let (status, _) = app.call(Role::Magazzino, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let empty = data_id(&create_category(&app, "Vuota").await);
    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::DELETE,
            &format!("/api/v1/warehouse/categories/{empty}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (status, _) = app
        .call(
            Role::Magazzino,
            Method::GET,
            &format!("/api/v1/warehouse/categories/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
