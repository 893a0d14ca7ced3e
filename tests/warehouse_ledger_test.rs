//! Stock ledger behaviour through the HTTP API: balances are the sum of
//! signed movements, outbound movements cannot overdraw an item and
//! stocktakes book the difference as one adjustment.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{decimal, TestApp};
use lenta_gestionale::entities::Role;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn balance_is_sum_of_movements_and_flags_threshold() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Lione Nord").await;
    let item_id = app.seed_item("bolt-001", 10, None).await;

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(json!({ "item_id": item_id, "movement_type": "inbound", "quantity": 50 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(decimal(&body["data"]["quantity"]), dec!(50));

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(json!({
                "item_id": item_id,
                "movement_type": "outbound",
                "quantity": 45,
                "site_id": site_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(decimal(&body["data"]["quantity"]), dec!(-45));

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::GET,
            &format!("/api/v1/warehouse/items/{item_id}/balance"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["balance"]), dec!(5));
    assert_eq!(body["data"]["under_threshold"], true);

    let (status, body) = app
        .call(
            Role::Manager,
            Method::GET,
            "/api/v1/warehouse/items/under-threshold",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = body["data"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|row| row["code"].as_str())
        .collect();
    assert_eq!(codes, vec!["bolt-001"]);
}

#[tokio::test]
async fn outbound_beyond_balance_is_rejected_and_not_recorded() {
    let app = TestApp::new().await;
    let item_id = app.seed_item("tassello-8", 0, Some(3)).await;

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(json!({ "item_id": item_id, "movement_type": "outbound", "quantity": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (_, body) = app
        .call(
            Role::Magazzino,
            Method::GET,
            &format!("/api/v1/warehouse/items/{item_id}"),
            None,
        )
        .await;
    assert_eq!(decimal(&body["data"]["balance"]), dec!(3));

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::GET,
            &format!("/api/v1/warehouse/movements?item_id={item_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["movements"]["total"], 1);
}

#[tokio::test]
async fn zero_quantity_movement_is_a_validation_error() {
    let app = TestApp::new().await;
    let item_id = app.seed_item("guanti-l", 0, None).await;

    let (status, _) = app
        .call(
            Role::Admin,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(json!({ "item_id": item_id, "movement_type": "inbound", "quantity": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stocktake_books_the_difference_once() {
    let app = TestApp::new().await;
    let item_id = app.seed_item("cemento-25kg", 5, Some(20)).await;
    let uri = format!("/api/v1/warehouse/items/{item_id}/stocktake");

    let (status, body) = app
        .call(Role::Magazzino, Method::POST, &uri, Some(json!({ "counted": 17 })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["movement_type"], "adjustment");
    assert_eq!(decimal(&body["data"]["quantity"]), dec!(-3));

    let (status, body) = app
        .call(Role::Magazzino, Method::POST, &uri, Some(json!({ "counted": 17 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());

    let (status, _) = app
        .call(Role::Magazzino, Method::POST, &uri, Some(json!({ "counted": -1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn movement_list_totals_outbound_per_site() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Grenoble").await;
    let item_id = app.seed_item("rete-elettrosaldata", 0, Some(30)).await;

    for quantity in [4, 6] {
        let (status, body) = app
            .call(
                Role::Admin,
                Method::POST,
                "/api/v1/warehouse/movements",
                Some(json!({
                    "item_id": item_id,
                    "movement_type": "outbound",
                    "quantity": quantity,
                    "site_id": site_id,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = app
        .call(
            Role::Admin,
            Method::GET,
            &format!("/api/v1/warehouse/movements?site_id={site_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["movements"]["total"], 2);
    let per_site = body["data"]["outbound_by_site"].as_array().expect("array");
    assert_eq!(per_site.len(), 1);
    assert_eq!(per_site[0]["site_name"], "Cantiere Grenoble");
    assert_eq!(decimal(&per_site[0]["quantity"]), dec!(10));
}

#[tokio::test]
async fn duplicate_item_code_is_rejected() {
    let app = TestApp::new().await;
    app.seed_item("vite-m6", 0, None).await;

    let (status, _) = app
        .call(
            Role::Admin,
            Method::POST,
            "/api/v1/warehouse/items",
            Some(json!({ "code": "vite-m6", "name": "Vite M6 bis" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn huge_page_on_filtered_item_list_is_empty_not_a_crash() {
    let app = TestApp::new().await;
    app.seed_item("chiodi-50", 10, Some(2)).await;

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::GET,
            "/api/v1/warehouse/items?page=18446744073709551615&under_threshold=true",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total"], 1);
    assert!(body["data"]["items"].as_array().expect("items").is_empty());
}

#[tokio::test]
async fn movement_for_unknown_item_is_not_found_and_not_recorded() {
    let app = TestApp::new().await;
    let item_id = app.seed_item("rete-elettrosaldata", 0, Some(5)).await;

    let (status, body) = app
        .call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(json!({ "item_id": Uuid::new_v4(), "movement_type": "inbound", "quantity": 7 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, body) = app
        .call(Role::Magazzino, Method::GET, "/api/v1/warehouse/movements", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["movements"]["total"], 1);

    let (_, body) = app
        .call(
            Role::Magazzino,
            Method::GET,
            &format!("/api/v1/warehouse/items/{item_id}"),
            None,
        )
        .await;
    assert_eq!(decimal(&body["data"]["balance"]), dec!(5));
}

#[tokio::test]
async fn movement_date_filter_is_inclusive_of_both_days() {
    let app = TestApp::new().await;
    let item_id = app.seed_item("ghiaietto", 0, Some(9)).await;
    let today = Utc::now().date_naive();
    let tomorrow = today.succ_opt().expect("tomorrow");
    let yesterday = today.pred_opt().expect("yesterday");

    for (from, to, expected) in [
        (today, today, 1),
        (yesterday, today, 1),
        (tomorrow, tomorrow, 0),
        (yesterday, yesterday, 0),
    ] {
        let (status, body) = app
            .call(
                Role::Magazzino,
                Method::GET,
                &format!("/api/v1/warehouse/movements?item_id={item_id}&from={from}&to={to}"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["movements"]["total"], expected, "{from}..{to}");
    }
}
