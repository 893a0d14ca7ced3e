//! Concurrent outbound movements against one item never overdraw it.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use lenta_gestionale::{
    auth::AuthUser,
    entities::{warehouse_movement::MovementType, Role},
    services::warehouse::ledger::NewMovement,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn two_simultaneous_withdrawals_cannot_both_succeed() {
    let app = TestApp::new().await;
    let item_id = app.seed_item("cemento-32", 0, Some(50)).await;
    let withdrawal = json!({ "item_id": item_id, "movement_type": "outbound", "quantity": 30 });

    let (first, second) = tokio::join!(
        app.call(
            Role::Magazzino,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(withdrawal.clone()),
        ),
        app.call(
            Role::Admin,
            Method::POST,
            "/api/v1/warehouse/movements",
            Some(withdrawal.clone()),
        ),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(
        statuses,
        [StatusCode::CREATED, StatusCode::UNPROCESSABLE_ENTITY],
        "{} / {}",
        first.1,
        second.1
    );

    let (_, body) = app
        .call(
            Role::Magazzino,
            Method::GET,
            &format!("/api/v1/warehouse/items/{item_id}/balance"),
            None,
        )
        .await;
    assert_eq!(decimal(&body["data"]["balance"]), dec!(20));
}

#[tokio::test]
async fn many_concurrent_withdrawals_stop_at_zero() {
    let app = TestApp::new().await;
    let item_id = app.seed_item("bulloni-m12", 0, Some(10)).await;
    let user = AuthUser::from(&app.user(Role::Magazzino).model);
    let ledger = app.state.services.ledger.clone();

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let ledger = ledger.clone();
        let user = user.clone();
        tasks.push(tokio::spawn(async move {
            ledger
                .record(
                    &user,
                    NewMovement {
                        item_id,
                        movement_type: MovementType::Outbound,
                        quantity: Decimal::ONE,
                        site_id: None,
                        note: None,
                        request_id: None,
                    },
                )
                .await
                .is_ok()
        }));
    }
    let mut succeeded = 0;
    for task in tasks {
        if task.await.expect("withdrawal task") {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 10, "exactly 10 withdrawals should succeed");

    let balance = ledger.item_balance(item_id).await.expect("balance");
    assert_eq!(balance.balance, Decimal::ZERO);
}
