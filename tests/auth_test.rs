//! Login, token use and account administration.

mod common;

use axum::http::{Method, StatusCode};
use common::{data_id, response_json, TestApp, TEST_PASSWORD};
use lenta_gestionale::entities::Role;
use serde_json::json;

#[tokio::test]
async fn login_issues_a_usable_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "Manager@Lenta-France.fr", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_in"].as_i64().unwrap_or_default() > 0);
    let token = body["access_token"].as_str().expect("access token").to_string();

    let (status, body) = app.call_as(&token, Method::GET, "/api/v1/users/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "manager@lenta-france.fr");
    assert_eq!(body["data"]["role"], "manager");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new().await;

    for credentials in [
        json!({ "email": "admin@lenta-france.fr", "password": "sbagliata" }),
        json!({ "email": "nessuno@lenta-france.fr", "password": TEST_PASSWORD }),
        json!({ "email": "not-an-email", "password": TEST_PASSWORD }),
    ] {
        let response = app
            .request(Method::POST, "/auth/login", Some(credentials), None)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response_json(response).await;
        assert_eq!(body["error"]["code"], "AUTH_INVALID_CREDENTIALS");
    }
}

#[tokio::test]
async fn deactivated_account_loses_access() {
    let app = TestApp::new().await;
    let worker = app
        .add_user("capo.temporaneo@lenta-france.fr", Role::Caposquadra, false)
        .await;

    let (status, body) = app
        .call(
            Role::Admin,
            Method::DELETE,
            &format!("/api/v1/users/{}", worker.id()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_active"], false);

    let response = app
        .request(Method::GET, "/api/v1/sites", None, Some(&worker.token))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "capo.temporaneo@lenta-france.fr", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_INACTIVE_USER");
}

#[tokio::test]
async fn admin_cannot_deactivate_themselves() {
    let app = TestApp::new().await;
    let admin_id = app.user(Role::Admin).id();

    let (status, _) = app
        .call(
            Role::Admin,
            Method::DELETE,
            &format!("/api/v1/users/{admin_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn account_creation_validates_input() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Role::Admin,
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "email": "nuovo.capo@lenta-france.fr",
                "password": "Ponteggio1",
                "role": "caposquadra",
                "language": "FR",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["language"], "fr");
    assert_eq!(body["data"]["is_active"], true);
    let created = data_id(&body);

    for payload in [
        json!({ "email": "nuovo.capo@lenta-france.fr", "password": "Ponteggio1", "role": "hr" }),
        json!({ "email": "altro@lenta-france.fr", "password": "abc", "role": "hr" }),
        json!({
            "email": "terzo@lenta-france.fr",
            "password": "Ponteggio1",
            "role": "hr",
            "language": "de",
        }),
    ] {
        let (status, body) = app
            .call(Role::Admin, Method::POST, "/api/v1/users", Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    let (status, _) = app
        .call(
            Role::Manager,
            Method::PUT,
            &format!("/api/v1/users/{created}"),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "nuovo.capo@lenta-france.fr", "password": "Ponteggio1" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_probes_answer_without_auth() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["checks"]["database"]["status"], "up");
}
