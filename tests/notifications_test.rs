//! Notification fan-out from site activity, the per-user feed and the
//! missing-report reminder sweep.

mod common;

use axum::http::{Method, StatusCode};
use common::{data_id, TestApp};
use lenta_gestionale::entities::Role;
use serde_json::json;

#[tokio::test]
async fn report_notifies_management_but_not_author() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Valence").await;

    let (status, body) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/reports",
            Some(json!({
                "site_id": site_id,
                "total_hours": 32,
                "workers_count": 4,
                "activities": "Scavo fondazioni",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    for role in [Role::Admin, Role::Manager] {
        let (status, body) = app
            .call(role, Method::GET, "/api/v1/notifications/poll", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["unread_count"], 1, "{role}: {body}");
        assert_eq!(body["data"]["items"][0]["notification_type"], "report_created");
    }

    let (_, body) = app
        .call(Role::Caposquadra, Method::GET, "/api/v1/notifications", None)
        .await;
    assert_eq!(body["data"]["unread_count"], 0);
    assert!(body["data"]["items"].as_array().expect("items").is_empty());
}

#[tokio::test]
async fn site_status_change_notifies_crew_leader() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Dijon").await;

    let (status, body) = app
        .call(
            Role::Manager,
            Method::PUT,
            &format!("/api/v1/sites/{site_id}"),
            Some(json!({ "status": "chiuso" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "chiuso");

    let (_, body) = app
        .call(Role::Caposquadra, Method::GET, "/api/v1/notifications", None)
        .await;
    assert_eq!(body["data"]["unread_count"], 1);
    assert_eq!(body["data"]["items"][0]["notification_type"], "site_status_changed");

    // the actor is excluded, the other manager-side account is not
    let (_, body) = app
        .call(Role::Manager, Method::GET, "/api/v1/notifications", None)
        .await;
    assert_eq!(body["data"]["unread_count"], 0);
    let (_, body) = app
        .call(Role::Admin, Method::GET, "/api/v1/notifications", None)
        .await;
    assert_eq!(body["data"]["unread_count"], 1);
}

#[tokio::test]
async fn role_notification_reaches_role_members_and_can_be_read() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Role::Admin,
            Method::POST,
            "/api/v1/notifications",
            Some(json!({
                "recipient_role": "hr",
                "message": "Aggiornare le scadenze delle visite mediche",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let notification_id = data_id(&body);
    assert_eq!(body["data"]["notification_type"], "manual");

    let (_, body) = app
        .call(Role::Contabilita, Method::GET, "/api/v1/notifications", None)
        .await;
    assert_eq!(body["data"]["unread_count"], 0);

    let (status, body) = app
        .call(
            Role::Hr,
            Method::POST,
            &format!("/api/v1/notifications/{notification_id}/read"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_read"], true);

    let (status, _) = app
        .call(
            Role::Contabilita,
            Method::POST,
            &format!("/api/v1/notifications/{notification_id}/read"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notification_needs_exactly_one_recipient() {
    let app = TestApp::new().await;
    let hr_id = app.user(Role::Hr).id();

    for payload in [
        json!({ "message": "Nessun destinatario" }),
        json!({ "message": "Due destinatari", "recipient_role": "hr", "recipient_user_id": hr_id }),
    ] {
        let (status, body) = app
            .call(Role::Manager, Method::POST, "/api/v1/notifications", Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    let (status, _) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/notifications",
            Some(json!({ "message": "x", "recipient_role": "hr" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn mark_all_read_clears_the_unread_counter() {
    let app = TestApp::new().await;
    let hr_id = app.user(Role::Hr).id();

    for message in ["Primo avviso", "Secondo avviso"] {
        let (status, _) = app
            .call(
                Role::Manager,
                Method::POST,
                "/api/v1/notifications",
                Some(json!({ "recipient_user_id": hr_id, "message": message })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = app
        .call(Role::Hr, Method::GET, "/api/v1/notifications?unread_only=true", None)
        .await;
    assert_eq!(body["data"]["items"].as_array().expect("items").len(), 2);

    let (status, body) = app
        .call(Role::Hr, Method::POST, "/api/v1/notifications/read-all", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 2);

    let (_, body) = app
        .call(Role::Hr, Method::GET, "/api/v1/notifications/poll", None)
        .await;
    assert_eq!(body["data"]["unread_count"], 0);
    assert_eq!(body["data"]["items"].as_array().expect("items").len(), 2);
}

#[tokio::test]
async fn reading_one_notification_decrements_unread_by_one() {
    let app = TestApp::new().await;
    let hr_id = app.user(Role::Hr).id();

    let mut ids = Vec::new();
    for message in ["Visita medica", "Corso sicurezza", "Rinnovo patente"] {
        let (status, body) = app
            .call(
                Role::Manager,
                Method::POST,
                "/api/v1/notifications",
                Some(json!({ "recipient_user_id": hr_id, "message": message })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ids.push(data_id(&body));
    }

    let (_, body) = app
        .call(Role::Hr, Method::GET, "/api/v1/notifications/poll", None)
        .await;
    assert_eq!(body["data"]["unread_count"], 3);

    let (status, _) = app
        .call(
            Role::Hr,
            Method::POST,
            &format!("/api/v1/notifications/{}/read", ids[1]),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .call(Role::Hr, Method::GET, "/api/v1/notifications/poll", None)
        .await;
    assert_eq!(body["data"]["unread_count"], 2);

    // reading it again changes nothing
    let (status, _) = app
        .call(
            Role::Hr,
            Method::POST,
            &format!("/api/v1/notifications/{}/read", ids[1]),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app
        .call(Role::Hr, Method::GET, "/api/v1/notifications/poll", None)
        .await;
    assert_eq!(body["data"]["unread_count"], 2);
}

#[tokio::test]
async fn missing_report_reminders_skip_sites_with_a_report_today() {
    let app = TestApp::new().await;
    let site_id = app.seed_site("Cantiere Besançon").await;

    let (status, body) = app
        .call(
            Role::Manager,
            Method::POST,
            "/api/v1/notifications/missing-reports",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["created"], 1);

    let (_, body) = app
        .call(Role::Caposquadra, Method::GET, "/api/v1/notifications", None)
        .await;
    assert_eq!(body["data"]["items"][0]["notification_type"], "rapportino");
    let message = body["data"]["items"][0]["message"].as_str().expect("message");
    assert!(message.contains("Cantiere Besançon"), "{message}");

    let (status, _) = app
        .call(
            Role::Caposquadra,
            Method::POST,
            "/api/v1/reports",
            Some(json!({ "site_id": site_id, "total_hours": 8, "workers_count": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app
        .call(
            Role::Admin,
            Method::POST,
            "/api/v1/notifications/missing-reports",
            None,
        )
        .await;
    assert_eq!(body["data"]["created"], 0);
}
