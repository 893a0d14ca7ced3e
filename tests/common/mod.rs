#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use lenta_gestionale::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db::{self, DbConfig},
    entities::{user, Role},
    services::users::NewUser,
    AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "Cantiere2026!";

/// One seeded account and its bearer token.
#[derive(Clone)]
pub struct TestUser {
    pub model: user::Model,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.model.id
    }
}

/// Helper harness running the full router against a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    users: HashMap<Role, TestUser>,
}

impl TestApp {
    /// Fresh database with one active account per role.
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "k7Qp2v9LxR4tZ8wN1cY6bH3jF5gD0sAe".to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );

        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::new(
                cfg.jwt_secret.clone(),
                cfg.jwt_issuer.clone(),
                Duration::from_secs(cfg.jwt_expiration),
            ),
            db_arc.clone(),
        ));
        let state = AppState::new(db_arc, cfg);
        let router = lenta_gestionale::build_router(state.clone(), auth_service.clone());

        let mut app = Self {
            router,
            state,
            auth_service,
            users: HashMap::new(),
        };

        for role in [
            Role::Admin,
            Role::Manager,
            Role::Caposquadra,
            Role::Magazzino,
            Role::Contabilita,
            Role::Hr,
        ] {
            let email = format!("{}@lenta-france.fr", role);
            let seeded = app.add_user(&email, role, false).await;
            app.users.insert(role, seeded);
        }
        app
    }

    /// Create an extra active account.
    pub async fn add_user(&self, email: &str, role: Role, warehouse_manager: bool) -> TestUser {
        let model = self
            .state
            .services
            .users
            .create(
                None,
                NewUser {
                    email: email.to_string(),
                    password: TEST_PASSWORD.to_string(),
                    full_name: Some(format!("Test {}", role)),
                    role,
                    language: None,
                    is_active: true,
                    is_warehouse_manager: warehouse_manager,
                },
            )
            .await
            .expect("seed user for tests");
        let token = self
            .auth_service
            .generate_token(&model)
            .expect("token for seeded user")
            .access_token;
        TestUser { model, token }
    }

    pub fn user(&self, role: Role) -> &TestUser {
        &self.users[&role]
    }

    pub fn token(&self, role: Role) -> &str {
        &self.users[&role].token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request as the seeded user of `role`, returning status and JSON body.
    pub async fn call(
        &self,
        role: Role,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = self.token(role).to_string();
        self.call_as(&token, method, uri, body).await
    }

    pub async fn call_as(
        &self,
        token: &str,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, Some(token)).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Site assigned to the seeded crew leader, created by the admin.
    pub async fn seed_site(&self, name: &str) -> Uuid {
        let (status, body) = self
            .call(
                Role::Admin,
                Method::POST,
                "/api/v1/sites",
                Some(json!({
                    "name": name,
                    "caposquadra_id": self.user(Role::Caposquadra).id(),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed site: {body}");
        data_id(&body)
    }

    /// Warehouse item created by the admin, with an optional initial load.
    pub async fn seed_item(&self, code: &str, min_threshold: i64, initial: Option<i64>) -> Uuid {
        let mut payload = json!({
            "code": code,
            "name": format!("Articolo {}", code),
            "unit": "pz",
            "min_threshold": min_threshold,
        });
        if let Some(quantity) = initial {
            payload["initial_quantity"] = json!(quantity);
        }
        let (status, body) = self
            .call(Role::Admin, Method::POST, "/api/v1/warehouse/items", Some(payload))
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed item: {body}");
        data_id(&body)
    }
}

/// Parse a response body, mapping an empty body to `null`.
pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub fn data_id(body: &Value) -> Uuid {
    body["data"]["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .unwrap_or_else(|| panic!("response without data.id: {body}"))
}

/// Decimals serialize as strings; accept plain numbers too.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
