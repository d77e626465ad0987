//! Utilidades comunes para los tests de integración
#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue};
use axum_test::TestServer;
use roadside_dispatch::{
    config::EnvironmentConfig,
    controllers::auth_controller::bootstrap_admin,
    create_app,
    repositories::{DispatchStore, MemoryDispatchStore},
    state::AppState,
};
use serde_json::{json, Value};

pub const PASSWORD: &str = "password123";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Configuración de tests: bcrypt barato, límite alto, admin inicial
pub fn test_config() -> EnvironmentConfig {
    EnvironmentConfig {
        bcrypt_cost: 4,
        rate_limit_requests: 10_000,
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        ..EnvironmentConfig::default()
    }
}

pub async fn test_state() -> AppState {
    let config = test_config();
    let store: Arc<dyn DispatchStore> = Arc::new(MemoryDispatchStore::new());
    bootstrap_admin(&store, &config)
        .await
        .expect("Failed to bootstrap admin");
    AppState::new(config, store)
}

/// Crear un servidor de test sobre el store en memoria
pub async fn create_test_server() -> TestServer {
    let app = create_app(test_state().await);
    TestServer::new(app).expect("Failed to create test server")
}

pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).expect("valid header"),
    )
}

/// Username válido (mínimo 3 caracteres) derivado del email
pub fn username_for(email: &str) -> String {
    format!("user_{}", email.split('@').next().unwrap())
}

pub async fn register(server: &TestServer, email: &str, role: &str) -> Value {
    let response = server
        .post("/api/users/register/")
        .json(&json!({
            "email": email,
            "username": username_for(email),
            "password": PASSWORD,
            "first_name": "Test",
            "last_name": "User",
            "role": role
        }))
        .await;
    assert_eq!(response.status_code(), 201, "register failed: {}", response.text());
    response.json()
}

pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/api/users/login/")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 200, "login failed: {}", response.text());
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

pub async fn admin_token(server: &TestServer) -> String {
    login(server, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

/// Registrar un solicitante y devolver su token
pub async fn create_requester(server: &TestServer, email: &str) -> String {
    register(server, email, "user").await;
    login(server, email, PASSWORD).await
}

/// Proveedor con perfil creado y en `online`; devuelve (token, provider_id)
pub async fn create_online_provider(server: &TestServer, email: &str) -> (String, i64) {
    register(server, email, "provider").await;
    let token = login(server, email, PASSWORD).await;
    let (name, value) = bearer(&token);

    let response = server
        .post("/api/providers/create_profile/")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "company_name": "Ace Towing",
            "license_number": "LIC-001",
            "vehicle_type": "flatbed",
            "vehicle_plate": "TOW 001"
        }))
        .await;
    assert_eq!(response.status_code(), 201, "create_profile failed: {}", response.text());
    let provider: Value = response.json();

    let response = server
        .put("/api/providers/update_status/")
        .add_header(name, value)
        .json(&json!({ "status": "online" }))
        .await;
    assert_eq!(response.status_code(), 200);

    (token, provider["id"].as_i64().unwrap())
}

pub fn towing_request_body() -> Value {
    json!({
        "service_type": "towing",
        "priority": "high",
        "location_address": "123 Main St",
        "latitude": 40.7128,
        "longitude": -74.0060,
        "vehicle_make": "Toyota",
        "vehicle_model": "Camry",
        "vehicle_year": 2018,
        "vehicle_plate": "ABC 123",
        "description": "Engine will not start"
    })
}

/// Crear una solicitud de grúa y devolver su id
pub async fn create_request(server: &TestServer, token: &str) -> i64 {
    let (name, value) = bearer(token);
    let response = server
        .post("/api/requests/")
        .add_header(name, value)
        .json(&towing_request_body())
        .await;
    assert_eq!(response.status_code(), 201, "create request failed: {}", response.text());
    let body: Value = response.json();
    body["id"].as_i64().unwrap()
}

/// POST autenticado sin cuerpo
pub async fn post_as(server: &TestServer, token: &str, path: &str) -> axum_test::TestResponse {
    let (name, value) = bearer(token);
    server.post(path).add_header(name, value).await
}

pub async fn post_json_as(
    server: &TestServer,
    token: &str,
    path: &str,
    body: Value,
) -> axum_test::TestResponse {
    let (name, value) = bearer(token);
    server.post(path).add_header(name, value).json(&body).await
}

pub async fn get_as(server: &TestServer, token: &str, path: &str) -> axum_test::TestResponse {
    let (name, value) = bearer(token);
    server.get(path).add_header(name, value).await
}

pub async fn put_json_as(
    server: &TestServer,
    token: &str,
    path: &str,
    body: Value,
) -> axum_test::TestResponse {
    let (name, value) = bearer(token);
    server.put(path).add_header(name, value).json(&body).await
}
