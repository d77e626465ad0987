//! Registro, sesiones y perfil de usuario

mod common;

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use common::*;
use serde_json::{json, Value};

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_login_and_me() {
    let server = create_test_server().await;
    let registered = register(&server, "Driver@Example.com", "user").await;
    assert_eq!(registered["email"], "driver@example.com");
    assert_eq!(registered["role"], "user");
    assert!(registered.get("password_hash").is_none());

    let response = server
        .post("/api/users/login/")
        .json(&json!({ "email": "driver@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["expires_at"].is_string());
    assert_eq!(body["user"]["id"], registered["id"]);

    let token = body["token"].as_str().unwrap();
    let me: Value = get_as(&server, token, "/api/users/me/").await.json();
    assert_eq!(me["id"], registered["id"]);
    assert_eq!(me["username"], "user_Driver");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let server = create_test_server().await;
    register(&server, "driver@example.com", "user").await;

    let response = server
        .post("/api/users/register/")
        .json(&json!({
            "email": "DRIVER@example.com",
            "username": "another",
            "password": PASSWORD,
            "role": "provider"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "CONFLICT");
}

#[tokio::test]
async fn test_register_validation() {
    let server = create_test_server().await;

    let response = server
        .post("/api/users/register/")
        .json(&json!({ "email": "not-an-email", "username": "someone", "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

    let response = server
        .post("/api/users/register/")
        .json(&json!({ "email": "a@example.com", "username": "someone", "password": "short" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/users/register/")
        .json(&json!({ "email": "a@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

    let response = server
        .post("/api/users/register/")
        .text("{not json")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_admin_cannot_self_register() {
    let server = create_test_server().await;
    let response = server
        .post("/api/users/register/")
        .json(&json!({
            "email": "boss@example.com",
            "username": "boss",
            "password": PASSWORD,
            "role": "admin"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let server = create_test_server().await;
    register(&server, "driver@example.com", "user").await;

    let response = server
        .post("/api/users/login/")
        .json(&json!({ "email": "driver@example.com", "password": "wrong-password" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .post("/api/users/login/")
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_missing_or_bad_token() {
    let server = create_test_server().await;

    let response = server.get("/api/requests/my_requests/").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = get_as(&server, "not-a-jwt", "/api/users/me/").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_legacy_token_prefix_is_accepted() {
    let server = create_test_server().await;
    let token = create_requester(&server, "driver@example.com").await;

    let response = server
        .get("/api/users/me/")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Token {}", token)).unwrap(),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let server = create_test_server().await;
    let token = create_requester(&server, "driver@example.com").await;

    let response = post_as(&server, &token, "/api/users/logout/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["success"], true);

    let response = get_as(&server, &token, "/api/users/me/").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    // Un login nuevo emite una sesión válida
    let fresh = login(&server, "driver@example.com", PASSWORD).await;
    assert_eq!(get_as(&server, &fresh, "/api/users/me/").await.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_user_list_is_admin_only() {
    let server = create_test_server().await;
    let token = create_requester(&server, "driver@example.com").await;

    let response = get_as(&server, &token, "/api/users/").await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let admin = admin_token(&server).await;
    let response = get_as(&server, &admin, "/api/users/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let users: Value = response.json();
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_own_profile() {
    let server = create_test_server().await;
    let token = create_requester(&server, "driver@example.com").await;

    let response = put_json_as(
        &server,
        &token,
        "/api/users/profile/",
        json!({ "first_name": "Dana", "phone_number": "+1 555 0100" }),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["first_name"], "Dana");
    assert_eq!(updated["last_name"], "User");
    assert_eq!(updated["phone_number"], "+1 555 0100");

    let response =
        put_json_as(&server, &token, "/api/users/profile/", json!({ "username": "ab" })).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
