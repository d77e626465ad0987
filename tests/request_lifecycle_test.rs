//! Ciclo de vida de las solicitudes a través de la API

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::{json, Value};

#[tokio::test]
async fn test_end_to_end_accept_and_complete() {
    let server = create_test_server().await;
    let user = create_requester(&server, "driver@example.com").await;
    let (provider_a, provider_a_id) = create_online_provider(&server, "a@tow.com").await;
    let (provider_b, _) = create_online_provider(&server, "b@tow.com").await;

    let id = create_request(&server, &user).await;
    let created: Value = get_as(&server, &user, &format!("/api/requests/{}/", id)).await.json();
    assert_eq!(created["status"], "pending");
    assert_eq!(created["provider_id"], Value::Null);
    assert_eq!(created["final_cost"], Value::Null);

    let response = post_as(&server, &provider_a, &format!("/api/requests/{}/assign/", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let assigned: Value = response.json();
    assert_eq!(assigned["status"], "assigned");
    assert_eq!(assigned["assignment_phase"], "accepted");
    assert_eq!(assigned["provider_id"], provider_a_id);

    let response = post_as(&server, &provider_b, &format!("/api/requests/{}/assign/", id)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "ALREADY_ASSIGNED");
    assert_eq!(body["message"], "Request already taken");

    let response = post_json_as(
        &server,
        &provider_a,
        &format!("/api/requests/{}/complete/", id),
        json!({ "final_cost": 75.00 }),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let completed: Value = response.json();
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["final_cost"], "75.00");
    assert!(completed["completed_at"].is_string());

    let history: Value = get_as(&server, &user, "/api/requests/my_requests/").await.json();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], id);
    assert_eq!(history[0]["final_cost"], "75.00");
}

#[tokio::test]
async fn test_start_moves_to_in_progress() {
    let server = create_test_server().await;
    let user = create_requester(&server, "driver@example.com").await;
    let (provider, _) = create_online_provider(&server, "a@tow.com").await;
    let id = create_request(&server, &user).await;

    // Todavía pendiente: no se puede empezar
    let response = post_as(&server, &provider, &format!("/api/requests/{}/start/", id)).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    post_as(&server, &provider, &format!("/api/requests/{}/assign/", id)).await;
    let response = post_as(&server, &provider, &format!("/api/requests/{}/start/", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let started: Value = response.json();
    assert_eq!(started["status"], "in_progress");
    assert!(started["started_at"].is_string());

    let response = post_as(&server, &provider, &format!("/api/requests/{}/start/", id)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "INVALID_STATE");

    let response = post_json_as(
        &server,
        &provider,
        &format!("/api/requests/{}/complete/", id),
        json!({ "final_cost": "120.5" }),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["final_cost"], "120.50");
}

#[tokio::test]
async fn test_cancel_only_while_pending() {
    let server = create_test_server().await;
    let user = create_requester(&server, "driver@example.com").await;
    let (provider, _) = create_online_provider(&server, "a@tow.com").await;

    let id = create_request(&server, &user).await;
    let response = post_as(&server, &user, &format!("/api/requests/{}/cancel/", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let cancelled: Value = response.json();
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled["cancelled_at"].is_string());

    // Cancelada es terminal
    let response = post_as(&server, &user, &format!("/api/requests/{}/cancel/", id)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "INVALID_STATE");

    let id = create_request(&server, &user).await;
    post_as(&server, &provider, &format!("/api/requests/{}/assign/", id)).await;
    let response = post_as(&server, &user, &format!("/api/requests/{}/cancel/", id)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let still: Value = get_as(&server, &user, &format!("/api/requests/{}/", id)).await.json();
    assert_eq!(still["status"], "assigned");
}

#[tokio::test]
async fn test_only_requester_can_cancel() {
    let server = create_test_server().await;
    let owner = create_requester(&server, "owner@example.com").await;
    let other = create_requester(&server, "other@example.com").await;
    let id = create_request(&server, &owner).await;

    let response = post_as(&server, &other, &format!("/api/requests/{}/cancel/", id)).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let request: Value = get_as(&server, &owner, &format!("/api/requests/{}/", id)).await.json();
    assert_eq!(request["status"], "pending");
}

#[tokio::test]
async fn test_complete_by_unbound_provider_is_rejected() {
    let server = create_test_server().await;
    let user = create_requester(&server, "driver@example.com").await;
    let (bound, _) = create_online_provider(&server, "a@tow.com").await;
    let (stranger, _) = create_online_provider(&server, "b@tow.com").await;

    let id = create_request(&server, &user).await;
    post_as(&server, &bound, &format!("/api/requests/{}/assign/", id)).await;

    let response = post_json_as(
        &server,
        &stranger,
        &format!("/api/requests/{}/complete/", id),
        json!({ "final_cost": 75 }),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "FORBIDDEN");

    let request: Value = get_as(&server, &user, &format!("/api/requests/{}/", id)).await.json();
    assert_eq!(request["status"], "assigned");
    assert_eq!(request["final_cost"], Value::Null);
    assert_eq!(request["completed_at"], Value::Null);
}

#[tokio::test]
async fn test_complete_requires_valid_cost() {
    let server = create_test_server().await;
    let user = create_requester(&server, "driver@example.com").await;
    let (provider, _) = create_online_provider(&server, "a@tow.com").await;
    let id = create_request(&server, &user).await;
    post_as(&server, &provider, &format!("/api/requests/{}/assign/", id)).await;

    let path = format!("/api/requests/{}/complete/", id);
    let response = post_json_as(&server, &provider, &path, json!({})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

    let response = post_json_as(&server, &provider, &path, json!({ "final_cost": -5 })).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response =
        post_json_as(&server, &provider, &path, json!({ "final_cost": "123456789012.99" })).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

    let request: Value = get_as(&server, &user, &format!("/api/requests/{}/", id)).await.json();
    assert_eq!(request["status"], "assigned");
}

#[tokio::test]
async fn test_complete_pending_request_is_forbidden() {
    let server = create_test_server().await;
    let user = create_requester(&server, "driver@example.com").await;
    let (provider, _) = create_online_provider(&server, "a@tow.com").await;
    let id = create_request(&server, &user).await;

    let response = post_json_as(
        &server,
        &provider,
        &format!("/api/requests/{}/complete/", id),
        json!({ "final_cost": 10 }),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_one_active_request_per_user() {
    let server = create_test_server().await;
    let user = create_requester(&server, "driver@example.com").await;
    let id = create_request(&server, &user).await;

    let response = post_json_as(&server, &user, "/api/requests/", towing_request_body()).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "CONFLICT");

    post_as(&server, &user, &format!("/api/requests/{}/cancel/", id)).await;
    let response = post_json_as(&server, &user, "/api/requests/", towing_request_body()).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_request_validation() {
    let server = create_test_server().await;
    let user = create_requester(&server, "driver@example.com").await;

    let mut body = towing_request_body();
    body["location_address"] = json!("");
    let response = post_json_as(&server, &user, "/api/requests/", body).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

    let mut body = towing_request_body();
    body["latitude"] = json!(123.0);
    let response = post_json_as(&server, &user, "/api/requests/", body).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let mut body = towing_request_body();
    body["service_type"] = json!("teleport");
    let response = post_json_as(&server, &user, "/api/requests/", body).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

    for field in ["service_type", "vehicle_make", "location_address"] {
        let mut body = towing_request_body();
        body.as_object_mut().unwrap().remove(field);
        let response = post_json_as(&server, &user, "/api/requests/", body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR", "missing {}", field);
    }

    // Nada quedó guardado
    let mine: Value = get_as(&server, &user, "/api/requests/my_requests/").await.json();
    assert_eq!(mine, json!([]));
}

#[tokio::test]
async fn test_providers_cannot_create_requests() {
    let server = create_test_server().await;
    let (provider, _) = create_online_provider(&server, "a@tow.com").await;

    let response = post_json_as(&server, &provider, "/api/requests/", towing_request_body()).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let server = create_test_server().await;
    let user = create_requester(&server, "driver@example.com").await;
    let (provider, _) = create_online_provider(&server, "a@tow.com").await;

    let response = get_as(&server, &user, "/api/requests/999/").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = post_as(&server, &provider, "/api/requests/999/assign/").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_detail_visibility() {
    let server = create_test_server().await;
    let owner = create_requester(&server, "owner@example.com").await;
    let other = create_requester(&server, "other@example.com").await;
    let (bound, _) = create_online_provider(&server, "a@tow.com").await;
    let (stranger, _) = create_online_provider(&server, "b@tow.com").await;
    let admin = admin_token(&server).await;
    let id = create_request(&server, &owner).await;
    let path = format!("/api/requests/{}/", id);

    // Pendiente: visible para cualquier proveedor
    assert_eq!(get_as(&server, &stranger, &path).await.status_code(), StatusCode::OK);
    assert_eq!(get_as(&server, &other, &path).await.status_code(), StatusCode::FORBIDDEN);

    post_as(&server, &bound, &format!("/api/requests/{}/assign/", id)).await;
    assert_eq!(get_as(&server, &bound, &path).await.status_code(), StatusCode::OK);
    assert_eq!(get_as(&server, &stranger, &path).await.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(get_as(&server, &admin, &path).await.status_code(), StatusCode::OK);
}
