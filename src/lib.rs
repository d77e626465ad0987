//! Roadside Dispatch
//!
//! Backend de despacho de asistencia en carretera: solicitudes con ciclo de
//! vida explícito, asignación atómica de proveedores, disponibilidad,
//! liquidación y contrato de polling para los dashboards.

pub mod client;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{middleware as axum_middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware::{cors_layer, rate_limit_middleware, RateLimitState};
use crate::routes::{create_provider_router, create_request_router, create_user_router};
use crate::state::AppState;

/// Construir el router completo de la aplicación
pub fn create_app(state: AppState) -> Router {
    let rate_limit = RateLimitState::new(&state.config);

    let api = Router::new()
        .merge(create_user_router(state.clone()))
        .merge(create_provider_router(state.clone()))
        .merge(create_request_router(state.clone()));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config))
                .layer(CompressionLayer::new())
                .layer(axum_middleware::from_fn_with_state(rate_limit, rate_limit_middleware)),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "roadside_dispatch",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
