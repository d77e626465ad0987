use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};

use crate::controllers::provider_controller::ProviderController;
use crate::dto::{
    CreateProviderProfileRequest, ProviderStatsResponse, UpdateLocationRequest, UpdateStatusRequest,
};
use crate::middleware::{auth_middleware, AuthenticatedUser};
use crate::models::Provider;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::extract::AppJson;

/// Rutas de proveedores (todas autenticadas)
pub fn create_provider_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/providers/", get(list_providers))
        .route("/providers/my_profile/", get(my_profile))
        .route("/providers/my_stats/", get(my_stats))
        .route("/providers/create_profile/", post(create_profile))
        .route("/providers/update_location/", put(update_location))
        .route("/providers/update_status/", put(update_status))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

async fn list_providers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Provider>>, AppError> {
    let providers = ProviderController::new(state.store).list(&user).await?;
    Ok(Json(providers))
}

async fn my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Provider>, AppError> {
    let provider = ProviderController::new(state.store).my_profile(&user).await?;
    Ok(Json(provider))
}

async fn my_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ProviderStatsResponse>, AppError> {
    let stats = ProviderController::new(state.store).my_stats(&user).await?;
    Ok(Json(stats))
}

async fn create_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(request): AppJson<CreateProviderProfileRequest>,
) -> Result<(StatusCode, Json<Provider>), AppError> {
    let provider = ProviderController::new(state.store)
        .create_profile(&user, request)
        .await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

async fn update_location(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(request): AppJson<UpdateLocationRequest>,
) -> Result<Json<Provider>, AppError> {
    let provider = ProviderController::new(state.store)
        .update_location(&user, request)
        .await?;
    Ok(Json(provider))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(request): AppJson<UpdateStatusRequest>,
) -> Result<Json<Provider>, AppError> {
    let provider = ProviderController::new(state.store)
        .update_status(&user, request)
        .await?;
    Ok(Json(provider))
}
