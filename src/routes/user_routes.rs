use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};

use crate::controllers::auth_controller::AuthController;
use crate::dto::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest, UpdateProfileRequest};
use crate::middleware::{admin_middleware, auth_middleware, AuthenticatedUser};
use crate::models::UserResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::extract::AppJson;

/// Rutas de usuarios y sesiones
pub fn create_user_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/users/register/", post(register))
        .route("/users/login/", post(login));

    let protected = Router::new()
        .route("/users/logout/", post(logout))
        .route("/users/me/", get(me))
        .route("/users/profile/", put(update_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/users/", get(list_users))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected).merge(admin)
}

async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = AuthController::new(state).register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = AuthController::new(state).login(request).await?;
    Ok(Json(response))
}

async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<MessageResponse> {
    AuthController::new(state).logout(&user).await;
    Json(MessageResponse::ok("Logged out"))
}

async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = AuthController::new(state).me(&user).await?;
    Ok(Json(user))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(request): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = AuthController::new(state).update_profile(&user, request).await?;
    Ok(Json(user))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = AuthController::new(state).list_users(&user).await?;
    Ok(Json(users))
}
