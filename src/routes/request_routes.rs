use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::request_controller::RequestController;
use crate::dto::{
    AdminAssignRequest, CompleteRequestRequest, CreateServiceRequestRequest,
    DispatchStatsResponse, ListQuery, ListResponse,
};
use crate::middleware::{auth_middleware, AuthenticatedUser};
use crate::models::ServiceRequest;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::extract::{AppJson, AppQuery};

/// Rutas de solicitudes (todas autenticadas)
pub fn create_request_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/requests/", post(create_request).get(list_requests))
        .route("/requests/my_requests/", get(my_requests))
        .route("/requests/my_assignments/", get(my_assignments))
        .route("/requests/stats/", get(dispatch_stats))
        .route("/requests/:id/", get(get_request))
        .route("/requests/:id/assign/", post(accept_request))
        .route("/requests/:id/admin_assign/", post(admin_assign_request))
        .route("/requests/:id/start/", post(start_request))
        .route("/requests/:id/complete/", post(complete_request))
        .route("/requests/:id/cancel/", post(cancel_request))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

type RequestResult = Result<Json<ServiceRequest>, AppError>;
type ListResult = Result<Json<ListResponse<ServiceRequest>>, AppError>;

async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(request): AppJson<CreateServiceRequestRequest>,
) -> Result<(StatusCode, Json<ServiceRequest>), AppError> {
    let created = RequestController::new(state.store).create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_requests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppQuery(query): AppQuery<ListQuery>,
) -> ListResult {
    let list = RequestController::new(state.store).list(&user, &query).await?;
    Ok(Json(list))
}

async fn my_requests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppQuery(query): AppQuery<ListQuery>,
) -> ListResult {
    let list = RequestController::new(state.store)
        .my_requests(&user, &query)
        .await?;
    Ok(Json(list))
}

async fn my_assignments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppQuery(query): AppQuery<ListQuery>,
) -> ListResult {
    let list = RequestController::new(state.store)
        .my_assignments(&user, &query)
        .await?;
    Ok(Json(list))
}

async fn dispatch_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<DispatchStatsResponse>, AppError> {
    let stats = RequestController::new(state.store).stats(&user).await?;
    Ok(Json(stats))
}

async fn get_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> RequestResult {
    let request = RequestController::new(state.store).get(&user, id).await?;
    Ok(Json(request))
}

async fn accept_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> RequestResult {
    let request = RequestController::new(state.store).accept(&user, id).await?;
    Ok(Json(request))
}

async fn admin_assign_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    AppJson(body): AppJson<AdminAssignRequest>,
) -> RequestResult {
    let request = RequestController::new(state.store)
        .admin_assign(&user, id, body)
        .await?;
    Ok(Json(request))
}

async fn start_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> RequestResult {
    let request = RequestController::new(state.store).start(&user, id).await?;
    Ok(Json(request))
}

async fn complete_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    AppJson(body): AppJson<CompleteRequestRequest>,
) -> RequestResult {
    let request = RequestController::new(state.store)
        .complete(&user, id, body)
        .await?;
    Ok(Json(request))
}

async fn cancel_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> RequestResult {
    let request = RequestController::new(state.store).cancel(&user, id).await?;
    Ok(Json(request))
}
