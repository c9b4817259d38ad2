use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::controllers::TrackingController;
use crate::dto::position_dto::{CreatePositionRequest, PositionResponse};
use crate::dto::Pagination;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_tracking_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_position))
        .route("/:vehicle_id/positions", get(position_history))
        .route("/:vehicle_id/latest", get(latest_position))
}

async fn create_position(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreatePositionRequest>,
) -> Result<Json<PositionResponse>, AppError> {
    request.validate()?;

    let controller = TrackingController::new(&state);
    let response = controller.create(&auth, request).await?;
    Ok(Json(response))
}

async fn position_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vehicle_id): Path<i32>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<PositionResponse>>, AppError> {
    let controller = TrackingController::new(&state);
    let response = controller
        .history(vehicle_id, &auth, pagination.skip, pagination.limit)
        .await?;
    Ok(Json(response))
}

async fn latest_position(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vehicle_id): Path<i32>,
) -> Result<Json<PositionResponse>, AppError> {
    let controller = TrackingController::new(&state);
    let response = controller.latest(vehicle_id, &auth).await?;
    Ok(Json(response))
}
