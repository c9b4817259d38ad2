use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::AlertController;
use crate::dto::alert_dto::AlertResponse;
use crate::dto::{ApiResponse, Pagination};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_alert_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_alerts))
        .route("/vehicle/:vehicle_id", get(list_vehicle_alerts))
        .route("/:id/acknowledge", post(acknowledge_alert))
}

async fn list_alerts(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<AlertResponse>>, AppError> {
    let controller = AlertController::new(&state);
    let response = controller.list(&auth, pagination.skip, pagination.limit).await?;
    Ok(Json(response))
}

async fn list_vehicle_alerts(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vehicle_id): Path<i32>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<AlertResponse>>, AppError> {
    let controller = AlertController::new(&state);
    let response = controller
        .list_for_vehicle(vehicle_id, &auth, pagination.skip, pagination.limit)
        .await?;
    Ok(Json(response))
}

async fn acknowledge_alert(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AlertResponse>>, AppError> {
    let controller = AlertController::new(&state);
    let response = controller.acknowledge(id, &auth).await?;
    Ok(Json(response))
}
