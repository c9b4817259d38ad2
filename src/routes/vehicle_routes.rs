use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::controllers::VehicleController;
use crate::dto::vehicle_dto::{
    PairVehicleRequest, ProvisionVehicleRequest, UpdateVehicleRequest, VehicleResponse,
};
use crate::dto::{ApiResponse, Pagination};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles))
        .route("/provision", post(provision_vehicle))
        .route("/pair", post(pair_vehicle))
        .route("/:id", get(get_vehicle))
        .route("/:id", put(update_vehicle))
        .route("/:id", delete(delete_vehicle))
        .route("/:id/release", post(release_vehicle))
}

async fn list_vehicles(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.list(&auth, pagination.skip, pagination.limit).await?;
    Ok(Json(response))
}

async fn get_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<VehicleResponse>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.get(id, &auth).await?;
    Ok(Json(response))
}

async fn provision_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ProvisionVehicleRequest>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.provision(&auth, request).await?;
    Ok(Json(response))
}

async fn pair_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<PairVehicleRequest>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.pair(&auth, request).await?;
    Ok(Json(response))
}

async fn update_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateVehicleRequest>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.update(id, &auth, request).await?;
    Ok(Json(response))
}

async fn release_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.release(id, &auth).await?;
    Ok(Json(response))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let controller = VehicleController::new(&state);
    controller.delete(id, &auth).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Vehicle deleted"
    })))
}
