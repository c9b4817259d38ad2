use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::controllers::ZoneController;
use crate::dto::zone_dto::{CreateZoneRequest, UpdateZoneRequest, ZoneResponse};
use crate::dto::ApiResponse;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_zone_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_zone))
        .route("/", get(list_zones))
        .route("/:id", get(get_zone))
        .route("/:id", put(update_zone))
        .route("/:id", delete(delete_zone))
}

#[derive(Debug, Deserialize)]
struct ZoneListQuery {
    vehicle_id: Option<i32>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

async fn create_zone(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateZoneRequest>,
) -> Result<Json<ApiResponse<ZoneResponse>>, AppError> {
    let controller = ZoneController::new(&state);
    let response = controller.create(&auth, request).await?;
    Ok(Json(response))
}

async fn list_zones(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ZoneListQuery>,
) -> Result<Json<Vec<ZoneResponse>>, AppError> {
    let controller = ZoneController::new(&state);
    let response = controller
        .list(&auth, query.vehicle_id, query.skip, query.limit)
        .await?;
    Ok(Json(response))
}

async fn get_zone(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ZoneResponse>, AppError> {
    let controller = ZoneController::new(&state);
    let response = controller.get(id, &auth).await?;
    Ok(Json(response))
}

async fn update_zone(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateZoneRequest>,
) -> Result<Json<ApiResponse<ZoneResponse>>, AppError> {
    let controller = ZoneController::new(&state);
    let response = controller.update(id, &auth, request).await?;
    Ok(Json(response))
}

async fn delete_zone(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let controller = ZoneController::new(&state);
    controller.delete(id, &auth).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Zone deleted"
    })))
}
