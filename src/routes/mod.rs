pub mod alert_routes;
pub mod tracking_routes;
pub mod vehicle_routes;
pub mod webhook_routes;
pub mod ws_routes;
pub mod zone_routes;

use axum::{routing::get, Json, Router};

use crate::state::AppState;

/// Router completo de la API
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/webhook", webhook_routes::create_webhook_router())
        .nest("/api/v1/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/api/v1/zones", zone_routes::create_zone_router())
        .nest("/api/v1/tracking", tracking_routes::create_tracking_router())
        .nest("/api/v1/alerts", alert_routes::create_alert_router())
        .nest("/ws", ws_routes::create_ws_router())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "safetrack-backend"
    }))
}
