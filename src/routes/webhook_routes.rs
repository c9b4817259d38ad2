//! Webhook de ChirpStack
//!
//! Endpoint público (ChirpStack no manda JWT); la "autenticación" es la red.
//! Responde SIEMPRE 200 para que el network server no reintente ni marque
//! el endpoint como caído.

use axum::{extract::State, routing::post, Json, Router};
use serde_json::Value;

use crate::controllers::UplinkController;
use crate::state::AppState;

pub fn create_webhook_router() -> Router<AppState> {
    Router::new().route("/uplink", post(handle_uplink))
}

async fn handle_uplink(State(state): State<AppState>, Json(payload): Json<Value>) -> Json<Value> {
    let controller = UplinkController::new(&state);
    let outcome = controller.handle(&payload).await;
    Json(outcome.body())
}
