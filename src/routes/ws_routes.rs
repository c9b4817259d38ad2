//! WebSocket de notificaciones en tiempo real
//!
//! El token JWT viaja en el path (`/ws/:token`) porque los clientes de
//! browser no pueden mandar headers en el handshake de WebSocket. La
//! conexión vive registrada en el NotificationRegistry hasta que el
//! cliente se desconecta.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::decode_user_id;

pub fn create_ws_router() -> Router<AppState> {
    Router::new().route("/:token", get(ws_handler))
}

async fn ws_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    // Autenticar ANTES del upgrade: un token inválido devuelve 401 HTTP
    let user_id = decode_user_id(&token, &state.config.jwt_secret)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: i32) {
    let (connection_id, mut rx) = state.notifications.register(user_id).await;
    info!("🔌 WebSocket abierto para user {} ({})", user_id, connection_id);

    let (mut sink, mut stream) = socket.split();

    // Eventos del registro → socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Error serializando evento WS: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Lado de recepción: solo nos interesa detectar el cierre
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            if let Message::Close(_) = message {
                break;
            }
            debug!("Mensaje WS entrante ignorado");
        }
    });

    // La primera tarea que termina tumba a la otra
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.notifications.unregister(user_id, connection_id).await;
    info!("🔌 WebSocket cerrado para user {} ({})", user_id, connection_id);
}
