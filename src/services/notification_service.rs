//! Registro de notificaciones en tiempo real
//!
//! Registro process-wide de conexiones WebSocket, creado al arranque y
//! compartido vía AppState. El registro es dueño de las conexiones: los
//! handlers solo registran/desregistran y el resto del sistema consume
//! únicamente `deliver(user_id, event)`.
//!
//! La entrega es fire-and-forget: que un usuario no tenga conexiones no es
//! un error, y un sender cerrado simplemente se poda.

use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Alert, Vehicle};

/// Evento estructurado entregado a los clientes: `{type, data}`
#[derive(Debug, Clone, Serialize)]
pub struct WsEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Value,
}

impl WsEvent {
    /// Evento NEW_ALERT con el shape que espera la app
    pub fn new_alert(alert: &Alert) -> Self {
        Self {
            event_type: "NEW_ALERT".to_string(),
            data: json!({
                "id": alert.id,
                "vehicle_id": alert.vehicle_id,
                "message": alert.message,
                "severity": alert.severity,
                "timestamp": alert.created_at.to_rfc3339(),
            }),
        }
    }

    /// Evento VEHICLE_UPDATE con el delta de estado de relé
    pub fn vehicle_update(vehicle: &Vehicle) -> Self {
        Self {
            event_type: "VEHICLE_UPDATE".to_string(),
            data: json!({
                "vehicle_id": vehicle.id,
                "relay_cut": vehicle.relay_cut,
                "command_pending": vehicle.command_pending,
            }),
        }
    }
}

struct Connection {
    id: Uuid,
    tx: mpsc::UnboundedSender<WsEvent>,
}

/// Registro de conexiones por usuario
#[derive(Clone)]
pub struct NotificationRegistry {
    connections: Arc<RwLock<HashMap<i32, Vec<Connection>>>>,
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registrar una conexión nueva para un usuario. Devuelve el id de la
    /// conexión y el receptor por el que llegarán los eventos.
    pub async fn register(&self, user_id: i32) -> (Uuid, mpsc::UnboundedReceiver<WsEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();

        let mut connections = self.connections.write().await;
        connections
            .entry(user_id)
            .or_default()
            .push(Connection { id: connection_id, tx });

        debug!("🔌 Conexión {} registrada para user {}", connection_id, user_id);
        (connection_id, rx)
    }

    /// Desregistrar una conexión (al desconectarse el cliente)
    pub async fn unregister(&self, user_id: i32, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(user_connections) = connections.get_mut(&user_id) {
            user_connections.retain(|c| c.id != connection_id);
            if user_connections.is_empty() {
                connections.remove(&user_id);
            }
        }
        debug!("🔌 Conexión {} desregistrada para user {}", connection_id, user_id);
    }

    /// Entregar un evento a todas las conexiones de un usuario.
    /// Fire-and-forget: los senders cerrados se podan en el camino.
    pub async fn deliver(&self, user_id: i32, event: WsEvent) {
        let mut connections = self.connections.write().await;
        let Some(user_connections) = connections.get_mut(&user_id) else {
            debug!("Sin conexiones para user {}, evento {} descartado", user_id, event.event_type);
            return;
        };

        user_connections.retain(|connection| {
            if connection.tx.send(event.clone()).is_err() {
                warn!("Conexión {} cerrada, podando", connection.id);
                false
            } else {
                true
            }
        });

        if user_connections.is_empty() {
            connections.remove(&user_id);
        }
    }

    /// Cantidad de conexiones activas de un usuario
    pub async fn connection_count(&self, user_id: i32) -> usize {
        self.connections
            .read()
            .await
            .get(&user_id)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_event() -> WsEvent {
        WsEvent {
            event_type: "NEW_ALERT".to_string(),
            data: json!({ "id": 1 }),
        }
    }

    #[tokio::test]
    async fn test_deliver_to_registered_connection() {
        let registry = NotificationRegistry::new();
        let (_id, mut rx) = registry.register(7).await;

        registry.deliver(7, test_event()).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "NEW_ALERT");
    }

    #[tokio::test]
    async fn test_deliver_without_connections_is_noop() {
        let registry = NotificationRegistry::new();
        // No debe fallar ni bloquear
        registry.deliver(99, test_event()).await;
        assert_eq!(registry.connection_count(99).await, 0);
    }

    #[tokio::test]
    async fn test_unregister_removes_connection() {
        let registry = NotificationRegistry::new();
        let (id, _rx) = registry.register(7).await;
        assert_eq!(registry.connection_count(7).await, 1);

        registry.unregister(7, id).await;
        assert_eq!(registry.connection_count(7).await, 0);
    }

    #[tokio::test]
    async fn test_closed_connections_are_pruned_on_deliver() {
        let registry = NotificationRegistry::new();
        let (_id, rx) = registry.register(7).await;
        drop(rx);

        registry.deliver(7, test_event()).await;
        assert_eq!(registry.connection_count(7).await, 0);
    }

    #[tokio::test]
    async fn test_deliver_fans_out_to_all_connections() {
        let registry = NotificationRegistry::new();
        let (_a, mut rx_a) = registry.register(7).await;
        let (_b, mut rx_b) = registry.register(7).await;

        registry.deliver(7, test_event()).await;

        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
    }
}
