//! DTOs de Alert

use serde::Serialize;

use crate::models::Alert;

/// Response de alerta para la API
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub id: i32,
    pub vehicle_id: i32,
    pub alert_type: String,
    pub severity: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub acknowledged: bool,
    pub created_at: String,
}

impl From<Alert> for AlertResponse {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            vehicle_id: alert.vehicle_id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            message: alert.message,
            details: alert.details,
            acknowledged: alert.acknowledged,
            created_at: alert.created_at.to_rfc3339(),
        }
    }
}
