//! Modelo de Alert
//!
//! Las alertas las crea el core como efecto secundario de transiciones de
//! estado; después de creadas solo mutan los campos de acuse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Categoría de alerta - mapea a la columna `alert_type`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertType {
    GeofenceBreach,
    RelayCommand,
    CommandTimeout,
    SpeedLimit,
    LowBattery,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::GeofenceBreach => "GEOFENCE_BREACH",
            AlertType::RelayCommand => "RELAY_COMMAND",
            AlertType::CommandTimeout => "COMMAND_TIMEOUT",
            AlertType::SpeedLimit => "SPEED_LIMIT",
            AlertType::LowBattery => "LOW_BATTERY",
        }
    }
}

/// Severidad de alerta - mapea a la columna `severity`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertSeverity {
    Low,
    Medium,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

/// Alert - mapea exactamente a la tabla `alerts`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: i32,
    pub vehicle_id: i32,
    pub alert_type: String,
    pub severity: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<i32>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
