//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle y sus estados. Mapea exactamente
//! al schema PostgreSQL (tabla `vehicles`, primary key `id`).
//!
//! Campos de relé: `relay_cut` refleja el último estado confirmado por el
//! dispositivo; `command_pending` + `command_issued_at` marcan un comando en
//! vuelo a la espera de confirmación (o timeout).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Estado del vehículo - mapea a la columna `status`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VehicleStatus {
    Available,
    Active,
    Inactive,
    Maintenance,
    Suspended,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "AVAILABLE",
            VehicleStatus::Active => "ACTIVE",
            VehicleStatus::Inactive => "INACTIVE",
            VehicleStatus::Maintenance => "MAINTENANCE",
            VehicleStatus::Suspended => "SUSPENDED",
        }
    }
}

/// Vehicle principal - mapea exactamente a la tabla `vehicles`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: i32,
    /// DevEUI LoRaWAN: 16 caracteres hex, único, comparación case-insensitive
    pub deveui: String,
    pub name: Option<String>,
    pub license_plate: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub status: String,
    /// NULL mientras el dispositivo está DISPONIBLE (sin reclamar)
    pub owner_user_id: Option<i32>,
    pub relay_cut: bool,
    pub command_pending: bool,
    pub command_issued_at: Option<DateTime<Utc>>,
    pub auto_geofencing: bool,
    pub last_position_lat: Option<Decimal>,
    pub last_position_lon: Option<Decimal>,
    pub last_communication: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Nombre legible para mensajes de alerta (matrícula > nombre > deveui)
    pub fn display_name(&self) -> &str {
        self.license_plate
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.deveui)
    }
}
