//! Modelo de Position
//!
//! Registro GPS append-only. Solo lo crea el pipeline de uplinks (y el
//! endpoint de ingestión directa); `inside_zone` se anota una única vez
//! justo después de la evaluación de geofence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Estado de movimiento derivado de la velocidad
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MovementStatus {
    Moving,
    Stopped,
}

/// Umbral en km/h por encima del cual el vehículo se considera en movimiento
pub const MOVING_SPEED_THRESHOLD_KMH: f64 = 5.0;

impl MovementStatus {
    pub fn from_speed(speed_kmh: f64) -> Self {
        if speed_kmh > MOVING_SPEED_THRESHOLD_KMH {
            MovementStatus::Moving
        } else {
            MovementStatus::Stopped
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Moving => "MOVING",
            MovementStatus::Stopped => "STOPPED",
        }
    }
}

/// Position - mapea exactamente a la tabla `positions`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub id: i32,
    pub vehicle_id: i32,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub altitude: Option<f64>,
    pub speed: f64,
    pub heading: Option<f64>,
    pub fix_status: Option<i16>,
    pub satellites: Option<i32>,
    pub movement_status: String,
    /// NULL cuando no se evaluó geofence (sin zona activa o modo auto apagado)
    pub inside_zone: Option<bool>,
    pub raw_payload: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_status_from_speed() {
        assert_eq!(MovementStatus::from_speed(0.0), MovementStatus::Stopped);
        assert_eq!(MovementStatus::from_speed(5.0), MovementStatus::Stopped);
        assert_eq!(MovementStatus::from_speed(5.1), MovementStatus::Moving);
        assert_eq!(MovementStatus::from_speed(12.0), MovementStatus::Moving);
    }
}
