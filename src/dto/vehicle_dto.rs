//! DTOs de Vehicle

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Vehicle;

/// Request para pre-registrar un dispositivo LoRaWAN por su DevEUI (solo ADMIN)
#[derive(Debug, Deserialize, Validate)]
pub struct ProvisionVehicleRequest {
    /// 16 caracteres hex
    #[validate(length(min = 16, max = 16))]
    pub deveui: String,

    #[validate(length(max = 100))]
    pub device_name: Option<String>,

    #[validate(length(max = 255))]
    pub device_description: Option<String>,
}

/// Request para que un usuario reclame un dispositivo DISPONIBLE
#[derive(Debug, Deserialize, Validate)]
pub struct PairVehicleRequest {
    #[validate(length(min = 16, max = 16))]
    pub deveui: String,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 50))]
    pub license_plate: Option<String>,

    #[validate(length(max = 50))]
    pub brand: Option<String>,

    #[validate(length(max = 50))]
    pub model: Option<String>,

    #[validate(range(min = 1950, max = 2050))]
    pub year: Option<i32>,
}

/// Request para actualizar un vehículo existente
///
/// `relay_cut` NO se escribe directamente: dispara el pipeline de comando
/// diferido (PENDING + downlink) y solo la confirmación del dispositivo lo
/// materializa.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 50))]
    pub license_plate: Option<String>,

    #[validate(length(max = 50))]
    pub brand: Option<String>,

    #[validate(length(max = 50))]
    pub model: Option<String>,

    #[validate(range(min = 1950, max = 2050))]
    pub year: Option<i32>,

    pub status: Option<String>,

    pub relay_cut: Option<bool>,

    pub auto_geofencing: Option<bool>,
}

/// Response de vehículo para la API
#[derive(Debug, Serialize)]
pub struct VehicleResponse {
    pub id: i32,
    pub deveui: String,
    pub name: Option<String>,
    pub license_plate: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub status: String,
    pub owner_user_id: Option<i32>,
    pub relay_cut: bool,
    pub command_pending: bool,
    pub command_issued_at: Option<String>,
    pub auto_geofencing: bool,
    pub last_position_lat: Option<f64>,
    pub last_position_lon: Option<f64>,
    pub last_communication: Option<String>,
    pub created_at: String,
}

impl From<Vehicle> for VehicleResponse {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            id: vehicle.id,
            deveui: vehicle.deveui,
            name: vehicle.name,
            license_plate: vehicle.license_plate,
            brand: vehicle.brand,
            model: vehicle.model,
            year: vehicle.year,
            status: vehicle.status,
            owner_user_id: vehicle.owner_user_id,
            relay_cut: vehicle.relay_cut,
            command_pending: vehicle.command_pending,
            command_issued_at: vehicle.command_issued_at.map(|t| t.to_rfc3339()),
            auto_geofencing: vehicle.auto_geofencing,
            last_position_lat: vehicle.last_position_lat.and_then(|d| d.to_f64()),
            last_position_lon: vehicle.last_position_lon.and_then(|d| d.to_f64()),
            last_communication: vehicle.last_communication.map(|t| t.to_rfc3339()),
            created_at: vehicle.created_at.to_rfc3339(),
        }
    }
}
