//! DTOs de Zone (geofence)

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{LatLng, Zone};

/// Request para crear una zona
#[derive(Debug, Deserialize, Validate)]
pub struct CreateZoneRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    /// "CIRCLE" (default) o "POLYGON"
    pub zone_type: Option<String>,

    pub center_lat: Option<f64>,
    pub center_lon: Option<f64>,

    #[validate(range(min = 1, max = 65535))]
    pub radius_m: Option<i32>,

    pub coordinates: Option<Vec<LatLng>>,

    #[validate(length(max = 20))]
    pub color: Option<String>,

    pub active: Option<bool>,

    pub vehicle_id: Option<i32>,
}

/// Request para actualizar una zona
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateZoneRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub zone_type: Option<String>,

    pub center_lat: Option<f64>,
    pub center_lon: Option<f64>,

    #[validate(range(min = 1, max = 65535))]
    pub radius_m: Option<i32>,

    pub coordinates: Option<Vec<LatLng>>,

    #[validate(length(max = 20))]
    pub color: Option<String>,

    pub active: Option<bool>,
}

/// Response de zona para la API
#[derive(Debug, Serialize)]
pub struct ZoneResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub zone_type: String,
    pub center_lat: Option<f64>,
    pub center_lon: Option<f64>,
    pub radius_m: Option<i32>,
    pub coordinates: Vec<LatLng>,
    pub color: Option<String>,
    pub active: bool,
    pub vehicle_id: Option<i32>,
    pub created_at: String,
}

impl From<Zone> for ZoneResponse {
    fn from(zone: Zone) -> Self {
        let coordinates = zone.polygon_coordinates();
        Self {
            id: zone.id,
            name: zone.name,
            description: zone.description,
            zone_type: zone.zone_type,
            center_lat: zone.center_lat.and_then(|d| d.to_f64()),
            center_lon: zone.center_lon.and_then(|d| d.to_f64()),
            radius_m: zone.radius_m,
            coordinates,
            color: zone.color,
            active: zone.active,
            vehicle_id: zone.vehicle_id,
            created_at: zone.created_at.to_rfc3339(),
        }
    }
}
