//! DTOs de Position

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Position;

/// Request de ingestión directa de una posición
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePositionRequest {
    pub vehicle_id: i32,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub altitude: Option<f64>,

    #[validate(range(min = 0.0, max = 1000.0))]
    pub speed: Option<f64>,

    #[validate(range(min = 0.0, max = 360.0))]
    pub heading: Option<f64>,

    pub satellites: Option<i32>,
}

/// Response de posición para la API
#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub id: i32,
    pub vehicle_id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub speed: f64,
    pub heading: Option<f64>,
    pub satellites: Option<i32>,
    pub movement_status: String,
    pub inside_zone: Option<bool>,
    pub recorded_at: String,
}

impl From<Position> for PositionResponse {
    fn from(position: Position) -> Self {
        Self {
            id: position.id,
            vehicle_id: position.vehicle_id,
            latitude: position.latitude.to_f64().unwrap_or(0.0),
            longitude: position.longitude.to_f64().unwrap_or(0.0),
            altitude: position.altitude,
            speed: position.speed,
            heading: position.heading,
            satellites: position.satellites,
            movement_status: position.movement_status,
            inside_zone: position.inside_zone,
            recorded_at: position.recorded_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(latitude: f64, longitude: f64) -> CreatePositionRequest {
        CreatePositionRequest {
            vehicle_id: 1,
            latitude,
            longitude,
            altitude: None,
            speed: None,
            heading: None,
            satellites: None,
        }
    }

    #[test]
    fn test_valid_position_request() {
        assert!(request(19.6, -99.1).validate().is_ok());
        assert!(request(-90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn test_coordinates_out_of_range_rejected() {
        assert!(request(90.5, 0.0).validate().is_err());
        assert!(request(0.0, -180.5).validate().is_err());
    }

    #[test]
    fn test_optional_fields_validated_when_present() {
        let mut req = request(19.6, -99.1);
        req.speed = Some(1500.0);
        assert!(req.validate().is_err());

        let mut req = request(19.6, -99.1);
        req.heading = Some(361.0);
        assert!(req.validate().is_err());
    }
}
