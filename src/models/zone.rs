//! Modelo de Zone (geofence)
//!
//! Zona circular (centro + radio) o poligonal (lista ordenada de vértices).
//! Invariante del sistema: como máximo una zona activa por vehículo.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Tipo de zona - mapea a la columna `zone_type`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ZoneType {
    Circle,
    Polygon,
}

impl ZoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Circle => "CIRCLE",
            ZoneType::Polygon => "POLYGON",
        }
    }
}

/// Vértice de polígono, en el formato {lat, lng} que usan los mapas del frontend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Zone - mapea exactamente a la tabla `geofence_zones`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Zone {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub zone_type: String,
    pub center_lat: Option<Decimal>,
    pub center_lon: Option<Decimal>,
    pub radius_m: Option<i32>,
    pub color: Option<String>,
    pub active: bool,
    /// Lista JSON de {lat, lng} para polígonos
    pub coordinates: Option<serde_json::Value>,
    /// NULL = zona compartida/global
    pub vehicle_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Zone {
    pub fn is_polygon(&self) -> bool {
        self.zone_type == ZoneType::Polygon.as_str()
    }

    /// Vértices del polígono; lista vacía si el JSON falta o está malformado
    pub fn polygon_coordinates(&self) -> Vec<LatLng> {
        self.coordinates
            .as_ref()
            .and_then(|v| serde_json::from_value::<Vec<LatLng>>(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.center_lat.as_ref().and_then(|d| d.to_f64()).unwrap_or(0.0),
            self.center_lon.as_ref().and_then(|d| d.to_f64()).unwrap_or(0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn zone_with_coordinates(coordinates: Option<serde_json::Value>) -> Zone {
        Zone {
            id: 1,
            name: "Depósito".to_string(),
            description: None,
            zone_type: ZoneType::Polygon.as_str().to_string(),
            center_lat: None,
            center_lon: None,
            radius_m: None,
            color: Some("#00FF00".to_string()),
            active: true,
            coordinates,
            vehicle_id: Some(3),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_polygon_coordinates_parses_lat_lng_list() {
        let zone = zone_with_coordinates(Some(json!([
            {"lat": 3.86, "lng": 11.51},
            {"lat": 3.87, "lng": 11.52}
        ])));
        let coords = zone.polygon_coordinates();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[0], LatLng { lat: 3.86, lng: 11.51 });
    }

    #[test]
    fn test_polygon_coordinates_tolerates_malformed_json() {
        assert!(zone_with_coordinates(None).polygon_coordinates().is_empty());
        assert!(zone_with_coordinates(Some(json!("garbage")))
            .polygon_coordinates()
            .is_empty());
    }
}
