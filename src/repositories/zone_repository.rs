//! Repositorio de Zone
//!
//! Invariante: como máximo una zona activa por vehículo. Activar una zona
//! (create o update con active=true) desactiva a las hermanas dentro de la
//! misma transacción.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::{LatLng, Zone, ZoneType};
use crate::utils::errors::AppError;

/// Fuente de la zona activa de un vehículo.
///
/// Seam para que los tests de GeofencingService fijen la zona sin base de
/// datos.
#[async_trait]
pub trait ActiveZoneSource: Send + Sync {
    async fn find_active_for_vehicle(&self, vehicle_id: i32) -> Result<Option<Zone>, AppError>;
}

/// Datos de una zona nueva, ya normalizados por el controller
#[derive(Debug, Clone)]
pub struct NewZone {
    pub name: String,
    pub description: Option<String>,
    pub zone_type: String,
    pub center_lat: Option<f64>,
    pub center_lon: Option<f64>,
    pub radius_m: Option<i32>,
    pub coordinates: Option<Vec<LatLng>>,
    pub color: Option<String>,
    pub active: bool,
    pub vehicle_id: Option<i32>,
}

#[derive(Clone)]
pub struct ZoneRepository {
    pool: PgPool,
}

#[async_trait]
impl ActiveZoneSource for ZoneRepository {
    async fn find_active_for_vehicle(&self, vehicle_id: i32) -> Result<Option<Zone>, AppError> {
        ZoneRepository::find_active_for_vehicle(self, vehicle_id).await
    }
}

impl ZoneRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Zone>, AppError> {
        let zone = sqlx::query_as::<_, Zone>("SELECT * FROM geofence_zones WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error finding zone: {}", e)))?;

        Ok(zone)
    }

    /// La zona activa de un vehículo (a lo sumo una, por invariante)
    pub async fn find_active_for_vehicle(&self, vehicle_id: i32) -> Result<Option<Zone>, AppError> {
        let zone = sqlx::query_as::<_, Zone>(
            "SELECT * FROM geofence_zones WHERE vehicle_id = $1 AND active = TRUE LIMIT 1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error finding active zone: {}", e)))?;

        Ok(zone)
    }

    pub async fn list(
        &self,
        vehicle_id: Option<i32>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Zone>, AppError> {
        let zones = match vehicle_id {
            Some(vid) => {
                sqlx::query_as::<_, Zone>(
                    "SELECT * FROM geofence_zones WHERE vehicle_id = $1 ORDER BY created_at DESC OFFSET $2 LIMIT $3",
                )
                .bind(vid)
                .bind(skip)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Zone>(
                    "SELECT * FROM geofence_zones ORDER BY created_at DESC OFFSET $1 LIMIT $2",
                )
                .bind(skip)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::DatabaseError(format!("Error listing zones: {}", e)))?;

        Ok(zones)
    }

    /// Crear una zona. Si nace activa y ligada a un vehículo, desactiva a las
    /// hermanas de ese vehículo en la misma transacción.
    pub async fn create(&self, new: NewZone) -> Result<Zone, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        if new.active {
            if let Some(vehicle_id) = new.vehicle_id {
                sqlx::query(
                    "UPDATE geofence_zones SET active = FALSE, updated_at = $2 WHERE vehicle_id = $1 AND active = TRUE",
                )
                .bind(vehicle_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Error deactivating sibling zones: {}", e))
                })?;
            }
        }

        let coordinates = coordinates_to_json(&new.coordinates)?;

        let zone = sqlx::query_as::<_, Zone>(
            r#"
            INSERT INTO geofence_zones (
                name, description, zone_type, center_lat, center_lon, radius_m,
                coordinates, color, active, vehicle_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(new.name)
        .bind(new.description)
        .bind(new.zone_type)
        .bind(to_decimal(new.center_lat)?)
        .bind(to_decimal(new.center_lon)?)
        .bind(new.radius_m)
        .bind(coordinates)
        .bind(new.color)
        .bind(new.active)
        .bind(new.vehicle_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error creating zone: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error committing transaction: {}", e)))?;

        Ok(zone)
    }

    /// Actualizar una zona (merge con los valores actuales). Si pasa a activa,
    /// desactiva a las hermanas en la misma transacción.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        current: &Zone,
        name: Option<String>,
        description: Option<String>,
        zone_type: Option<String>,
        center_lat: Option<f64>,
        center_lon: Option<f64>,
        radius_m: Option<i32>,
        coordinates: Option<Vec<LatLng>>,
        color: Option<String>,
        active: Option<bool>,
    ) -> Result<Zone, AppError> {
        let will_be_active = active.unwrap_or(current.active);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        if will_be_active {
            if let Some(vehicle_id) = current.vehicle_id {
                sqlx::query(
                    r#"
                    UPDATE geofence_zones SET active = FALSE, updated_at = $3
                    WHERE vehicle_id = $1 AND active = TRUE AND id != $2
                    "#,
                )
                .bind(vehicle_id)
                .bind(current.id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Error deactivating sibling zones: {}", e))
                })?;
            }
        }

        let coordinates_json = match coordinates {
            Some(coords) => coordinates_to_json(&Some(coords))?,
            None => current.coordinates.clone(),
        };

        let center_lat = match center_lat {
            Some(v) => to_decimal(Some(v))?,
            None => current.center_lat,
        };
        let center_lon = match center_lon {
            Some(v) => to_decimal(Some(v))?,
            None => current.center_lon,
        };

        let zone = sqlx::query_as::<_, Zone>(
            r#"
            UPDATE geofence_zones
            SET name = $2, description = $3, zone_type = $4, center_lat = $5,
                center_lon = $6, radius_m = $7, coordinates = $8, color = $9,
                active = $10, updated_at = $11
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(name.unwrap_or_else(|| current.name.clone()))
        .bind(description.or_else(|| current.description.clone()))
        .bind(zone_type.unwrap_or_else(|| current.zone_type.clone()))
        .bind(center_lat)
        .bind(center_lon)
        .bind(radius_m.or(current.radius_m))
        .bind(coordinates_json)
        .bind(color.or_else(|| current.color.clone()))
        .bind(will_be_active)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating zone: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error committing transaction: {}", e)))?;

        Ok(zone)
    }

    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        sqlx::query("DELETE FROM geofence_zones WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error deleting zone: {}", e)))?;

        Ok(())
    }
}

fn to_decimal(value: Option<f64>) -> Result<Option<Decimal>, AppError> {
    match value {
        Some(v) => Decimal::from_f64_retain(v)
            .map(Some)
            .ok_or_else(|| AppError::ValidationError("Invalid coordinate value".to_string())),
        None => Ok(None),
    }
}

fn coordinates_to_json(
    coordinates: &Option<Vec<LatLng>>,
) -> Result<Option<serde_json::Value>, AppError> {
    match coordinates {
        Some(coords) => serde_json::to_value(coords)
            .map(Some)
            .map_err(|e| AppError::Internal(format!("Error serializing coordinates: {}", e))),
        None => Ok(None),
    }
}

/// Normalizar el tipo de zona recibido de la API ("CIRCLE" por defecto)
pub fn normalize_zone_type(zone_type: Option<&str>) -> String {
    match zone_type {
        Some(t) if t.eq_ignore_ascii_case("POLYGON") => ZoneType::Polygon.as_str().to_string(),
        _ => ZoneType::Circle.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_zone_type() {
        assert_eq!(normalize_zone_type(Some("POLYGON")), "POLYGON");
        assert_eq!(normalize_zone_type(Some("polygon")), "POLYGON");
        assert_eq!(normalize_zone_type(Some("CIRCLE")), "CIRCLE");
        assert_eq!(normalize_zone_type(Some("anything")), "CIRCLE");
        assert_eq!(normalize_zone_type(None), "CIRCLE");
    }
}
