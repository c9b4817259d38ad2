//! Repositorio de Position
//!
//! Inserciones append-only; la única mutación permitida es anotar
//! `inside_zone` justo después de la evaluación de geofence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::Position;
use crate::utils::errors::AppError;

/// Datos de una posición nueva (antes de insertar)
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub vehicle_id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub speed: f64,
    pub heading: Option<f64>,
    pub fix_status: Option<i16>,
    pub satellites: Option<i32>,
    pub movement_status: String,
    pub raw_payload: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PositionRepository {
    pool: PgPool,
}

impl PositionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: NewPosition) -> Result<Position, AppError> {
        let lat = Decimal::from_f64_retain(new.latitude)
            .ok_or_else(|| AppError::ValidationError("Invalid latitude value".to_string()))?;
        let lon = Decimal::from_f64_retain(new.longitude)
            .ok_or_else(|| AppError::ValidationError("Invalid longitude value".to_string()))?;

        let position = sqlx::query_as::<_, Position>(
            r#"
            INSERT INTO positions (
                vehicle_id, latitude, longitude, altitude, speed, heading,
                fix_status, satellites, movement_status, inside_zone,
                raw_payload, recorded_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(new.vehicle_id)
        .bind(lat)
        .bind(lon)
        .bind(new.altitude)
        .bind(new.speed)
        .bind(new.heading)
        .bind(new.fix_status)
        .bind(new.satellites)
        .bind(new.movement_status)
        .bind(new.raw_payload)
        .bind(new.recorded_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error inserting position: {}", e)))?;

        Ok(position)
    }

    /// Anotar el resultado de la evaluación de geofence sobre una posición ya persistida
    pub async fn set_inside_zone(&self, id: i32, inside: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE positions SET inside_zone = $2 WHERE id = $1")
            .bind(id)
            .bind(inside)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error updating inside_zone: {}", e)))?;

        Ok(())
    }

    pub async fn list_by_vehicle(
        &self,
        vehicle_id: i32,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Position>, AppError> {
        let positions = sqlx::query_as::<_, Position>(
            r#"
            SELECT * FROM positions
            WHERE vehicle_id = $1
            ORDER BY recorded_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(vehicle_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing positions: {}", e)))?;

        Ok(positions)
    }
}
