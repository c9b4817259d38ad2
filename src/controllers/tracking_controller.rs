//! Controller de tracking
//!
//! Lectura del historial de posiciones, última posición conocida e
//! ingestión manual de posiciones (p.ej. desde una app móvil).

use chrono::Utc;
use tracing::{error, info};

use crate::dto::position_dto::{CreatePositionRequest, PositionResponse};
use crate::middleware::AuthUser;
use crate::models::{MovementStatus, Vehicle};
use crate::repositories::{NewPosition, PositionRepository, VehicleRepository};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub struct TrackingController {
    state: AppState,
    positions: PositionRepository,
    vehicles: VehicleRepository,
}

impl TrackingController {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            positions: PositionRepository::new(state.pool.clone()),
            vehicles: VehicleRepository::new(state.pool.clone()),
        }
    }

    async fn check_access(&self, vehicle_id: i32, auth: &AuthUser) -> AppResult<()> {
        self.find_accessible(vehicle_id, auth).await.map(|_| ())
    }

    async fn find_accessible(&self, vehicle_id: i32, auth: &AuthUser) -> AppResult<Vehicle> {
        let vehicle = self
            .vehicles
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

        if !auth.is_admin() && vehicle.owner_user_id != Some(auth.user_id) {
            return Err(AppError::Forbidden(
                "You do not have access to this vehicle".to_string(),
            ));
        }
        Ok(vehicle)
    }

    /// Ingestión manual de una posición ya geodecodificada
    pub async fn create(
        &self,
        auth: &AuthUser,
        request: CreatePositionRequest,
    ) -> AppResult<PositionResponse> {
        let vehicle = self.find_accessible(request.vehicle_id, auth).await?;

        let speed = request.speed.unwrap_or(0.0);
        let now = Utc::now();
        let position = self
            .positions
            .insert(NewPosition {
                vehicle_id: vehicle.id,
                latitude: request.latitude,
                longitude: request.longitude,
                altitude: request.altitude,
                speed,
                heading: request.heading,
                fix_status: Some(1),
                satellites: request.satellites,
                movement_status: MovementStatus::from_speed(speed).as_str().to_string(),
                raw_payload: Some("MANUAL".to_string()),
                recorded_at: now,
            })
            .await?;

        info!(
            "📍 Posición manual {} de vehículo {} ({}, {})",
            position.id, vehicle.id, request.latitude, request.longitude
        );

        // Misma evaluación de geofence que el pipeline de uplinks
        match self
            .state
            .geofencing
            .check_and_enforce(&vehicle, request.latitude, request.longitude)
            .await
        {
            Ok(Some(inside)) => {
                if let Err(e) = self.positions.set_inside_zone(position.id, inside).await {
                    error!("Error anotando inside_zone en posición {}: {}", position.id, e);
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!("Error evaluando geofence para vehículo {}: {}", vehicle.id, e);
            }
        }

        self.vehicles
            .update_last_seen(vehicle.id, request.latitude, request.longitude, now)
            .await?;

        Ok(PositionResponse::from(position))
    }

    pub async fn history(
        &self,
        vehicle_id: i32,
        auth: &AuthUser,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<PositionResponse>> {
        self.check_access(vehicle_id, auth).await?;

        let positions = self.positions.list_by_vehicle(vehicle_id, skip, limit).await?;
        Ok(positions.into_iter().map(PositionResponse::from).collect())
    }

    pub async fn latest(&self, vehicle_id: i32, auth: &AuthUser) -> AppResult<PositionResponse> {
        self.check_access(vehicle_id, auth).await?;

        let mut positions = self.positions.list_by_vehicle(vehicle_id, 0, 1).await?;
        positions
            .pop()
            .map(PositionResponse::from)
            .ok_or_else(|| AppError::NotFound("No positions recorded for this vehicle".to_string()))
    }
}
