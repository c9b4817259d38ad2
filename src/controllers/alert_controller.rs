//! Controller de alertas
//!
//! Las alertas las crea el core (geofence, comandos de relé); acá solo se
//! listan y se acusan.

use crate::dto::alert_dto::AlertResponse;
use crate::dto::ApiResponse;
use crate::middleware::AuthUser;
use crate::repositories::{AlertRepository, VehicleRepository};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub struct AlertController {
    repository: AlertRepository,
    vehicles: VehicleRepository,
}

impl AlertController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: AlertRepository::new(state.pool.clone()),
            vehicles: VehicleRepository::new(state.pool.clone()),
        }
    }

    /// Alertas de todos los vehículos del usuario autenticado
    pub async fn list(&self, auth: &AuthUser, skip: i64, limit: i64) -> AppResult<Vec<AlertResponse>> {
        let alerts = self.repository.list_for_owner(auth.user_id, skip, limit).await?;
        Ok(alerts.into_iter().map(AlertResponse::from).collect())
    }

    pub async fn list_for_vehicle(
        &self,
        vehicle_id: i32,
        auth: &AuthUser,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<AlertResponse>> {
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

        let alerts = self.repository.list_for_vehicle(vehicle_id, skip, limit).await?;
        Ok(alerts.into_iter().map(AlertResponse::from).collect())
    }

    pub async fn acknowledge(&self, id: i32, auth: &AuthUser) -> AppResult<ApiResponse<AlertResponse>> {
        let alert = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Alert not found".to_string()))?;

        let vehicle = self
            .vehicles
            .find_by_id(alert.vehicle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

        if !auth.is_admin() && vehicle.owner_user_id != Some(auth.user_id) {
            return Err(AppError::Forbidden(
                "You do not have access to this alert".to_string(),
            ));
        }

        let acknowledged = self.repository.acknowledge(id, auth.user_id).await?;
        Ok(ApiResponse::success_with_message(
            AlertResponse::from(acknowledged),
            "Alert acknowledged".to_string(),
        ))
    }
}
