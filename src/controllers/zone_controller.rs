//! Controller de zonas de geofence
//!
//! CRUD con el invariante de una sola zona activa por vehículo (lo garantiza
//! el repositorio en transacción). Las zonas ligadas a un vehículo solo las
//! maneja su dueño o un ADMIN.

use validator::Validate;

use crate::dto::zone_dto::{CreateZoneRequest, UpdateZoneRequest, ZoneResponse};
use crate::dto::ApiResponse;
use crate::middleware::AuthUser;
use crate::models::Zone;
use crate::repositories::zone_repository::normalize_zone_type;
use crate::repositories::{NewZone, VehicleRepository, ZoneRepository};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub struct ZoneController {
    repository: ZoneRepository,
    vehicles: VehicleRepository,
}

impl ZoneController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: ZoneRepository::new(state.pool.clone()),
            vehicles: VehicleRepository::new(state.pool.clone()),
        }
    }

    /// Verificar que el usuario puede administrar zonas de este vehículo
    async fn check_vehicle_access(&self, vehicle_id: i32, auth: &AuthUser) -> AppResult<()> {
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
        Ok(())
    }

    async fn find_accessible(&self, id: i32, auth: &AuthUser) -> AppResult<Zone> {
        let zone = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Zone not found".to_string()))?;

        if let Some(vehicle_id) = zone.vehicle_id {
            self.check_vehicle_access(vehicle_id, auth).await?;
        } else if !auth.is_admin() {
            return Err(AppError::Forbidden(
                "Shared zones can only be managed by admins".to_string(),
            ));
        }
        Ok(zone)
    }

    pub async fn create(
        &self,
        auth: &AuthUser,
        request: CreateZoneRequest,
    ) -> AppResult<ApiResponse<ZoneResponse>> {
        request.validate()?;

        if let Some(vehicle_id) = request.vehicle_id {
            self.check_vehicle_access(vehicle_id, auth).await?;
        } else if !auth.is_admin() {
            return Err(AppError::Forbidden(
                "Shared zones can only be created by admins".to_string(),
            ));
        }

        let zone_type = normalize_zone_type(request.zone_type.as_deref());
        validate_geometry(
            &zone_type,
            request.center_lat,
            request.center_lon,
            request.radius_m,
            request.coordinates.as_deref(),
        )?;

        let zone = self
            .repository
            .create(NewZone {
                name: request.name,
                description: request.description,
                zone_type,
                center_lat: request.center_lat,
                center_lon: request.center_lon,
                radius_m: request.radius_m,
                coordinates: request.coordinates,
                color: request.color,
                active: request.active.unwrap_or(true),
                vehicle_id: request.vehicle_id,
            })
            .await?;

        Ok(ApiResponse::success_with_message(
            ZoneResponse::from(zone),
            "Zone created".to_string(),
        ))
    }

    pub async fn list(
        &self,
        auth: &AuthUser,
        vehicle_id: Option<i32>,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<ZoneResponse>> {
        if let Some(vehicle_id) = vehicle_id {
            self.check_vehicle_access(vehicle_id, auth).await?;
        } else if !auth.is_admin() {
            return Err(AppError::Forbidden(
                "Listing all zones requires admin privileges".to_string(),
            ));
        }

        let zones = self.repository.list(vehicle_id, skip, limit).await?;
        Ok(zones.into_iter().map(ZoneResponse::from).collect())
    }

    pub async fn get(&self, id: i32, auth: &AuthUser) -> AppResult<ZoneResponse> {
        let zone = self.find_accessible(id, auth).await?;
        Ok(ZoneResponse::from(zone))
    }

    pub async fn update(
        &self,
        id: i32,
        auth: &AuthUser,
        request: UpdateZoneRequest,
    ) -> AppResult<ApiResponse<ZoneResponse>> {
        request.validate()?;
        let zone = self.find_accessible(id, auth).await?;

        let zone_type = request
            .zone_type
            .as_deref()
            .map(|t| normalize_zone_type(Some(t)))
            .unwrap_or_else(|| zone.zone_type.clone());

        // La geometría efectiva es el merge de la request con la zona actual
        let effective_coordinates = match &request.coordinates {
            Some(coords) => coords.clone(),
            None => zone.polygon_coordinates(),
        };
        validate_geometry(
            &zone_type,
            request.center_lat.or(zone.center_lat.as_ref().and_then(decimal_to_f64)),
            request.center_lon.or(zone.center_lon.as_ref().and_then(decimal_to_f64)),
            request.radius_m.or(zone.radius_m),
            Some(&effective_coordinates),
        )?;

        let updated = self
            .repository
            .update(
                &zone,
                request.name,
                request.description,
                Some(zone_type),
                request.center_lat,
                request.center_lon,
                request.radius_m,
                request.coordinates,
                request.color,
                request.active,
            )
            .await?;

        Ok(ApiResponse::success_with_message(
            ZoneResponse::from(updated),
            "Zone updated".to_string(),
        ))
    }

    pub async fn delete(&self, id: i32, auth: &AuthUser) -> AppResult<()> {
        self.find_accessible(id, auth).await?;
        self.repository.delete(id).await?;
        Ok(())
    }
}

fn decimal_to_f64(d: &rust_decimal::Decimal) -> Option<f64> {
    rust_decimal::prelude::ToPrimitive::to_f64(d)
}

/// Validar la geometría según el tipo de zona
fn validate_geometry(
    zone_type: &str,
    center_lat: Option<f64>,
    center_lon: Option<f64>,
    radius_m: Option<i32>,
    coordinates: Option<&[crate::models::LatLng]>,
) -> AppResult<()> {
    if zone_type == "POLYGON" {
        let count = coordinates.map(|c| c.len()).unwrap_or(0);
        if count < 3 {
            return Err(AppError::ValidationError(
                "A polygon zone requires at least 3 coordinates".to_string(),
            ));
        }
    } else {
        if center_lat.is_none() || center_lon.is_none() || radius_m.is_none() {
            return Err(AppError::ValidationError(
                "A circle zone requires center_lat, center_lon and radius_m".to_string(),
            ));
        }
    }
    Ok(())
}
