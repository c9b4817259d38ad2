//! Controller de vehículos
//!
//! Ciclo de vida del dispositivo: aprovisionamiento (ADMIN), appairage por
//! el usuario, actualización de perfil, liberación y baja. El cambio de
//! `relay_cut` vía update NO escribe la columna: dispara el pipeline de
//! comando diferido y solo la confirmación del dispositivo lo materializa.

use validator::Validate;

use crate::dto::vehicle_dto::{
    PairVehicleRequest, ProvisionVehicleRequest, UpdateVehicleRequest, VehicleResponse,
};
use crate::dto::ApiResponse;
use crate::middleware::AuthUser;
use crate::models::{Vehicle, VehicleStatus};
use crate::repositories::VehicleRepository;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub struct VehicleController {
    state: AppState,
    repository: VehicleRepository,
}

impl VehicleController {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            repository: VehicleRepository::new(state.pool.clone()),
        }
    }

    /// Buscar el vehículo y verificar que el usuario puede verlo
    async fn find_owned(&self, id: i32, auth: &AuthUser) -> AppResult<Vehicle> {
        let vehicle = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

        if !auth.is_admin() && vehicle.owner_user_id != Some(auth.user_id) {
            return Err(AppError::Forbidden(
                "You do not have access to this vehicle".to_string(),
            ));
        }
        Ok(vehicle)
    }

    pub async fn list(&self, auth: &AuthUser, skip: i64, limit: i64) -> AppResult<Vec<VehicleResponse>> {
        let mut vehicles = if auth.is_admin() {
            self.repository.list_all(skip, limit).await?
        } else {
            self.repository.list_by_owner(auth.user_id, skip, limit).await?
        };

        // Chequeo perezoso: expirar comandos viejos antes de responder
        self.state.relay.apply_command_timeouts(&mut vehicles).await?;

        Ok(vehicles.into_iter().map(VehicleResponse::from).collect())
    }

    pub async fn get(&self, id: i32, auth: &AuthUser) -> AppResult<VehicleResponse> {
        let vehicle = self.find_owned(id, auth).await?;

        let mut vehicles = [vehicle];
        self.state.relay.apply_command_timeouts(&mut vehicles).await?;
        let [vehicle] = vehicles;

        Ok(VehicleResponse::from(vehicle))
    }

    /// Pre-registrar un dispositivo por su DevEUI (solo ADMIN). También lo
    /// da de alta en ChirpStack; un fallo ahí no aborta el registro local.
    pub async fn provision(
        &self,
        auth: &AuthUser,
        request: ProvisionVehicleRequest,
    ) -> AppResult<ApiResponse<VehicleResponse>> {
        if !auth.is_admin() {
            return Err(AppError::Forbidden("Admin privileges required".to_string()));
        }
        request.validate()?;

        let deveui = request.deveui.to_lowercase();
        if !deveui.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::ValidationError(
                "DevEUI must be 16 hexadecimal characters".to_string(),
            ));
        }

        if self.repository.deveui_exists(&deveui).await? {
            return Err(AppError::Conflict(format!(
                "Device with DevEUI '{}' already exists",
                deveui
            )));
        }

        let vehicle = self.repository.create_provisioned(&deveui).await?;

        let name = request.device_name.unwrap_or_else(|| format!("tracker-{}", deveui));
        let description = request.device_description.unwrap_or_default();
        self.state
            .chirpstack
            .register_device(&deveui, &name, &description)
            .await;

        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(vehicle),
            "Device provisioned".to_string(),
        ))
    }

    /// Un usuario reclama un dispositivo DISPONIBLE y lo convierte en su
    /// vehículo. Tras el appairage se sincroniza el estado inicial por
    /// downlink (relé activo, geofencing manual).
    pub async fn pair(
        &self,
        auth: &AuthUser,
        request: PairVehicleRequest,
    ) -> AppResult<ApiResponse<VehicleResponse>> {
        request.validate()?;

        let vehicle = self
            .repository
            .find_by_deveui(&request.deveui)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No device found with DevEUI '{}'", request.deveui))
            })?;

        if vehicle.owner_user_id.is_some() || vehicle.status != VehicleStatus::Available.as_str() {
            return Err(AppError::Conflict(
                "Device is already paired to another account".to_string(),
            ));
        }

        let vehicle = self
            .repository
            .pair(
                vehicle.id,
                auth.user_id,
                request.name,
                request.license_plate,
                request.brand,
                request.model,
                request.year,
            )
            .await?;

        // Sincronización inicial del dispositivo, best-effort
        self.state.chirpstack.send_start_command(&vehicle.deveui).await;
        self.state.chirpstack.send_command(&vehicle.deveui, "MANUAL").await;

        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(vehicle),
            "Vehicle paired".to_string(),
        ))
    }

    pub async fn update(
        &self,
        id: i32,
        auth: &AuthUser,
        request: UpdateVehicleRequest,
    ) -> AppResult<ApiResponse<VehicleResponse>> {
        request.validate()?;
        let vehicle = self.find_owned(id, auth).await?;

        let updated = self
            .repository
            .update_profile(
                &vehicle,
                request.name,
                request.license_plate,
                request.brand,
                request.model,
                request.year,
                request.status,
            )
            .await?;

        // relay_cut pedido: comando diferido, la columna no se toca acá
        if let Some(cut) = request.relay_cut {
            self.state.relay.request_cutoff(&updated, cut).await?;
        }

        if let Some(enabled) = request.auto_geofencing {
            self.repository.set_auto_geofencing(id, enabled).await?;
            let mode = if enabled { "AUTO" } else { "MANUAL" };
            self.state.chirpstack.send_command(&updated.deveui, mode).await;
        }

        // Releer para devolver el estado post-comando (command_pending, etc.)
        let fresh = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(fresh),
            "Vehicle updated".to_string(),
        ))
    }

    /// Desvincular el vehículo de su dueño y devolverlo al pool DISPONIBLE.
    /// Se pide el corte antes de soltar, como salvaguarda del dispositivo.
    pub async fn release(&self, id: i32, auth: &AuthUser) -> AppResult<ApiResponse<VehicleResponse>> {
        let vehicle = self.find_owned(id, auth).await?;

        self.state.chirpstack.send_stop_command(&vehicle.deveui).await;
        let released = self.repository.release(id).await?;

        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(released),
            "Vehicle released".to_string(),
        ))
    }

    /// Baja definitiva (solo ADMIN): elimina el device de ChirpStack y el
    /// registro local con su historial (cascada en la base)
    pub async fn delete(&self, id: i32, auth: &AuthUser) -> AppResult<()> {
        if !auth.is_admin() {
            return Err(AppError::Forbidden("Admin privileges required".to_string()));
        }

        let vehicle = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

        self.state.chirpstack.delete_device(&vehicle.deveui).await;
        self.repository.delete(id).await?;

        Ok(())
    }
}
