//! Repositorio de Vehicle
//!
//! Todas las lecturas/escrituras sobre la tabla `vehicles`. Los campos de
//! relé se actualizan siempre con updates de una sola fila: la serialización
//! por vehículo es suficiente, no hay coordinación entre vehículos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::{Vehicle, VehicleStatus};
use crate::utils::errors::AppError;

/// Escrituras de estado de comandos de relé.
///
/// Seam entre RelayService y la base: los tests del servicio inyectan un
/// store en memoria en lugar del repositorio real.
#[async_trait]
pub trait RelayCommandStore: Send + Sync {
    async fn list_pending_commands(&self) -> Result<Vec<Vehicle>, AppError>;
    async fn mark_command_pending(&self, id: i32, issued_at: DateTime<Utc>)
        -> Result<(), AppError>;
    async fn clear_command_pending(&self, id: i32) -> Result<(), AppError>;
    async fn apply_relay_confirmation(&self, id: i32, relay_cut: bool) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct VehicleRepository {
    pool: PgPool,
}

#[async_trait]
impl RelayCommandStore for VehicleRepository {
    async fn list_pending_commands(&self) -> Result<Vec<Vehicle>, AppError> {
        VehicleRepository::list_pending_commands(self).await
    }

    async fn mark_command_pending(
        &self,
        id: i32,
        issued_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        VehicleRepository::mark_command_pending(self, id, issued_at).await
    }

    async fn clear_command_pending(&self, id: i32) -> Result<(), AppError> {
        VehicleRepository::clear_command_pending(self, id).await
    }

    async fn apply_relay_confirmation(&self, id: i32, relay_cut: bool) -> Result<(), AppError> {
        VehicleRepository::apply_relay_confirmation(self, id, relay_cut).await
    }
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error finding vehicle: {}", e)))?;

        Ok(vehicle)
    }

    /// Búsqueda por DevEUI, case-insensitive (los uplinks pueden llegar en
    /// mayúsculas o minúsculas según la versión de ChirpStack)
    pub async fn find_by_deveui(&self, deveui: &str) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE LOWER(deveui) = LOWER($1)",
        )
        .bind(deveui)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error finding vehicle by deveui: {}", e)))?;

        Ok(vehicle)
    }

    pub async fn deveui_exists(&self, deveui: &str) -> Result<bool, AppError> {
        let result: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE LOWER(deveui) = LOWER($1))",
        )
        .bind(deveui)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error checking deveui: {}", e)))?;

        Ok(result.0)
    }

    pub async fn list_by_owner(
        &self,
        owner_user_id: i32,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Vehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE owner_user_id = $1 ORDER BY created_at DESC OFFSET $2 LIMIT $3",
        )
        .bind(owner_user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing vehicles: {}", e)))?;

        Ok(vehicles)
    }

    pub async fn list_all(&self, skip: i64, limit: i64) -> Result<Vec<Vehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles ORDER BY created_at DESC OFFSET $1 LIMIT $2",
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing vehicles: {}", e)))?;

        Ok(vehicles)
    }

    /// Vehículos con un comando de relé en vuelo (para el barrido de timeouts)
    pub async fn list_pending_commands(&self) -> Result<Vec<Vehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE command_pending = TRUE",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing pending commands: {}", e)))?;

        Ok(vehicles)
    }

    /// Pre-registrar un DevEUI: estado AVAILABLE, sin propietario
    pub async fn create_provisioned(&self, deveui: &str) -> Result<Vehicle, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (deveui, status, created_at, updated_at)
            VALUES (LOWER($1), $2, $3, $3)
            RETURNING *
            "#,
        )
        .bind(deveui)
        .bind(VehicleStatus::Available.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error provisioning vehicle: {}", e)))?;

        Ok(vehicle)
    }

    /// Appairage: el usuario reclama un dispositivo DISPONIBLE
    #[allow(clippy::too_many_arguments)]
    pub async fn pair(
        &self,
        id: i32,
        owner_user_id: i32,
        name: String,
        license_plate: Option<String>,
        brand: Option<String>,
        model: Option<String>,
        year: Option<i32>,
    ) -> Result<Vehicle, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET name = $2, license_plate = $3, brand = $4, model = $5, year = $6,
                owner_user_id = $7, status = $8, activated_at = $9, updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(license_plate)
        .bind(brand)
        .bind(model)
        .bind(year)
        .bind(owner_user_id)
        .bind(VehicleStatus::Active.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error pairing vehicle: {}", e)))?;

        Ok(vehicle)
    }

    /// Actualizar los campos descriptivos (merge con los valores actuales)
    #[allow(clippy::too_many_arguments)]
    pub async fn update_profile(
        &self,
        current: &Vehicle,
        name: Option<String>,
        license_plate: Option<String>,
        brand: Option<String>,
        model: Option<String>,
        year: Option<i32>,
        status: Option<String>,
    ) -> Result<Vehicle, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET name = $2, license_plate = $3, brand = $4, model = $5, year = $6,
                status = $7, updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(name.or_else(|| current.name.clone()))
        .bind(license_plate.or_else(|| current.license_plate.clone()))
        .bind(brand.or_else(|| current.brand.clone()))
        .bind(model.or_else(|| current.model.clone()))
        .bind(year.or(current.year))
        .bind(status.unwrap_or_else(|| current.status.clone()))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating vehicle: {}", e)))?;

        Ok(vehicle)
    }

    /// Marcar comando en vuelo (no toca relay_cut: solo la confirmación lo hace)
    pub async fn mark_command_pending(
        &self,
        id: i32,
        issued_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE vehicles SET command_pending = TRUE, command_issued_at = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(issued_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error marking command pending: {}", e)))?;

        Ok(())
    }

    /// Limpiar el comando en vuelo sin tocar relay_cut (timeout)
    pub async fn clear_command_pending(&self, id: i32) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE vehicles SET command_pending = FALSE, command_issued_at = NULL, updated_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error clearing command pending: {}", e)))?;

        Ok(())
    }

    /// Confirmación del dispositivo: materializa relay_cut y cierra el comando
    pub async fn apply_relay_confirmation(
        &self,
        id: i32,
        relay_cut: bool,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE vehicles
            SET relay_cut = $2, command_pending = FALSE, command_issued_at = NULL, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(relay_cut)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error applying relay confirmation: {}", e)))?;

        Ok(())
    }

    pub async fn set_auto_geofencing(&self, id: i32, enabled: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE vehicles SET auto_geofencing = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error updating auto_geofencing: {}", e)))?;

        Ok(())
    }

    /// Cache de última posición conocida
    pub async fn update_last_seen(
        &self,
        id: i32,
        lat: f64,
        lon: f64,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let lat = Decimal::from_f64_retain(lat)
            .ok_or_else(|| AppError::ValidationError("Invalid latitude value".to_string()))?;
        let lon = Decimal::from_f64_retain(lon)
            .ok_or_else(|| AppError::ValidationError("Invalid longitude value".to_string()))?;

        sqlx::query(
            r#"
            UPDATE vehicles
            SET last_position_lat = $2, last_position_lon = $3, last_communication = $4, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(lat)
        .bind(lon)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating last position: {}", e)))?;

        Ok(())
    }

    /// Liberar el dispositivo: limpia datos personales y vuelve a AVAILABLE
    pub async fn release(&self, id: i32) -> Result<Vehicle, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET name = NULL, license_plate = NULL, brand = NULL, model = NULL, year = NULL,
                owner_user_id = NULL, status = $2, relay_cut = FALSE,
                command_pending = FALSE, command_issued_at = NULL, auto_geofencing = FALSE,
                activated_at = NULL, last_communication = NULL,
                last_position_lat = NULL, last_position_lon = NULL, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(VehicleStatus::Available.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error releasing vehicle: {}", e)))?;

        Ok(vehicle)
    }

    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error deleting vehicle: {}", e)))?;

        Ok(())
    }
}
