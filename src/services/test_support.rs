//! Dobles en memoria de los repositorios para tests de servicios

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::environment::EnvironmentConfig;
use crate::models::{Alert, Vehicle, Zone};
use crate::repositories::{ActiveZoneSource, AlertSink, NewAlert, RelayCommandStore};
use crate::services::chirpstack_service::ChirpstackClient;
use crate::utils::errors::AppError;

/// Config mínima de test; sin API key de ChirpStack los downlinks son no-ops
pub fn test_config() -> EnvironmentConfig {
    EnvironmentConfig {
        environment: "test".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
        jwt_secret: "test-secret".to_string(),
        cors_origins: vec!["*".to_string()],
        chirpstack_api_url: "http://127.0.0.1:9".to_string(),
        chirpstack_api_key: None,
        osrm_enabled: false,
        osrm_url: "http://127.0.0.1:9".to_string(),
    }
}

pub fn test_chirpstack() -> ChirpstackClient {
    ChirpstackClient::new(&test_config())
}

pub fn test_vehicle(id: i32, relay_cut: bool, command_pending: bool) -> Vehicle {
    Vehicle {
        id,
        deveui: format!("a1b2c3d4e5f607{:02x}", id as u8),
        name: Some("Test".to_string()),
        license_plate: Some("ABC-123".to_string()),
        brand: None,
        model: None,
        year: None,
        status: "ACTIVE".to_string(),
        owner_user_id: Some(10),
        relay_cut,
        command_pending,
        command_issued_at: if command_pending { Some(Utc::now()) } else { None },
        auto_geofencing: true,
        last_position_lat: Some(Decimal::new(196, 1)),
        last_position_lon: Some(Decimal::new(-991, 1)),
        last_communication: None,
        activated_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn circle_zone(id: i32, lat: f64, lon: f64, radius_m: i32) -> Zone {
    Zone {
        id,
        name: "Base".to_string(),
        description: None,
        zone_type: "CIRCLE".to_string(),
        center_lat: Decimal::from_f64_retain(lat),
        center_lon: Decimal::from_f64_retain(lon),
        radius_m: Some(radius_m),
        color: None,
        active: true,
        coordinates: None,
        vehicle_id: Some(1),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Store de vehículos en memoria: solo las columnas de relé
pub struct MemoryCommandStore {
    vehicles: Mutex<Vec<Vehicle>>,
}

impl MemoryCommandStore {
    pub fn with(vehicles: Vec<Vehicle>) -> Self {
        Self {
            vehicles: Mutex::new(vehicles),
        }
    }

    pub fn get(&self, id: i32) -> Option<Vehicle> {
        self.vehicles
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == id)
            .cloned()
    }
}

#[async_trait]
impl RelayCommandStore for MemoryCommandStore {
    async fn list_pending_commands(&self) -> Result<Vec<Vehicle>, AppError> {
        Ok(self
            .vehicles
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.command_pending)
            .cloned()
            .collect())
    }

    async fn mark_command_pending(
        &self,
        id: i32,
        issued_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut vehicles = self.vehicles.lock().unwrap();
        for vehicle in vehicles.iter_mut().filter(|v| v.id == id) {
            vehicle.command_pending = true;
            vehicle.command_issued_at = Some(issued_at);
        }
        Ok(())
    }

    async fn clear_command_pending(&self, id: i32) -> Result<(), AppError> {
        let mut vehicles = self.vehicles.lock().unwrap();
        for vehicle in vehicles.iter_mut().filter(|v| v.id == id) {
            vehicle.command_pending = false;
            vehicle.command_issued_at = None;
        }
        Ok(())
    }

    async fn apply_relay_confirmation(&self, id: i32, relay_cut: bool) -> Result<(), AppError> {
        let mut vehicles = self.vehicles.lock().unwrap();
        for vehicle in vehicles.iter_mut().filter(|v| v.id == id) {
            vehicle.relay_cut = relay_cut;
            vehicle.command_pending = false;
            vehicle.command_issued_at = None;
        }
        Ok(())
    }
}

/// Sink de alertas que las acumula para inspección
#[derive(Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn insert(&self, new: NewAlert) -> Result<Alert, AppError> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = Alert {
            id: alerts.len() as i32 + 1,
            vehicle_id: new.vehicle_id,
            alert_type: new.alert_type.as_str().to_string(),
            severity: new.severity.as_str().to_string(),
            message: new.message,
            details: Some(new.details),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            created_at: Utc::now(),
        };
        alerts.push(alert.clone());
        Ok(alert)
    }
}

/// Fuente de zona activa fija
pub struct FixedZoneSource(pub Option<Zone>);

#[async_trait]
impl ActiveZoneSource for FixedZoneSource {
    async fn find_active_for_vehicle(&self, _vehicle_id: i32) -> Result<Option<Zone>, AppError> {
        Ok(self.0.clone())
    }
}
