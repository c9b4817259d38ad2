//! Orquestador del pipeline de uplinks
//!
//! Secuencia: normalizar → resolver vehículo → rama exclusiva
//! (confirmación de relé | posición GPS) → geofence → last_seen.
//!
//! El webhook SIEMPRE responde 200: un error nuestro no debe hacer que
//! ChirpStack reintente ni marque el endpoint como caído. El resultado
//! real va en el cuerpo JSON.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::models::MovementStatus;
use crate::repositories::{NewPosition, PositionRepository, VehicleRepository};
use crate::services::uplink_decoder::{self, UplinkReading};
use crate::state::AppState;
use crate::utils::errors::AppResult;

/// Resultado del procesamiento de un uplink
#[derive(Debug, PartialEq)]
pub enum UplinkOutcome {
    /// Payload inválido (sin DevEUI)
    Rejected { reason: &'static str },
    /// Uplink válido pero sin efecto (dispositivo desconocido, payload
    /// irreconocible, confirmación redundante)
    Ignored { reason: &'static str },
    /// Confirmación de relé aplicada
    Confirmed { message: &'static str },
    /// Posición persistida
    Stored { position_id: i32 },
}

impl UplinkOutcome {
    /// Cuerpo JSON de la respuesta del webhook (siempre con HTTP 200)
    pub fn body(&self) -> Value {
        match self {
            UplinkOutcome::Rejected { reason } => {
                json!({ "status": "rejected", "reason": reason })
            }
            UplinkOutcome::Ignored { reason } => {
                json!({ "status": "ignored", "reason": reason })
            }
            UplinkOutcome::Confirmed { message } => {
                json!({ "status": "ok", "message": message })
            }
            UplinkOutcome::Stored { position_id } => {
                json!({ "status": "ok", "position_id": position_id })
            }
        }
    }
}

pub struct UplinkController {
    state: AppState,
    vehicles: VehicleRepository,
    positions: PositionRepository,
}

impl UplinkController {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            vehicles: VehicleRepository::new(state.pool.clone()),
            positions: PositionRepository::new(state.pool.clone()),
        }
    }

    /// Procesar un uplink. Nunca falla hacia afuera: los errores internos
    /// se loguean y se degradan a un cuerpo de error con 200.
    pub async fn handle(&self, payload: &Value) -> UplinkOutcome {
        match self.process(payload).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("❌ Error procesando uplink: {}", e);
                UplinkOutcome::Ignored { reason: "internal_error" }
            }
        }
    }

    async fn process(&self, payload: &Value) -> AppResult<UplinkOutcome> {
        let Some(uplink) = uplink_decoder::normalize(payload) else {
            warn!("Uplink sin DevEUI, rechazado");
            return Ok(UplinkOutcome::Rejected { reason: "missing_deveui" });
        };

        let Some(vehicle) = self.vehicles.find_by_deveui(&uplink.dev_eui).await? else {
            warn!("Uplink de dispositivo desconocido: {}", uplink.dev_eui);
            return Ok(UplinkOutcome::Ignored { reason: "unknown_device" });
        };

        match uplink.reading {
            UplinkReading::RelayConfirmation { is_cut } => {
                let applied = self.state.relay.on_confirmation(&vehicle, is_cut).await?;
                if applied {
                    Ok(UplinkOutcome::Confirmed {
                        message: if is_cut {
                            "relay_cut_confirmed"
                        } else {
                            "relay_active_confirmed"
                        },
                    })
                } else {
                    Ok(UplinkOutcome::Ignored { reason: "redundant_confirmation" })
                }
            }

            UplinkReading::Position(gps) => {
                if !valid_fix(gps.latitude, gps.longitude) {
                    warn!(
                        "Fix GPS inválido de {} ({}, {}), ignorado",
                        uplink.dev_eui, gps.latitude, gps.longitude
                    );
                    return Ok(UplinkOutcome::Ignored { reason: "invalid_gps" });
                }

                let (lat, lon) = if self.state.config.osrm_enabled {
                    self.state.osrm.snap_to_road(gps.latitude, gps.longitude).await
                } else {
                    (gps.latitude, gps.longitude)
                };

                let now = Utc::now();
                let position = self
                    .positions
                    .insert(NewPosition {
                        vehicle_id: vehicle.id,
                        latitude: lat,
                        longitude: lon,
                        altitude: Some(gps.altitude),
                        speed: gps.speed,
                        heading: Some(gps.heading),
                        fix_status: Some(1),
                        satellites: Some(gps.satellites),
                        movement_status: MovementStatus::from_speed(gps.speed).as_str().to_string(),
                        raw_payload: Some(format!("CHIRPSTACK_FCNT_{}", uplink.f_cnt)),
                        recorded_at: now,
                    })
                    .await?;

                info!(
                    "📍 Posición {} de vehículo {} ({}, {})",
                    position.id, vehicle.id, lat, lon
                );

                // Geofence best-effort: la posición ya está persistida y un
                // fallo acá no la revierte
                match self.state.geofencing.check_and_enforce(&vehicle, lat, lon).await {
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

                self.vehicles.update_last_seen(vehicle.id, lat, lon, now).await?;

                Ok(UplinkOutcome::Stored { position_id: position.id })
            }

            UplinkReading::Unrecognized => {
                info!("Uplink de {} sin GPS ni relé, ignorado", uplink.dev_eui);
                Ok(UplinkOutcome::Ignored { reason: "unrecognized_payload" })
            }
        }
    }
}

/// Un fix en (0, 0) es el valor centinela del firmware sin señal
fn valid_fix(lat: f64, lon: f64) -> bool {
    (lat != 0.0 || lon != 0.0) && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}
