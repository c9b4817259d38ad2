//! Máquina de estados de comandos de relé (corte remoto de motor)
//!
//! El estado del relé vive en tres columnas de `vehicles`: `relay_cut`
//! (último estado confirmado por el dispositivo), `command_pending` y
//! `command_issued_at`. Las reglas:
//!
//! - `relay_cut` solo lo materializa una confirmación del dispositivo,
//!   nunca la emisión del comando.
//! - Un comando en vuelo expira a los 300 segundos sin confirmación; el
//!   vehículo vuelve a SYNCED con su último estado confirmado.
//! - Pedir un estado ya sincronizado y sin comando en vuelo es un no-op.
//!   Pedirlo con comando en vuelo re-emite el downlink y reinicia el timer.
//!
//! Las decisiones puras (despachar, aplicar, expirar) están separadas del
//! I/O para poder probarlas sin base de datos.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::models::{Alert, AlertSeverity, AlertType, Vehicle};
use crate::repositories::{
    AlertRepository, AlertSink, NewAlert, RelayCommandStore, VehicleRepository,
};
use crate::services::chirpstack_service::ChirpstackClient;
use crate::services::notification_service::{NotificationRegistry, WsEvent};
use crate::utils::errors::AppResult;

/// Segundos sin confirmación tras los cuales un comando en vuelo expira
pub const COMMAND_TIMEOUT_SECONDS: i64 = 300;

/// ¿Hay que emitir un downlink para llevar el relé a `desired_cut`?
///
/// Re-entrante: con un comando en vuelo siempre se re-emite, aunque el
/// estado pedido coincida con el último confirmado.
pub fn should_dispatch(vehicle: &Vehicle, desired_cut: bool) -> bool {
    vehicle.relay_cut != desired_cut || vehicle.command_pending
}

/// ¿Hay que materializar esta confirmación del dispositivo?
///
/// Se aplica si hay comando en vuelo, o si el estado confirmado difiere del
/// registrado (el dispositivo cambió por fuera, p.ej. tras un timeout).
pub fn should_apply_confirmation(vehicle: &Vehicle, confirmed_cut: bool) -> bool {
    vehicle.command_pending || vehicle.relay_cut != confirmed_cut
}

/// ¿Expiró un comando emitido en `issued_at`?
pub fn command_timed_out(issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - issued_at > Duration::seconds(COMMAND_TIMEOUT_SECONDS)
}

/// Servicio de comandos de relé: despacho, confirmación y expiración
#[derive(Clone)]
pub struct RelayService {
    vehicles: Arc<dyn RelayCommandStore>,
    alerts: Arc<dyn AlertSink>,
    chirpstack: ChirpstackClient,
    notifications: NotificationRegistry,
}

impl RelayService {
    pub fn new(
        pool: PgPool,
        chirpstack: ChirpstackClient,
        notifications: NotificationRegistry,
    ) -> Self {
        Self::with_stores(
            Arc::new(VehicleRepository::new(pool.clone())),
            Arc::new(AlertRepository::new(pool)),
            chirpstack,
            notifications,
        )
    }

    pub fn with_stores(
        vehicles: Arc<dyn RelayCommandStore>,
        alerts: Arc<dyn AlertSink>,
        chirpstack: ChirpstackClient,
        notifications: NotificationRegistry,
    ) -> Self {
        Self {
            vehicles,
            alerts,
            chirpstack,
            notifications,
        }
    }

    /// Pedir corte (`cut=true`) o restauración (`cut=false`) del relé.
    ///
    /// Devuelve `true` si se emitió un downlink, `false` si el vehículo ya
    /// estaba sincronizado en el estado pedido.
    pub async fn request_cutoff(&self, vehicle: &Vehicle, cut: bool) -> AppResult<bool> {
        if !should_dispatch(vehicle, cut) {
            info!(
                "Relé de vehículo {} ya sincronizado (cut={}), sin comando",
                vehicle.id, cut
            );
            return Ok(false);
        }

        // Downlink primero: si ChirpStack no responde igual queda el comando
        // en vuelo y el timeout lo cierra
        if cut {
            self.chirpstack.send_stop_command(&vehicle.deveui).await;
        } else {
            self.chirpstack.send_start_command(&vehicle.deveui).await;
        }

        let issued_at = Utc::now();
        self.vehicles.mark_command_pending(vehicle.id, issued_at).await?;

        info!(
            "🚨 Comando de relé emitido para vehículo {} ({}): cut={}",
            vehicle.id, vehicle.deveui, cut
        );

        let mut updated = vehicle.clone();
        updated.command_pending = true;
        updated.command_issued_at = Some(issued_at);
        self.notify_owner(&updated, None).await;

        Ok(true)
    }

    /// Procesar una confirmación de relé llegada en un uplink.
    ///
    /// Devuelve `true` si la confirmación se aplicó, `false` si era
    /// redundante (sin comando en vuelo y mismo estado).
    pub async fn on_confirmation(&self, vehicle: &Vehicle, confirmed_cut: bool) -> AppResult<bool> {
        if !should_apply_confirmation(vehicle, confirmed_cut) {
            info!(
                "Confirmación redundante de vehículo {} (cut={}), ignorada",
                vehicle.id, confirmed_cut
            );
            return Ok(false);
        }

        self.vehicles
            .apply_relay_confirmation(vehicle.id, confirmed_cut)
            .await?;

        info!(
            "✅ Relé de vehículo {} confirmado: cut={}",
            vehicle.id, confirmed_cut
        );

        // La alerta nace con la confirmación, no con la emisión del comando
        let (severity, message) = if confirmed_cut {
            (
                AlertSeverity::Critical,
                format!("Engine cutoff confirmed for {}", vehicle.display_name()),
            )
        } else {
            (
                AlertSeverity::Low,
                format!("Engine restored for {}", vehicle.display_name()),
            )
        };

        let alert = self
            .alerts
            .insert(NewAlert {
                vehicle_id: vehicle.id,
                alert_type: AlertType::RelayCommand,
                severity,
                message,
                details: json!({ "relay_cut": confirmed_cut }),
            })
            .await?;

        let mut updated = vehicle.clone();
        updated.relay_cut = confirmed_cut;
        updated.command_pending = false;
        updated.command_issued_at = None;
        self.notify_owner(&updated, Some(&alert)).await;

        Ok(true)
    }

    /// Chequeo perezoso de expiración sobre vehículos recién leídos.
    ///
    /// Muta los structs en memoria para que la respuesta refleje el estado
    /// ya expirado sin releer la base.
    pub async fn apply_command_timeouts(&self, vehicles: &mut [Vehicle]) -> AppResult<()> {
        let now = Utc::now();
        for vehicle in vehicles.iter_mut() {
            if !vehicle.command_pending {
                continue;
            }
            let Some(issued_at) = vehicle.command_issued_at else {
                continue;
            };
            if command_timed_out(issued_at, now) {
                self.expire_command(vehicle).await?;
                vehicle.command_pending = false;
                vehicle.command_issued_at = None;
            }
        }
        Ok(())
    }

    /// Barrido periódico de comandos en vuelo expirados.
    ///
    /// Cubre a los vehículos que nadie consulta; devuelve cuántos expiró.
    pub async fn sweep_pending_commands(&self) -> AppResult<usize> {
        let pending = self.vehicles.list_pending_commands().await?;
        let now = Utc::now();
        let mut expired = 0;

        for vehicle in &pending {
            let Some(issued_at) = vehicle.command_issued_at else {
                continue;
            };
            if command_timed_out(issued_at, now) {
                self.expire_command(vehicle).await?;
                expired += 1;
            }
        }

        if expired > 0 {
            info!("⏱️ Barrido de comandos: {} expirados", expired);
        }
        Ok(expired)
    }

    /// Cerrar un comando expirado: limpia el pending sin tocar relay_cut,
    /// registra la alerta y notifica al dueño
    async fn expire_command(&self, vehicle: &Vehicle) -> AppResult<()> {
        warn!(
            "⏱️ Comando de relé expirado para vehículo {} ({}), emitido {:?}",
            vehicle.id, vehicle.deveui, vehicle.command_issued_at
        );

        self.vehicles.clear_command_pending(vehicle.id).await?;

        let alert = self
            .alerts
            .insert(NewAlert {
                vehicle_id: vehicle.id,
                alert_type: AlertType::CommandTimeout,
                severity: AlertSeverity::Critical,
                message: format!(
                    "Relay command for {} timed out without device confirmation",
                    vehicle.display_name()
                ),
                details: json!({
                    "issued_at": vehicle
                        .command_issued_at
                        .map(|t| t.to_rfc3339()),
                    "timeout_seconds": COMMAND_TIMEOUT_SECONDS,
                }),
            })
            .await?;

        let mut updated = vehicle.clone();
        updated.command_pending = false;
        updated.command_issued_at = None;
        self.notify_owner(&updated, Some(&alert)).await;

        Ok(())
    }

    /// Empujar eventos WebSocket al dueño del vehículo (si tiene)
    async fn notify_owner(&self, vehicle: &Vehicle, alert: Option<&Alert>) {
        let Some(owner_id) = vehicle.owner_user_id else {
            return;
        };
        if let Some(alert) = alert {
            self.notifications
                .deliver(owner_id, WsEvent::new_alert(alert))
                .await;
        }
        self.notifications
            .deliver(owner_id, WsEvent::vehicle_update(vehicle))
            .await;
    }
}
