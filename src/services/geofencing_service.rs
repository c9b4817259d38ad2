//! Evaluación de geocercas y aplicación automática de corte
//!
//! Geometría pura (haversine + ray casting) separada de la aplicación de
//! la política, que consulta la zona activa del vehículo y dispara el corte
//! de relé al detectar una salida de zona.
//!
//! Política: la salida de zona corta; la re-entrada NO restaura sola. La
//! restauración es siempre una decisión explícita del usuario.

use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::models::{AlertSeverity, AlertType, LatLng, Vehicle, Zone};
use crate::repositories::{ActiveZoneSource, AlertRepository, AlertSink, NewAlert, ZoneRepository};
use crate::services::notification_service::{NotificationRegistry, WsEvent};
use crate::services::relay_service::RelayService;
use crate::utils::errors::AppResult;

/// Radio medio de la Tierra en metros
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distancia haversine en metros entre dos puntos (grados decimales)
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// ¿Está el punto dentro del círculo? Borde cerrado: distancia == radio
/// cuenta como adentro.
pub fn is_point_in_circle(
    lat: f64,
    lon: f64,
    center_lat: f64,
    center_lon: f64,
    radius_m: f64,
) -> bool {
    haversine_distance_m(lat, lon, center_lat, center_lon) <= radius_m
}

/// Ray casting par-impar sobre coordenadas planas.
///
/// Con menos de 3 vértices el polígono es inválido y devolvemos `true`
/// (fail-open): una zona mal configurada nunca corta un motor.
pub fn is_point_in_polygon(lat: f64, lon: f64, vertices: &[LatLng]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return true;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (&vertices[i], &vertices[j]);
        if ((vi.lat > lat) != (vj.lat > lat))
            && (lon < (vj.lng - vi.lng) * (lat - vi.lat) / (vj.lat - vi.lat) + vi.lng)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// ¿Está el punto dentro de la zona, según su tipo?
pub fn is_inside_zone(lat: f64, lon: f64, zone: &Zone) -> bool {
    if zone.is_polygon() {
        is_point_in_polygon(lat, lon, &zone.polygon_coordinates())
    } else {
        let (center_lat, center_lon) = zone.center();
        let radius = zone.radius_m.unwrap_or(0) as f64;
        is_point_in_circle(lat, lon, center_lat, center_lon, radius)
    }
}

/// Servicio de geocercas: evaluación por posición + corte automático
#[derive(Clone)]
pub struct GeofencingService {
    zones: Arc<dyn ActiveZoneSource>,
    alerts: Arc<dyn AlertSink>,
    relay: RelayService,
    notifications: NotificationRegistry,
}

impl GeofencingService {
    pub fn new(pool: PgPool, relay: RelayService, notifications: NotificationRegistry) -> Self {
        Self::with_stores(
            Arc::new(ZoneRepository::new(pool.clone())),
            Arc::new(AlertRepository::new(pool)),
            relay,
            notifications,
        )
    }

    pub fn with_stores(
        zones: Arc<dyn ActiveZoneSource>,
        alerts: Arc<dyn AlertSink>,
        relay: RelayService,
        notifications: NotificationRegistry,
    ) -> Self {
        Self {
            zones,
            alerts,
            relay,
            notifications,
        }
    }

    /// Evaluar una posición contra la zona activa del vehículo y aplicar la
    /// política de corte.
    ///
    /// Devuelve `None` si no corresponde evaluar (auto_geofencing apagado o
    /// sin zona activa), `Some(inside)` en caso contrario.
    pub async fn check_and_enforce(
        &self,
        vehicle: &Vehicle,
        lat: f64,
        lon: f64,
    ) -> AppResult<Option<bool>> {
        if !vehicle.auto_geofencing {
            return Ok(None);
        }

        let Some(zone) = self.zones.find_active_for_vehicle(vehicle.id).await? else {
            return Ok(None);
        };

        let inside = is_inside_zone(lat, lon, &zone);

        if !inside && !vehicle.relay_cut {
            warn!(
                "🚧 Vehículo {} fuera de zona '{}' ({}, {}), disparando corte",
                vehicle.id, zone.name, lat, lon
            );
            self.relay.request_cutoff(vehicle, true).await?;

            let alert = self
                .alerts
                .insert(NewAlert {
                    vehicle_id: vehicle.id,
                    alert_type: AlertType::GeofenceBreach,
                    severity: AlertSeverity::Critical,
                    message: format!(
                        "{} left geofence zone '{}'",
                        vehicle.display_name(),
                        zone.name
                    ),
                    details: json!({
                        "latitude": lat,
                        "longitude": lon,
                        "zone_id": zone.id,
                    }),
                })
                .await?;

            if let Some(owner_id) = vehicle.owner_user_id {
                self.notifications
                    .deliver(owner_id, WsEvent::new_alert(&alert))
                    .await;
            }
        } else if !inside {
            info!(
                "Vehículo {} sigue fuera de zona '{}' con relé ya cortado",
                vehicle.id, zone.name
            );
        }

        Ok(Some(inside))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_haversine_known_distance() {
        // Yaundé centro a Obala: ~36 km
        let d = haversine_distance_m(3.848, 11.502, 4.169, 11.535);
        assert!((d - 35_900.0).abs() < 1_000.0, "distance was {}", d);
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        assert!(haversine_distance_m(3.848, 11.502, 3.848, 11.502) < 1e-6);
    }

    #[test]
    fn test_circle_boundary_is_closed() {
        let center = (3.848, 11.502);
        // Punto a ~1111m al norte (0.01 grados de latitud)
        let d = haversine_distance_m(3.858, 11.502, center.0, center.1);
        assert!(is_point_in_circle(3.858, 11.502, center.0, center.1, d));
        assert!(!is_point_in_circle(3.858, 11.502, center.0, center.1, d - 1.0));
    }

    fn square() -> Vec<LatLng> {
        vec![
            LatLng { lat: 0.0, lng: 0.0 },
            LatLng { lat: 0.0, lng: 10.0 },
            LatLng { lat: 10.0, lng: 10.0 },
            LatLng { lat: 10.0, lng: 0.0 },
        ]
    }

    #[test]
    fn test_point_inside_square() {
        assert!(is_point_in_polygon(5.0, 5.0, &square()));
    }

    #[test]
    fn test_point_outside_square() {
        assert!(!is_point_in_polygon(15.0, 5.0, &square()));
        assert!(!is_point_in_polygon(-1.0, 5.0, &square()));
    }

    #[test]
    fn test_polygon_rotation_invariance() {
        let mut vertices = square();
        for _ in 0..vertices.len() {
            vertices.rotate_left(1);
            assert!(is_point_in_polygon(5.0, 5.0, &vertices));
            assert!(!is_point_in_polygon(15.0, 5.0, &vertices));
        }
    }

    #[test]
    fn test_degenerate_polygon_fails_open() {
        assert!(is_point_in_polygon(50.0, 50.0, &[]));
        assert!(is_point_in_polygon(
            50.0,
            50.0,
            &[LatLng { lat: 0.0, lng: 0.0 }, LatLng { lat: 1.0, lng: 1.0 }]
        ));
    }

    #[test]
    fn test_concave_polygon() {
        // Forma en "L"
        let vertices = vec![
            LatLng { lat: 0.0, lng: 0.0 },
            LatLng { lat: 0.0, lng: 10.0 },
            LatLng { lat: 5.0, lng: 10.0 },
            LatLng { lat: 5.0, lng: 5.0 },
            LatLng { lat: 10.0, lng: 5.0 },
            LatLng { lat: 10.0, lng: 0.0 },
        ];
        assert!(is_point_in_polygon(2.0, 8.0, &vertices));
        // Dentro del bounding box pero fuera de la "L"
        assert!(!is_point_in_polygon(8.0, 8.0, &vertices));
    }

    fn circle_zone(lat: f64, lon: f64, radius_m: i32) -> Zone {
        Zone {
            id: 1,
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

    #[test]
    fn test_is_inside_zone_circle() {
        let zone = circle_zone(3.848, 11.502, 500);
        assert!(is_inside_zone(3.848, 11.502, &zone));
        assert!(!is_inside_zone(3.9, 11.502, &zone));
    }

    #[test]
    fn test_is_inside_zone_polygon() {
        let mut zone = circle_zone(0.0, 0.0, 0);
        zone.zone_type = "POLYGON".to_string();
        zone.coordinates = Some(json!([
            {"lat": 0.0, "lng": 0.0},
            {"lat": 0.0, "lng": 10.0},
            {"lat": 10.0, "lng": 10.0},
            {"lat": 10.0, "lng": 0.0}
        ]));
        assert!(is_inside_zone(5.0, 5.0, &zone));
        assert!(!is_inside_zone(15.0, 5.0, &zone));
    }

    use crate::services::test_support::{
        test_chirpstack, test_vehicle, FixedZoneSource, MemoryCommandStore, RecordingAlertSink,
    };

    // Servicio completo con dobles en memoria; el sink de alertas es
    // compartido entre geofencing y relay para contar el total emitido
    fn enforcement_setup(
        vehicle: Vehicle,
        zone: Option<Zone>,
    ) -> (GeofencingService, Arc<MemoryCommandStore>, Arc<RecordingAlertSink>) {
        let store = Arc::new(MemoryCommandStore::with(vec![vehicle]));
        let alerts = Arc::new(RecordingAlertSink::new());
        let notifications = NotificationRegistry::new();

        let relay = RelayService::with_stores(
            store.clone(),
            alerts.clone(),
            test_chirpstack(),
            notifications.clone(),
        );
        let service = GeofencingService::with_stores(
            Arc::new(FixedZoneSource(zone)),
            alerts.clone(),
            relay,
            notifications,
        );
        (service, store, alerts)
    }

    #[tokio::test]
    async fn test_breach_dispatches_cutoff_and_one_critical_alert() {
        let vehicle = test_vehicle(1, false, false);
        let zone = crate::services::test_support::circle_zone(1, 3.848, 11.502, 500);
        let (service, store, alerts) = enforcement_setup(vehicle.clone(), Some(zone));

        // ~5.7 km al norte del centro, bien fuera del radio de 500m
        let inside = service.check_and_enforce(&vehicle, 3.9, 11.502).await.unwrap();
        assert_eq!(inside, Some(false));

        let stored = store.get(1).unwrap();
        assert!(stored.command_pending);
        assert!(!stored.relay_cut);

        let recorded = alerts.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].alert_type, "GEOFENCE_BREACH");
        assert_eq!(recorded[0].severity, "CRITICAL");
    }

    #[tokio::test]
    async fn test_inside_zone_has_no_side_effects() {
        let vehicle = test_vehicle(1, false, false);
        let zone = crate::services::test_support::circle_zone(1, 3.848, 11.502, 500);
        let (service, store, alerts) = enforcement_setup(vehicle.clone(), Some(zone));

        let inside = service.check_and_enforce(&vehicle, 3.848, 11.502).await.unwrap();
        assert_eq!(inside, Some(true));
        assert!(!store.get(1).unwrap().command_pending);
        assert!(alerts.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_breach_with_relay_already_cut_does_not_redispatch() {
        let vehicle = test_vehicle(1, true, false);
        let zone = crate::services::test_support::circle_zone(1, 3.848, 11.502, 500);
        let (service, store, alerts) = enforcement_setup(vehicle.clone(), Some(zone));

        let inside = service.check_and_enforce(&vehicle, 3.9, 11.502).await.unwrap();
        assert_eq!(inside, Some(false));
        assert!(!store.get(1).unwrap().command_pending);
        assert!(alerts.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_auto_geofencing_off_skips_evaluation() {
        let mut vehicle = test_vehicle(1, false, false);
        vehicle.auto_geofencing = false;
        let zone = crate::services::test_support::circle_zone(1, 3.848, 11.502, 500);
        let (service, _store, alerts) = enforcement_setup(vehicle.clone(), Some(zone));

        let inside = service.check_and_enforce(&vehicle, 3.9, 11.502).await.unwrap();
        assert_eq!(inside, None);
        assert!(alerts.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_no_active_zone_skips_evaluation() {
        let vehicle = test_vehicle(1, false, false);
        let (service, _store, alerts) = enforcement_setup(vehicle.clone(), None);

        let inside = service.check_and_enforce(&vehicle, 3.9, 11.502).await.unwrap();
        assert_eq!(inside, None);
        assert!(alerts.recorded().is_empty());
    }
}
