//! Cliente de ChirpStack
//!
//! Downlinks (cola de mensajes hacia el dispositivo) y alta/baja de devices
//! en el network server. Todo es fire-and-forget con timeouts cortos: un
//! fallo aquí nunca debe abortar el pipeline de uplinks.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::EnvironmentConfig;
use crate::models::Zone;

/// Puerto LoRaWAN por el que el dispositivo espera los comandos
pub const DOWNLINK_FPORT: u8 = 10;

/// Application y device-profile fijos del despliegue
const CHIRPSTACK_APPLICATION_ID: &str = "1";
const CHIRPSTACK_DEVICE_PROFILE_ID: &str = "528c426f-fa35-4ca2-a4a3-47df89a5a9c5";

#[derive(Clone)]
pub struct ChirpstackClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ChirpstackClient {
    pub fn new(config: &EnvironmentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.chirpstack_api_url.trim_end_matches('/').to_string(),
            api_key: config.chirpstack_api_key.clone(),
            client,
        }
    }

    fn auth_header(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| format!("Bearer {}", key))
    }

    /// Encolar un downlink (payload Base64 opaco) para un dispositivo.
    /// Sin confirmación de entrega: el transporte es best-effort.
    pub async fn send_downlink(&self, dev_eui: &str, data_b64: &str, f_port: u8) {
        let Some(auth) = self.auth_header() else {
            warn!("⚠️ ChirpStack API Key no configurada. Downlink omitido.");
            return;
        };

        let url = format!("{}/api/devices/{}/queue", self.base_url, dev_eui.to_lowercase());
        let payload = json!({
            "deviceQueueItem": {
                "confirmed": false,
                "fPort": f_port,
                "data": data_b64,
            }
        });

        let result = self
            .client
            .post(&url)
            .header("Grpc-Metadata-Authorization", auth)
            .json(&payload)
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("📡 Downlink encolado para {}", dev_eui);
            }
            Ok(response) => {
                error!(
                    "❌ ChirpStack rechazó el downlink para {}: {}",
                    dev_eui,
                    response.status()
                );
            }
            Err(e) => {
                error!("❌ Fallo enviando downlink a {}: {}", dev_eui, e);
            }
        }
    }

    /// Enviar un comando de texto (codificado en Base64) al dispositivo
    pub async fn send_command(&self, dev_eui: &str, command_text: &str) {
        let encoded = BASE64.encode(command_text.as_bytes());
        self.send_downlink(dev_eui, &encoded, DOWNLINK_FPORT).await;
    }

    /// Comando STOP (corte de relé)
    pub async fn send_stop_command(&self, dev_eui: &str) {
        self.send_command(dev_eui, "STOP").await;
    }

    /// Comando START (restablecer relé)
    pub async fn send_start_command(&self, dev_eui: &str) {
        self.send_command(dev_eui, "START").await;
    }

    /// Registrar un device en ChirpStack bajo la aplicación SafeTrack.
    /// Devuelve false en cualquier fallo (no bloqueante).
    pub async fn register_device(&self, dev_eui: &str, name: &str, description: &str) -> bool {
        let Some(auth) = self.auth_header() else {
            warn!("⚠️ ChirpStack API Key no configurada. Registro de device omitido.");
            return false;
        };

        let url = format!("{}/api/devices", self.base_url);
        let payload = json!({
            "device": {
                "devEUI": dev_eui,
                "name": if name.is_empty() { dev_eui } else { name },
                "description": description,
                "applicationID": CHIRPSTACK_APPLICATION_ID,
                "deviceProfileID": CHIRPSTACK_DEVICE_PROFILE_ID,
                "skipFCntCheck": false,
                "isDisabled": false,
            }
        });

        match self
            .client
            .post(&url)
            .header("Grpc-Metadata-Authorization", auth)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("✅ Device {} registrado en ChirpStack (name='{}')", dev_eui, name);
                true
            }
            Ok(response) => {
                warn!(
                    "ChirpStack rechazó el registro del device {}: {}",
                    dev_eui,
                    response.status()
                );
                false
            }
            Err(e) => {
                warn!("Fallo registrando device {} en ChirpStack: {}", dev_eui, e);
                false
            }
        }
    }

    /// Eliminar un device de ChirpStack. 404 se considera OK (ya eliminado).
    pub async fn delete_device(&self, dev_eui: &str) -> bool {
        let Some(auth) = self.auth_header() else {
            warn!("⚠️ ChirpStack API Key no configurada. Baja de device omitida.");
            return false;
        };

        let url = format!("{}/api/devices/{}", self.base_url, dev_eui.to_lowercase());

        match self
            .client
            .delete(&url)
            .header("Grpc-Metadata-Authorization", auth)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("✅ Device {} eliminado de ChirpStack", dev_eui);
                true
            }
            Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                info!("Device {} no existe en ChirpStack (ya eliminado)", dev_eui);
                true
            }
            Ok(response) => {
                warn!(
                    "ChirpStack rechazó la baja del device {}: {}",
                    dev_eui,
                    response.status()
                );
                false
            }
            Err(e) => {
                warn!("Fallo eliminando device {} de ChirpStack: {}", dev_eui, e);
                false
            }
        }
    }
}

/// Codificar una zona en el layout binario legacy para el enforcement del
/// lado del dispositivo, devuelto como Base64.
///
/// CIRCLE (0x01): `[TYPE: 1][LAT: f32 BE][LON: f32 BE][RADIUS: u16 BE]`
/// POLYGON (0x02): `[TYPE: 1][NUM_POINTS: 1][LAT1: f32 BE][LON1: f32 BE]...`
///
/// El diseño actual evalúa contención en el servidor; el encoder se conserva
/// por compatibilidad con firmware antiguo.
pub fn encode_geofence(zone: &Zone) -> String {
    let mut payload: Vec<u8> = Vec::new();

    if zone.is_polygon() {
        let coords = zone.polygon_coordinates();
        payload.push(0x02);
        payload.push(coords.len() as u8);
        for point in coords {
            payload.extend_from_slice(&(point.lat as f32).to_be_bytes());
            payload.extend_from_slice(&(point.lng as f32).to_be_bytes());
        }
    } else {
        let (lat, lon) = zone.center();
        let radius = zone.radius_m.unwrap_or(0).clamp(0, u16::MAX as i32) as u16;
        payload.push(0x01);
        payload.extend_from_slice(&(lat as f32).to_be_bytes());
        payload.extend_from_slice(&(lon as f32).to_be_bytes());
        payload.extend_from_slice(&radius.to_be_bytes());
    }

    BASE64.encode(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZoneType;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn circle_zone(lat: f64, lon: f64, radius_m: i32) -> Zone {
        Zone {
            id: 1,
            name: "Zona".to_string(),
            description: None,
            zone_type: ZoneType::Circle.as_str().to_string(),
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

    fn polygon_zone(points: serde_json::Value) -> Zone {
        Zone {
            zone_type: ZoneType::Polygon.as_str().to_string(),
            coordinates: Some(points),
            ..circle_zone(0.0, 0.0, 0)
        }
    }

    #[test]
    fn test_stop_command_base64() {
        // Equivalente a: echo -n "STOP" | base64
        assert_eq!(BASE64.encode("STOP"), "U1RPUA==");
        assert_eq!(BASE64.encode("START"), "U1RBUlQ=");
    }

    #[test]
    fn test_encode_circle_layout() {
        let zone = circle_zone(3.8666, 11.5166, 500);
        let raw = BASE64.decode(encode_geofence(&zone)).unwrap();

        // 1 type + 4 lat + 4 lon + 2 radius
        assert_eq!(raw.len(), 11);
        assert_eq!(raw[0], 0x01);
        assert_eq!(f32::from_be_bytes(raw[1..5].try_into().unwrap()), 3.8666_f32);
        assert_eq!(f32::from_be_bytes(raw[5..9].try_into().unwrap()), 11.5166_f32);
        assert_eq!(u16::from_be_bytes(raw[9..11].try_into().unwrap()), 500);
    }

    #[test]
    fn test_encode_polygon_layout() {
        let zone = polygon_zone(json!([
            {"lat": 1.0, "lng": 2.0},
            {"lat": 3.0, "lng": 4.0},
            {"lat": 5.0, "lng": 6.0}
        ]));
        let raw = BASE64.decode(encode_geofence(&zone)).unwrap();

        // 1 type + 1 count + 3 * (4 + 4)
        assert_eq!(raw.len(), 26);
        assert_eq!(raw[0], 0x02);
        assert_eq!(raw[1], 3);
        assert_eq!(f32::from_be_bytes(raw[2..6].try_into().unwrap()), 1.0_f32);
        assert_eq!(f32::from_be_bytes(raw[6..10].try_into().unwrap()), 2.0_f32);
    }

    #[test]
    fn test_encode_empty_polygon_clears_zone() {
        // Sin puntos igual se manda el paquete, con count 0 (limpia la zona)
        let zone = polygon_zone(json!([]));
        let raw = BASE64.decode(encode_geofence(&zone)).unwrap();
        assert_eq!(raw, vec![0x02, 0x00]);
    }

    #[test]
    fn test_encode_circle_radius_clamped_to_u16() {
        let zone = circle_zone(0.0, 0.0, 200_000);
        let raw = BASE64.decode(encode_geofence(&zone)).unwrap();
        assert_eq!(u16::from_be_bytes(raw[9..11].try_into().unwrap()), u16::MAX);
    }
}
