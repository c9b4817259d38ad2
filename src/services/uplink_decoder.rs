//! Normalizador de payloads de uplink
//!
//! ChirpStack (y las distintas versiones de firmware de los trackers) no
//! mandan un shape único: el DevEUI puede venir en varias claves y a veces
//! en Base64, el objeto decodificado puede venir como mapa (`object`), como
//! string JSON (`objectJSON`) o con los campos GPS sueltos al tope, y la
//! confirmación de relé puede ser un campo decodificado, flags booleanos o
//! directamente los bytes crudos de `data`.
//!
//! Este módulo reduce todo eso a un union etiquetado (`UplinkReading`),
//! probando cada shape conocido en orden de prioridad fijo. Es best-effort
//! por diseño: Base64 malformado o JSON anidado malformado se tratan como
//! "campo ausente", nunca como error.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use tracing::{debug, warn};

/// Lectura canónica de un uplink
#[derive(Debug, Clone, PartialEq)]
pub enum UplinkReading {
    /// El dispositivo confirma el estado de su relé
    RelayConfirmation { is_cut: bool },
    /// Fix GPS
    Position(GpsReading),
    /// Ni confirmación ni GPS: no es un error, se loguea y se ignora
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpsReading {
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub altitude: f64,
    pub satellites: i32,
}

/// Uplink normalizado: identidad + lectura
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedUplink {
    /// DevEUI en su forma canónica (hex minúsculas cuando venía en Base64)
    pub dev_eui: String,
    /// Frame counter LoRaWAN, para el trace del payload
    pub f_cnt: i64,
    pub reading: UplinkReading,
}

/// Normalizar un uplink arbitrario. `None` solo cuando falta el DevEUI.
pub fn normalize(payload: &Value) -> Option<NormalizedUplink> {
    let dev_eui = extract_dev_eui(payload)?;
    let f_cnt = payload.get("fCnt").and_then(Value::as_i64).unwrap_or(0);

    let decoded = decoded_object(payload);
    let gps = extract_gps(payload, decoded.as_ref());

    // Prioridad: (a) relay_status decodificado; (b) flags relay_cut/relay_active;
    // (c) bytes crudos de `data`, solo cuando no hay status decodificado ni GPS
    let mut relay_status = decoded
        .as_ref()
        .and_then(|obj| get_case_insensitive(obj, "relay_status"))
        .and_then(Value::as_str)
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty() && s != "unknown");

    if relay_status.is_none() {
        let relay_cut = decoded
            .as_ref()
            .and_then(|obj| get_case_insensitive(obj, "relay_cut"))
            .and_then(Value::as_bool);
        let relay_active = decoded
            .as_ref()
            .and_then(|obj| get_case_insensitive(obj, "relay_active"))
            .and_then(Value::as_bool);
        if relay_cut == Some(true) {
            relay_status = Some("cut".to_string());
        } else if relay_active == Some(true) {
            relay_status = Some("active".to_string());
        }
    }

    if !matches!(relay_status.as_deref(), Some("cut") | Some("active")) && gps.is_none() {
        if let Some(data_b64) = payload.get("data").and_then(Value::as_str) {
            match BASE64.decode(data_b64) {
                Ok(raw) => {
                    debug!("📦 Bytes LoRa crudos ({} byte(s)) para {}", raw.len(), dev_eui);
                    if raw.len() == 1 {
                        relay_status = Some("cut".to_string());
                    } else if raw.len() == 2 {
                        relay_status = Some("active".to_string());
                    }
                }
                Err(e) => {
                    warn!("Base64 inválido en 'data' para {}: {}", dev_eui, e);
                }
            }
        }
    }

    let reading = match relay_status.as_deref() {
        Some("cut") => UplinkReading::RelayConfirmation { is_cut: true },
        Some("active") => UplinkReading::RelayConfirmation { is_cut: false },
        _ => match gps {
            Some(gps) => UplinkReading::Position(gps),
            None => UplinkReading::Unrecognized,
        },
    };

    Some(NormalizedUplink { dev_eui, f_cnt, reading })
}

/// Extraer el DevEUI probando las ubicaciones conocidas:
/// `deviceInfo.devEui`, `devEui`, `devEUI`
pub fn extract_dev_eui(payload: &Value) -> Option<String> {
    let raw = payload
        .get("deviceInfo")
        .and_then(|info| info.get("devEui"))
        .or_else(|| payload.get("devEui"))
        .or_else(|| payload.get("devEUI"))
        .and_then(Value::as_str)?;

    Some(canonicalize_dev_eui(raw))
}

/// Algunas versiones de ChirpStack re-codifican el DevEUI (8 bytes) en
/// Base64: 11 chars sin padding o 12 con padding. Si no parece hex, se
/// intenta decodificar; si falla, se conserva el valor crudo.
pub fn canonicalize_dev_eui(raw: &str) -> String {
    let looks_hex = raw.chars().all(|c| c.is_ascii_hexdigit());
    if (raw.len() == 11 || raw.len() == 12) && !looks_hex {
        let padding = (4 - raw.len() % 4) % 4;
        let padded = format!("{}{}", raw, "=".repeat(padding));
        match BASE64.decode(&padded) {
            Ok(bytes) if bytes.len() == 8 => {
                let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                debug!("DevEUI Base64 '{}' decodificado a hex '{}'", raw, hex);
                return hex;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Fallo decodificando DevEUI Base64 '{}': {}", raw, e);
            }
        }
    }
    raw.to_string()
}

/// El objeto decodificado: `object` como mapa, o `objectJSON` como string
fn decoded_object(payload: &Value) -> Option<Value> {
    if let Some(obj) = payload.get("object") {
        if obj.is_object() && obj.as_object().map(|m| !m.is_empty()).unwrap_or(false) {
            return Some(obj.clone());
        }
    }
    if let Some(raw) = payload.get("objectJSON").and_then(Value::as_str) {
        match serde_json::from_str::<Value>(raw) {
            Ok(parsed) if parsed.is_object() => return Some(parsed),
            Ok(_) => {}
            Err(e) => {
                warn!("Fallo parseando objectJSON: {}", e);
            }
        }
    }
    None
}

/// Lookup case-insensitive de una clave en un objeto JSON
pub fn get_case_insensitive<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let obj = value.as_object()?;
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Número que puede venir como number o como string numérico
fn as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn field_f64(payload: &Value, decoded: Option<&Value>, key: &str) -> Option<f64> {
    decoded
        .and_then(|obj| get_case_insensitive(obj, key))
        .and_then(as_f64)
        .or_else(|| get_case_insensitive(payload, key).and_then(as_f64))
}

/// Campos GPS del objeto decodificado, con fallback al tope del payload
fn extract_gps(payload: &Value, decoded: Option<&Value>) -> Option<GpsReading> {
    let latitude = field_f64(payload, decoded, "latitude")?;
    let longitude = field_f64(payload, decoded, "longitude")?;

    Some(GpsReading {
        latitude,
        longitude,
        speed: field_f64(payload, decoded, "speed").unwrap_or(0.0),
        heading: field_f64(payload, decoded, "heading").unwrap_or(0.0),
        altitude: field_f64(payload, decoded, "altitude").unwrap_or(0.0),
        satellites: field_f64(payload, decoded, "satellites").unwrap_or(0.0) as i32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deveui_from_device_info() {
        let payload = json!({
            "deviceInfo": { "devEui": "AABBCCDDEEFF0011" },
            "object": { "latitude": 3.8666, "longitude": 11.5166 }
        });
        let uplink = normalize(&payload).unwrap();
        assert_eq!(uplink.dev_eui, "AABBCCDDEEFF0011");
    }

    #[test]
    fn test_deveui_top_level_variants() {
        let a = normalize(&json!({ "devEui": "aabbccddeeff0011" })).unwrap();
        let b = normalize(&json!({ "devEUI": "aabbccddeeff0011" })).unwrap();
        assert_eq!(a.dev_eui, "aabbccddeeff0011");
        assert_eq!(b.dev_eui, "aabbccddeeff0011");
    }

    #[test]
    fn test_deveui_base64_decoded_to_hex() {
        // base64("\xaa\xbb\xcc\xdd\xee\xff\x00\x11") = "qrvM3e7/ABE="
        assert_eq!(canonicalize_dev_eui("qrvM3e7/ABE="), "aabbccddeeff0011");
        // Sin padding (11 chars)
        assert_eq!(canonicalize_dev_eui("qrvM3e7/ABE"), "aabbccddeeff0011");
    }

    #[test]
    fn test_deveui_hex_kept_as_is() {
        // 16 chars hex nunca pasa por el decodificador Base64
        assert_eq!(canonicalize_dev_eui("AABBCCDDEEFF0011"), "AABBCCDDEEFF0011");
    }

    #[test]
    fn test_deveui_malformed_base64_kept_raw() {
        // 11 chars no-hex pero Base64 inválido: se conserva el valor crudo
        assert_eq!(canonicalize_dev_eui("!!invalid!!"), "!!invalid!!");
    }

    #[test]
    fn test_missing_deveui_rejected() {
        assert!(normalize(&json!({ "object": { "latitude": 1.0, "longitude": 2.0 } })).is_none());
    }

    #[test]
    fn test_gps_from_decoded_object() {
        let payload = json!({
            "devEui": "aabbccddeeff0011",
            "fCnt": 125,
            "object": { "latitude": 3.8666, "longitude": 11.5166, "speed": 12 }
        });
        let uplink = normalize(&payload).unwrap();
        assert_eq!(uplink.f_cnt, 125);
        match uplink.reading {
            UplinkReading::Position(gps) => {
                assert_eq!(gps.latitude, 3.8666);
                assert_eq!(gps.longitude, 11.5166);
                assert_eq!(gps.speed, 12.0);
                assert_eq!(gps.heading, 0.0);
                assert_eq!(gps.satellites, 0);
            }
            other => panic!("expected Position, got {:?}", other),
        }
    }

    #[test]
    fn test_gps_keys_case_insensitive() {
        let payload = json!({
            "devEui": "aabbccddeeff0011",
            "object": { "Latitude": "3.8666", "LONGITUDE": "11.5166", "Speed": "7.5" }
        });
        match normalize(&payload).unwrap().reading {
            UplinkReading::Position(gps) => {
                assert_eq!(gps.latitude, 3.8666);
                assert_eq!(gps.speed, 7.5);
            }
            other => panic!("expected Position, got {:?}", other),
        }
    }

    #[test]
    fn test_gps_from_object_json_string() {
        let payload = json!({
            "devEui": "aabbccddeeff0011",
            "objectJSON": "{\"latitude\": 3.8, \"longitude\": 11.5}"
        });
        assert!(matches!(
            normalize(&payload).unwrap().reading,
            UplinkReading::Position(_)
        ));
    }

    #[test]
    fn test_malformed_object_json_falls_back_to_top_level() {
        let payload = json!({
            "devEui": "aabbccddeeff0011",
            "objectJSON": "{not json",
            "latitude": 3.8,
            "longitude": 11.5
        });
        assert!(matches!(
            normalize(&payload).unwrap().reading,
            UplinkReading::Position(_)
        ));
    }

    #[test]
    fn test_relay_status_decoded_takes_priority_over_gps() {
        let payload = json!({
            "devEui": "aabbccddeeff0011",
            "object": { "relay_status": "cut", "latitude": 3.8, "longitude": 11.5 }
        });
        assert_eq!(
            normalize(&payload).unwrap().reading,
            UplinkReading::RelayConfirmation { is_cut: true }
        );
    }

    #[test]
    fn test_relay_boolean_flags() {
        let cut = json!({
            "devEui": "aabbccddeeff0011",
            "object": { "relay_cut": true }
        });
        let active = json!({
            "devEui": "aabbccddeeff0011",
            "object": { "relay_active": true }
        });
        assert_eq!(
            normalize(&cut).unwrap().reading,
            UplinkReading::RelayConfirmation { is_cut: true }
        );
        assert_eq!(
            normalize(&active).unwrap().reading,
            UplinkReading::RelayConfirmation { is_cut: false }
        );
    }

    #[test]
    fn test_relay_unknown_status_ignored() {
        let payload = json!({
            "devEui": "aabbccddeeff0011",
            "object": { "relay_status": "unknown" }
        });
        assert_eq!(normalize(&payload).unwrap().reading, UplinkReading::Unrecognized);
    }

    #[test]
    fn test_raw_data_fallback_one_byte_means_cut() {
        // base64 de 1 byte
        let payload = json!({ "devEui": "aabbccddeeff0011", "data": "AQ==" });
        assert_eq!(
            normalize(&payload).unwrap().reading,
            UplinkReading::RelayConfirmation { is_cut: true }
        );
    }

    #[test]
    fn test_raw_data_fallback_two_bytes_means_active() {
        // base64 de 2 bytes
        let payload = json!({ "devEui": "aabbccddeeff0011", "data": "AQI=" });
        assert_eq!(
            normalize(&payload).unwrap().reading,
            UplinkReading::RelayConfirmation { is_cut: false }
        );
    }

    #[test]
    fn test_raw_data_fallback_not_used_when_gps_present() {
        let payload = json!({
            "devEui": "aabbccddeeff0011",
            "data": "AQ==",
            "object": { "latitude": 3.8, "longitude": 11.5 }
        });
        assert!(matches!(
            normalize(&payload).unwrap().reading,
            UplinkReading::Position(_)
        ));
    }

    #[test]
    fn test_raw_data_three_bytes_unrecognized() {
        let payload = json!({ "devEui": "aabbccddeeff0011", "data": "AQID" });
        assert_eq!(normalize(&payload).unwrap().reading, UplinkReading::Unrecognized);
    }

    #[test]
    fn test_malformed_raw_data_tolerated() {
        let payload = json!({ "devEui": "aabbccddeeff0011", "data": "$$$not-base64$$$" });
        assert_eq!(normalize(&payload).unwrap().reading, UplinkReading::Unrecognized);
    }

    #[test]
    fn test_empty_payload_unrecognized() {
        let payload = json!({ "devEui": "aabbccddeeff0011" });
        assert_eq!(normalize(&payload).unwrap().reading, UplinkReading::Unrecognized);
    }
}
