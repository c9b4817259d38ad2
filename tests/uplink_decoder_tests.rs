//! Tests de integración del normalizador de uplinks con payloads reales
//! de ChirpStack v3 y v4.

use serde_json::json;

use safetrack_backend::services::uplink_decoder::{normalize, GpsReading, UplinkReading};

#[test]
fn chirpstack_v4_payload_with_decoded_gps() {
    let payload = json!({
        "deviceInfo": { "devEui": "a1b2c3d4e5f60708" },
        "fCnt": 1523,
        "object": {
            "latitude": 3.8480,
            "longitude": 11.5021,
            "speed": 42.5,
            "heading": 180.0,
            "altitude": 726.0,
            "satellites": 9
        }
    });

    let uplink = normalize(&payload).unwrap();
    assert_eq!(uplink.dev_eui, "a1b2c3d4e5f60708");
    assert_eq!(uplink.f_cnt, 1523);
    assert_eq!(
        uplink.reading,
        UplinkReading::Position(GpsReading {
            latitude: 3.8480,
            longitude: 11.5021,
            speed: 42.5,
            heading: 180.0,
            altitude: 726.0,
            satellites: 9,
        })
    );
}

#[test]
fn chirpstack_v3_payload_with_object_json_string() {
    // v3 manda el objeto decodificado como string JSON en objectJSON
    let payload = json!({
        "devEUI": "a1b2c3d4e5f60708",
        "fCnt": 7,
        "objectJSON": "{\"latitude\": 3.85, \"longitude\": 11.50, \"speed\": \"12.5\"}"
    });

    let uplink = normalize(&payload).unwrap();
    match uplink.reading {
        UplinkReading::Position(gps) => {
            assert_eq!(gps.latitude, 3.85);
            assert_eq!(gps.longitude, 11.50);
            assert_eq!(gps.speed, 12.5);
        }
        other => panic!("expected Position, got {:?}", other),
    }
}

#[test]
fn base64_dev_eui_is_canonicalized_to_hex() {
    // "qrvM3e7/ABE=" son los bytes aa bb cc dd ee ff 00 11
    let payload = json!({
        "deviceInfo": { "devEui": "qrvM3e7/ABE=" },
        "object": { "latitude": 1.0, "longitude": 2.0 }
    });

    let uplink = normalize(&payload).unwrap();
    assert_eq!(uplink.dev_eui, "aabbccddeeff0011");
}

#[test]
fn relay_confirmation_takes_priority_over_gps() {
    let payload = json!({
        "devEUI": "a1b2c3d4e5f60708",
        "object": {
            "relay_status": "cut",
            "latitude": 3.85,
            "longitude": 11.50
        }
    });

    let uplink = normalize(&payload).unwrap();
    assert_eq!(uplink.reading, UplinkReading::RelayConfirmation { is_cut: true });
}

#[test]
fn boolean_relay_flags_are_recognized() {
    let cut = json!({
        "devEUI": "a1b2c3d4e5f60708",
        "object": { "relay_cut": true }
    });
    assert_eq!(
        normalize(&cut).unwrap().reading,
        UplinkReading::RelayConfirmation { is_cut: true }
    );

    let active = json!({
        "devEUI": "a1b2c3d4e5f60708",
        "object": { "relay_active": true }
    });
    assert_eq!(
        normalize(&active).unwrap().reading,
        UplinkReading::RelayConfirmation { is_cut: false }
    );
}

#[test]
fn raw_single_byte_data_means_cut() {
    // Sin objeto decodificado ni GPS: 1 byte = corte, 2 bytes = activo
    let one_byte = json!({
        "devEUI": "a1b2c3d4e5f60708",
        "data": "AQ=="
    });
    assert_eq!(
        normalize(&one_byte).unwrap().reading,
        UplinkReading::RelayConfirmation { is_cut: true }
    );

    let two_bytes = json!({
        "devEUI": "a1b2c3d4e5f60708",
        "data": "AQI="
    });
    assert_eq!(
        normalize(&two_bytes).unwrap().reading,
        UplinkReading::RelayConfirmation { is_cut: false }
    );
}

#[test]
fn raw_data_fallback_is_skipped_when_gps_present() {
    // Con GPS decodificado los bytes crudos no se interpretan como relé
    let payload = json!({
        "devEUI": "a1b2c3d4e5f60708",
        "data": "AQ==",
        "object": { "latitude": 3.85, "longitude": 11.50 }
    });

    let uplink = normalize(&payload).unwrap();
    assert!(matches!(uplink.reading, UplinkReading::Position(_)));
}

#[test]
fn missing_dev_eui_rejects_payload() {
    let payload = json!({
        "object": { "latitude": 3.85, "longitude": 11.50 }
    });
    assert!(normalize(&payload).is_none());
}

#[test]
fn payload_without_gps_or_relay_is_unrecognized() {
    let payload = json!({
        "devEUI": "a1b2c3d4e5f60708",
        "object": { "battery": 87 }
    });
    assert_eq!(normalize(&payload).unwrap().reading, UplinkReading::Unrecognized);
}

#[test]
fn unknown_relay_status_falls_through_to_gps() {
    let payload = json!({
        "devEUI": "a1b2c3d4e5f60708",
        "object": {
            "relay_status": "unknown",
            "latitude": 3.85,
            "longitude": 11.50
        }
    });
    assert!(matches!(
        normalize(&payload).unwrap().reading,
        UplinkReading::Position(_)
    ));
}
