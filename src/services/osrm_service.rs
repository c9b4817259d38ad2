//! Cliente OSRM (road snapping)
//!
//! Dado un fix GPS crudo, busca la coordenada de ruta más cercana con el
//! servicio `nearest` de OSRM. Best-effort: ante cualquier fallo se
//! devuelven las coordenadas originales.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct OsrmNearestResponse {
    code: String,
    #[serde(default)]
    waypoints: Vec<OsrmWaypoint>,
}

#[derive(Debug, Deserialize)]
struct OsrmWaypoint {
    /// [longitude, latitude]
    location: [f64; 2],
}

#[derive(Clone)]
pub struct OsrmClient {
    base_url: String,
    client: reqwest::Client,
}

impl OsrmClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Ajustar (lat, lon) a la ruta más cercana. Devuelve las coordenadas
    /// originales si OSRM falla o no responde a tiempo.
    pub async fn snap_to_road(&self, lat: f64, lon: f64) -> (f64, f64) {
        // OSRM espera lon,lat
        let url = format!("{}/{},{}?number=1", self.base_url, lon, lat);

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<OsrmNearestResponse>().await {
                    Ok(data) if data.code == "Ok" && !data.waypoints.is_empty() => {
                        let [snapped_lon, snapped_lat] = data.waypoints[0].location;
                        debug!(
                            "🛣️ OSRM snap: ({}, {}) -> ({}, {})",
                            lat, lon, snapped_lat, snapped_lon
                        );
                        (snapped_lat, snapped_lon)
                    }
                    Ok(_) => {
                        warn!("OSRM nearest sin waypoints para ({}, {})", lat, lon);
                        (lat, lon)
                    }
                    Err(e) => {
                        warn!("Respuesta OSRM inválida: {}", e);
                        (lat, lon)
                    }
                }
            }
            Ok(response) => {
                warn!("OSRM nearest falló con status {}", response.status());
                (lat, lon)
            }
            Err(e) => {
                warn!("Error de red con OSRM: {}", e);
                (lat, lon)
            }
        }
    }
}
