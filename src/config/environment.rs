//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    // ChirpStack (network server LoRaWAN)
    pub chirpstack_api_url: String,
    pub chirpstack_api_key: Option<String>,
    // OSRM (road snapping, opcional)
    pub osrm_enabled: bool,
    pub osrm_url: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            chirpstack_api_url: env::var("CHIRPSTACK_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            chirpstack_api_key: env::var("CHIRPSTACK_API_KEY").ok().filter(|k| !k.is_empty()),
            osrm_enabled: env::var("OSRM_ENABLED")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            osrm_url: env::var("OSRM_URL")
                .unwrap_or_else(|_| "http://router.project-osrm.org/nearest/v1/driving".to_string()),
        }
    }
}

impl EnvironmentConfig {
    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
