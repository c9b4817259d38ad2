//! DTOs de la API
//!
//! Requests y responses serializables, separados de los modelos de base
//! de datos.

pub mod alert_dto;
pub mod position_dto;
pub mod vehicle_dto;
pub mod zone_dto;

use serde::{Deserialize, Serialize};

/// Parámetros de paginación comunes (?skip=0&limit=100)
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// Envoltorio genérico de respuesta para operaciones de escritura
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}
