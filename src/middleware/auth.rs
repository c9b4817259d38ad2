//! Autenticación JWT
//!
//! Extractor `AuthUser` para los endpoints protegidos. Los tokens los emite
//! el servicio de autenticación con el mismo JWT_SECRET; acá solo se
//! validan y se extraen user_id y rol.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::decode_token;

/// Usuario autenticado, inyectado vía extractor en los handlers
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub role: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("ADMIN")
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

        let claims = decode_token(token, &state.config.jwt_secret)?;
        let user_id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized("Invalid subject in token".to_string()))?;

        Ok(AuthUser {
            user_id,
            role: claims.role,
        })
    }
}
