//! Utilidades JWT
//!
//! Decodificación de tokens emitidos por el servicio de autenticación
//! (mismo JWT_SECRET compartido). Este backend no emite tokens.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::utils::errors::AppError;

/// Claims del token de acceso
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identificador del usuario (string, como lo emite el servicio de auth)
    pub sub: String,
    /// Rol del usuario: "USER" | "ADMIN"
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

/// Decodificar y validar un token, devolviendo los claims
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| AppError::Jwt(format!("Invalid token: {}", e)))?;
    Ok(data.claims)
}

/// Extraer el user_id numérico del token
pub fn decode_user_id(token: &str, secret: &str) -> Result<i32, AppError> {
    let claims = decode_token(token, secret)?;
    claims
        .sub
        .parse::<i32>()
        .map_err(|_| AppError::Jwt("Invalid subject in token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_token(sub: &str, role: Option<&str>, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            role: role.map(|r| r.to_string()),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_valid_token() {
        let token = make_token("42", Some("ADMIN"), "test-secret");
        let claims = decode_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role.as_deref(), Some("ADMIN"));
        assert_eq!(decode_user_id(&token, "test-secret").unwrap(), 42);
    }

    #[test]
    fn test_decode_wrong_secret() {
        let token = make_token("42", None, "test-secret");
        assert!(decode_token(&token, "another-secret").is_err());
    }

    #[test]
    fn test_decode_non_numeric_subject() {
        let token = make_token("not-a-number", None, "test-secret");
        assert!(decode_user_id(&token, "test-secret").is_err());
    }
}
