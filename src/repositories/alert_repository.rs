//! Repositorio de Alert

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::models::{Alert, AlertSeverity, AlertType};
use crate::utils::errors::AppError;

/// Datos de una alerta nueva (antes de insertar)
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub vehicle_id: i32,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub details: serde_json::Value,
}

/// Destino de alertas nuevas.
///
/// Seam para que los tests de servicios capturen las alertas emitidas sin
/// base de datos.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn insert(&self, new: NewAlert) -> Result<Alert, AppError>;
}

#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

#[async_trait]
impl AlertSink for AlertRepository {
    async fn insert(&self, new: NewAlert) -> Result<Alert, AppError> {
        AlertRepository::insert(self, new).await
    }
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: NewAlert) -> Result<Alert, AppError> {
        let alert = sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (vehicle_id, alert_type, severity, message, details, acknowledged, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6)
            RETURNING *
            "#,
        )
        .bind(new.vehicle_id)
        .bind(new.alert_type.as_str())
        .bind(new.severity.as_str())
        .bind(new.message)
        .bind(new.details)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error inserting alert: {}", e)))?;

        Ok(alert)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Alert>, AppError> {
        let alert = sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error finding alert: {}", e)))?;

        Ok(alert)
    }

    /// Alertas de todos los vehículos de un propietario
    pub async fn list_for_owner(
        &self,
        owner_user_id: i32,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Alert>, AppError> {
        let alerts = sqlx::query_as::<_, Alert>(
            r#"
            SELECT a.* FROM alerts a
            JOIN vehicles v ON v.id = a.vehicle_id
            WHERE v.owner_user_id = $1
            ORDER BY a.created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(owner_user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing alerts: {}", e)))?;

        Ok(alerts)
    }

    pub async fn list_for_vehicle(
        &self,
        vehicle_id: i32,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Alert>, AppError> {
        let alerts = sqlx::query_as::<_, Alert>(
            "SELECT * FROM alerts WHERE vehicle_id = $1 ORDER BY created_at DESC OFFSET $2 LIMIT $3",
        )
        .bind(vehicle_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing vehicle alerts: {}", e)))?;

        Ok(alerts)
    }

    pub async fn acknowledge(&self, id: i32, user_id: i32) -> Result<Alert, AppError> {
        let alert = sqlx::query_as::<_, Alert>(
            r#"
            UPDATE alerts
            SET acknowledged = TRUE, acknowledged_by = $2, acknowledged_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error acknowledging alert: {}", e)))?;

        Ok(alert)
    }
}
