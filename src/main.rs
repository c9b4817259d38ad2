use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};

use safetrack_backend::config::environment::EnvironmentConfig;
use safetrack_backend::database::DatabaseConnection;
use safetrack_backend::middleware::{cors_middleware, cors_middleware_with_origins};
use safetrack_backend::routes::create_api_router;
use safetrack_backend::state::AppState;

/// Intervalo del barrido de comandos de relé en vuelo
const COMMAND_SWEEP_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🛰️ SafeTrack Backend - Rastreo vehicular LoRaWAN");
    info!("================================================");

    let config = EnvironmentConfig::default();

    // Inicializar base de datos
    let db_connection = match DatabaseConnection::new_default().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };
    let pool = db_connection.pool().clone();

    let app_state = AppState::new(pool, config.clone());

    // Barrido periódico: expira comandos de relé sin confirmación aunque
    // nadie consulte esos vehículos
    let sweep_relay = app_state.relay.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(COMMAND_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if let Err(e) = sweep_relay.sweep_pending_commands().await {
                error!("❌ Error en barrido de comandos: {}", e);
            }
        }
    });

    // CORS permisivo en desarrollo, restringido a orígenes configurados en
    // producción
    let cors = if config.is_development() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(config.cors_origins.clone())
    };

    let app = create_api_router().layer(cors).with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("📡 Webhook ChirpStack:");
    info!("   POST /api/v1/webhook/uplink - Ingesta de uplinks (siempre 200)");
    info!("🚗 Vehículos:");
    info!("   GET  /api/v1/vehicles - Listar vehículos");
    info!("   POST /api/v1/vehicles/provision - Pre-registrar dispositivo (ADMIN)");
    info!("   POST /api/v1/vehicles/pair - Reclamar dispositivo disponible");
    info!("   GET  /api/v1/vehicles/:id - Obtener vehículo");
    info!("   PUT  /api/v1/vehicles/:id - Actualizar (relay_cut = comando diferido)");
    info!("   POST /api/v1/vehicles/:id/release - Liberar vehículo");
    info!("   DELETE /api/v1/vehicles/:id - Eliminar vehículo (ADMIN)");
    info!("🚧 Zonas de geofence:");
    info!("   POST /api/v1/zones - Crear zona");
    info!("   GET  /api/v1/zones - Listar zonas");
    info!("   GET  /api/v1/zones/:id - Obtener zona");
    info!("   PUT  /api/v1/zones/:id - Actualizar zona");
    info!("   DELETE /api/v1/zones/:id - Eliminar zona");
    info!("📍 Tracking:");
    info!("   POST /api/v1/tracking - Ingesta manual de posición");
    info!("   GET  /api/v1/tracking/:vehicle_id/positions - Historial de posiciones");
    info!("   GET  /api/v1/tracking/:vehicle_id/latest - Última posición");
    info!("🚨 Alertas:");
    info!("   GET  /api/v1/alerts - Alertas del usuario");
    info!("   GET  /api/v1/alerts/vehicle/:vehicle_id - Alertas de un vehículo");
    info!("   POST /api/v1/alerts/:id/acknowledge - Acusar alerta");
    info!("🔌 Tiempo real:");
    info!("   GET  /ws/:token - WebSocket de notificaciones");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
