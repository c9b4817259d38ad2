//! Estado compartido de la aplicación
//!
//! Se construye una vez al arranque y se clona barato en cada handler
//! (pool, clientes HTTP y registro de notificaciones son todos Arc por dentro).

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::services::{
    ChirpstackClient, GeofencingService, NotificationRegistry, OsrmClient, RelayService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub chirpstack: ChirpstackClient,
    pub osrm: OsrmClient,
    pub notifications: NotificationRegistry,
    pub relay: RelayService,
    pub geofencing: GeofencingService,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        let chirpstack = ChirpstackClient::new(&config);
        let osrm = OsrmClient::new(config.osrm_url.clone());
        let notifications = NotificationRegistry::new();
        let relay = RelayService::new(pool.clone(), chirpstack.clone(), notifications.clone());
        let geofencing = GeofencingService::new(pool.clone(), relay.clone(), notifications.clone());

        Self {
            pool,
            config,
            chirpstack,
            osrm,
            notifications,
            relay,
            geofencing,
        }
    }
}
