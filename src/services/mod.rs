//! Servicios del sistema
//!
//! Lógica de dominio y clientes de servicios externos (ChirpStack, OSRM).

pub mod chirpstack_service;
pub mod geofencing_service;
pub mod notification_service;
pub mod osrm_service;
pub mod relay_service;
#[cfg(test)]
pub mod test_support;
pub mod uplink_decoder;

pub use chirpstack_service::ChirpstackClient;
pub use geofencing_service::GeofencingService;
pub use notification_service::{NotificationRegistry, WsEvent};
pub use osrm_service::OsrmClient;
pub use relay_service::RelayService;
