//! Controllers de la aplicación
//!
//! Lógica de negocio entre las rutas y los repositorios.

pub mod alert_controller;
pub mod tracking_controller;
pub mod uplink_controller;
pub mod vehicle_controller;
pub mod zone_controller;

pub use alert_controller::AlertController;
pub use tracking_controller::TrackingController;
pub use uplink_controller::{UplinkController, UplinkOutcome};
pub use vehicle_controller::VehicleController;
pub use zone_controller::ZoneController;
