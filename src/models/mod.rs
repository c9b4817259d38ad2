//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL.

pub mod alert;
pub mod position;
pub mod vehicle;
pub mod zone;

pub use alert::{Alert, AlertSeverity, AlertType};
pub use position::{MovementStatus, Position};
pub use vehicle::{Vehicle, VehicleStatus};
pub use zone::{LatLng, Zone, ZoneType};
