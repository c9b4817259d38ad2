//! Repositorios de acceso a datos

pub mod alert_repository;
pub mod position_repository;
pub mod vehicle_repository;
pub mod zone_repository;

pub use alert_repository::{AlertRepository, AlertSink, NewAlert};
pub use position_repository::{NewPosition, PositionRepository};
pub use vehicle_repository::{RelayCommandStore, VehicleRepository};
pub use zone_repository::{ActiveZoneSource, NewZone, ZoneRepository};
