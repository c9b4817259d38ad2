//! Utilidades del sistema

pub mod errors;
pub mod jwt;

pub use errors::*;
