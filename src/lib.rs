//! SafeTrack Backend - rastreo de vehículos sobre LoRaWAN
//!
//! Ingesta de uplinks GPS vía webhook de ChirpStack, geofencing del lado
//! del servidor y comandos de corte de relé con confirmación asíncrona.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
