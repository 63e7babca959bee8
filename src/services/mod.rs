//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

use chrono::{DateTime, SecondsFormat, Utc};

pub mod mattermost_service;
pub mod ports;
pub mod registry_service;
pub mod response_parser;
pub mod template_service;
pub mod update_checker;
pub mod update_log_service;

/// Timestamps en SQLite: RFC 3339 con ancho fijo (microsegundos), así el
/// orden de texto coincide con el orden temporal.
pub(crate) fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
