//! handlers/mod.rs
//! Handlers del API de administración (plantillas e historial de cambios).
pub mod template_handler;
pub mod update_handler;
