//! models/update_model.rs
//! Cambios de versión detectados y su estado de notificación.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    #[serde(rename = "SENT")]
    Sent,
    #[serde(rename = "NOTSENT")]
    NotSent,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "SENT",
            MessageStatus::NotSent => "NOTSENT",
        }
    }
}

impl FromStr for MessageStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SENT" => Ok(MessageStatus::Sent),
            "NOTSENT" => Ok(MessageStatus::NotSent),
            other => Err(anyhow!("Estado de mensaje desconocido: {}", other)),
        }
    }
}

/// Lo que el parser extrae de la respuesta del registro.
/// La comparación contra la versión local la hace el `UpdateChecker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub template_code: String,
    pub new_version: String,
    pub has_validation_changes: bool,
    pub description: String,
    pub raw_xml: String,
}

/// Fila de `update_logs` (con el código de la plantilla ya resuelto).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub id: String,
    pub template_id: String,
    pub template_code: String,
    pub old_version: String,
    pub new_version: String,
    pub has_validation_changes: bool,
    pub message_status: MessageStatus, // NOTSENT -> SENT, una sola vez
    pub raw_xml: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Para listar cambios con paginación
#[derive(Debug, Clone, Serialize)]
pub struct ListUpdatesResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<UpdateRecord>,
}
