//! models/template_model.rs
//! Plantillas monitoreadas y requests del API de administración.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Versión inicial cuando no se indica otra al registrar una plantilla
pub const DEFAULT_INITIAL_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Active,
    Inactive,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Active => "active",
            TemplateStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(TemplateStatus::Active),
            "inactive" => Ok(TemplateStatus::Inactive),
            other => Err(anyhow!("Estado de plantilla desconocido: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: String,
    pub template_code: String,
    /// Solo avanza tras una notificación entregada
    pub current_version: String,
    pub status: TemplateStatus,
    pub last_checked: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request para registrar una plantilla
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub template_code: String,
    pub current_version: Option<String>,
    pub status: Option<TemplateStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTemplateStatusRequest {
    pub status: TemplateStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListTemplatesQuery {
    pub status: Option<TemplateStatus>,
}
