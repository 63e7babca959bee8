//! config/app_config.rs
//! Configuración global del monitor (URLs, canal, timeouts).
//! Se construye una sola vez en `main` y se inyecta en cada servicio.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,

    /// Endpoint del registro de plantillas (GET con P_TC, P_V, ...)
    pub registry_base_url: String,
    /// Desactiva la validación de certificados del registro.
    /// Solo para entornos con certificados internos.
    pub registry_accept_invalid_certs: bool,
    pub registry_timeout_secs: u64,

    /// Webhook entrante de Mattermost. Sin él, el notificador no envía nada.
    pub mattermost_webhook_url: Option<String>,
    pub mattermost_channel: Option<String>,
    pub mattermost_username: String,
    pub mattermost_icon_emoji: String,
    pub notify_timeout_secs: u64,

    pub server_host: String,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: "sqlite:data/templates.db".to_string(),
            registry_base_url: String::new(),
            registry_accept_invalid_certs: false,
            registry_timeout_secs: 30,
            mattermost_webhook_url: None,
            mattermost_channel: None,
            mattermost_username: "Template Monitor".to_string(),
            mattermost_icon_emoji: ":robot_face:".to_string(),
            notify_timeout_secs: 10,
            server_host: "0.0.0.0".to_string(),
            server_port: 5022,
        }
    }
}

impl AppConfig {
    /// Lee la configuración del entorno (después de `dotenv()`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Igual que `from_env`, pero con una función de búsqueda inyectable (tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Variables vacías cuentan como no definidas
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = AppConfig::default();

        Ok(AppConfig {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            registry_base_url: get("REGISTRY_API_BASE_URL").unwrap_or(defaults.registry_base_url),
            registry_accept_invalid_certs: match get("REGISTRY_ACCEPT_INVALID_CERTS") {
                Some(v) => parse_bool("REGISTRY_ACCEPT_INVALID_CERTS", &v)?,
                None => defaults.registry_accept_invalid_certs,
            },
            registry_timeout_secs: match get("REGISTRY_TIMEOUT_SECS") {
                Some(v) => parse_number("REGISTRY_TIMEOUT_SECS", &v)?,
                None => defaults.registry_timeout_secs,
            },
            mattermost_webhook_url: get("MATTERMOST_WEBHOOK_URL"),
            mattermost_channel: get("MATTERMOST_CHANNEL"),
            mattermost_username: get("MATTERMOST_USERNAME").unwrap_or(defaults.mattermost_username),
            mattermost_icon_emoji: get("MATTERMOST_ICON_EMOJI")
                .unwrap_or(defaults.mattermost_icon_emoji),
            notify_timeout_secs: match get("NOTIFY_TIMEOUT_SECS") {
                Some(v) => parse_number("NOTIFY_TIMEOUT_SECS", &v)?,
                None => defaults.notify_timeout_secs,
            },
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: match get("SERVER_PORT") {
                Some(v) => parse_number("SERVER_PORT", &v)?,
                None => defaults.server_port,
            },
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{} no es un booleano válido: '{}'", key, other)),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| anyhow!("{} no es un número válido: '{}'", key, value))
}
