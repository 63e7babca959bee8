//! services/registry_service.rs
//! Cliente HTTP del registro de plantillas. Un GET por plantilla, sin reintentos.

use anyhow::{Context, Result};
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Duration;

use crate::{config::app_config::AppConfig, services::ports::TemplateSource};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Conexión, TLS o timeout
    #[error("fallo de red consultando el registro: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("el registro respondió {0}")]
    Status(StatusCode),

    #[error("no se pudo leer el cuerpo de la respuesta: {0}")]
    Body(#[source] reqwest::Error),

    /// Bytes inválidos para el charset declarado (o UTF-8)
    #[error("el cuerpo de la respuesta no es {charset} válido")]
    Decode { charset: &'static str },
}

#[derive(Clone, Debug)]
pub struct RegistryService {
    http_client: Client,
    base_url: String,
}

impl RegistryService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        if config.registry_accept_invalid_certs {
            log::warn!("(RegistryService) Validación de certificados TLS DESACTIVADA para el registro");
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.registry_timeout_secs))
            .danger_accept_invalid_certs(config.registry_accept_invalid_certs)
            .build()
            .context("No se pudo construir el cliente HTTP del registro")?;

        Ok(Self {
            http_client,
            base_url: config.registry_base_url.clone(),
        })
    }

    /// Devuelve el XML crudo, decodificado con el charset que declara el
    /// Content-Type (UTF-8 si no declara ninguno).
    pub async fn fetch_template(
        &self,
        template_code: &str,
        version: &str,
    ) -> std::result::Result<String, FetchError> {
        log::info!(
            "(fetch_template) GET {} P_TC={} P_V={}",
            self.base_url,
            template_code,
            version
        );

        let resp = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("P_TC", template_code),
                ("P_V", version),
                ("P_NSRF", ""),
                ("P_ENTITY", ""),
                ("P_EXTENDED_INFO", ""),
            ])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.bytes().await.map_err(FetchError::Body)?;

        decode_body(content_type.as_deref(), &body)
    }
}

/// Decodifica sin caracteres de reemplazo: un byte inválido es un error.
/// Un BOM manda sobre el charset del header.
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<String, FetchError> {
    let (encoding, body) = match Encoding::for_bom(body) {
        Some((encoding, bom_len)) => (encoding, &body[bom_len..]),
        None => {
            let encoding = content_type
                .and_then(charset_label)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
                .unwrap_or(UTF_8);
            (encoding, body)
        }
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or(FetchError::Decode {
            charset: encoding.name(),
        })
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

#[async_trait]
impl TemplateSource for RegistryService {
    async fn fetch(
        &self,
        template_code: &str,
        version: &str,
    ) -> std::result::Result<String, FetchError> {
        self.fetch_template(template_code, version).await
    }
}
