use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::{
    config::app_config::AppConfig, models::update_model::UpdateRecord,
    services::ports::UpdateNotifier,
};

/// Cuerpo del webhook entrante de Mattermost
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub username: String,
    pub icon_emoji: String,
}

#[derive(Clone, Debug)]
pub struct MattermostService {
    http_client: Client,
    webhook_url: Option<String>,
    channel: Option<String>,
    username: String,
    icon_emoji: String,
}

impl MattermostService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.notify_timeout_secs))
            .build()
            .context("No se pudo construir el cliente HTTP de Mattermost")?;

        Ok(Self {
            http_client,
            webhook_url: config.mattermost_webhook_url.clone(),
            channel: config.mattermost_channel.clone(),
            username: config.mattermost_username.clone(),
            icon_emoji: config.mattermost_icon_emoji.clone(),
        })
    }

    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref()
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Envía el aviso de la actualización. true = webhook respondió 2xx.
    pub async fn send_update_notification(&self, record: &UpdateRecord) -> bool {
        let Some(webhook_url) = self.webhook_url.as_deref() else {
            log::warn!("(send_update_notification) Webhook URL de Mattermost no configurado");
            return false;
        };

        let payload = self.build_payload(record, Utc::now());
        match self.post_webhook(webhook_url, &payload).await {
            Ok(()) => {
                log::info!(
                    "(send_update_notification) Notificación enviada a Mattermost para {}",
                    record.template_code
                );
                true
            }
            Err(e) => {
                log::error!(
                    "(send_update_notification) Error enviando notificación de {}: {:?}",
                    record.template_code,
                    e
                );
                false
            }
        }
    }

    pub fn build_payload(&self, record: &UpdateRecord, at: DateTime<Utc>) -> WebhookPayload {
        WebhookPayload {
            text: render_message(record, at),
            channel: self.channel.clone(),
            username: self.username.clone(),
            icon_emoji: self.icon_emoji.clone(),
        }
    }

    async fn post_webhook(&self, webhook_url: &str, payload: &WebhookPayload) -> Result<()> {
        let resp = self
            .http_client
            .post(webhook_url)
            .json(payload)
            .send()
            .await
            .context("Fallo al hacer POST al webhook")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body_txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Webhook respondió {}: {}", status, body_txt));
        }
        Ok(())
    }
}

#[async_trait]
impl UpdateNotifier for MattermostService {
    async fn notify(&self, record: &UpdateRecord) -> bool {
        self.send_update_notification(record).await
    }
}

/// Texto del mensaje (markdown de Mattermost)
pub fn render_message(record: &UpdateRecord, at: DateTime<Utc>) -> String {
    let emoji = if record.has_validation_changes {
        "🚨"
    } else {
        "📝"
    };

    let mut message = format!("**{} Обновление шаблона**\n\n", emoji);
    message += &format!("**Шаблон:** `{}`\n", record.template_code);
    message += &format!(
        "**Версия:** `{}` → `{}`\n",
        record.old_version, record.new_version
    );

    if record.has_validation_changes {
        message += "⚠️ **КРИТИЧНОЕ ОБНОВЛЕНИЕ**\n";
        message += "🔍 **Изменения в проверках**\n";
    }

    message += &format!("**Время:** {}", at.format("%d.%m.%Y %H:%M:%S"));
    message
}
