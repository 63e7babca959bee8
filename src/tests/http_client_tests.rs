//! tests/http_client_tests.rs
//! `RegistryService` y `MattermostService` contra un servidor HTTP local.

use actix_rt::test;
use chrono::Utc;

use crate::config::app_config::AppConfig;
use crate::models::update_model::{MessageStatus, UpdateRecord};
use crate::services::mattermost_service::MattermostService;
use crate::services::registry_service::{FetchError, RegistryService};
use crate::services::response_parser::parse_registry_response;
use crate::tests::support::{closed_port_url, encode_cp1251, registry_xml, StubServer};

fn registry_config(base_url: String) -> AppConfig {
    AppConfig {
        registry_base_url: base_url,
        registry_timeout_secs: 5,
        ..AppConfig::default()
    }
}

fn webhook_config(webhook_url: Option<String>) -> AppConfig {
    AppConfig {
        mattermost_webhook_url: webhook_url,
        mattermost_channel: Some("template-updates".to_string()),
        notify_timeout_secs: 5,
        ..AppConfig::default()
    }
}

fn sample_record() -> UpdateRecord {
    UpdateRecord {
        id: "rec".to_string(),
        template_id: "tpl".to_string(),
        template_code: "T001".to_string(),
        old_version: "1.0.0".to_string(),
        new_version: "1.0.1".to_string(),
        has_validation_changes: true,
        message_status: MessageStatus::NotSent,
        raw_xml: None,
        created_at: Utc::now(),
    }
}

#[test]
async fn registry_sends_fixed_query_parameters() {
    let xml = registry_xml("1.0.1", "описание");
    let server = StubServer::start(200, "application/xml; charset=utf-8", xml.clone());
    let registry =
        RegistryService::new(&registry_config(format!("{}/api/template", server.base_url))).unwrap();

    let body = registry.fetch_template("T001", "1.0.0").await.unwrap();
    assert_eq!(body, xml);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/api/template");
    assert_eq!(
        requests[0].query,
        "P_TC=T001&P_V=1.0.0&P_NSRF=&P_ENTITY=&P_EXTENDED_INFO="
    );
    server.stop().await;
}

#[test]
async fn registry_decodes_declared_charset() {
    let xml = r#"<ROOT xmlns="urn:t"><VERSION>2.0</VERSION><DESCRIPTION_UPDATE>добавлена проверка</DESCRIPTION_UPDATE></ROOT>"#;
    let server = StubServer::start(200, "text/xml; charset=windows-1251", encode_cp1251(xml));
    let registry = RegistryService::new(&registry_config(server.base_url.clone())).unwrap();

    let body = registry.fetch_template("T001", "1.0").await.unwrap();
    assert_eq!(body, xml);

    let candidate = parse_registry_response(&body, "T001").unwrap();
    assert!(candidate.has_validation_changes);
    server.stop().await;
}

#[test]
async fn registry_defaults_to_utf8_without_charset() {
    let xml = registry_xml("3.0", "обновлено описание формы");
    let server = StubServer::start(200, "application/xml", xml.clone());
    let registry = RegistryService::new(&registry_config(server.base_url.clone())).unwrap();

    assert_eq!(registry.fetch_template("T001", "1.0").await.unwrap(), xml);
    server.stop().await;
}

#[test]
async fn registry_rejects_undecodable_body() {
    let mut body = b"<ROOT><VERSION>2.0</VERSION><DESCRIPTION_UPDATE>".to_vec();
    body.extend_from_slice(&[0xFF, 0xFE, 0xC0]);
    body.extend_from_slice(b"</DESCRIPTION_UPDATE></ROOT>");
    let server = StubServer::start(200, "application/xml", body);
    let registry = RegistryService::new(&registry_config(server.base_url.clone())).unwrap();

    let err = registry.fetch_template("T001", "1.0").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { charset: "UTF-8" }));
    server.stop().await;
}

#[test]
async fn registry_error_status_is_a_fetch_failure() {
    let server = StubServer::start(502, "text/plain", "bad gateway");
    let registry = RegistryService::new(&registry_config(server.base_url.clone())).unwrap();

    let err = registry.fetch_template("T001", "1.0.0").await.unwrap_err();
    assert!(matches!(err, FetchError::Status(status) if status.as_u16() == 502));
    server.stop().await;
}

#[test]
async fn registry_unreachable_is_a_transport_failure() {
    let registry = RegistryService::new(&registry_config(closed_port_url())).unwrap();

    let err = registry.fetch_template("T001", "1.0.0").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[test]
async fn notifier_posts_rendered_message() {
    let server = StubServer::start(200, "text/plain", "ok");
    let mattermost =
        MattermostService::new(&webhook_config(Some(format!("{}/hooks/abc", server.base_url))))
            .unwrap();

    assert!(mattermost.send_update_notification(&sample_record()).await);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/hooks/abc");
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));

    let payload: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(payload["channel"], "template-updates");
    assert_eq!(payload["username"], "Template Monitor");
    assert_eq!(payload["icon_emoji"], ":robot_face:");
    let text = payload["text"].as_str().unwrap();
    assert!(text.contains("`T001`"));
    assert!(text.contains("`1.0.0` → `1.0.1`"));
    assert!(text.contains("КРИТИЧНОЕ ОБНОВЛЕНИЕ"));
    server.stop().await;
}

#[test]
async fn notifier_reports_false_on_error_status() {
    let server = StubServer::start(500, "text/plain", "boom");
    let mattermost =
        MattermostService::new(&webhook_config(Some(server.base_url.clone()))).unwrap();

    assert!(!mattermost.send_update_notification(&sample_record()).await);
    assert_eq!(server.requests().len(), 1);
    server.stop().await;
}

#[test]
async fn notifier_reports_false_when_unreachable() {
    let mattermost = MattermostService::new(&webhook_config(Some(closed_port_url()))).unwrap();
    assert!(!mattermost.send_update_notification(&sample_record()).await);
}

#[test]
async fn notifier_without_webhook_does_not_send() {
    let mattermost = MattermostService::new(&webhook_config(None)).unwrap();
    assert!(mattermost.webhook_url().is_none());
    assert!(!mattermost.send_update_notification(&sample_record()).await);
}
