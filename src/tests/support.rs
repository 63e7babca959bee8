//! tests/support.rs
//! Helpers compartidos: base en memoria, registro/notificador falsos y un
//! servidor HTTP local para probar los clientes reales.

use actix_web::{dev::ServerHandle, http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::{
    collections::HashMap,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    models::{
        check_model::{CheckSummary, TemplateOutcome},
        template_model::{CreateTemplateRequest, TemplateRecord, TemplateStatus},
        update_model::UpdateRecord,
    },
    services::{
        ports::{TemplateSource, UpdateNotifier},
        registry_service::FetchError,
        template_service::TemplateService,
    },
};

/// SQLite en memoria con migraciones aplicadas. Una sola conexión que nunca
/// se recicla (cada conexión en memoria es una base distinta).
pub async fn memory_pool() -> Pool<Sqlite> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("url sqlite válida")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options)
        .await
        .expect("No se pudo abrir SQLite en memoria");

    TemplateService::new(pool.clone())
        .run_migrations()
        .await
        .expect("Fallaron las migraciones");
    pool
}

pub async fn seed_template(
    service: &TemplateService,
    code: &str,
    version: &str,
    status: TemplateStatus,
) -> TemplateRecord {
    service
        .create_template(CreateTemplateRequest {
            template_code: code.to_string(),
            current_version: Some(version.to_string()),
            status: Some(status),
        })
        .await
        .expect("No se pudo crear la plantilla de prueba")
}

pub fn registry_xml(version: &str, description: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<TEMPLATE_INFO xmlns="http://eias.example/xsd/template-info">
  <VERSION>{version}</VERSION>
  <DESCRIPTION_UPDATE>{description}</DESCRIPTION_UPDATE>
</TEMPLATE_INFO>"#
    )
}

pub fn outcome_of(summary: &CheckSummary, code: &str) -> Option<TemplateOutcome> {
    summary
        .results
        .iter()
        .find(|r| r.template_code == code)
        .map(|r| r.outcome)
}

// --------------------------------------------------------------------------------
// Registro falso
// --------------------------------------------------------------------------------
#[derive(Clone, Default)]
pub struct FakeRegistry {
    responses: Arc<Mutex<HashMap<String, Option<String>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeRegistry {
    pub fn respond(&self, code: &str, xml: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(code.to_string(), Some(xml.into()));
    }

    pub fn fail(&self, code: &str) {
        self.responses.lock().unwrap().insert(code.to_string(), None);
    }

    /// (código, versión) de cada consulta, en orden
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TemplateSource for FakeRegistry {
    async fn fetch(&self, template_code: &str, version: &str) -> Result<String, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((template_code.to_string(), version.to_string()));

        match self.responses.lock().unwrap().get(template_code) {
            Some(Some(xml)) => Ok(xml.clone()),
            _ => Err(FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)),
        }
    }
}

// --------------------------------------------------------------------------------
// Notificador falso
// --------------------------------------------------------------------------------
#[derive(Clone)]
pub struct FakeNotifier {
    deliver: Arc<Mutex<bool>>,
    sent: Arc<Mutex<Vec<UpdateRecord>>>,
}

impl FakeNotifier {
    pub fn delivering(deliver: bool) -> Self {
        Self {
            deliver: Arc::new(Mutex::new(deliver)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_delivering(&self, deliver: bool) {
        *self.deliver.lock().unwrap() = deliver;
    }

    /// Registros recibidos (entregados o no)
    pub fn sent(&self) -> Vec<UpdateRecord> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpdateNotifier for FakeNotifier {
    async fn notify(&self, record: &UpdateRecord) -> bool {
        self.sent.lock().unwrap().push(record.clone());
        *self.deliver.lock().unwrap()
    }
}

// --------------------------------------------------------------------------------
// Servidor HTTP local
// --------------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

struct StubState {
    status: u16,
    content_type: String,
    body: Vec<u8>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct StubServer {
    pub base_url: String,
    handle: ServerHandle,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubServer {
    /// Responde siempre con el mismo status/cuerpo y guarda cada request
    pub fn start(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = web::Data::new(StubState {
            status,
            content_type: content_type.to_string(),
            body: body.into(),
            captured: captured.clone(),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .default_service(web::to(stub_handler))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("No se pudo abrir puerto local");

        let port = server.addrs()[0].port();
        let server = server.run();
        let handle = server.handle();
        actix_rt::spawn(server);

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            handle,
            captured,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

async fn stub_handler(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<StubState>,
) -> HttpResponse {
    state.captured.lock().unwrap().push(CapturedRequest {
        method: req.method().to_string(),
        path: req.path().to_string(),
        query: req.query_string().to_string(),
        content_type: req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
        body: body.to_vec(),
    });

    HttpResponse::build(StatusCode::from_u16(state.status).expect("status válido"))
        .content_type(state.content_type.as_str())
        .body(state.body.clone())
}

/// Puerto local sin nadie escuchando
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind local");
    let port = listener.local_addr().expect("addr local").port();
    drop(listener);
    format!("http://127.0.0.1:{}/hooks/closed", port)
}

/// Codifica texto ASCII + cirílico básico en windows-1251
pub fn encode_cp1251(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            c if c.is_ascii() => c as u8,
            'А'..='я' => (c as u32 - 'А' as u32 + 0xC0) as u8,
            'ё' => 0xB8,
            'Ё' => 0xA8,
            other => panic!("carácter no soportado en el helper cp1251: {}", other),
        })
        .collect()
}
