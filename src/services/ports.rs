//! services/ports.rs
//! Puntos de extensión del `UpdateChecker`: de dónde sale el XML y a quién
//! se avisa. Los tests los sustituyen por implementaciones en memoria.

use async_trait::async_trait;

use crate::{models::update_model::UpdateRecord, services::registry_service::FetchError};

#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, template_code: &str, version: &str) -> Result<String, FetchError>;
}

#[async_trait]
pub trait UpdateNotifier: Send + Sync {
    /// true = entregado. Nunca propaga errores.
    async fn notify(&self, record: &UpdateRecord) -> bool;
}
