//! handlers/update_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::services::update_log_service::UpdateLogService;

#[derive(Deserialize)]
pub struct PaginationQuery {
    page: Option<u64>,
    page_size: Option<u64>,
}

/// GET /api/updates
pub async fn list_updates_endpoint(
    update_log_service: web::Data<UpdateLogService>,
    query: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10).clamp(1, 200);

    match update_log_service.list_updates(page, page_size).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}

/// GET /api/updates/{id}
pub async fn get_update_endpoint(
    update_log_service: web::Data<UpdateLogService>,
    path: web::Path<String>,
) -> HttpResponse {
    let record_id = path.into_inner();
    match update_log_service.get_record(&record_id).await {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Update record not found",
            "id": record_id
        })),
        Err(e) => {
            log::error!("Error consultando update_log {}: {:?}", record_id, e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error",
                "details": format!("{:?}", e)
            }))
        }
    }
}
