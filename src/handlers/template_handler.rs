//! handlers/template_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::template_model::{
    CreateTemplateRequest, ListTemplatesQuery, UpdateTemplateStatusRequest,
};
use crate::services::{template_service::TemplateService, update_log_service::UpdateLogService};

fn internal_error(e: anyhow::Error) -> HttpResponse {
    log::error!("Error en API de plantillas: {:?}", e);
    HttpResponse::InternalServerError().json(json!({
        "error": "Internal server error",
        "details": format!("{:?}", e)
    }))
}

fn template_not_found(code: &str) -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "error": "Template not found",
        "template_code": code
    }))
}

/// GET /api/templates
pub async fn list_templates_endpoint(
    template_service: web::Data<TemplateService>,
    query: web::Query<ListTemplatesQuery>,
) -> HttpResponse {
    match template_service.list_templates(query.status).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => internal_error(e),
    }
}

/// POST /api/templates
pub async fn create_template_endpoint(
    template_service: web::Data<TemplateService>,
    body: web::Json<CreateTemplateRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let code = req.template_code.trim().to_string();
    if code.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "template_code is required"
        }));
    }

    match template_service.get_template(&code).await {
        Ok(Some(_)) => {
            return HttpResponse::Conflict().json(json!({
                "error": "Template already exists",
                "template_code": code
            }))
        }
        Ok(None) => {}
        Err(e) => return internal_error(e),
    }

    let req = CreateTemplateRequest {
        template_code: code,
        ..req
    };
    match template_service.create_template(req).await {
        Ok(template) => HttpResponse::Created().json(template),
        Err(e) => internal_error(e),
    }
}

/// GET /api/templates/{code}
pub async fn get_template_endpoint(
    template_service: web::Data<TemplateService>,
    path: web::Path<String>,
) -> HttpResponse {
    let code = path.into_inner();

    match template_service.get_template(&code).await {
        Ok(Some(template)) => HttpResponse::Ok().json(template),
        Ok(None) => template_not_found(&code),
        Err(e) => internal_error(e),
    }
}

/// PUT /api/templates/{code}/status
pub async fn update_template_status_endpoint(
    template_service: web::Data<TemplateService>,
    path: web::Path<String>,
    body: web::Json<UpdateTemplateStatusRequest>,
) -> HttpResponse {
    let code = path.into_inner();

    match template_service.set_status(&code, body.status).await {
        Ok(true) => match template_service.get_template(&code).await {
            Ok(Some(template)) => HttpResponse::Ok().json(template),
            Ok(None) => template_not_found(&code),
            Err(e) => internal_error(e),
        },
        Ok(false) => template_not_found(&code),
        Err(e) => internal_error(e),
    }
}

/// DELETE /api/templates/{code}
pub async fn delete_template_endpoint(
    template_service: web::Data<TemplateService>,
    path: web::Path<String>,
) -> HttpResponse {
    let code = path.into_inner();

    match template_service.delete_template(&code).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => template_not_found(&code),
        Err(e) => internal_error(e),
    }
}

/// GET /api/templates/{code}/updates
pub async fn list_template_updates_endpoint(
    template_service: web::Data<TemplateService>,
    update_log_service: web::Data<UpdateLogService>,
    path: web::Path<String>,
) -> HttpResponse {
    let code = path.into_inner();

    let template = match template_service.get_template(&code).await {
        Ok(Some(template)) => template,
        Ok(None) => return template_not_found(&code),
        Err(e) => return internal_error(e),
    };

    match update_log_service.list_for_template(&template.id).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => internal_error(e),
    }
}
