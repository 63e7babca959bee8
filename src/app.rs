//! app.rs
use crate::handlers::{template_handler, update_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/templates")
                    .route(
                        "",
                        web::get().to(template_handler::list_templates_endpoint),
                    )
                    .route(
                        "",
                        web::post().to(template_handler::create_template_endpoint),
                    )
                    .route(
                        "/{code}",
                        web::get().to(template_handler::get_template_endpoint),
                    )
                    .route(
                        "/{code}",
                        web::delete().to(template_handler::delete_template_endpoint),
                    )
                    .route(
                        "/{code}/status",
                        web::put().to(template_handler::update_template_status_endpoint),
                    )
                    .route(
                        "/{code}/updates",
                        web::get().to(template_handler::list_template_updates_endpoint),
                    ),
            )
            .service(
                web::scope("/updates")
                    .route("", web::get().to(update_handler::list_updates_endpoint))
                    .route("/{id}", web::get().to(update_handler::get_update_endpoint)),
            ),
    );
}
