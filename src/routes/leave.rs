use actix_web::web;

use crate::handlers::leave;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leave")
            .route("", web::post().to(leave::submit))
            .route("", web::get().to(leave::list))
            .route("/mine", web::get().to(leave::list_own))
            .route("/balance", web::get().to(leave::balance))
            .route("/{id}", web::get().to(leave::get))
            .route("/{id}/manager/approve", web::post().to(leave::manager_approve))
            .route("/{id}/manager/reject", web::post().to(leave::manager_reject))
            .route("/{id}/admin/approve", web::post().to(leave::admin_approve))
            .route("/{id}/admin/reject", web::post().to(leave::admin_reject)),
    );
}
