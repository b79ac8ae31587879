use actix_web::web;

use crate::handlers::payroll;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payroll")
            .route("", web::get().to(payroll::list))
            .route("/{id}", web::get().to(payroll::get)),
    );
}
