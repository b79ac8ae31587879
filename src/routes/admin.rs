use actix_web::web;

use crate::handlers::{attendance, employees, leave, payroll};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/attendance", web::get().to(attendance::list_all))
            .route("/attendance/report", web::get().to(attendance::report))
            .route(
                "/attendance/auto-checkout",
                web::post().to(attendance::auto_checkout),
            )
            .route("/employees", web::post().to(employees::create))
            .route(
                "/employees/{id}/leave-balance",
                web::put().to(leave::override_balance),
            )
            .route("/leave/report", web::get().to(leave::report))
            .route("/leave/sync-balances", web::post().to(leave::sync_balances))
            .route("/payroll", web::post().to(payroll::create))
            .route("/payroll/generate", web::post().to(payroll::generate))
            .route("/payroll/{id}", web::put().to(payroll::update))
            .route("/payroll/{id}", web::delete().to(payroll::delete))
            .route("/payroll/{id}/mark-paid", web::post().to(payroll::mark_paid))
            .route("/payroll/{id}/cancel", web::post().to(payroll::cancel)),
    );
}
